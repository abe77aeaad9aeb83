use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
    "http://localhost:8000",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub cors_allow_origins: Vec<String>,
    pub export_dir: PathBuf,
    pub public_base_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL is not set".to_string())?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid BIND_ADDR: {}", e))?;

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let cors_allow_origins = parse_origins(std::env::var("CORS_ALLOW_ORIGINS").ok().as_deref());

        let export_dir = std::env::var("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("exports"));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            bind_addr,
            db_max_connections,
            cors_allow_origins,
            export_dir,
            public_base_url,
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("DATABASE_URL is empty".to_string());
        }
        if self.db_max_connections == 0 {
            return Err("DB_MAX_CONNECTIONS must be greater than zero".to_string());
        }
        Ok(())
    }
}

fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let parsed: Vec<String> = raw
        .unwrap_or("")
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

    if parsed.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()
    } else {
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/crm".to_string(),
            bind_addr: "127.0.0.1:8000".parse().unwrap(),
            db_max_connections: 5,
            cors_allow_origins: parse_origins(None),
            export_dir: PathBuf::from("exports"),
            public_base_url: None,
        }
    }

    #[test]
    fn test_default_origins_when_unset() {
        let origins = parse_origins(None);
        assert!(origins.contains(&"http://localhost:5173".to_string()));
        assert_eq!(parse_origins(Some(" , ")), origins);
    }

    #[test]
    fn test_origins_are_split_and_trimmed() {
        let origins = parse_origins(Some("https://a.example, https://b.example ,"));
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = sample();
        assert!(config.validate().is_ok());
        config.db_max_connections = 0;
        assert!(config.validate().is_err());
    }
}
