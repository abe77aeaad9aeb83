use axum::Router;
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::routes::{admin, crm, health, justification};
use crate::state::AppState;

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/v1/crm", crm::router())
        .nest("/api/v1/justification", justification::router())
        .nest("/api/v1/admin", admin::router())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use http::{header, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::services::document_store::DocumentStore;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    fn test_app() -> Router {
        let config = AppConfig {
            database_url: "postgres://localhost/advisory_test".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            db_max_connections: 1,
            cors_allow_origins: vec!["http://localhost:5173".to_string()],
            export_dir: PathBuf::from("exports"),
            public_base_url: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool");
        let documents = DocumentStore::new(config.export_dir.clone());
        create_app(AppState {
            pool,
            config: Arc::new(config),
            documents,
        })
    }

    fn multipart_request(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_status_and_version() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/crm/clients")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_import_without_file_is_rejected() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"snapshot_month\"\r\n\r\n2024-05\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let response = test_app()
            .oneshot(multipart_request("/api/v1/admin/import-crm-balances", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Missing uploaded file");
    }

    #[tokio::test]
    async fn test_import_with_empty_file_is_rejected() {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"FNX.xml\"\r\nContent-Type: text/xml\r\n\r\n\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let response = test_app()
            .oneshot(multipart_request("/api/v1/admin/import-gemelnet-xml", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["detail"], "Empty XML file uploaded");
    }
}
