mod app;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::logging::LoggingConfig;
use crate::services::document_store::DocumentStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logging first so startup failures are visible.
    logging::init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("Database migrations applied");

    let documents = DocumentStore::new(config.export_dir.clone());
    tokio::fs::create_dir_all(documents.root()).await?;

    let addr = config.bind_addr;
    let state = AppState {
        pool,
        config: Arc::new(config),
        documents,
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Advisory backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
