use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::document_store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub documents: DocumentStore,
}
