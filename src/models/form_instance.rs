use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_FORM_STATUS: &str = "נוצר";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FormInstance {
    pub id: i64,
    pub new_product_id: i64,
    pub template_filename: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub filled_data: Option<serde_json::Value>,
    pub file_output_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFormInstance {
    pub template_filename: String,
    pub status: Option<String>,
    pub filled_data: Option<serde_json::Value>,
    pub file_output_path: Option<String>,
}
