use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_SIGNED: &str = "signed";

// One-time remote signing link for a client's packet.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub id: i64,
    pub client_id: i64,
    pub token: String,
    pub packet_filename: String,
    pub signed_packet_filename: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub signed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequestResponse {
    pub token: String,
    pub url: String,
    pub full_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureSubmit {
    #[serde(default)]
    pub signature_data_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignatureSubmitResponse {
    pub detail: String,
    pub status: String,
}
