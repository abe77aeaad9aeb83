use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketTrimRequest {
    #[serde(default)]
    pub pages_to_remove: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketTrimResponse {
    pub detail: String,
    pub edited_filename: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub detail: String,
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct PacketQuery {
    #[serde(default)]
    pub generate: bool,
}
