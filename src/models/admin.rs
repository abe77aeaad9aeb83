use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmImportResult {
    pub company_code: String,
    pub created_clients: i64,
    pub reused_clients: i64,
    pub created_snapshots: i64,
    pub rows_processed: i64,
    pub duplicates_skipped: i64,
    pub invalid_rows_skipped: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GemelNetImportResult {
    pub created_saving_products: i64,
    pub updated_saving_products: i64,
    pub rows_processed: i64,
    pub duplicates_skipped: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearCrmDataResult {
    pub deleted_snapshots: i64,
    pub deleted_client_notes: i64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearJustificationDataResult {
    pub deleted_saving_products: i64,
    pub deleted_existing_products: i64,
    pub deleted_new_products: i64,
    pub deleted_form_instances: i64,
}
