use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Proposed product, optionally replacing one existing product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub id: i64,
    pub client_id: i64,
    pub existing_product_id: Option<i64>,
    pub fund_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub fund_code: String,
    #[serde(rename = "yield1yr")]
    pub yield_1yr: Option<f64>,
    #[serde(rename = "yield3yr")]
    pub yield_3yr: Option<f64>,
    pub personal_number: Option<String>,
    pub management_fee_balance: Option<f64>,
    pub management_fee_contributions: Option<f64>,
    pub accumulated_amount: Option<f64>,
    pub employment_status: Option<String>,
    pub has_regular_contributions: Option<bool>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNewProduct {
    pub existing_product_id: Option<i64>,
    pub fund_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub fund_code: String,
    #[serde(rename = "yield1yr")]
    pub yield_1yr: Option<f64>,
    #[serde(rename = "yield3yr")]
    pub yield_3yr: Option<f64>,
    pub personal_number: Option<String>,
    pub management_fee_balance: Option<f64>,
    pub management_fee_contributions: Option<f64>,
    pub accumulated_amount: Option<f64>,
    pub employment_status: Option<String>,
    pub has_regular_contributions: Option<bool>,
}
