use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Market catalog row imported from the Gemel-Net feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SavingProduct {
    pub id: i64,
    pub fund_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub fund_code: String,
    #[serde(rename = "yield1yr")]
    pub yield_1yr: Option<f64>,
    #[serde(rename = "yield3yr")]
    pub yield_3yr: Option<f64>,
    pub risk_level: Option<i32>,
    pub guaranteed_return: Option<String>,
}
