use serde::{Deserialize, Serialize};

use super::SavingProduct;

/// Holding fields the market matcher looks at. Any of them may be empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMatchRequest {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub fund_name: String,
    #[serde(default)]
    pub fund_code: String,
    #[serde(default)]
    pub fund_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMatchResponse {
    #[serde(rename = "match")]
    pub matched: Option<SavingProduct>,
    pub score: Option<u32>,
    /// Fund type a replacement must keep: the holding's own type, else the match's.
    pub locked_fund_type: Option<String>,
}
