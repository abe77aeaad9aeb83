use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub month: Option<String>,
    pub total_assets: f64,
    pub by_source: BTreeMap<String, f64>,
    pub by_fund_type: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyChangePoint {
    pub month: String,
    pub total: f64,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundHistoryPoint {
    pub date: String,
    pub amount: f64,
    pub source: String,
    pub change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummaryItem {
    pub id: i64,
    pub full_name: String,
    pub id_number: String,
    pub total_amount: f64,
    pub sources: String,
    pub raw_sources: String,
    pub fund_count: i64,
    pub last_update: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub client_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FundHistoryQuery {
    pub client_id: i64,
    pub fund_number: String,
}
