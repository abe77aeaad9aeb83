use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// One dated balance of a fund holding; repeated dates form the time series.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: i64,
    pub client_id: i64,
    pub fund_code: String,
    pub fund_type: Option<String>,
    pub fund_name: Option<String>,
    pub fund_number: Option<String>,
    pub source: Option<String>,
    pub amount: f64,
    pub snapshot_date: NaiveDate,
    pub is_active: bool,
}

impl Snapshot {
    /// Key that identifies the holding across snapshot dates.
    pub fn fund_key(&self) -> &str {
        match self.fund_number.as_deref().map(str::trim) {
            Some(number) if !number.is_empty() => number,
            _ => self.fund_code.trim(),
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshot {
    pub fund_code: String,
    pub fund_type: Option<String>,
    pub fund_name: Option<String>,
    pub fund_number: Option<String>,
    pub source: Option<String>,
    pub amount: f64,
    pub snapshot_date: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Snapshot row ready to be written, with the date already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub client_id: i64,
    pub fund_code: String,
    pub fund_type: Option<String>,
    pub fund_name: Option<String>,
    pub fund_number: Option<String>,
    pub source: Option<String>,
    pub amount: f64,
    pub snapshot_date: NaiveDate,
    pub is_active: bool,
}
