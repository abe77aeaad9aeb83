use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub id: i64,
    #[serde(skip_serializing)]
    pub client_id: i64,
    #[serde(rename = "index")]
    pub idx: i32,
    pub first_name: String,
    pub last_name: String,
    pub id_number: String,
    pub birth_date: NaiveDate,
    pub address: String,
    pub relation: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeneficiaryInput {
    pub index: i32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub percentage: f64,
}
