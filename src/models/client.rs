use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::beneficiary::{Beneficiary, BeneficiaryInput};

// A person tracked by the office; the national id is stored normalized.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    #[serde(skip_serializing)]
    pub id_number_raw: String,
    pub id_number: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_country: Option<String>,
    pub employer_name: Option<String>,
    pub employer_hp: Option<String>,
    pub employer_address: Option<String>,
    pub employer_phone: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_house_number: Option<String>,
    pub address_apartment: Option<String>,
    pub address_postal_code: Option<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Client {
    /// First and last name when present, otherwise the stored full name.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.full_name.trim().to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub beneficiaries: Vec<Beneficiary>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClient {
    pub id_number: String,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_country: Option<String>,
    pub employer_name: Option<String>,
    pub employer_hp: Option<String>,
    pub employer_address: Option<String>,
    pub employer_phone: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_house_number: Option<String>,
    pub address_apartment: Option<String>,
    pub address_postal_code: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_country: Option<String>,
    pub employer_name: Option<String>,
    pub employer_hp: Option<String>,
    pub employer_address: Option<String>,
    pub employer_phone: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_house_number: Option<String>,
    pub address_apartment: Option<String>,
    pub address_postal_code: Option<String>,
    pub beneficiaries: Option<Vec<BeneficiaryInput>>,
}

/// Column values for an insert, resolved from a request or an import row.
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub id_number_raw: String,
    pub id_number: String,
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_country: Option<String>,
    pub employer_name: Option<String>,
    pub employer_hp: Option<String>,
    pub employer_address: Option<String>,
    pub employer_phone: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_house_number: Option<String>,
    pub address_apartment: Option<String>,
    pub address_postal_code: Option<String>,
}
