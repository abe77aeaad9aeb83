use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

// A client's current holding. Virtual rows are synthesized from CRM
// snapshots, carry negative ids and are never stored as such.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExistingProduct {
    pub id: i64,
    pub client_id: i64,
    pub fund_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub fund_code: String,
    #[serde(rename = "yield1yr")]
    pub yield_1yr: Option<f64>,
    #[serde(rename = "yield3yr")]
    pub yield_3yr: Option<f64>,
    pub personal_number: String,
    pub management_fee_balance: Option<f64>,
    pub management_fee_contributions: Option<f64>,
    pub accumulated_amount: Option<f64>,
    pub employment_status: Option<String>,
    pub has_regular_contributions: Option<bool>,
    #[sqlx(skip)]
    #[serde(default)]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExistingProduct {
    pub fund_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub fund_code: String,
    #[serde(rename = "yield1yr")]
    pub yield_1yr: Option<f64>,
    #[serde(rename = "yield3yr")]
    pub yield_3yr: Option<f64>,
    pub personal_number: String,
    pub management_fee_balance: Option<f64>,
    pub management_fee_contributions: Option<f64>,
    pub accumulated_amount: Option<f64>,
    pub employment_status: Option<String>,
    pub has_regular_contributions: Option<bool>,
}

impl From<&ExistingProduct> for CreateExistingProduct {
    fn from(p: &ExistingProduct) -> Self {
        Self {
            fund_type: p.fund_type.clone(),
            company_name: p.company_name.clone(),
            fund_name: p.fund_name.clone(),
            fund_code: p.fund_code.clone(),
            yield_1yr: p.yield_1yr,
            yield_3yr: p.yield_3yr,
            personal_number: p.personal_number.clone(),
            management_fee_balance: p.management_fee_balance,
            management_fee_contributions: p.management_fee_contributions,
            accumulated_amount: p.accumulated_amount,
            employment_status: p.employment_status.clone(),
            has_regular_contributions: p.has_regular_contributions,
        }
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExistingProduct {
    pub fund_type: Option<String>,
    pub company_name: Option<String>,
    pub fund_name: Option<String>,
    pub fund_code: Option<String>,
    pub personal_number: Option<String>,
    #[serde(rename = "yield1yr", default, deserialize_with = "deserialize_some")]
    pub yield_1yr: Option<Option<f64>>,
    #[serde(rename = "yield3yr", default, deserialize_with = "deserialize_some")]
    pub yield_3yr: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub management_fee_balance: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub management_fee_contributions: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub accumulated_amount: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub employment_status: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub has_regular_contributions: Option<Option<bool>>,
}

impl UpdateExistingProduct {
    pub fn apply_to(self, product: &mut ExistingProduct) {
        if let Some(v) = self.fund_type {
            product.fund_type = v;
        }
        if let Some(v) = self.company_name {
            product.company_name = v;
        }
        if let Some(v) = self.fund_name {
            product.fund_name = v;
        }
        if let Some(v) = self.fund_code {
            product.fund_code = v;
        }
        if let Some(v) = self.personal_number {
            product.personal_number = v;
        }
        if let Some(v) = self.yield_1yr {
            product.yield_1yr = v;
        }
        if let Some(v) = self.yield_3yr {
            product.yield_3yr = v;
        }
        if let Some(v) = self.management_fee_balance {
            product.management_fee_balance = v;
        }
        if let Some(v) = self.management_fee_contributions {
            product.management_fee_contributions = v;
        }
        if let Some(v) = self.accumulated_amount {
            product.accumulated_amount = v;
        }
        if let Some(v) = self.employment_status {
            product.employment_status = v;
        }
        if let Some(v) = self.has_regular_contributions {
            product.has_regular_contributions = v;
        }
    }
}
