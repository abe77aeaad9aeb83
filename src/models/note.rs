use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub client_id: i64,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub reminder_at: Option<NaiveDate>,
    pub dismissed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNote {
    pub note: String,
    pub reminder_at: Option<String>,
}

// A due reminder joined with the owning client's name.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: i64,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub reminder_at: Option<NaiveDate>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub client_id: i64,
    pub client_name: String,
}
