use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateNote, Note, Reminder};
use crate::services::client_service;

fn parse_reminder_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid reminder date: {}", value))),
    }
}

pub async fn list(pool: &PgPool, client_id: i64) -> Result<Vec<Note>, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let notes = db::note_queries::fetch_for_client(pool, client_id).await?;
    Ok(notes)
}

pub async fn create(pool: &PgPool, client_id: i64, input: CreateNote) -> Result<Note, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let text = input.note.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Note text cannot be empty".into()));
    }
    let reminder_at = parse_reminder_date(input.reminder_at.as_deref())?;
    let note = db::note_queries::create(pool, client_id, text, reminder_at).await?;
    Ok(note)
}

pub async fn dismiss(pool: &PgPool, client_id: i64, note_id: i64) -> Result<Note, AppError> {
    let note = db::note_queries::dismiss(pool, client_id, note_id)
        .await?
        .ok_or(AppError::NotFound("Note not found".to_string()))?;
    Ok(note)
}

pub async fn clear_reminder(pool: &PgPool, client_id: i64, note_id: i64) -> Result<Note, AppError> {
    let note = db::note_queries::clear_reminder(pool, client_id, note_id)
        .await?
        .ok_or(AppError::NotFound("Note not found".to_string()))?;
    Ok(note)
}

pub async fn delete(pool: &PgPool, client_id: i64, note_id: i64) -> Result<u64, AppError> {
    match db::note_queries::delete(pool, client_id, note_id).await {
        Ok(0) => Err(AppError::NotFound("Note not found".to_string())),
        Ok(n) => Ok(n),
        Err(e) => Err(AppError::from(e)),
    }
}

pub async fn due_reminders(pool: &PgPool) -> Result<Vec<Reminder>, AppError> {
    let today = Utc::now().date_naive();
    let reminders = db::note_queries::fetch_due_reminders(pool, today).await?;
    Ok(reminders)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_date_parsing() {
        assert_eq!(parse_reminder_date(None).unwrap(), None);
        assert_eq!(parse_reminder_date(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_reminder_date(Some("2024-07-01")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 1)
        );
        assert!(parse_reminder_date(Some("next week")).is_err());
    }
}
