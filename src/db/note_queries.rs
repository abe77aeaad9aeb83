use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};

use crate::models::{Note, Reminder};

const NOTE_COLUMNS: &str = "id, client_id, note, created_at, reminder_at, dismissed_at";

pub async fn fetch_for_client(pool: &PgPool, client_id: i64) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT {} FROM client_note WHERE client_id = $1 ORDER BY created_at DESC, id DESC",
        NOTE_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    client_id: i64,
    note: &str,
    reminder_at: Option<NaiveDate>,
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "INSERT INTO client_note (client_id, note, reminder_at)
         VALUES ($1, $2, $3)
         RETURNING {}",
        NOTE_COLUMNS
    ))
    .bind(client_id)
    .bind(note)
    .bind(reminder_at)
    .fetch_one(pool)
    .await
}

pub async fn dismiss(pool: &PgPool, client_id: i64, note_id: i64) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "UPDATE client_note SET dismissed_at = NOW()
         WHERE id = $1 AND client_id = $2
         RETURNING {}",
        NOTE_COLUMNS
    ))
    .bind(note_id)
    .bind(client_id)
    .fetch_optional(pool)
    .await
}

pub async fn clear_reminder(pool: &PgPool, client_id: i64, note_id: i64) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "UPDATE client_note SET reminder_at = NULL, dismissed_at = NULL
         WHERE id = $1 AND client_id = $2
         RETURNING {}",
        NOTE_COLUMNS
    ))
    .bind(note_id)
    .bind(client_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, client_id: i64, note_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM client_note WHERE id = $1 AND client_id = $2")
        .bind(note_id)
        .bind(client_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Undismissed reminders dated on or before `today`, across all clients.
pub async fn fetch_due_reminders(pool: &PgPool, today: NaiveDate) -> Result<Vec<Reminder>, sqlx::Error> {
    sqlx::query_as::<_, Reminder>(
        "SELECT n.id, n.note, n.created_at, n.reminder_at, n.dismissed_at,
                c.id AS client_id, c.full_name AS client_name
         FROM client_note n
         JOIN client c ON c.id = n.client_id
         WHERE n.reminder_at IS NOT NULL
           AND n.dismissed_at IS NULL
           AND n.reminder_at <= $1
         ORDER BY n.reminder_at, n.id",
    )
    .bind(today)
    .fetch_all(pool)
    .await
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM client_note").execute(executor).await?;
    Ok(result.rows_affected())
}
