use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};

use crate::models::{NewSnapshot, Snapshot};

const SNAPSHOT_COLUMNS: &str = "id, client_id, fund_code, fund_type, fund_name, fund_number,
    source, amount, snapshot_date, is_active";

pub async fn fetch_for_client(pool: &PgPool, client_id: i64) -> Result<Vec<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(&format!(
        "SELECT {} FROM snapshot WHERE client_id = $1 ORDER BY snapshot_date DESC, id DESC",
        SNAPSHOT_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await
}

pub async fn fetch_active(pool: &PgPool) -> Result<Vec<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(&format!(
        "SELECT {} FROM snapshot WHERE is_active ORDER BY snapshot_date, id",
        SNAPSHOT_COLUMNS
    ))
    .fetch_all(pool)
    .await
}

pub async fn fetch_active_for_client<'e, E>(executor: E, client_id: i64) -> Result<Vec<Snapshot>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Snapshot>(&format!(
        "SELECT {} FROM snapshot WHERE client_id = $1 AND is_active ORDER BY snapshot_date, id",
        SNAPSHOT_COLUMNS
    ))
    .bind(client_id)
    .fetch_all(executor)
    .await
}

pub async fn fetch_fund_history(
    pool: &PgPool,
    client_id: i64,
    fund_number: &str,
) -> Result<Vec<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(&format!(
        "SELECT {} FROM snapshot
         WHERE client_id = $1 AND fund_number = $2
         ORDER BY snapshot_date, id",
        SNAPSHOT_COLUMNS
    ))
    .bind(client_id)
    .bind(fund_number)
    .fetch_all(pool)
    .await
}

pub async fn create<'e, E>(executor: E, input: &NewSnapshot) -> Result<Snapshot, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Snapshot>(&format!(
        "INSERT INTO snapshot
         (client_id, fund_code, fund_type, fund_name, fund_number, source, amount, snapshot_date, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         RETURNING {}",
        SNAPSHOT_COLUMNS
    ))
    .bind(input.client_id)
    .bind(&input.fund_code)
    .bind(&input.fund_type)
    .bind(&input.fund_name)
    .bind(&input.fund_number)
    .bind(&input.source)
    .bind(input.amount)
    .bind(input.snapshot_date)
    .bind(input.is_active)
    .fetch_one(executor)
    .await
}

/// Id of the snapshot an import row would overwrite, if one exists.
pub async fn find_import_target<'e, E>(
    executor: E,
    client_id: i64,
    fund_number: &str,
    snapshot_date: NaiveDate,
    source: &str,
) -> Result<Option<i64>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM snapshot
         WHERE client_id = $1 AND COALESCE(fund_number, '') = $2 AND snapshot_date = $3 AND source = $4
         ORDER BY id
         LIMIT 1",
    )
    .bind(client_id)
    .bind(fund_number)
    .bind(snapshot_date)
    .bind(source)
    .fetch_optional(executor)
    .await
}

pub async fn overwrite<'e, E>(executor: E, id: i64, input: &NewSnapshot) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE snapshot
         SET fund_code = $2, fund_type = $3, fund_name = $4, amount = $5, is_active = $6
         WHERE id = $1",
    )
    .bind(id)
    .bind(&input.fund_code)
    .bind(&input.fund_type)
    .bind(&input.fund_name)
    .bind(input.amount)
    .bind(input.is_active)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_all<'e, E>(executor: E) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM snapshot").execute(executor).await?;
    Ok(result.rows_affected())
}
