use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{CreateSnapshot, NewSnapshot, Snapshot};
use crate::services::client_service;
use crate::utils::dates::parse_snapshot_date;

pub(crate) fn build_snapshot(client_id: i64, input: CreateSnapshot) -> Result<NewSnapshot, AppError> {
    let fund_code = input.fund_code.trim().to_string();
    if fund_code.is_empty() {
        return Err(AppError::Validation("Fund code is required".into()));
    }
    let snapshot_date = parse_snapshot_date(&input.snapshot_date).ok_or_else(|| {
        AppError::Validation(format!("Invalid snapshot date: {}", input.snapshot_date))
    })?;

    Ok(NewSnapshot {
        client_id,
        fund_code,
        fund_type: input.fund_type,
        fund_name: input.fund_name,
        fund_number: input.fund_number,
        source: input.source,
        amount: input.amount,
        snapshot_date,
        is_active: input.is_active,
    })
}

pub async fn list(pool: &PgPool, client_id: i64) -> Result<Vec<Snapshot>, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let snapshots = db::snapshot_queries::fetch_for_client(pool, client_id).await?;
    Ok(snapshots)
}

pub async fn create(pool: &PgPool, client_id: i64, input: CreateSnapshot) -> Result<Snapshot, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let new_snapshot = build_snapshot(client_id, input)?;
    let snapshot = db::snapshot_queries::create(pool, &new_snapshot).await?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(date: &str) -> CreateSnapshot {
        CreateSnapshot {
            fund_code: " 1328 ".to_string(),
            fund_type: Some("גמל".to_string()),
            fund_name: None,
            fund_number: Some("55-1".to_string()),
            source: Some("AS".to_string()),
            amount: 1500.0,
            snapshot_date: date.to_string(),
            is_active: true,
        }
    }

    #[test]
    fn test_month_only_date_resolves_to_first_day() {
        let snapshot = build_snapshot(3, input("2024-06")).unwrap();
        assert_eq!(snapshot.snapshot_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(snapshot.fund_code, "1328");
        assert_eq!(snapshot.client_id, 3);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        assert!(matches!(build_snapshot(3, input("June")), Err(AppError::Validation(_))));
    }
}
