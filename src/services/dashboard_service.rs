//! Snapshot aggregations behind the CRM dashboard.
//!
//! Each computation is a pure function over snapshot rows so the numbers can
//! be checked without a database; the async wrappers only load the rows.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{
    Client, ClientSummaryItem, FundHistoryPoint, HistoryPoint, MonthlyChangePoint, Snapshot,
    SummaryResponse,
};
use crate::utils::dates::month_key;
use crate::utils::sources;

const UNKNOWN_SOURCE: &str = "לא ידוע";
const UNKNOWN_FUND_TYPE: &str = "לא זמין";
const NO_SOURCES: &str = "אין נתונים";

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn label_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

fn latest_month(snapshots: &[Snapshot]) -> Option<String> {
    snapshots.iter().map(|s| month_key(s.snapshot_date)).max()
}

fn monthly_totals<'a>(snapshots: impl IntoIterator<Item = &'a Snapshot>) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for s in snapshots {
        *totals.entry(month_key(s.snapshot_date)).or_insert(0.0) += s.amount;
    }
    totals
}

pub(crate) fn summarize(snapshots: &[Snapshot], month: Option<&str>) -> SummaryResponse {
    let Some(latest) = latest_month(snapshots) else {
        return SummaryResponse {
            month: month.map(str::to_string),
            total_assets: 0.0,
            by_source: BTreeMap::new(),
            by_fund_type: BTreeMap::new(),
        };
    };
    let target = month.map(str::to_string).unwrap_or(latest);

    let mut total = 0.0;
    let mut by_source = BTreeMap::new();
    let mut by_fund_type = BTreeMap::new();
    for s in snapshots.iter().filter(|s| month_key(s.snapshot_date) == target) {
        total += s.amount;
        *by_source
            .entry(label_or(s.source.as_deref(), UNKNOWN_SOURCE))
            .or_insert(0.0) += s.amount;
        *by_fund_type
            .entry(label_or(s.fund_type.as_deref(), UNKNOWN_FUND_TYPE))
            .or_insert(0.0) += s.amount;
    }

    SummaryResponse {
        month: Some(target),
        total_assets: round2(total),
        by_source,
        by_fund_type,
    }
}

pub(crate) fn monthly_change(snapshots: &[Snapshot]) -> Vec<MonthlyChangePoint> {
    let mut points = Vec::new();
    let mut previous: Option<f64> = None;
    for (month, total) in monthly_totals(snapshots) {
        let (change, percent_change) = match previous {
            None => (None, None),
            Some(prev) => {
                let change = total - prev;
                let pct = if prev > 0.0 { Some(change / prev * 100.0) } else { None };
                (Some(change), pct)
            }
        };
        points.push(MonthlyChangePoint {
            month,
            total,
            change,
            percent_change,
        });
        previous = Some(total);
    }
    points
}

/// Monthly totals for one client, or for everyone when `client_id` is 0 or absent.
pub(crate) fn history(snapshots: &[Snapshot], client_id: Option<i64>) -> Vec<HistoryPoint> {
    let filter = client_id.filter(|id| *id != 0);
    monthly_totals(snapshots.iter().filter(|s| filter.map_or(true, |id| s.client_id == id)))
        .into_iter()
        .map(|(month, amount)| HistoryPoint {
            month,
            amount: round2(amount),
        })
        .collect()
}

pub(crate) fn fund_history(snapshots: &[Snapshot]) -> Vec<FundHistoryPoint> {
    let mut previous: Option<f64> = None;
    snapshots
        .iter()
        .filter(|s| s.is_active)
        .map(|s| {
            let point = FundHistoryPoint {
                date: s.snapshot_date.to_string(),
                amount: s.amount,
                source: s.source.clone().unwrap_or_default(),
                change: previous.map(|prev| s.amount - prev),
            };
            previous = Some(s.amount);
            point
        })
        .collect()
}

#[derive(Default)]
struct ClientBucket {
    total: f64,
    sources: BTreeSet<String>,
    fund_numbers: BTreeSet<String>,
    last_update: Option<NaiveDate>,
}

/// One row per client (in the given order) for the month, default latest.
pub(crate) fn client_summaries(
    clients: &[Client],
    snapshots: &[Snapshot],
    month: Option<&str>,
) -> Vec<ClientSummaryItem> {
    let mut buckets: HashMap<i64, ClientBucket> = HashMap::new();
    if let Some(target) = month.map(str::to_string).or_else(|| latest_month(snapshots)) {
        for s in snapshots.iter().filter(|s| month_key(s.snapshot_date) == target) {
            let bucket = buckets.entry(s.client_id).or_default();
            bucket.total += s.amount;
            if let Some(source) = s.source.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                bucket.sources.insert(source.to_string());
            }
            if let Some(number) = s.fund_number.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                bucket.fund_numbers.insert(number.to_string());
            }
            if bucket.last_update.map_or(true, |d| s.snapshot_date > d) {
                bucket.last_update = Some(s.snapshot_date);
            }
        }
    }

    clients
        .iter()
        .map(|c| {
            let bucket = buckets.remove(&c.id).unwrap_or_default();
            let (display, raw) = if bucket.sources.is_empty() {
                (NO_SOURCES.to_string(), NO_SOURCES.to_string())
            } else {
                let display: Vec<String> = bucket.sources.iter().map(|s| sources::display_name(s)).collect();
                let raw: Vec<&str> = bucket.sources.iter().map(String::as_str).collect();
                (display.join(", "), raw.join(","))
            };
            ClientSummaryItem {
                id: c.id,
                full_name: c.full_name.clone(),
                id_number: c.id_number.clone(),
                total_amount: round2(bucket.total),
                sources: display,
                raw_sources: raw,
                fund_count: bucket.fund_numbers.len() as i64,
                last_update: bucket.last_update.map(|d| d.to_string()),
            }
        })
        .collect()
}

/// Latest snapshot per fund key (fund number, else fund code), newest first.
pub(crate) fn latest_per_fund(snapshots: &[Snapshot]) -> Vec<Snapshot> {
    let mut latest: BTreeMap<String, &Snapshot> = BTreeMap::new();
    for s in snapshots {
        let key = s.fund_key().to_string();
        match latest.get(&key) {
            Some(current) if current.snapshot_date >= s.snapshot_date => {}
            _ => {
                latest.insert(key, s);
            }
        }
    }
    let mut rows: Vec<Snapshot> = latest.into_values().cloned().collect();
    rows.sort_by(|a, b| {
        b.snapshot_date
            .cmp(&a.snapshot_date)
            .then_with(|| b.amount.total_cmp(&a.amount))
    });
    rows
}

pub async fn get_summary(pool: &PgPool, month: Option<&str>) -> Result<SummaryResponse, AppError> {
    let snapshots = db::snapshot_queries::fetch_active(pool).await?;
    Ok(summarize(&snapshots, month))
}

pub async fn get_monthly_change(pool: &PgPool) -> Result<Vec<MonthlyChangePoint>, AppError> {
    let snapshots = db::snapshot_queries::fetch_active(pool).await?;
    Ok(monthly_change(&snapshots))
}

pub async fn get_history(pool: &PgPool, client_id: Option<i64>) -> Result<Vec<HistoryPoint>, AppError> {
    let snapshots = db::snapshot_queries::fetch_active(pool).await?;
    Ok(history(&snapshots, client_id))
}

pub async fn get_fund_history(
    pool: &PgPool,
    client_id: i64,
    fund_number: &str,
) -> Result<Vec<FundHistoryPoint>, AppError> {
    let snapshots = db::snapshot_queries::fetch_fund_history(pool, client_id, fund_number).await?;
    Ok(fund_history(&snapshots))
}

pub async fn get_client_summaries(pool: &PgPool, month: Option<&str>) -> Result<Vec<ClientSummaryItem>, AppError> {
    let mut clients = db::client_queries::fetch_all(pool).await?;
    clients.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    let snapshots = db::snapshot_queries::fetch_active(pool).await?;
    Ok(client_summaries(&clients, &snapshots, month))
}

pub async fn get_latest_snapshots(pool: &PgPool, client_id: i64) -> Result<Vec<Snapshot>, AppError> {
    let snapshots = db::snapshot_queries::fetch_active_for_client(pool, client_id).await?;
    Ok(latest_per_fund(&snapshots))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn client(id: i64, name: &str) -> Client {
        Client {
            id,
            id_number_raw: id.to_string(),
            id_number: id.to_string(),
            full_name: name.to_string(),
            first_name: None,
            last_name: None,
            birth_date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            gender: None,
            marital_status: None,
            birth_country: None,
            employer_name: None,
            employer_hp: None,
            employer_address: None,
            employer_phone: None,
            email: None,
            phone: None,
            address_street: None,
            address_city: None,
            address_house_number: None,
            address_apartment: None,
            address_postal_code: None,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    pub fn snapshot(id: i64, client_id: i64, date: &str, amount: f64) -> Snapshot {
        Snapshot {
            id,
            client_id,
            fund_code: format!("C{}", id),
            fund_type: None,
            fund_name: None,
            fund_number: None,
            source: None,
            amount,
            snapshot_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{client, snapshot};
    use super::*;

    #[test]
    fn test_summary_defaults_to_latest_month() {
        let mut a = snapshot(1, 1, "2024-04-01", 100.0);
        a.source = Some("FNX".into());
        let mut b = snapshot(2, 1, "2024-05-01", 200.456);
        b.source = Some("FNX".into());
        b.fund_type = Some("גמל".into());
        let c = snapshot(3, 2, "2024-05-01", 50.0);

        let summary = summarize(&[a, b, c], None);
        assert_eq!(summary.month.as_deref(), Some("2024-05"));
        assert_eq!(summary.total_assets, 250.46);
        assert_eq!(summary.by_source["FNX"], 200.456);
        assert_eq!(summary.by_source[UNKNOWN_SOURCE], 50.0);
        assert_eq!(summary.by_fund_type[UNKNOWN_FUND_TYPE], 50.0);
    }

    #[test]
    fn test_summary_without_snapshots() {
        let summary = summarize(&[], Some("2024-01"));
        assert_eq!(summary.month.as_deref(), Some("2024-01"));
        assert_eq!(summary.total_assets, 0.0);
        assert!(summary.by_source.is_empty());
    }

    #[test]
    fn test_monthly_change_percent() {
        let rows = vec![
            snapshot(1, 1, "2024-01-01", 0.0),
            snapshot(2, 1, "2024-02-01", 100.0),
            snapshot(3, 1, "2024-03-01", 150.0),
        ];
        let points = monthly_change(&rows);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].change, None);
        assert_eq!(points[1].change, Some(100.0));
        assert_eq!(points[1].percent_change, None);
        assert_eq!(points[2].percent_change, Some(50.0));
    }

    #[test]
    fn test_history_filters_client() {
        let rows = vec![
            snapshot(1, 1, "2024-01-01", 10.0),
            snapshot(2, 2, "2024-01-15", 5.0),
            snapshot(3, 1, "2024-02-01", 20.0),
        ];
        assert_eq!(history(&rows, None)[0].amount, 15.0);
        assert_eq!(history(&rows, Some(0)).len(), 2);
        let client_two = history(&rows, Some(2));
        assert_eq!(client_two, vec![HistoryPoint { month: "2024-01".into(), amount: 5.0 }]);
    }

    #[test]
    fn test_fund_history_changes() {
        let rows = vec![
            snapshot(1, 1, "2024-01-01", 10.0),
            snapshot(2, 1, "2024-02-01", 25.0),
        ];
        let points = fund_history(&rows);
        assert_eq!(points[0].change, None);
        assert_eq!(points[1].change, Some(15.0));
        assert_eq!(points[1].date, "2024-02-01");
    }

    #[test]
    fn test_client_summaries() {
        let clients = vec![client(1, "אבי"), client(2, "בני")];
        let mut a = snapshot(1, 1, "2024-05-01", 100.0);
        a.source = Some("FNX".into());
        a.fund_number = Some("111".into());
        let mut b = snapshot(2, 1, "2024-05-01", 50.0);
        b.source = Some("AS".into());
        b.fund_number = Some("111".into());

        let items = client_summaries(&clients, &[a, b], None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].total_amount, 150.0);
        assert_eq!(items[0].raw_sources, "AS,FNX");
        assert_eq!(items[0].sources, "אלטשולר-שחם, הפניקס");
        assert_eq!(items[0].fund_count, 1);
        assert_eq!(items[0].last_update.as_deref(), Some("2024-05-01"));
        assert_eq!(items[1].sources, NO_SOURCES);
        assert_eq!(items[1].total_amount, 0.0);
    }

    #[test]
    fn test_latest_per_fund() {
        let mut old = snapshot(1, 1, "2024-01-01", 10.0);
        old.fund_number = Some("111".into());
        let mut new = snapshot(2, 1, "2024-03-01", 30.0);
        new.fund_number = Some("111".into());
        let other = snapshot(3, 1, "2024-02-01", 5.0);

        let latest = latest_per_fund(&[old, new, other]);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, 2);
        assert_eq!(latest[1].id, 3);
    }
}
