//! Per-client balance report (HTML page and CSV export).

use chrono::{Local, NaiveDate};
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{Client, Snapshot};
use crate::services::{client_service, dashboard_service};
use crate::utils::dates::month_key;
use crate::utils::html::{escape, format_thousands};
use crate::utils::sources;

const UTF8_BOM: &str = "\u{feff}";
const CSV_HEADERS: [&str; 6] = ["תאריך צילום", "קוד קופה", "שם קופה", "סוג קופה", "סכום", "מקור"];

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub fund_number: String,
    pub fund_name: String,
    pub fund_type: String,
    pub company: String,
    pub amount: f64,
    pub snapshot_date: NaiveDate,
}

/// Latest date inside `month` when it has data, otherwise the latest overall.
pub(crate) fn select_report_date(snapshots: &[Snapshot], month: Option<&str>) -> Option<NaiveDate> {
    if let Some(month) = month.map(str::trim).filter(|m| m.len() == 7) {
        let in_month = snapshots
            .iter()
            .map(|s| s.snapshot_date)
            .filter(|d| month_key(*d) == month)
            .max();
        if in_month.is_some() {
            return in_month;
        }
    }
    snapshots.iter().map(|s| s.snapshot_date).max()
}

pub(crate) fn build_rows(snapshots: &[Snapshot], date: NaiveDate) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = snapshots
        .iter()
        .filter(|s| s.snapshot_date == date)
        .map(|s| ReportRow {
            fund_number: s.fund_number.clone().unwrap_or_default(),
            fund_name: s.fund_name.clone().unwrap_or_default(),
            fund_type: s.fund_type.clone().unwrap_or_default(),
            company: sources::display_name(s.source.as_deref().unwrap_or("")),
            amount: s.amount,
            snapshot_date: s.snapshot_date,
        })
        .collect();
    rows.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    rows
}

pub(crate) fn render_html(client: &Client, rows: &[ReportRow], month: &str) -> String {
    let total: f64 = rows.iter().map(|r| r.amount).sum();
    let body: String = rows
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&r.company),
                escape(&r.fund_type),
                escape(&r.fund_name),
                escape(&r.fund_number),
                format_thousands(r.amount)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="he" dir="rtl">
<head><meta charset="utf-8"><title>דוח יתרות - {name}</title>
<style>body{{font-family:Arial,sans-serif}}table{{border-collapse:collapse;width:100%}}td,th{{border:1px solid #999;padding:4px 8px}}</style>
</head>
<body>
<h1>דוח יתרות ללקוח</h1>
<p>שם: {name} | ת.ז: {id_number} | טלפון: {phone} | דוא"ל: {email}</p>
<p>חודש: {month} | תאריך הפקה: {today}</p>
<table>
<thead><tr><th>חברה מנהלת</th><th>סוג קופה</th><th>שם קופה</th><th>מספר קופה</th><th>יתרה</th></tr></thead>
<tbody>
{body}</tbody>
<tfoot><tr><th colspan="4">סה"כ</th><th>{total}</th></tr></tfoot>
</table>
</body>
</html>
"#,
        name = escape(&client.full_name),
        id_number = escape(&client.id_number),
        phone = escape(client.phone.as_deref().unwrap_or("")),
        email = escape(client.email.as_deref().unwrap_or("")),
        month = escape(month),
        today = Local::now().format("%d/%m/%Y"),
        body = body,
        total = format_thousands(total),
    )
}

pub(crate) fn render_csv(snapshots: &[Snapshot]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADERS)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV: {}", e)))?;
    for s in snapshots {
        writer
            .write_record([
                s.snapshot_date.to_string(),
                s.fund_code.clone(),
                s.fund_name.clone().unwrap_or_default(),
                s.fund_type.clone().unwrap_or_default(),
                format!("{:.2}", s.amount),
                s.source.clone().unwrap_or_default(),
            ])
            .map_err(|e| AppError::Internal(format!("Failed to write CSV: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    let text = String::from_utf8(bytes).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(format!("{}{}", UTF8_BOM, text))
}

pub async fn client_report_html(pool: &PgPool, client_id: i64, month: Option<&str>) -> Result<String, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let snapshots = db::snapshot_queries::fetch_active_for_client(pool, client_id).await?;
    let date = select_report_date(&snapshots, month)
        .ok_or(AppError::NotFound("No data found for this client".to_string()))?;
    let rows = build_rows(&snapshots, date);
    let report_month = month
        .map(str::trim)
        .filter(|m| m.len() >= 7)
        .and_then(|m| m.get(..7))
        .map(str::to_string)
        .unwrap_or_else(|| month_key(date));
    Ok(render_html(&client, &rows, &report_month))
}

pub async fn client_report_csv(pool: &PgPool, client_id: i64) -> Result<String, AppError> {
    client_service::fetch_one(pool, client_id).await?;
    let latest = dashboard_service::get_latest_snapshots(pool, client_id).await?;
    render_csv(&latest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::fixtures::snapshot;

    #[test]
    fn test_report_date_prefers_requested_month() {
        let rows = vec![
            snapshot(1, 1, "2024-03-01", 10.0),
            snapshot(2, 1, "2024-03-20", 10.0),
            snapshot(3, 1, "2024-05-01", 10.0),
        ];
        assert_eq!(
            select_report_date(&rows, Some("2024-03")),
            NaiveDate::from_ymd_opt(2024, 3, 20)
        );
        assert_eq!(
            select_report_date(&rows, Some("2023-12")),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(select_report_date(&[], None), None);
    }

    #[test]
    fn test_rows_sorted_by_amount_with_company_names() {
        let mut a = snapshot(1, 1, "2024-05-01", 10.0);
        a.source = Some("yl".into());
        let b = snapshot(2, 1, "2024-05-01", 99.0);
        let c = snapshot(3, 1, "2024-04-01", 500.0);
        let rows = build_rows(&[a, b, c], NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].amount, 99.0);
        assert_eq!(rows[1].company, "ילין לפידות");
    }

    #[test]
    fn test_csv_has_bom_and_hebrew_headers() {
        let csv = render_csv(&[snapshot(1, 1, "2024-05-01", 1234.5)]).unwrap();
        assert!(csv.starts_with('\u{feff}'));
        let mut lines = csv.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next(), Some("תאריך צילום,קוד קופה,שם קופה,סוג קופה,סכום,מקור"));
        assert_eq!(lines.next(), Some("2024-05-01,C1,,,1234.50,"));
    }
}
