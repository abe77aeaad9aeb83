//! Import of provider balance reports (one workbook or CSV per managing company).

use std::collections::HashMap;
use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Datelike, NaiveDate};
use csv::ReaderBuilder;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::errors::AppError;
use crate::models::{CrmImportResult, NewClient, NewSnapshot};
use crate::utils::dates::{default_birth_date, parse_snapshot_date};
use crate::utils::id_number::{normalize_id_number, MAX_ID_DIGITS};
use crate::utils::sources::{company_code_from_filename, normalize_company_code};

const ID_ALIASES: &[&str] = &["id_canon", "id_number", "מספר זהות", "ת.ז"];
const NAME_ALIASES: &[&str] = &["client_name", "שם לקוח", "שם"];
const FUND_NUMBER_ALIASES: &[&str] = &["fund_number", "מספר קופה", "מספר חשבון"];
const FUND_CODE_ALIASES: &[&str] = &["fund_code", "קוד קופה"];
const FUND_NAME_ALIASES: &[&str] = &["fund_name", "שם קופה"];
const FUND_TYPE_ALIASES: &[&str] = &["fund_type", "סוג קופה", "סוג מוצר"];
const AMOUNT_ALIASES: &[&str] = &["accumulated_amount", "amount", "צבירה", "יתרה"];

/// One balance line, or the sum of all lines for the same (id, fund number).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceRow {
    pub id_raw: String,
    pub client_name: String,
    pub fund_number: String,
    pub fund_code: String,
    pub fund_name: String,
    pub fund_type: String,
    pub amount: f64,
}

fn normalize_header(value: &str) -> String {
    value.trim().trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias))
}

/// Amounts may carry thousands separators and a shekel sign; anything
/// unparsable counts as zero.
fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '₪') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Maps a header row and its data rows onto balance rows by header alias.
fn balance_rows<I>(headers: &[String], records: I) -> Result<Vec<BalanceRow>>
where
    I: IntoIterator<Item = Result<Vec<String>>>,
{
    let id_col = find_column(headers, ID_ALIASES).context("Missing client id column")?;
    let amount_col = find_column(headers, AMOUNT_ALIASES).context("Missing balance column")?;
    let name_col = find_column(headers, NAME_ALIASES);
    let number_col = find_column(headers, FUND_NUMBER_ALIASES);
    let code_col = find_column(headers, FUND_CODE_ALIASES);
    let fund_name_col = find_column(headers, FUND_NAME_ALIASES);
    let type_col = find_column(headers, FUND_TYPE_ALIASES);

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let cell = |col: Option<usize>| -> String {
            col.and_then(|c| record.get(c)).map(|v| v.trim()).unwrap_or("").to_string()
        };

        rows.push(BalanceRow {
            id_raw: cell(Some(id_col)),
            client_name: cell(name_col),
            fund_number: cell(number_col),
            fund_code: cell(code_col),
            fund_name: cell(fund_name_col),
            fund_type: cell(type_col),
            amount: parse_amount(&cell(Some(amount_col))),
        });
    }
    Ok(rows)
}

pub fn parse_balance_csv(bytes: &[u8]) -> Result<Vec<BalanceRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(normalize_header)
        .collect();

    let records = reader.records().enumerate().map(|(line, record)| {
        record
            .map(|r| r.iter().map(str::to_string).collect::<Vec<String>>())
            .with_context(|| format!("Failed to parse CSV line {}", line + 2))
    });
    balance_rows(&headers, records)
}

/// Text of a worksheet cell. Whole numbers lose their `.0` so ids and fund
/// numbers read the same as in a CSV export.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// Reads the first worksheet of an Excel (or OpenDocument) workbook.
pub fn parse_balance_workbook(bytes: &[u8]) -> Result<Vec<BalanceRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| anyhow!("Failed to open workbook: {}", e))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no worksheets")?
        .map_err(|e| anyhow!("Failed to read worksheet: {}", e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("Worksheet is empty")?
        .iter()
        .map(|c| normalize_header(&cell_text(c)))
        .collect();

    balance_rows(&headers, rows.map(|row| Ok::<Vec<String>, anyhow::Error>(row.iter().map(cell_text).collect())))
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Workbooks are recognized by extension or by their zip / OLE signature.
fn is_workbook(filename: Option<&str>, bytes: &[u8]) -> bool {
    let by_extension = filename
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| WORKBOOK_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
    by_extension || bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

pub fn parse_balance_file(bytes: &[u8], filename: Option<&str>) -> Result<Vec<BalanceRow>> {
    if is_workbook(filename, bytes) {
        parse_balance_workbook(bytes)
    } else {
        parse_balance_csv(bytes)
    }
}

/// Sums balances per (id, fund number). Descriptive fields keep the first
/// non-empty value; groups keep the order of their first line.
pub fn aggregate_rows(rows: Vec<BalanceRow>) -> Vec<BalanceRow> {
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut grouped: Vec<BalanceRow> = Vec::new();

    for row in rows {
        let key = (row.id_raw.clone(), row.fund_number.clone());
        match positions.get(&key) {
            Some(&pos) => {
                let target = &mut grouped[pos];
                target.amount += row.amount;
                for (dst, src) in [
                    (&mut target.client_name, row.client_name),
                    (&mut target.fund_code, row.fund_code),
                    (&mut target.fund_name, row.fund_name),
                    (&mut target.fund_type, row.fund_type),
                ] {
                    if dst.is_empty() {
                        *dst = src;
                    }
                }
            }
            None => {
                positions.insert(key, grouped.len());
                grouped.push(row);
            }
        }
    }
    grouped
}

fn import_date(snapshot_month: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = snapshot_month
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Validation("חסר תאריך סנפשוט".to_string()))?;
    parse_snapshot_date(raw)
        .and_then(|d| d.with_day(1))
        .ok_or(AppError::Validation(format!("Invalid snapshot month: {}", raw)))
}

fn resolve_company_code(company_code: Option<&str>, filename: Option<&str>) -> Result<String, AppError> {
    company_code
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(normalize_company_code)
        .or_else(|| filename.and_then(company_code_from_filename))
        .ok_or(AppError::Validation(
            "Company code is required (form field or filename prefix)".to_string(),
        ))
}

#[derive(Debug, PartialEq)]
enum RowCheck {
    Import(String),
    Ignore,
    InvalidId,
}

/// Rows without an id or a positive balance are ignored; ids longer than a
/// national id can be are reported separately.
fn check_row(row: &BalanceRow) -> RowCheck {
    let id_number = normalize_id_number(&row.id_raw);
    if id_number.is_empty() || row.amount <= 0.0 {
        RowCheck::Ignore
    } else if id_number.len() > MAX_ID_DIGITS {
        RowCheck::InvalidId
    } else {
        RowCheck::Import(id_number)
    }
}

fn optional(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

pub async fn import_crm_balances(
    pool: &PgPool,
    bytes: &[u8],
    snapshot_month: Option<&str>,
    company_code: Option<&str>,
    filename: Option<&str>,
) -> Result<CrmImportResult, AppError> {
    let snapshot_date = import_date(snapshot_month)?;
    let company = resolve_company_code(company_code, filename)?;

    let rows = parse_balance_file(bytes, filename).map_err(|e| AppError::Validation(format!("{:#}", e)))?;
    let rows = aggregate_rows(rows);

    let mut result = CrmImportResult {
        company_code: company.clone(),
        ..Default::default()
    };
    let mut client_ids: HashMap<String, i64> = HashMap::new();

    let mut tx = pool.begin().await?;
    for row in rows {
        result.rows_processed += 1;

        let id_number = match check_row(&row) {
            RowCheck::Import(id_number) => id_number,
            RowCheck::Ignore => continue,
            RowCheck::InvalidId => {
                warn!(fund_number = %row.fund_number, "Skipping balance row with an invalid id number");
                result.invalid_rows_skipped += 1;
                continue;
            }
        };

        let client_id = match client_ids.get(&id_number) {
            Some(&id) => {
                result.reused_clients += 1;
                id
            }
            None => {
                let id = match db::client_queries::fetch_by_id_number(&mut *tx, &id_number).await? {
                    Some(client) => {
                        result.reused_clients += 1;
                        client.id
                    }
                    None => {
                        let full_name = optional(&row.client_name).unwrap_or_else(|| row.id_raw.clone());
                        let new_client = NewClient {
                            id_number_raw: row.id_raw.clone(),
                            id_number: id_number.clone(),
                            full_name,
                            birth_date: default_birth_date(),
                            ..Default::default()
                        };
                        let client = db::client_queries::create(&mut *tx, &new_client).await?;
                        result.created_clients += 1;
                        client.id
                    }
                };
                client_ids.insert(id_number, id);
                id
            }
        };

        let fund_number = optional(&row.fund_number);
        let fund_code = optional(&row.fund_code).unwrap_or_else(|| row.fund_number.trim().to_string());
        let snapshot = NewSnapshot {
            client_id,
            fund_code,
            fund_type: optional(&row.fund_type),
            fund_name: optional(&row.fund_name),
            fund_number: fund_number.clone(),
            source: Some(company.clone()),
            amount: row.amount,
            snapshot_date,
            is_active: true,
        };

        let target = db::snapshot_queries::find_import_target(
            &mut *tx,
            client_id,
            fund_number.as_deref().unwrap_or(""),
            snapshot_date,
            &company,
        )
        .await?;
        match target {
            Some(id) => {
                db::snapshot_queries::overwrite(&mut *tx, id, &snapshot).await?;
                result.duplicates_skipped += 1;
            }
            None => {
                db::snapshot_queries::create(&mut *tx, &snapshot).await?;
                result.created_snapshots += 1;
            }
        }
    }
    tx.commit().await?;

    info!(
        company = %result.company_code,
        created_clients = result.created_clients,
        created_snapshots = result.created_snapshots,
        duplicates = result.duplicates_skipped,
        invalid = result.invalid_rows_skipped,
        "CRM balances imported"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_hebrew_headers_and_amounts() {
        let csv = "\u{feff}מספר זהות,שם לקוח,מספר חשבון,שם קופה,סוג מוצר,יתרה\n\
                   012345678,ישראל ישראלי,555,אלטשולר גמל,גמל,\"12,500.50 ₪\"\n";
        let rows = parse_balance_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_raw, "012345678");
        assert_eq!(rows[0].fund_number, "555");
        assert_eq!(rows[0].fund_code, "");
        assert_eq!(rows[0].fund_type, "גמל");
        assert!((rows[0].amount - 12500.5).abs() < 1e-9);
    }

    #[test]
    fn test_english_headers_are_case_insensitive() {
        let csv = "ID_Number,Fund_Code,Amount\n123,9604,100\n";
        let rows = parse_balance_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].fund_code, "9604");
        assert_eq!(rows[0].amount, 100.0);
    }

    #[test]
    fn test_missing_id_column_is_an_error() {
        let err = parse_balance_csv(b"name,amount\nx,1\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Missing client id column"));
    }

    #[test]
    fn test_aggregates_by_id_and_fund_number() {
        let row = |id: &str, number: &str, name: &str, amount: f64| BalanceRow {
            id_raw: id.into(),
            fund_number: number.into(),
            fund_name: name.into(),
            amount,
            ..Default::default()
        };
        let rows = aggregate_rows(vec![
            row("1", "A", "", 100.0),
            row("2", "A", "other", 5.0),
            row("1", "A", "first name", 50.0),
            row("1", "B", "", 7.0),
        ]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].amount, 150.0);
        assert_eq!(rows[0].fund_name, "first name");
        assert_eq!(rows[1].id_raw, "2");
        assert_eq!(rows[2].fund_number, "B");
    }

    #[test]
    fn test_import_date_is_first_of_month() {
        let date = import_date(Some("2024-05-17")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(import_date(Some("2024-05")).unwrap(), date);
        assert!(matches!(import_date(None), Err(AppError::Validation(ref m)) if m == "חסר תאריך סנפשוט"));
        assert!(import_date(Some("May")).is_err());
    }

    #[test]
    fn test_company_code_from_field_or_filename() {
        assert_eq!(resolve_company_code(Some("ds"), Some("fnx.csv")).unwrap(), "DASH");
        assert_eq!(resolve_company_code(Some(" "), Some("fnx_2024.csv")).unwrap(), "FNX");
        assert!(resolve_company_code(None, None).is_err());
    }

    #[test]
    fn test_overlong_ids_are_reported_not_imported() {
        let row = |id: &str, amount: f64| BalanceRow {
            id_raw: id.into(),
            amount,
            ..Default::default()
        };
        assert_eq!(check_row(&row("1234567891", 10.0)), RowCheck::InvalidId);
        assert_eq!(check_row(&row("1234567800", 10.0)), RowCheck::Import("12345678".into()));
        assert_eq!(check_row(&row("", 10.0)), RowCheck::Ignore);
        assert_eq!(check_row(&row("123456782", 0.0)), RowCheck::Ignore);
    }

    #[test]
    fn test_worksheet_cells_read_like_csv_text() {
        assert_eq!(cell_text(&Data::Float(12345678.0)), "12345678");
        assert_eq!(cell_text(&Data::Float(12500.5)), "12500.5");
        assert_eq!(cell_text(&Data::Int(555)), "555");
        assert_eq!(cell_text(&Data::String("גמל".into())), "גמל");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_worksheet_rows_use_header_aliases() {
        let headers: Vec<String> = [cell_text(&Data::String("מספר זהות".into())), "יתרה".into(), "סוג מוצר".into()]
            .iter()
            .map(|h| normalize_header(h))
            .collect();
        let cells = [
            vec![Data::Float(12345678.0), Data::Float(1000.25), Data::String("גמל".into())],
            vec![Data::Empty, Data::Empty, Data::Empty],
        ];
        let rows = balance_rows(&headers, cells.iter().map(|r| Ok::<Vec<String>, anyhow::Error>(r.iter().map(cell_text).collect()))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_raw, "12345678");
        assert_eq!(rows[0].fund_type, "גמל");
        assert!((rows[0].amount - 1000.25).abs() < 1e-9);
    }

    #[test]
    fn test_workbooks_are_detected_by_extension_or_signature() {
        assert!(is_workbook(Some("mgdl_2024.XLSX"), b"anything"));
        assert!(is_workbook(None, b"PK\x03\x04rest"));
        assert!(is_workbook(None, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1]));
        assert!(!is_workbook(Some("fnx.csv"), b"id_number,amount\n"));
    }

    #[test]
    fn test_unreadable_workbook_is_an_error() {
        let err = parse_balance_file(b"PK\x03\x04 not really a zip", Some("fnx.xlsx")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open workbook"));
    }
}
