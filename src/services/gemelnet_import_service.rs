//! Market catalog import from the Gemel-Net XML feed.

use std::collections::HashMap;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::errors::AppError;
use crate::models::{GemelNetImportResult, SavingProduct};

const ROW_TAG: &str = "Row";

const GEMEL: &str = "גמל";
const GEMEL_INVESTMENT: &str = "גמל להשקעה";
const STUDY_FUND: &str = "השתלמות";

/// Fields of one `Row` element, keyed by child element name.
type RawRow = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub fund_code: String,
    pub fund_name: String,
    pub company_name: String,
    pub fund_type: String,
    pub yield_1yr: Option<f64>,
    pub yield_3yr: Option<f64>,
}

fn read_rows(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut rows = Vec::new();
    let mut current: Option<RawRow> = None;
    let mut field: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("Invalid XML at position {}", reader.buffer_position()))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name == ROW_TAG {
                    current = Some(RawRow::new());
                } else if current.is_some() {
                    field = Some(name);
                }
            }
            Event::Text(t) => {
                if let (Some(row), Some(name)) = (current.as_mut(), field.as_ref()) {
                    let text = t.unescape().context("Invalid XML text")?;
                    row.entry(name.clone()).or_default().push_str(&text);
                }
            }
            Event::CData(c) => {
                if let (Some(row), Some(name)) = (current.as_mut(), field.as_ref()) {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    row.entry(name.clone()).or_default().push_str(&text);
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == ROW_TAG.as_bytes() {
                    if let Some(row) = current.take() {
                        rows.push(row);
                    }
                }
                field = None;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rows)
}

fn to_yield(value: Option<&String>) -> Option<f64> {
    let text = value?.trim().replace('%', "");
    text.trim().parse::<f64>().ok()
}

/// A missing or zero primary yield falls back to the secondary column.
fn yield_with_fallback(row: &RawRow, primary: &str, fallback: &str) -> Option<f64> {
    match to_yield(row.get(primary)) {
        Some(v) if v != 0.0 => Some(v),
        _ => to_yield(row.get(fallback)),
    }
}

pub fn classify_fund_type(fund_name: &str, company_name: &str) -> &'static str {
    let combined = format!("{} {}", fund_name, company_name);
    if combined.contains(GEMEL_INVESTMENT) {
        GEMEL_INVESTMENT
    } else if (fund_name.contains("חסכון פלוס") || fund_name.contains("חיסכון פלוס"))
        && company_name.contains("אלטשולר")
    {
        GEMEL_INVESTMENT
    } else if combined.contains(STUDY_FUND) {
        STUDY_FUND
    } else {
        GEMEL
    }
}

/// Parses the feed. Rows missing a code, name or company come back as `None`
/// so they still count as processed.
pub fn parse_gemelnet_xml(bytes: &[u8]) -> Result<Vec<Option<CatalogRow>>> {
    let rows = read_rows(bytes)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let text = |key: &str| row.get(key).map(|v| v.trim().to_string()).unwrap_or_default();
            let fund_code = text("ID");
            let fund_name = text("SHM_KUPA");
            let company_name = text("SHM_HEVRA_MENAHELET");
            if fund_code.is_empty() || fund_name.is_empty() || company_name.is_empty() {
                return None;
            }

            Some(CatalogRow {
                fund_type: classify_fund_type(&fund_name, &company_name).to_string(),
                yield_1yr: yield_with_fallback(&row, "TSUA_MITZTABERET_LETKUFA", "TSUA_SHNATIT_MEMUZAAT_3_SHANIM"),
                yield_3yr: yield_with_fallback(&row, "TSUA_MITZTABERET_36_HODASHIM", "TSUA_MEMUZAAT_36_HODASHIM"),
                fund_code,
                fund_name,
                company_name,
            })
        })
        .collect())
}

pub async fn import_gemelnet_xml(pool: &PgPool, bytes: &[u8]) -> Result<GemelNetImportResult, AppError> {
    let rows = parse_gemelnet_xml(bytes).map_err(|e| AppError::Validation(format!("{:#}", e)))?;
    let mut result = GemelNetImportResult::default();

    let mut tx = pool.begin().await?;
    for row in rows {
        result.rows_processed += 1;
        let Some(row) = row else { continue };

        let existing = db::saving_product_queries::find_by_key(
            &mut *tx,
            &row.fund_type,
            &row.company_name,
            &row.fund_name,
            &row.fund_code,
        )
        .await?;

        match existing {
            None => {
                let product = SavingProduct {
                    fund_type: row.fund_type,
                    company_name: row.company_name,
                    fund_name: row.fund_name,
                    fund_code: row.fund_code,
                    yield_1yr: row.yield_1yr,
                    yield_3yr: row.yield_3yr,
                    ..Default::default()
                };
                db::saving_product_queries::create(&mut *tx, &product).await?;
                result.created_saving_products += 1;
            }
            Some(product) if product.yield_1yr != row.yield_1yr || product.yield_3yr != row.yield_3yr => {
                db::saving_product_queries::update_yields(&mut *tx, product.id, row.yield_1yr, row.yield_3yr).await?;
                result.updated_saving_products += 1;
            }
            Some(_) => result.duplicates_skipped += 1,
        }
    }
    tx.commit().await?;

    info!(
        created = result.created_saving_products,
        updated = result.updated_saving_products,
        rows = result.rows_processed,
        "Gemel-Net catalog imported"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ROOT>
  <Row>
    <ID>1328</ID>
    <SHM_KUPA>אלטשולר שחם חסכון פלוס</SHM_KUPA>
    <SHM_HEVRA_MENAHELET>אלטשולר שחם גמל ופנסיה</SHM_HEVRA_MENAHELET>
    <TSUA_MITZTABERET_LETKUFA>0</TSUA_MITZTABERET_LETKUFA>
    <TSUA_SHNATIT_MEMUZAAT_3_SHANIM>7.25%</TSUA_SHNATIT_MEMUZAAT_3_SHANIM>
    <TSUA_MITZTABERET_36_HODASHIM>21.4</TSUA_MITZTABERET_36_HODASHIM>
  </Row>
  <Row>
    <ID>9604</ID>
    <SHM_KUPA>מגדל השתלמות כללי</SHM_KUPA>
    <SHM_HEVRA_MENAHELET>מגדל מקפת</SHM_HEVRA_MENAHELET>
    <TSUA_MITZTABERET_LETKUFA>5.1</TSUA_MITZTABERET_LETKUFA>
  </Row>
  <Row>
    <ID></ID>
    <SHM_KUPA>ללא קוד</SHM_KUPA>
    <SHM_HEVRA_MENAHELET>חברה</SHM_HEVRA_MENAHELET>
  </Row>
</ROOT>"#;

    #[test]
    fn test_parses_rows_with_yield_fallbacks() {
        let rows = parse_gemelnet_xml(FEED.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.fund_code, "1328");
        assert_eq!(first.fund_type, GEMEL_INVESTMENT);
        assert_eq!(first.yield_1yr, Some(7.25));
        assert_eq!(first.yield_3yr, Some(21.4));

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.fund_type, STUDY_FUND);
        assert_eq!(second.yield_1yr, Some(5.1));
        assert_eq!(second.yield_3yr, None);

        assert!(rows[2].is_none());
    }

    #[test]
    fn test_fund_type_heuristic() {
        assert_eq!(classify_fund_type("הראל גמל להשקעה", "הראל"), GEMEL_INVESTMENT);
        assert_eq!(classify_fund_type("חיסכון פלוס", "הראל"), GEMEL);
        assert_eq!(classify_fund_type("קרן", "השתלמות בע\"מ"), STUDY_FUND);
        assert_eq!(classify_fund_type("מסלול כללי", "מור"), GEMEL);
    }

    #[test]
    fn test_invalid_xml_is_an_error() {
        assert!(parse_gemelnet_xml(b"<ROOT><Row><ID>1</Row>").is_err());
    }
}
