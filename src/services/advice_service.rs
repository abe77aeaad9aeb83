//! The advice (justification) document: one comparison table per holding,
//! its proposed replacements and fixed alternatives, rendered as RTL HTML.

use base64::{engine::general_purpose, Engine as _};
use chrono::{Datelike, NaiveDate, Utc};
use sqlx::PgPool;

use crate::db;
use crate::errors::AppError;
use crate::models::{Client, ExistingProduct, NewProduct};
use crate::services::client_service;
use crate::services::document_store::DocumentStore;
use crate::utils::filenames;
use crate::utils::html::{escape, format_thousands};

pub const INTEREST_RATE: f64 = 0.03;
pub const RETIREMENT_AGE: i32 = 67;

const GEMEL: &str = "גמל";
const TRACKED_TYPES: [&str; 3] = ["גמל", "גמל להשקעה", "השתלמות"];

const KEEP: &str = "להשאיר";
const CANCEL: &str = "לבטל";
const JOIN: &str = "להצטרף";
const NO_DATA: &str = "אין נתון";
const NOT_RELEVANT: &str = "לא רלוונטי";
const NO_COVERAGE: &str = "אין כיסויים במוצר זה";
const SELECTION_NOTE: &str = "שיקולים לבחירת הקופה: 1. רמת שירות גבוהה של הגוף המוסדי. 2. רמת תפעול גבוהה של הגוף המוסדי. 3. רמת ניהול השקעות גבוהה של הגוף המוסדי.";

struct Alternative {
    label: &'static str,
    product_type: &'static str,
    company_name: &'static str,
    fund_name: &'static str,
    track_name: &'static str,
    guaranteed_return: &'static str,
    yield_note: &'static str,
    fee_contributions: &'static str,
    fee_balance: &'static str,
    fee_rate: f64,
}

const ALTERNATIVES: [Alternative; 3] = [
    Alternative {
        label: "חלופה 1",
        product_type: "קרן פנסיה",
        company_name: "אלטשולר שחם גמל ופנסיה בעמ",
        fund_name: "אלטשולר שחם פנסיה מקיפה 1328",
        track_name: "מודל השקעה תלוי גיל, אלטשולר שחם, פנסיה מקיפה, מסלול לבני 50 עד 60, מ.ה 9758",
        guaranteed_return: "כן, קיימת הבטחת תשואה שנתית של 5.15% (צמודה למדד) על 30% מהנכסים",
        yield_note: "אלטשולר שחם פנסיה מקיפה מסלול לבני 50-60 תאריך תחילת פעילות 12/11/2015",
        fee_contributions: "1% הטבה למשך תקופה של 10 שנים לאחר מכן ד.נ. מצבירה 6%",
        fee_balance: "0.22% הטבה למשך תקופה של 10 שנים לאחר מכן ד.נ. מצבירה 0.5%",
        fee_rate: 0.0022,
    },
    Alternative {
        label: "חלופה 2",
        product_type: "קרן פנסיה",
        company_name: "אלטשולר שחם גמל ופנסיה בעמ",
        fund_name: "אלטשולר שחם פנסיה כללית 1329",
        track_name: "מודל השקעה תלוי גיל, אלטשולר שחם, פנסיה מקיפה, מסלול לבני 50 עד 60, מ.ה 9762",
        guaranteed_return: "לא",
        yield_note: "אלטשולר שחם פנסיה כללית מסלול לבני 50-60 תאריך תחילת פעילות 12/11/2015",
        fee_contributions: "1% הטבה למשך תקופה של 10 שנים לאחר מכן ד.נ. מצבירה 4%",
        fee_balance: "0.22% הטבה למשך תקופה של 10 שנים לאחר מכן ד.נ. מצבירה 1.05%",
        fee_rate: 0.0022,
    },
    Alternative {
        label: "חלופה 3",
        product_type: "פוליסה",
        company_name: "מגדל",
        fund_name: "מגדל מסלול לבני 50-60 מ.ה-9604 פוליסה",
        track_name: "מודל השקעה תלוי גיל, מגדל מסלול לבני 50 עד 60, מ.ה 9604",
        guaranteed_return: "לא",
        yield_note: "מגדל מסלול לבני 50-60 תאריך תחילת פעילות : פוליסות שהונפקו משנת 2004 ואילך",
        fee_contributions: "0% קבוע לכל חיי המוצר",
        fee_balance: "דמי ניהול יורדים לפי צבירה",
        fee_rate: 0.0044,
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdviceRow {
    pub recommendation: String,
    pub product_type: String,
    pub company_name: String,
    pub fund_name: String,
    pub track_name: String,
    pub guaranteed_return: String,
    pub yield_1yr: String,
    pub yield_3yr: String,
    pub fee_contributions: String,
    pub fee_balance: String,
    pub balance: String,
    pub forecast: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub recommendation: String,
    pub product_name: String,
    pub company_name: String,
}

/// Fields shared by existing and proposed products.
struct ProductView<'a> {
    fund_type: &'a str,
    company_name: &'a str,
    fund_name: &'a str,
    fund_code: &'a str,
    personal_number: Option<&'a str>,
    yield_1yr: Option<f64>,
    yield_3yr: Option<f64>,
    fee_contributions: Option<f64>,
    fee_balance: Option<f64>,
}

impl<'a> From<&'a ExistingProduct> for ProductView<'a> {
    fn from(p: &'a ExistingProduct) -> Self {
        Self {
            fund_type: &p.fund_type,
            company_name: &p.company_name,
            fund_name: &p.fund_name,
            fund_code: &p.fund_code,
            personal_number: Some(p.personal_number.as_str()),
            yield_1yr: p.yield_1yr,
            yield_3yr: p.yield_3yr,
            fee_contributions: p.management_fee_contributions,
            fee_balance: p.management_fee_balance,
        }
    }
}

impl<'a> From<&'a NewProduct> for ProductView<'a> {
    fn from(p: &'a NewProduct) -> Self {
        Self {
            fund_type: &p.fund_type,
            company_name: &p.company_name,
            fund_name: &p.fund_name,
            fund_code: &p.fund_code,
            personal_number: p.personal_number.as_deref(),
            yield_1yr: p.yield_1yr,
            yield_3yr: p.yield_3yr,
            fee_contributions: p.management_fee_contributions,
            fee_balance: p.management_fee_balance,
        }
    }
}

impl ProductView<'_> {
    fn labelled_name(&self) -> String {
        match self.personal_number.map(str::trim).filter(|n| !n.is_empty()) {
            Some(number) if TRACKED_TYPES.contains(&self.fund_type) => {
                format!("{} (מס' קופה: {})", self.fund_name, number)
            }
            _ => self.fund_name.to_string(),
        }
    }
}

pub fn years_to_retirement(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    (RETIREMENT_AGE - (today.year() - birth_date.year())).max(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Balance grown at the fixed rate until retirement, without deposits.
pub fn future_value(balance: f64, years: i32) -> f64 {
    if years <= 0 {
        return 0.0;
    }
    round2(balance * (1.0 + INTEREST_RATE).powi(years))
}

/// Management fees paid on the balance until retirement.
pub fn fee_cost(balance: f64, fee_rate: f64, years: i32) -> f64 {
    if fee_rate == 0.0 || years <= 0 {
        return 0.0;
    }
    round2(balance * fee_rate * years as f64)
}

fn percent_or_no_data(value: Option<f64>) -> String {
    value.map(|v| format!("{}%", v)).unwrap_or_else(|| NO_DATA.to_string())
}

fn number_or_blank(value: Option<f64>) -> String {
    value.filter(|v| *v != 0.0).map(|v| v.to_string()).unwrap_or_default()
}

fn balance_text(amount: f64) -> String {
    if amount == 0.0 {
        NOT_RELEVANT.to_string()
    } else {
        format_thousands(amount)
    }
}

fn forecast_text(amount: f64, fee_rate: f64, years: i32) -> String {
    format!(
        "גיל פרישה {} הון צפוי ללא הפקדות {} דמי ניהול של {}",
        RETIREMENT_AGE,
        format_thousands(future_value(amount, years)),
        format_thousands(fee_cost(amount, fee_rate, years))
    )
}

fn product_row(product: &ProductView<'_>, recommendation: &str, amount: f64, years: i32) -> AdviceRow {
    let fee_rate = product.fee_balance.unwrap_or(0.0) / 100.0;
    let name = product.labelled_name();
    AdviceRow {
        recommendation: recommendation.to_string(),
        product_type: format!("קופת {}", product.fund_type),
        company_name: product.company_name.to_string(),
        fund_name: name.clone(),
        track_name: format!("{} ({})", name, product.fund_code),
        guaranteed_return: "לא".to_string(),
        yield_1yr: percent_or_no_data(product.yield_1yr),
        yield_3yr: percent_or_no_data(product.yield_3yr),
        fee_contributions: number_or_blank(product.fee_contributions),
        fee_balance: number_or_blank(product.fee_balance),
        balance: balance_text(amount),
        forecast: forecast_text(amount, fee_rate, years),
    }
}

fn alternative_rows(amount: f64, years: i32) -> Vec<AdviceRow> {
    ALTERNATIVES
        .iter()
        .map(|alt| AdviceRow {
            recommendation: alt.label.to_string(),
            product_type: alt.product_type.to_string(),
            company_name: alt.company_name.to_string(),
            fund_name: alt.fund_name.to_string(),
            track_name: alt.track_name.to_string(),
            guaranteed_return: alt.guaranteed_return.to_string(),
            yield_1yr: alt.yield_note.to_string(),
            yield_3yr: NO_DATA.to_string(),
            fee_contributions: alt.fee_contributions.to_string(),
            fee_balance: alt.fee_balance.to_string(),
            balance: balance_text(amount),
            forecast: forecast_text(amount, alt.fee_rate, years),
        })
        .collect()
}

fn selection_note_row() -> AdviceRow {
    AdviceRow {
        recommendation: SELECTION_NOTE.to_string(),
        ..Default::default()
    }
}

/// Replacements of `existing`: linked to it and of the same fund type.
fn replacements_of<'a>(existing: &ExistingProduct, new_products: &'a [NewProduct]) -> Vec<&'a NewProduct> {
    new_products
        .iter()
        .filter(|np| np.existing_product_id == Some(existing.id) && np.fund_type == existing.fund_type)
        .collect()
}

/// Standalone proposals first, then one table per existing holding.
pub fn build_tables(
    existing: &[ExistingProduct],
    new_products: &[NewProduct],
    years: i32,
) -> Vec<Vec<AdviceRow>> {
    let mut tables = Vec::new();

    for np in new_products.iter().filter(|np| np.existing_product_id.is_none()) {
        let view = ProductView::from(np);
        let amount = np.accumulated_amount.unwrap_or(0.0);
        let mut table = vec![product_row(&view, JOIN, amount, years)];
        if np.fund_type == GEMEL {
            table.extend(alternative_rows(amount, years));
        }
        table.push(selection_note_row());
        tables.push(table);
    }

    for ex in existing {
        let replacements = replacements_of(ex, new_products);
        let amount = ex.accumulated_amount.unwrap_or(0.0);
        let recommendation = if TRACKED_TYPES.contains(&ex.fund_type.as_str()) && !replacements.is_empty() {
            CANCEL
        } else {
            KEEP
        };
        let mut table = vec![product_row(&ProductView::from(ex), recommendation, amount, years)];

        if !replacements.is_empty() {
            // A holding split across several replacements is divided evenly.
            let share = match ex.accumulated_amount {
                Some(total) if replacements.len() > 1 => Some(total / replacements.len() as f64),
                _ => None,
            };
            for np in &replacements {
                let np_amount = share.unwrap_or_else(|| np.accumulated_amount.unwrap_or(0.0));
                table.push(product_row(&ProductView::from(*np), JOIN, np_amount, years));
            }
            if ex.fund_type == GEMEL {
                table.extend(alternative_rows(amount, years));
            }
            table.push(selection_note_row());
        }
        tables.push(table);
    }
    tables
}

fn coverage_row(recommendation: &str, product_name: String, company_name: &str) -> CoverageRow {
    CoverageRow {
        recommendation: recommendation.to_string(),
        product_name,
        company_name: company_name.to_string(),
    }
}

fn alternative_coverage() -> impl Iterator<Item = CoverageRow> {
    ALTERNATIVES
        .iter()
        .map(|alt| coverage_row(alt.label, alt.fund_name.to_string(), alt.company_name))
}

/// Insurance coverage tables. None of the products carry coverage; the fixed
/// alternatives are listed once, with the first `גמל` table.
pub fn build_coverage_tables(existing: &[ExistingProduct], new_products: &[NewProduct]) -> Vec<Vec<CoverageRow>> {
    let mut tables = Vec::new();
    let mut alternatives_added = false;

    for ex in existing {
        let first_replacement = replacements_of(ex, new_products).into_iter().next();
        let view = ProductView::from(ex);
        let mut rows = vec![coverage_row(
            if first_replacement.is_some() { JOIN } else { KEEP },
            view.labelled_name(),
            &ex.company_name,
        )];
        if let Some(np) = first_replacement {
            rows.push(coverage_row(JOIN, ProductView::from(np).labelled_name(), &np.company_name));
        }
        if ex.fund_type == GEMEL && !alternatives_added {
            alternatives_added = true;
            rows.extend(alternative_coverage());
        }
        tables.push(rows);
    }

    for np in new_products.iter().filter(|np| np.existing_product_id.is_none()) {
        let mut rows = vec![coverage_row(JOIN, ProductView::from(np).labelled_name(), &np.company_name)];
        if np.fund_type == GEMEL && !alternatives_added {
            alternatives_added = true;
            rows.extend(alternative_coverage());
        }
        tables.push(rows);
    }
    tables
}

const ADVICE_HEADERS: [&str; 12] = [
    "המלצה",
    "סוג מוצר",
    "חברה מנהלת",
    "שם קופה",
    "מסלול",
    "תשואה מובטחת",
    "תשואה שנה",
    "תשואה 3 שנים",
    "ד.נ. מהפקדה",
    "ד.נ. מצבירה",
    "יתרה",
    "תחזית",
];

fn render_advice_table(rows: &[AdviceRow]) -> String {
    let head: String = ADVICE_HEADERS.iter().map(|h| format!("<th>{}</th>", h)).collect();
    let body: String = rows
        .iter()
        .map(|r| {
            let cells = [
                &r.recommendation,
                &r.product_type,
                &r.company_name,
                &r.fund_name,
                &r.track_name,
                &r.guaranteed_return,
                &r.yield_1yr,
                &r.yield_3yr,
                &r.fee_contributions,
                &r.fee_balance,
                &r.balance,
                &r.forecast,
            ];
            let tds: String = cells.iter().map(|c| format!("<td>{}</td>", escape(c))).collect();
            format!("<tr>{}</tr>\n", tds)
        })
        .collect();
    format!("<table><thead><tr>{}</tr></thead><tbody>\n{}</tbody></table>\n", head, body)
}

fn render_coverage_table(rows: &[CoverageRow]) -> String {
    let body: String = rows
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape(&r.recommendation),
                escape(&r.product_name),
                escape(&r.company_name),
                NO_COVERAGE,
                NO_COVERAGE,
                NO_COVERAGE
            )
        })
        .collect();
    format!(
        "<table><thead><tr><th>המלצה</th><th>שם מוצר</th><th>חברה מנהלת</th><th>סוג כיסוי</th><th>סכום כיסוי</th><th>עלות חודשית</th></tr></thead><tbody>\n{}</tbody></table>\n",
        body
    )
}

pub fn render_advice_html(
    client: &Client,
    tables: &[Vec<AdviceRow>],
    coverage: &[Vec<CoverageRow>],
    today: NaiveDate,
    client_signature: Option<&[u8]>,
) -> String {
    let comparison: String = tables.iter().map(|t| render_advice_table(t)).collect();
    let coverage: String = coverage.iter().map(|t| render_coverage_table(t)).collect();
    let signature = client_signature
        .map(|png| {
            format!(
                r#"<div class="signature"><p>חתימת הלקוח</p><img alt="חתימת הלקוח" src="data:image/png;base64,{}"></div>"#,
                general_purpose::STANDARD.encode(png)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="he" dir="rtl">
<head><meta charset="utf-8"><title>מסמך הנמקה - {name}</title>
<style>body{{font-family:Arial,sans-serif;font-size:12px}}table{{border-collapse:collapse;width:100%;margin-bottom:16px}}td,th{{border:1px solid #999;padding:4px}}th{{background:#eee}}.signature img{{max-height:80px}}</style>
</head>
<body>
<h1>מסמך הנמקה</h1>
<p>תאריך: {date}</p>
<table><tbody>
<tr><th>שם פרטי</th><td>{first}</td><th>שם משפחה</th><td>{last}</td></tr>
<tr><th>תעודת זהות</th><td>{id}</td><th>תאריך לידה</th><td>{birth}</td></tr>
<tr><th>מצב משפחתי</th><td>{marital}</td><th></th><td></td></tr>
</tbody></table>
<h2>השוואת מוצרים</h2>
{comparison}<h2>כיסויים ביטוחיים</h2>
{coverage}{signature}
</body>
</html>
"#,
        name = escape(&client.display_name()),
        date = today.format("%d/%m/%Y"),
        first = escape(client.first_name.as_deref().unwrap_or("")),
        last = escape(client.last_name.as_deref().unwrap_or("")),
        id = escape(&client.id_number),
        birth = client.birth_date.format("%d/%m/%Y"),
        marital = escape(client.marital_status.as_deref().unwrap_or("")),
        comparison = comparison,
        coverage = coverage,
        signature = signature,
    )
}

pub async fn advice_html(pool: &PgPool, store: &DocumentStore, client_id: i64) -> Result<String, AppError> {
    let client = client_service::fetch_one(pool, client_id).await?;
    let mut existing = db::existing_product_queries::fetch_for_client(pool, client.id).await?;
    existing.sort_by_key(|p| p.id);
    let mut new_products = db::new_product_queries::fetch_for_client(pool, client.id).await?;
    new_products.sort_by_key(|p| p.id);
    let signature = store.read(&client, filenames::CLIENT_SIGNATURE).await?;

    let today = Utc::now().date_naive();
    let years = years_to_retirement(client.birth_date, today);
    let tables = build_tables(&existing, &new_products, years);
    let coverage = build_coverage_tables(&existing, &new_products);
    Ok(render_advice_html(&client, &tables, &coverage, today, signature.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dashboard_service::fixtures::client;

    fn existing(id: i64, fund_type: &str, amount: Option<f64>) -> ExistingProduct {
        ExistingProduct {
            id,
            client_id: 1,
            fund_type: fund_type.into(),
            company_name: "הראל".into(),
            fund_name: "הראל כללי".into(),
            fund_code: "111".into(),
            personal_number: format!("P{}", id),
            accumulated_amount: amount,
            management_fee_balance: Some(0.5),
            ..Default::default()
        }
    }

    fn proposal(id: i64, existing_id: Option<i64>, fund_type: &str) -> NewProduct {
        NewProduct {
            id,
            client_id: 1,
            existing_product_id: existing_id,
            fund_type: fund_type.into(),
            company_name: "מגדל".into(),
            fund_name: "מגדל מניות".into(),
            fund_code: "9604".into(),
            accumulated_amount: Some(1000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_years_to_retirement_floors_at_zero() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(years_to_retirement(NaiveDate::from_ymd_opt(1980, 12, 31).unwrap(), today), 22);
        assert_eq!(years_to_retirement(NaiveDate::from_ymd_opt(1950, 1, 1).unwrap(), today), 0);
    }

    #[test]
    fn test_future_value_and_fee_cost() {
        assert_eq!(future_value(1000.0, 2), 1060.9);
        assert_eq!(future_value(1000.0, 0), 0.0);
        assert_eq!(fee_cost(100_000.0, 0.0022, 10), 2200.0);
        assert_eq!(fee_cost(100_000.0, 0.0, 10), 0.0);
    }

    #[test]
    fn test_replaced_gemel_gets_cancel_and_alternatives() {
        let ex = vec![existing(10, "גמל", Some(50_000.0))];
        let np = vec![proposal(1, Some(10), "גמל")];
        let tables = build_tables(&ex, &np, 20);

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        // existing + replacement + three alternatives + note
        assert_eq!(table.len(), 6);
        assert_eq!(table[0].recommendation, CANCEL);
        assert_eq!(table[0].fund_name, "הראל כללי (מס' קופה: P10)");
        assert_eq!(table[0].track_name, "הראל כללי (מס' קופה: P10) (111)");
        assert_eq!(table[1].recommendation, JOIN);
        assert_eq!(table[2].recommendation, "חלופה 1");
        assert_eq!(table[2].balance, "50,000");
        assert_eq!(table[5].recommendation, SELECTION_NOTE);
    }

    #[test]
    fn test_unreplaced_holding_is_kept_alone() {
        let ex = vec![existing(10, "השתלמות", None)];
        let np = vec![proposal(1, Some(10), "גמל")];
        let tables = build_tables(&ex, &np, 20);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 1);
        assert_eq!(tables[0][0].recommendation, KEEP);
        assert_eq!(tables[0][0].balance, NOT_RELEVANT);
        assert_eq!(tables[0][0].yield_1yr, NO_DATA);
    }

    #[test]
    fn test_balance_split_across_replacements() {
        let ex = vec![existing(10, "השתלמות", Some(9000.0))];
        let np = vec![proposal(1, Some(10), "השתלמות"), proposal(2, Some(10), "השתלמות")];
        let tables = build_tables(&ex, &np, 0);
        assert_eq!(tables[0][1].balance, "4,500");
        assert_eq!(tables[0][2].balance, "4,500");
    }

    #[test]
    fn test_standalone_tables_come_first() {
        let ex = vec![existing(10, "השתלמות", Some(1.0))];
        let np = vec![proposal(3, None, "גמל")];
        let tables = build_tables(&ex, &np, 10);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0][0].recommendation, JOIN);
        assert_eq!(tables[0].len(), 5);
    }

    #[test]
    fn test_coverage_alternatives_listed_once() {
        let ex = vec![existing(10, "גמל", Some(1.0)), existing(11, "גמל", Some(1.0))];
        let np = vec![proposal(1, Some(10), "גמל"), proposal(2, None, "גמל")];
        let coverage = build_coverage_tables(&ex, &np);
        assert_eq!(coverage.len(), 3);
        assert_eq!(coverage[0].len(), 5);
        assert_eq!(coverage[0][0].recommendation, JOIN);
        assert_eq!(coverage[1].len(), 1);
        assert_eq!(coverage[1][0].recommendation, KEEP);
        assert_eq!(coverage[2].len(), 1);
    }

    #[test]
    fn test_html_includes_signature_when_present() {
        let c = client(1, "<דנה>");
        let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let without = render_advice_html(&c, &[], &[], today, None);
        assert!(without.contains("&lt;דנה&gt;"));
        assert!(without.contains("02/01/2025"));
        assert!(!without.contains("data:image/png"));

        let with = render_advice_html(&c, &[], &[], today, Some(b"png"));
        assert!(with.contains("data:image/png;base64,cG5n"));
    }
}
