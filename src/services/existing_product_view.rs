//! Merged list of a client's current holdings for the justification screen.
//!
//! Stored existing products come first. Every active CRM fund that is not
//! already represented becomes a virtual row (negative id) resolved against
//! the market catalog. Finally rows that share a personal number are folded
//! into one row carrying the summed balance.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ExistingProduct, SavingProduct, Snapshot};
use crate::utils::sources;

fn trimmed(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or("")
}

fn normalize_company(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '\'' | '"'))
        .collect()
}

static PARENTHESIZED: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\(([^)]*)\)").ok());

fn parenthesized(raw: &str) -> Option<String> {
    let re = PARENTHESIZED.as_ref()?;
    let inner = re.captures(raw)?.get(1)?.as_str().trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Value inside the first pair of parentheses, e.g. `(6077389) 627-274` → `6077389`.
pub(crate) fn canonical_personal_number(raw: &str) -> String {
    let raw = raw.trim();
    parenthesized(raw).unwrap_or_else(|| raw.to_string())
}

/// First catalog row per trimmed fund code.
fn catalog_by_code(catalog: &[SavingProduct]) -> HashMap<&str, &SavingProduct> {
    let mut by_code = HashMap::new();
    for sp in catalog {
        let code = sp.fund_code.trim();
        if !code.is_empty() {
            by_code.entry(code).or_insert(sp);
        }
    }
    by_code
}

/// Catalog row with the same fund name whose company starts like the
/// snapshot's provider display name (either direction).
fn resolve_by_name<'a>(snapshot: &Snapshot, catalog: &'a [SavingProduct]) -> Option<&'a SavingProduct> {
    let fund_name = trimmed(snapshot.fund_name.as_deref());
    let source = trimmed(snapshot.source.as_deref());
    if fund_name.is_empty() || source.is_empty() {
        return None;
    }

    let expected = normalize_company(&sources::display_name(source));
    if expected.is_empty() {
        return None;
    }
    catalog.iter().find(|candidate| {
        if candidate.fund_name.trim() != fund_name {
            return false;
        }
        let company = normalize_company(&candidate.company_name);
        !company.is_empty() && (company.starts_with(&expected) || expected.starts_with(&company))
    })
}

/// Latest active snapshot per (fund code, fund number); rows with neither are ignored.
fn latest_snapshots(snapshots: &[Snapshot]) -> BTreeMap<(String, String), &Snapshot> {
    let mut latest: BTreeMap<(String, String), &Snapshot> = BTreeMap::new();
    for s in snapshots.iter().filter(|s| s.is_active) {
        let code = s.fund_code.trim().to_string();
        let number = trimmed(s.fund_number.as_deref()).to_string();
        if code.is_empty() && number.is_empty() {
            continue;
        }
        match latest.get(&(code.clone(), number.clone())) {
            Some(current) if current.snapshot_date >= s.snapshot_date => {}
            _ => {
                latest.insert((code, number), s);
            }
        }
    }
    latest
}

fn virtual_rows(
    client_id: i64,
    stored: &[ExistingProduct],
    snapshots: &[Snapshot],
    catalog: &[SavingProduct],
) -> Vec<ExistingProduct> {
    let seen: HashSet<(&str, &str, &str)> = stored
        .iter()
        .map(|p| (p.fund_code.trim(), p.fund_name.trim(), p.fund_type.trim()))
        .collect();
    let by_code = catalog_by_code(catalog);

    let mut rows = Vec::new();
    let mut next_id: i64 = -1;
    for ((code, number), snap) in latest_snapshots(snapshots) {
        let key = (
            code.as_str(),
            trimmed(snap.fund_name.as_deref()),
            trimmed(snap.fund_type.as_deref()),
        );
        if seen.contains(&key) {
            continue;
        }

        let sp = resolve_by_name(snap, catalog).or_else(|| by_code.get(code.as_str()).copied());

        let fund_type = non_empty_or(snap.fund_type.as_deref(), sp.map(|p| p.fund_type.as_str()));
        let fund_name = non_empty_or(snap.fund_name.as_deref(), sp.map(|p| p.fund_name.as_str()));
        let company_name = match sp {
            Some(p) => p.company_name.clone(),
            None => sources::display_name(snap.source.as_deref().unwrap_or("")),
        };
        if fund_type.is_empty() && fund_name.is_empty() && company_name.is_empty() {
            continue;
        }

        let personal_number = if !number.is_empty() {
            number.clone()
        } else if !code.is_empty() {
            code.clone()
        } else {
            format!("CRM-{}-{}", client_id, -next_id)
        };
        let fund_code = match sp {
            Some(p) if !p.fund_code.is_empty() => p.fund_code.clone(),
            _ if !code.is_empty() => code.clone(),
            _ => number.clone(),
        };

        rows.push(ExistingProduct {
            id: next_id,
            client_id,
            fund_type,
            company_name,
            fund_name,
            fund_code,
            yield_1yr: sp.and_then(|p| p.yield_1yr),
            yield_3yr: sp.and_then(|p| p.yield_3yr),
            personal_number,
            management_fee_balance: Some(snap.amount),
            management_fee_contributions: None,
            accumulated_amount: Some(snap.amount),
            employment_status: None,
            has_regular_contributions: None,
            is_virtual: true,
        });
        next_id -= 1;
    }
    rows
}

fn non_empty_or(primary: Option<&str>, fallback: Option<&str>) -> String {
    match primary {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.unwrap_or("").to_string(),
    }
}

/// Folds rows sharing a canonical personal number. Rows without one are kept
/// first and untouched; groups keep the order of their first member.
fn group_by_personal_number(items: Vec<ExistingProduct>, catalog: &[SavingProduct]) -> Vec<ExistingProduct> {
    let by_code = catalog_by_code(catalog);
    let mut standalone = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<ExistingProduct>> = HashMap::new();

    for item in items {
        if item.personal_number.trim().is_empty() {
            standalone.push(item);
            continue;
        }
        let key = canonical_personal_number(&item.personal_number);
        if !buckets.contains_key(&key) {
            order.push(key.clone());
        }
        buckets.entry(key).or_default().push(item);
    }

    let mut grouped = standalone;
    for key in order {
        let Some(mut bucket) = buckets.remove(&key) else {
            continue;
        };
        if bucket.len() == 1 {
            grouped.append(&mut bucket);
            continue;
        }

        let mut total = 0.0;
        let mut best: Option<(usize, f64)> = None;
        for (i, item) in bucket.iter().enumerate() {
            let amount = item.accumulated_amount.unwrap_or(0.0);
            total += amount;
            if best.map_or(true, |(_, best_amount)| amount > best_amount) {
                best = Some((i, amount));
            }
        }

        let best_index = best.map(|(i, _)| i).unwrap_or(0);
        let canonical = bucket
            .iter()
            .find_map(|item| by_code.get(item.fund_code.trim()).copied());

        let mut rep = bucket.swap_remove(best_index);
        rep.accumulated_amount = Some(total);
        rep.management_fee_balance = Some(total);
        if let Some(sp) = canonical {
            rep.company_name = sp.company_name.clone();
            rep.fund_name = sp.fund_name.clone();
            rep.fund_type = sp.fund_type.clone();
            rep.fund_code = sp.fund_code.clone();
        }
        grouped.push(rep);
    }
    grouped
}

pub fn build_existing_view(
    client_id: i64,
    stored: Vec<ExistingProduct>,
    snapshots: &[Snapshot],
    catalog: &[SavingProduct],
) -> Vec<ExistingProduct> {
    let virtual_items = virtual_rows(client_id, &stored, snapshots, catalog);
    let mut items = stored;
    items.extend(virtual_items);
    group_by_personal_number(items, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snap(id: i64, code: &str, number: Option<&str>, date: &str, amount: f64) -> Snapshot {
        Snapshot {
            id,
            client_id: 9,
            fund_code: code.to_string(),
            fund_type: None,
            fund_name: None,
            fund_number: number.map(str::to_string),
            source: None,
            amount,
            snapshot_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            is_active: true,
        }
    }

    fn catalog_row(code: &str, company: &str, name: &str, fund_type: &str) -> SavingProduct {
        SavingProduct {
            id: 1,
            fund_type: fund_type.to_string(),
            company_name: company.to_string(),
            fund_name: name.to_string(),
            fund_code: code.to_string(),
            yield_1yr: Some(7.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_canonical_personal_number() {
        assert!(PARENTHESIZED.is_some());
        assert_eq!(canonical_personal_number("(6077389) 627-274-19096"), "6077389");
        assert_eq!(canonical_personal_number(" 12345 "), "12345");
        assert_eq!(canonical_personal_number("() 555"), "() 555");
    }

    #[test]
    fn test_virtual_rows_use_latest_snapshot_and_catalog() {
        let mut old = snap(1, "1328", Some("A-1"), "2024-01-01", 100.0);
        old.source = Some("AS".into());
        let mut new = snap(2, "1328", Some("A-1"), "2024-03-01", 150.0);
        new.source = Some("AS".into());
        let catalog = vec![catalog_row("1328", "אלטשולר שחם גמל ופנסיה", "אלטשולר גמל כללי", "גמל")];

        let view = build_existing_view(9, Vec::new(), &[old, new], &catalog);
        assert_eq!(view.len(), 1);
        let row = &view[0];
        assert_eq!(row.id, -1);
        assert!(row.is_virtual);
        assert_eq!(row.accumulated_amount, Some(150.0));
        assert_eq!(row.management_fee_balance, Some(150.0));
        assert_eq!(row.company_name, "אלטשולר שחם גמל ופנסיה");
        assert_eq!(row.fund_name, "אלטשולר גמל כללי");
        assert_eq!(row.fund_type, "גמל");
        assert_eq!(row.personal_number, "A-1");
        assert_eq!(row.yield_1yr, Some(7.5));
    }

    #[test]
    fn test_name_resolution_prefers_company_prefix() {
        let mut s = snap(1, "999", Some("P1"), "2024-01-01", 10.0);
        s.source = Some("FNX".into());
        s.fund_name = Some("מסלול כללי".into());
        let catalog = vec![
            catalog_row("111", "מגדל", "מסלול כללי", "גמל"),
            catalog_row("222", "הפניקס חברה לביטוח", "מסלול כללי", "השתלמות"),
        ];
        let view = build_existing_view(9, Vec::new(), &[s], &catalog);
        assert_eq!(view[0].fund_code, "222");
        assert_eq!(view[0].company_name, "הפניקס חברה לביטוח");
        assert_eq!(view[0].fund_type, "השתלמות");
    }

    #[test]
    fn test_stored_rows_suppress_matching_virtual_rows() {
        let stored = ExistingProduct {
            id: 5,
            client_id: 9,
            fund_code: "777".into(),
            personal_number: "X1".into(),
            company_name: "כלל".into(),
            ..Default::default()
        };
        let s = snap(1, "777", Some("Y2"), "2024-01-01", 10.0);
        let view = build_existing_view(9, vec![stored], &[s], &[]);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, 5);
    }

    #[test]
    fn test_rows_without_description_are_dropped() {
        let s = snap(1, "", Some("N1"), "2024-01-01", 10.0);
        let view = build_existing_view(9, Vec::new(), &[s], &[]);
        assert!(view.is_empty());
    }

    #[test]
    fn test_virtual_ids_count_down() {
        let mut a = snap(1, "100", None, "2024-01-01", 10.0);
        a.fund_name = Some("א".into());
        let mut b = snap(2, "200", None, "2024-01-01", 20.0);
        b.fund_name = Some("ב".into());
        let view = build_existing_view(9, Vec::new(), &[a, b], &[]);
        let ids: Vec<i64> = view.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![-1, -2]);
        assert_eq!(view[0].personal_number, "100");
    }

    #[test]
    fn test_tracks_with_same_personal_number_are_merged() {
        let mut a = snap(1, "100", Some("(6077389) 627-1"), "2024-01-01", 10.0);
        a.fund_name = Some("מסלול א".into());
        let mut b = snap(2, "200", Some("(6077389) 627-2"), "2024-01-01", 30.0);
        b.fund_name = Some("מסלול ב".into());
        let catalog = vec![catalog_row("100", "מור", "מור גמל", "גמל")];

        let view = build_existing_view(9, Vec::new(), &[a, b], &catalog);
        assert_eq!(view.len(), 1);
        let row = &view[0];
        assert_eq!(row.accumulated_amount, Some(40.0));
        assert_eq!(row.id, -2);
        assert_eq!(row.fund_code, "100");
        assert_eq!(row.fund_name, "מור גמל");
        assert_eq!(row.company_name, "מור");
    }
}
