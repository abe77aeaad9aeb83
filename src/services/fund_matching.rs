//! Heuristic match of a client's holding against the market catalog.
//!
//! Each catalog row is scored additively on fund code, company and fund name
//! similarity plus a fund type bonus. A row qualifies at 60 points when any
//! code similarity contributed, otherwise at 30. The best qualifying row wins
//! and earlier rows keep ties.

use std::collections::HashSet;

use crate::models::SavingProduct;

const CODE_EXACT: u32 = 80;
const CODE_PARTIAL: u32 = 50;
const COMPANY_EXACT: u32 = 30;
const COMPANY_PARTIAL: u32 = 15;
const COMPANY_KEY: u32 = 20;
const NAME_EXACT: u32 = 25;
const NAME_PARTIAL: u32 = 10;
const FUND_TYPE: u32 = 10;

const MIN_SCORE_WITH_CODE: u32 = 60;
const MIN_SCORE_WITHOUT_CODE: u32 = 30;

const STUDY_FUND: &str = "השתלמות";

/// The holding side of a match; borrowed so callers can pass any record.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldingFields<'a> {
    pub company_name: &'a str,
    pub fund_name: &'a str,
    pub fund_code: &'a str,
    pub fund_type: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FundMatch<'a> {
    pub product: &'a SavingProduct,
    pub score: u32,
}

fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_name(value: &str) -> String {
    let stripped: String = normalize_text(value)
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '.' | ','))
        .collect();
    normalize_text(&stripped)
}

fn normalize_code(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Every study-fund variant collapses to the same canonical type.
pub fn canonical_fund_type(value: &str) -> String {
    let base = normalize_text(value);
    if base.contains(STUDY_FUND) {
        STUDY_FUND.to_string()
    } else {
        base
    }
}

fn company_key(value: &str) -> String {
    let base = normalize_text(value);
    let parts: Vec<&str> = base.split(' ').filter(|p| !p.is_empty()).collect();
    parts
        .iter()
        .find(|p| char_len(p) >= 3)
        .or_else(|| parts.first())
        .map(|p| p.to_string())
        .unwrap_or_default()
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Containment in either direction, only when both sides are long enough.
fn overlaps(a: &str, b: &str, min_len: usize) -> bool {
    char_len(a) >= min_len && char_len(b) >= min_len && (a.contains(b) || b.contains(a))
}

fn words(value: &str) -> Vec<&str> {
    value.split(' ').map(str::trim).filter(|w| char_len(w) >= 2).collect()
}

fn word_overlap_score(existing: &str, market: &str) -> u32 {
    let existing_words: HashSet<&str> = words(existing).into_iter().collect();
    let market_words = words(market);
    if existing_words.is_empty() || market_words.is_empty() {
        return 0;
    }

    let overlap = market_words.iter().filter(|w| existing_words.contains(*w)).count();
    match overlap {
        0 => 0,
        1 => 5,
        2 => 12,
        _ => 20,
    }
}

struct Normalized {
    company: String,
    company_key: String,
    fund_name: String,
    fund_code: String,
    fund_type: String,
}

impl Normalized {
    fn new(company: &str, fund_name: &str, fund_code: &str, fund_type: &str) -> Self {
        Self {
            company: normalize_name(company),
            company_key: company_key(company),
            fund_name: normalize_name(fund_name),
            fund_code: normalize_code(fund_code),
            fund_type: canonical_fund_type(fund_type),
        }
    }
}

/// Returns `(total, code_component)` for one catalog row.
fn score(existing: &Normalized, market: &Normalized) -> (u32, u32) {
    let mut code_score = 0;
    if !existing.fund_code.is_empty() && !market.fund_code.is_empty() {
        if existing.fund_code == market.fund_code {
            code_score = CODE_EXACT;
        } else if overlaps(&existing.fund_code, &market.fund_code, 4) {
            code_score = CODE_PARTIAL;
        }
    }

    let mut total = code_score;

    if !existing.company.is_empty() && !market.company.is_empty() {
        if existing.company == market.company {
            total += COMPANY_EXACT;
        } else if overlaps(&existing.company, &market.company, 4) {
            total += COMPANY_PARTIAL;
        }
    }

    if !existing.company_key.is_empty() && existing.company_key == market.company_key {
        total += COMPANY_KEY;
    }

    if !existing.fund_name.is_empty() && !market.fund_name.is_empty() {
        if existing.fund_name == market.fund_name {
            total += NAME_EXACT;
        } else if overlaps(&existing.fund_name, &market.fund_name, 6) {
            total += NAME_PARTIAL;
        }
        total += word_overlap_score(&existing.fund_name, &market.fund_name);
    }

    if !existing.fund_type.is_empty() && existing.fund_type == market.fund_type {
        total += FUND_TYPE;
    }

    (total, code_score)
}

pub fn find_matching_saving_product<'a>(
    holding: HoldingFields<'_>,
    catalog: &'a [SavingProduct],
) -> Option<FundMatch<'a>> {
    let existing = Normalized::new(
        holding.company_name,
        holding.fund_name,
        holding.fund_code,
        holding.fund_type,
    );

    let mut best: Option<FundMatch<'a>> = None;
    for product in catalog {
        let market = Normalized::new(
            &product.company_name,
            &product.fund_name,
            &product.fund_code,
            &product.fund_type,
        );
        let (total, code_score) = score(&existing, &market);
        let min_score = if code_score > 0 {
            MIN_SCORE_WITH_CODE
        } else {
            MIN_SCORE_WITHOUT_CODE
        };

        let best_score = best.map(|m| m.score).unwrap_or(0);
        if total >= min_score && total > best_score {
            best = Some(FundMatch { product, score: total });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, company: &str, name: &str, code: &str, fund_type: &str) -> SavingProduct {
        SavingProduct {
            id,
            fund_type: fund_type.to_string(),
            company_name: company.to_string(),
            fund_name: name.to_string(),
            fund_code: code.to_string(),
            ..Default::default()
        }
    }

    fn holding<'a>(company: &'a str, name: &'a str, code: &'a str, fund_type: &'a str) -> HoldingFields<'a> {
        HoldingFields {
            company_name: company,
            fund_name: name,
            fund_code: code,
            fund_type,
        }
    }

    #[test]
    fn test_exact_code_wins_despite_different_names() {
        let catalog = vec![
            product(1, "מגדל", "מגדל השתלמות כללי", "9604", "השתלמות"),
            product(2, "הראל", "הראל גמל מניות", "1234", "גמל"),
        ];
        let m = find_matching_saving_product(holding("חברה אחרת", "שם שונה", "1234", ""), &catalog)
            .expect("exact code should match");
        assert_eq!(m.product.id, 2);
        assert_eq!(m.score, 80);
    }

    #[test]
    fn test_no_signal_returns_none() {
        let catalog = vec![product(1, "מגדל", "מגדל השתלמות כללי", "9604", "השתלמות")];
        assert!(find_matching_saving_product(holding("הראל", "קרן צמיחה", "", ""), &catalog).is_none());
        assert!(find_matching_saving_product(HoldingFields::default(), &catalog).is_none());
    }

    #[test]
    fn test_whitespace_and_case_are_ignored() {
        let catalog = vec![product(1, "בנק הפועלים", "Gemel  Plus", "", "")];
        let m = find_matching_saving_product(holding("בנק  הפועלים", "gemel plus", "", ""), &catalog)
            .expect("normalized names should match");
        // company exact 30 + company key 20 + name exact 25 + two shared words 12
        assert_eq!(m.score, 87);
    }

    #[test]
    fn test_threshold_without_code_is_inclusive() {
        // name exact 25 + one shared word 5 = 30
        let catalog = vec![product(1, "", "קרן", "", "גמל")];
        let m = find_matching_saving_product(holding("", "קרן", "", ""), &catalog);
        assert_eq!(m.map(|m| m.score), Some(30));

        // name exact 25 alone (single-char words never overlap) stays below 30
        let catalog = vec![product(1, "", "א", "", "")];
        assert!(find_matching_saving_product(holding("", "א", "", ""), &catalog).is_none());
    }

    #[test]
    fn test_threshold_with_code_is_inclusive() {
        // partial code 50 + fund type 10 = 60
        let catalog = vec![product(1, "", "", "12345", "גמל")];
        let m = find_matching_saving_product(holding("", "", "1234", "גמל"), &catalog);
        assert_eq!(m.map(|m| m.score), Some(60));

        // partial code 50 alone is below 60 even though it exceeds 30
        let catalog = vec![product(1, "", "", "12345", "")];
        assert!(find_matching_saving_product(holding("", "", "1234", "גמל"), &catalog).is_none());
    }

    #[test]
    fn test_study_fund_types_are_equivalent() {
        assert_eq!(canonical_fund_type("קרן השתלמות"), "השתלמות");
        assert_eq!(canonical_fund_type(" השתלמות לשכירים "), "השתלמות");
        assert_eq!(canonical_fund_type("גמל  להשקעה"), "גמל להשקעה");

        let catalog = vec![product(1, "", "", "12345", "השתלמות לשכירים")];
        let m = find_matching_saving_product(holding("", "", "1234", "קרן השתלמות"), &catalog);
        assert_eq!(m.map(|m| m.score), Some(60));
    }

    #[test]
    fn test_ties_keep_first_row() {
        let catalog = vec![
            product(1, "", "", "5555", ""),
            product(2, "", "", "5555", ""),
        ];
        let m = find_matching_saving_product(holding("", "", "5555", ""), &catalog).unwrap();
        assert_eq!(m.product.id, 1);
    }

    #[test]
    fn test_code_normalization_strips_dashes_and_spaces() {
        let catalog = vec![product(7, "", "", "12-34 5", "")];
        let m = find_matching_saving_product(holding("", "", "12345", ""), &catalog).unwrap();
        assert_eq!(m.product.id, 7);
        assert_eq!(m.score, 80);
    }

    #[test]
    fn test_company_key_prefers_first_long_word() {
        assert_eq!(company_key("אי בי אי ניהול"), "ניהול");
        assert_eq!(company_key("Meitav Dash"), "meitav");
        assert_eq!(company_key("ab cd"), "ab");
        assert_eq!(company_key("   "), "");
    }
}
