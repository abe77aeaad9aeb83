use chrono::{Datelike, NaiveDate};

pub fn default_birth_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Accepts `YYYY-MM-DD` (an ISO timestamp prefix also works) or `YYYY-MM`,
/// which resolves to the first day of the month.
pub fn parse_snapshot_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if let Some(date) = value
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    {
        return Some(date);
    }
    if value.len() == 7 {
        return NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").ok();
    }
    None
}

/// Birth dates fall back to 1970-01-01 when missing or unparsable.
pub fn parse_birth_date(raw: Option<&str>) -> NaiveDate {
    raw.and_then(|v| {
        let v = v.trim();
        v.get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    })
    .unwrap_or_else(default_birth_date)
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snapshot_date_formats() {
        let may = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(parse_snapshot_date("2024-05"), Some(may));
        assert_eq!(parse_snapshot_date("2024-05-01"), Some(may));
        assert_eq!(parse_snapshot_date("2024-05-01T10:00:00"), Some(may));
        assert_eq!(parse_snapshot_date("05/2024"), None);
        assert_eq!(parse_snapshot_date(""), None);
    }

    #[test]
    fn test_parse_birth_date_defaults() {
        assert_eq!(parse_birth_date(None), default_birth_date());
        assert_eq!(parse_birth_date(Some("not a date")), default_birth_date());
        assert_eq!(
            parse_birth_date(Some("1985-03-14")),
            NaiveDate::from_ymd_opt(1985, 3, 14).unwrap()
        );
    }

    #[test]
    fn test_month_key() {
        assert_eq!(month_key(NaiveDate::from_ymd_opt(2023, 1, 31).unwrap()), "2023-01");
    }
}
