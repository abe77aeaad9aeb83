//! Provider (managing company) codes as they appear in CRM balance imports.

const SOURCE_DISPLAY_NAMES: &[(&str, &str)] = &[
    ("AS", "אלטשולר-שחם"),
    ("ANLST", "אנליסט"),
    ("YL", "ילין לפידות"),
    ("DASH", "מיטב-דש"),
    ("FNX", "הפניקס"),
    ("MOR", "מור"),
    ("NFTY", "אינפיניטי"),
];

const COMPANY_CODE_ALIASES: &[(&str, &str)] = &[
    ("fnx", "FNX"),
    ("as", "AS"),
    ("ds", "DASH"),
    ("dash", "DASH"),
    ("anlst", "ANLST"),
    ("yl", "YL"),
    ("mor", "MOR"),
    ("nfty", "NFTY"),
];

/// Hebrew display name for a source code; unknown codes are returned as given.
pub fn display_name(source: &str) -> String {
    let key = source.trim().to_uppercase();
    SOURCE_DISPLAY_NAMES
        .iter()
        .find(|(code, _)| *code == key)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| source.to_string())
}

pub fn normalize_company_code(raw: &str) -> String {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    COMPANY_CODE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, code)| code.to_string())
        .unwrap_or_else(|| trimmed.to_uppercase())
}

/// Company code taken from an upload filename such as `fnx_2024_05.csv`.
pub fn company_code_from_filename(filename: &str) -> Option<String> {
    let stem = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let prefix = stem
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .trim();
    if prefix.is_empty() {
        None
    } else {
        Some(normalize_company_code(prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_lookup_is_case_insensitive() {
        assert_eq!(display_name("fnx"), "הפניקס");
        assert_eq!(display_name("DASH"), "מיטב-דש");
        assert_eq!(display_name("XYZ"), "XYZ");
    }

    #[test]
    fn test_company_code_aliases() {
        assert_eq!(normalize_company_code(" ds "), "DASH");
        assert_eq!(normalize_company_code("Mor"), "MOR");
        assert_eq!(normalize_company_code("clal"), "CLAL");
    }

    #[test]
    fn test_company_code_from_filename() {
        assert_eq!(company_code_from_filename("fnx_2024_05.csv"), Some("FNX".to_string()));
        assert_eq!(company_code_from_filename("uploads/ds-may.csv"), Some("DASH".to_string()));
        assert_eq!(company_code_from_filename("_report.csv"), None);
    }
}
