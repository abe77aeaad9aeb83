/// National ids have at most nine digits.
pub const MAX_ID_DIGITS: usize = 9;

/// Canonical form of an Israeli national id as stored in `client.id_number`.
///
/// Keeps digits only, drops leading zeros, then trims trailing zeros that
/// provider exports pad onto the value: while longer than 8 digits a trailing
/// zero is dropped, and an 8-digit value ending in zero loses that zero.
/// Returns an empty string when nothing usable remains.
pub fn normalize_id_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let mut value = digits.trim_start_matches('0').to_string();

    while value.len() > 8 && value.ends_with('0') {
        value.pop();
    }
    if value.len() == 8 && value.ends_with('0') {
        value.pop();
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_plain_ids() {
        assert_eq!(normalize_id_number("123456782"), "123456782");
        assert_eq!(normalize_id_number("1234567"), "1234567");
    }

    #[test]
    fn test_strips_non_digits_and_leading_zeros() {
        assert_eq!(normalize_id_number(" 012-345-678 "), "12345678");
        assert_eq!(normalize_id_number("000123"), "123");
    }

    #[test]
    fn test_trims_padding_zeros() {
        assert_eq!(normalize_id_number("1234567800"), "12345678");
        assert_eq!(normalize_id_number("12345670"), "1234567");
    }

    #[test]
    fn test_empty_when_no_digits() {
        assert_eq!(normalize_id_number("abc"), "");
        assert_eq!(normalize_id_number("0000"), "");
    }
}
