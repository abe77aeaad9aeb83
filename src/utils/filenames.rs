//! File names used inside a client's export directory.

fn is_hebrew(c: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&c)
}

/// Keeps letters, digits and Hebrew characters; everything else becomes `_`.
pub fn safe_name(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || is_hebrew(c) { c } else { '_' })
        .collect()
}

/// ASCII-only variant used in `Content-Disposition` headers and advice PDFs.
pub fn ascii_safe_name(input: &str) -> String {
    safe_name(input)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

pub fn client_dir_name(client_id: i64, first_name: Option<&str>, last_name: Option<&str>) -> String {
    format!(
        "{}_{}_{}",
        client_id,
        safe_name(first_name.unwrap_or("")),
        safe_name(last_name.unwrap_or(""))
    )
}

pub fn advice_pdf_name(client_id: i64, full_name: &str) -> String {
    let ascii = ascii_safe_name(full_name);
    let stem = if ascii.trim_matches('_').is_empty() {
        format!("client_{}", client_id)
    } else {
        ascii
    };
    format!("justification_{}.pdf", stem)
}

pub fn b1_generated_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    let name = format!("{} {}", first_name.unwrap_or(""), last_name.unwrap_or(""));
    format!("יפוי כח עבור {}.pdf", name.trim())
}

pub const B1_EDITED: &str = "b1_edited.pdf";
pub const CLIENT_SIGNATURE: &str = "client_signature.png";

pub fn kit_generated_name(client_id: i64, new_product_id: i64) -> String {
    format!("kit_{}_{}.pdf", client_id, new_product_id)
}

pub fn kit_edited_name(new_product_id: i64) -> String {
    format!("kit_{}_edited.pdf", new_product_id)
}

pub fn packet_name(client_id: i64) -> String {
    format!("packet_{}.pdf", client_id)
}

pub fn packet_edited_name(client_id: i64) -> String {
    format!("packet_{}_edited.pdf", client_id)
}

pub fn packet_signed_name(client_id: i64) -> String {
    format!("packet_{}_signed_client.pdf", client_id)
}

/// Download name for a client document, falling back to the numeric id.
pub fn download_name(prefix: &str, id_number: &str, client_id: i64, suffix: &str) -> String {
    let ascii = ascii_safe_name(id_number);
    let key = if ascii.trim_matches('_').is_empty() {
        client_id.to_string()
    } else {
        ascii
    };
    format!("{}_{}{}.pdf", prefix, key, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_keeps_hebrew() {
        assert_eq!(safe_name("ישראל ישראלי"), "ישראל_ישראלי");
        assert_eq!(safe_name("O'Brien"), "O_Brien");
    }

    #[test]
    fn test_client_dir_name() {
        assert_eq!(client_dir_name(7, Some("דנה"), Some("לוי")), "7_דנה_לוי");
        assert_eq!(client_dir_name(7, None, None), "7__");
    }

    #[test]
    fn test_advice_pdf_name_falls_back_to_id() {
        assert_eq!(advice_pdf_name(3, "John Smith"), "justification_John_Smith.pdf");
        assert_eq!(advice_pdf_name(3, "דנה לוי"), "justification_client_3.pdf");
    }

    #[test]
    fn test_document_names() {
        assert_eq!(b1_generated_name(Some("דנה"), Some("לוי")), "יפוי כח עבור דנה לוי.pdf");
        assert_eq!(kit_generated_name(4, 9), "kit_4_9.pdf");
        assert_eq!(packet_edited_name(4), "packet_4_edited.pdf");
        assert_eq!(download_name("packet", "012345678", 4, "_signed_client"), "packet_012345678_signed_client.pdf");
        assert_eq!(download_name("b1", "", 4, ""), "b1_4.pdf");
    }
}
