//! Phone number helpers.
//!
//! Providers are inconsistent about the North American country code, so
//! matching is done on a loosely normalized form.

/// Strip one leading `+`, then one leading `1`.
pub fn normalize(number: &str) -> &str {
    let number = number.strip_prefix('+').unwrap_or(number);
    number.strip_prefix('1').unwrap_or(number)
}

/// Loose equality: equal after normalization, or one is a suffix of the other.
///
/// An empty normalized number never matches anything.
pub fn numbers_match(reported: &str, stored: &str) -> bool {
    let reported = normalize(reported);
    let stored = normalize(stored);
    if reported.is_empty() || stored.is_empty() {
        return false;
    }
    reported == stored || reported.ends_with(stored) || stored.ends_with(reported)
}

/// A dialable number: digits only once `+ - ( )` and spaces are removed, at least 10 of them.
pub fn is_valid_phone_number(number: &str) -> bool {
    let cleaned: String = number
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect();
    cleaned.len() >= 10 && cleaned.chars().all(|c| c.is_ascii_digit())
}

/// A DID as entered in configuration: bare digits, at least 10.
pub fn is_valid_did(did: &str) -> bool {
    let did = did.trim();
    did.len() >= 10 && did.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_plus_then_one() {
        assert_eq!(normalize("+15551234567"), "5551234567");
        assert_eq!(normalize("15551234567"), "5551234567");
        assert_eq!(normalize("5551234567"), "5551234567");
        // only a single leading 1 is removed
        assert_eq!(normalize("+115551234567"), "15551234567");
    }

    #[test]
    fn country_code_variants_match() {
        assert!(numbers_match("+15551234567", "5551234567"));
        assert!(numbers_match("15551234567", "5551234567"));
        assert!(numbers_match("5551234567", "+15551234567"));
        assert!(numbers_match("+445551234567", "5551234567"));
    }

    #[test]
    fn different_numbers_do_not_match() {
        assert!(!numbers_match("+16045551234", "5551234567"));
        assert!(!numbers_match("", "5551234567"));
        assert!(!numbers_match("+1", "5551234567"));
    }

    #[test]
    fn recipient_validation() {
        assert!(is_valid_phone_number("+1 (555) 123-4567"));
        assert!(is_valid_phone_number("5551234567"));
        assert!(!is_valid_phone_number("555-1234"));
        assert!(!is_valid_phone_number("555123456x"));
        assert!(!is_valid_phone_number(""));
    }

    #[test]
    fn did_validation() {
        assert!(is_valid_did("5551234567"));
        assert!(is_valid_did(" 15551234567 "));
        assert!(!is_valid_did("+15551234567"));
        assert!(!is_valid_did("555123"));
    }
}
