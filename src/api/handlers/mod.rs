pub mod health;
pub mod otp;
pub mod types;

// common functions for the handlers
use regex::Regex;

/// Strip the separators people type into phone numbers.
pub fn normalize_identity(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect()
}

/// E.164-ish check on an already-normalized phone number.
pub fn valid_identity(identity: &str) -> bool {
    Regex::new(r"^\+?[0-9]{6,15}$").is_ok_and(|regex| regex.is_match(identity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_identity_strips_separators() {
        assert_eq!(normalize_identity(" +1 (555) 123-45.67 "), "+15551234567");
        assert_eq!(normalize_identity("5551234567"), "5551234567");
    }

    #[test]
    fn valid_identity_accepts_phone_numbers() {
        assert!(valid_identity("+15551234567"));
        assert!(valid_identity("555123"));
        assert!(valid_identity("123456789012345"));
    }

    #[test]
    fn valid_identity_rejects_garbage() {
        assert!(!valid_identity(""));
        assert!(!valid_identity("12345"));
        assert!(!valid_identity("1234567890123456"));
        assert!(!valid_identity("++15551234567"));
        assert!(!valid_identity("alice@example.com"));
        assert!(!valid_identity("15551234567+"));
    }
}
