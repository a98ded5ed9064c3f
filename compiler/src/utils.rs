use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

/// Schema and field names follow the usual identifier rules.
pub fn is_identifier(text: &str) -> bool {
    IDENTIFIER.is_match(text)
}

#[test]
fn identifiers() {
    assert!(is_identifier("version"));
    assert!(is_identifier("_reserved2"));
    assert!(!is_identifier("2fast"));
    assert!(!is_identifier("user-id"));
    assert!(!is_identifier(""));
}
