use crate::RedactedToken;

/// **VALUE**: Verifies tokens never leak through `{:?}` or `{}` formatting.
///
/// **WHY THIS MATTERS**: Tokens flow through code that logs request state. A derived
/// Debug impl would print bearer tokens straight into log files.
///
/// **BUG THIS CATCHES**: Would catch someone replacing the manual Debug impl with
/// `#[derive(Debug)]`.
#[test]
fn given_token_when_formatted_then_value_is_redacted() {
    // GIVEN: A token with a recognizable value
    let token = RedactedToken::new("eyJhbGciOiJIUzI1NiJ9.secret");

    // WHEN: Formatting with Debug and Display
    let debug = format!("{token:?}");
    let display = format!("{token}");

    // THEN: Neither output contains the secret
    assert!(!debug.contains("secret"));
    assert!(!display.contains("secret"));
    assert!(debug.contains("REDACTED"));
}

#[test]
fn given_token_when_serialized_then_returns_error() {
    let token = RedactedToken::new("refresh-abc");

    let result = serde_json::to_string(&token);

    assert!(result.is_err(), "Redacted tokens must not serialize");
}

#[test]
fn given_token_when_exposed_then_returns_original_value() {
    let token = RedactedToken::new("access-123");

    assert_eq!(token.expose(), "access-123");
    assert_eq!(token.len(), 10);
    assert!(!token.is_empty());
}

#[test]
fn given_json_string_when_deserialized_then_wraps_token() {
    let token: RedactedToken = serde_json::from_str("\"access-xyz\"").unwrap();

    assert_eq!(token.expose(), "access-xyz");
}
