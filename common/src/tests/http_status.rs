use crate::HttpStatusCode;

#[test]
fn given_401_when_checked_then_is_unauthorized() {
    assert!(HttpStatusCode(401).is_unauthorized());
    assert!(HttpStatusCode(401).is_client_error());
    assert!(!HttpStatusCode(403).is_unauthorized());
}

/// **VALUE**: Status 0 is the marker for "no response received".
///
/// **WHY THIS MATTERS**: Network failures are reported with status 0, and callers use
/// `is_no_response()` to tell connectivity loss apart from real HTTP failures.
#[test]
fn given_zero_status_when_checked_then_is_no_response_and_not_an_http_class() {
    let status = HttpStatusCode::NO_RESPONSE;

    assert!(status.is_no_response());
    assert!(!status.is_success());
    assert!(!status.is_client_error());
    assert!(!status.is_server_error());
}

#[test]
fn given_status_ranges_when_classified_then_boundaries_are_respected() {
    assert!(HttpStatusCode(200).is_success());
    assert!(HttpStatusCode(299).is_success());
    assert!(!HttpStatusCode(300).is_success());
    assert!(HttpStatusCode(500).is_server_error());
    assert!(HttpStatusCode(599).is_server_error());
    assert!(!HttpStatusCode(600).is_server_error());
}
