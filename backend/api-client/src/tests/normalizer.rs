// Unit tests for response classification and error normalization.
// Every failure shape must produce an ApiError with a title and a defined status.

use crate::envelope::ErrorBody;
use crate::normalizer::{
    Failure, NETWORK_ERROR_CODE, NETWORK_ERROR_TITLE, REQUEST_FAILED_CODE, REQUEST_FAILED_TITLE,
    classify_response, normalize,
};

use common::HttpStatusCode;

use std::collections::BTreeMap;

use serde_json::json;

fn body(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

// ============================================
// NORMALIZE
// ============================================

/// **VALUE**: Envelope failures are copied through verbatim.
///
/// **WHY THIS MATTERS**: Forms highlight inputs from `field_errors` and toasts show
/// the backend's message. Losing or reordering either breaks the UI silently.
///
/// **BUG THIS CATCHES**: Would catch if normalization dropped details, rewrote the
/// status, or collapsed field error lists.
#[test]
fn given_envelope_failure_when_normalized_then_fields_are_copied_verbatim() {
    // GIVEN: A validation failure from the backend
    let mut field_errors = BTreeMap::new();
    field_errors.insert(
        "email".to_string(),
        vec!["is required".to_string(), "must be valid".to_string()],
    );
    let failure = Failure::Envelope {
        error: ErrorBody {
            title: "Validation Failed".to_string(),
            code: Some("VALIDATION_ERROR".to_string()),
            status: 422,
            details: vec!["2 fields are invalid".to_string()],
            field_errors,
        },
        message: Some("Please fix the highlighted fields".to_string()),
    };

    // WHEN: Normalizing
    let error = normalize(failure);

    // THEN: Everything survives unchanged
    assert_eq!(error.title(), "Validation Failed");
    assert_eq!(error.code(), Some("VALIDATION_ERROR"));
    assert_eq!(error.http_status(), HttpStatusCode(422));
    assert_eq!(error.details(), ["2 fields are invalid".to_string()]);
    assert_eq!(
        error.field_error("email").unwrap(),
        ["is required".to_string(), "must be valid".to_string()]
    );
    assert_eq!(error.backend_message(), Some("Please fix the highlighted fields"));
}

#[test]
fn given_transport_failure_when_normalized_then_is_network_error_with_status_zero() {
    let error = normalize(Failure::Transport {
        message: "error sending request: connection refused".to_string(),
    });

    assert_eq!(error.title(), NETWORK_ERROR_TITLE);
    assert_eq!(error.code(), Some(NETWORK_ERROR_CODE));
    assert_eq!(error.http_status(), HttpStatusCode(0));
    assert_eq!(error.details().len(), 1);
    assert!(error.is_network_error());
}

#[test]
fn given_unformatted_failure_when_normalized_then_is_request_failed_with_real_status() {
    let error = normalize(Failure::Unformatted {
        status: HttpStatusCode(502),
        message: "Request failed with status code 502".to_string(),
    });

    assert_eq!(error.title(), REQUEST_FAILED_TITLE);
    assert_eq!(error.code(), Some(REQUEST_FAILED_CODE));
    assert_eq!(error.http_status(), HttpStatusCode(502));
    assert_eq!(
        error.details(),
        ["Request failed with status code 502".to_string()]
    );
}

// ============================================
// CLASSIFY
// ============================================

#[test]
fn given_success_envelope_when_classified_then_returns_envelope() {
    let raw = body(json!({"success": true, "message": "ok", "value": {"id": 7}}));

    let envelope = classify_response(HttpStatusCode(200), &raw).unwrap();

    assert!(envelope.success);
    assert_eq!(envelope.value, Some(json!({"id": 7})));
    assert_eq!(envelope.message.as_deref(), Some("ok"));
}

#[test]
fn given_error_envelope_when_classified_then_returns_envelope_failure() {
    let raw = body(json!({
        "success": false,
        "message": "Session expired",
        "error": {"title": "Unauthorized", "code": "TOKEN_EXPIRED", "status": 401}
    }));

    let failure = classify_response(HttpStatusCode(401), &raw).unwrap_err();

    match failure {
        Failure::Envelope { error, message } => {
            assert_eq!(error.status, 401);
            assert_eq!(error.code.as_deref(), Some("TOKEN_EXPIRED"));
            assert!(error.details.is_empty());
            assert!(error.field_errors.is_empty());
            assert_eq!(message.as_deref(), Some("Session expired"));
        }
        other => panic!("Expected envelope failure, got {other:?}"),
    }
}

/// **VALUE**: A proxy's HTML error page must still normalize cleanly.
///
/// **BUG THIS CATCHES**: Would catch a JSON parse error escaping as a different
/// error type, or the real status being replaced.
#[test]
fn given_html_gateway_error_when_classified_then_returns_unformatted_with_status() {
    // GIVEN: A 504 with a non-JSON body
    let raw = b"<html><body>504 Gateway Time-out</body></html>";

    // WHEN: Classifying
    let failure = classify_response(HttpStatusCode(504), raw).unwrap_err();

    // THEN: Unformatted, with the axios-style detail text
    assert_eq!(
        failure,
        Failure::Unformatted {
            status: HttpStatusCode(504),
            message: "Request failed with status code 504".to_string(),
        }
    );
}

#[test]
fn given_empty_body_with_401_when_classified_then_keeps_unauthorized_status() {
    let failure = classify_response(HttpStatusCode(401), b"").unwrap_err();

    let error = normalize(failure);
    assert!(error.is_unauthorized());
    assert_eq!(error.title(), REQUEST_FAILED_TITLE);
}

#[test]
fn given_success_false_without_error_object_when_classified_then_is_unformatted() {
    let raw = body(json!({"success": false, "message": "Something went wrong"}));

    let failure = classify_response(HttpStatusCode(200), &raw).unwrap_err();

    assert_eq!(
        failure,
        Failure::Unformatted {
            status: HttpStatusCode(200),
            message: "Something went wrong".to_string(),
        }
    );
}

#[test]
fn given_2xx_with_non_envelope_body_when_classified_then_is_unformatted() {
    let raw = body(json!([1, 2, 3]));

    let failure = classify_response(HttpStatusCode(200), &raw).unwrap_err();

    assert!(matches!(
        failure,
        Failure::Unformatted { status, .. } if status == HttpStatusCode(200)
    ));
}

/// **VALUE**: Optional error fields sent as `null` read as empty.
///
/// **WHY THIS MATTERS**: Backends that declare `details` and `field_errors` optional
/// often serialize them as `null` instead of omitting them.
///
/// **BUG THIS CATCHES**: Would catch a `null` failing the envelope parse, which turns
/// a well-formed validation failure into a generic `REQUEST_FAILED` and drops the
/// backend's title, code and field errors.
#[test]
fn given_error_envelope_with_null_optional_fields_when_classified_then_fields_survive() {
    // GIVEN: `details` null, `field_errors` present
    let raw = body(json!({
        "success": false,
        "message": null,
        "error": {
            "title": "Validation Error",
            "code": "VALIDATION_ERROR",
            "status": 422,
            "details": null,
            "field_errors": {"email": ["taken"]}
        }
    }));

    // WHEN: Classifying and normalizing
    let error = normalize(classify_response(HttpStatusCode(422), &raw).unwrap_err());

    // THEN: The backend error is copied through
    assert_eq!(error.title(), "Validation Error");
    assert_eq!(error.code(), Some("VALIDATION_ERROR"));
    assert_eq!(error.http_status(), HttpStatusCode(422));
    assert!(error.details().is_empty());
    assert_eq!(error.field_error("email").unwrap(), ["taken".to_string()]);
}

#[test]
fn given_error_envelope_with_null_field_errors_when_classified_then_field_errors_empty() {
    let raw = body(json!({
        "success": false,
        "error": {
            "title": "Conflict",
            "code": "DUPLICATE",
            "status": 409,
            "details": ["Already exists"],
            "field_errors": null
        }
    }));

    let error = normalize(classify_response(HttpStatusCode(409), &raw).unwrap_err());

    assert_eq!(error.code(), Some("DUPLICATE"));
    assert_eq!(error.details(), ["Already exists".to_string()]);
    assert!(!error.has_field_errors());
}
