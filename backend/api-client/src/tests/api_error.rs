use crate::envelope::ErrorBody;
use crate::normalizer::{Failure, normalize};

use std::collections::BTreeMap;

fn validation_error(message: Option<&str>) -> crate::ApiError {
    let mut field_errors = BTreeMap::new();
    field_errors.insert("age".to_string(), vec!["must be positive".to_string()]);
    field_errors.insert(
        "name".to_string(),
        vec!["is required".to_string(), "is too short".to_string()],
    );

    normalize(Failure::Envelope {
        error: ErrorBody {
            title: "Validation Failed".to_string(),
            code: Some("VALIDATION_ERROR".to_string()),
            status: 400,
            details: vec!["Patient could not be saved".to_string()],
            field_errors,
        },
        message: message.map(str::to_string),
    })
}

#[test]
fn given_backend_message_when_display_message_then_prefers_backend_message() {
    let error = validation_error(Some("Check the patient form"));

    assert_eq!(error.display_message(), "Check the patient form");
}

#[test]
fn given_no_backend_message_when_display_message_then_falls_back_to_title() {
    let error = validation_error(None);

    assert_eq!(error.display_message(), "Validation Failed");
}

/// **VALUE**: The full message lists title, details and every field message in order.
///
/// **BUG THIS CATCHES**: Would catch a field with several messages only showing the first.
#[test]
fn given_details_and_field_errors_when_full_message_then_concatenates_all_lines() {
    let error = validation_error(None);

    assert_eq!(
        error.full_message(),
        "Validation Failed\n\
         Patient could not be saved\n\
         age: must be positive\n\
         name: is required\n\
         name: is too short"
    );
}

#[test]
fn given_unknown_field_when_field_error_then_returns_none() {
    let error = validation_error(None);

    assert!(error.has_field_errors());
    assert!(error.field_error("email").is_none());
}

#[test]
fn given_error_when_displayed_then_includes_title_status_and_location() {
    let error = validation_error(None);

    let rendered = error.to_string();

    assert!(rendered.contains("Validation Failed"));
    assert!(rendered.contains("HTTP 400"));
    assert!(rendered.contains("api_error.rs"));
}
