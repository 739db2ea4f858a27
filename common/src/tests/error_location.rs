use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies captured locations point at the caller's file.
///
/// **BUG THIS CATCHES**: Would catch if `ErrorLocation::from` started recording the
/// position inside this crate instead of the code that raised the error.
#[test]
fn given_caller_location_when_converted_then_records_file_and_line() {
    // GIVEN / WHEN: A location captured at this call site
    let location = ErrorLocation::from(Location::caller());

    // THEN: It points at this test file with a real line number
    assert!(location.file.ends_with("error_location.rs"));
    assert!(location.line > 0);
}

#[test]
fn given_location_when_displayed_then_uses_bracketed_file_line_column() {
    let location = ErrorLocation {
        file: "src/pipeline.rs",
        line: 42,
        column: 7,
    };

    assert_eq!(location.to_string(), "[src/pipeline.rs:42:7]");
}
