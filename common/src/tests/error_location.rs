use crate::ErrorLocation;
use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation::from()` captures file, line, and column.
///
/// **WHY THIS MATTERS**: Every pipe, config and launcher error embeds an ErrorLocation.
/// If it records garbage, a failed startup on a user's machine cannot be traced back
/// to the code that produced it.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - `Location::caller()` stops being propagated correctly
/// - File path extraction breaks
/// - Line/column capture fails
#[test]
fn given_location_caller_when_error_location_created_then_captures_file_line_column() {
    // GIVEN: Current caller location
    // WHEN: Creating ErrorLocation from caller
    let location = ErrorLocation::from(Location::caller());

    // THEN: Should capture this file and a non-zero column
    assert!(
        location.file.contains("error_location.rs"),
        "Should capture file path"
    );
    assert!(location.line > 0, "Should capture a line number");
    assert!(location.column > 0, "Should capture column number");
}

/// **VALUE**: Verifies that ErrorLocation Display produces the bracketed format.
///
/// **WHY THIS MATTERS**: Error messages end with the location. A format change would
/// make log lines from the pipe layer unreadable or ambiguous.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Display implementation drops the brackets
/// - File path, line, or column are missing from output
/// - The number of separators changes
#[test]
#[track_caller]
fn given_error_location_when_formatted_then_produces_bracketed_format() {
    // GIVEN: An ErrorLocation
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Formatting as string
    let formatted = format!("{}", location);

    // THEN: Should produce "[file:line:column]" format
    assert!(formatted.starts_with('['), "Should start with '['");
    assert!(formatted.ends_with(']'), "Should end with ']'");
    assert!(
        formatted.contains(&location.line.to_string()),
        "Should include line number"
    );
    assert!(
        formatted.contains(&location.column.to_string()),
        "Should include column number"
    );
    assert_eq!(
        formatted.matches(':').count(),
        2,
        "Should have exactly 2 colons"
    );
}

/// **VALUE**: Verifies that `#[track_caller]` propagation gives each call site its own line.
///
/// **WHY THIS MATTERS**: The pipe crate builds errors inside helper functions marked
/// `#[track_caller]`. If propagation breaks, every error would point at the helper.
///
/// **BUG THIS CATCHES**: Would catch if someone removes `#[track_caller]` from a helper
/// or location propagation breaks in refactoring.
#[test]
fn given_multiple_call_sites_when_capturing_location_then_each_has_unique_line() {
    // GIVEN: A helper function that captures location
    #[track_caller]
    fn capture_location() -> ErrorLocation {
        ErrorLocation::from(Location::caller())
    }

    // WHEN: Capturing location from different call sites
    let loc1 = capture_location();
    let loc2 = capture_location();

    // THEN: Should have same file but sequential line numbers
    assert_eq!(loc1.file, loc2.file, "Should have same file");
    assert_eq!(loc1.line + 1, loc2.line, "Lines should be sequential");
}
