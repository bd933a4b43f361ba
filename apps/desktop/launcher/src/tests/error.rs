// Unit tests for error conversion and serialization

use crate::error::LauncherError;

use common::ErrorLocation;

use pipe_core::{PipeBuilder, PipeConfig};

use std::panic::Location;

/// **VALUE**: Verifies that launcher errors serialize for structured logs.
///
/// **BUG THIS CATCHES**: Would catch a non-serializable field sneaking into a variant.
#[test]
fn given_launcher_error_when_serialized_then_contains_variant_and_message() {
    // GIVEN: A Forward error
    let err = LauncherError::Forward {
        message: String::from("Test"),
        location: ErrorLocation::from(Location::caller()),
    };

    // WHEN: Serializing to JSON
    let json = serde_json::to_string(&err).unwrap();

    // THEN: Variant and message are present
    assert!(json.contains("Forward"), "JSON should contain variant name");
    assert!(json.contains("Test"), "JSON should contain message");
}

/// **VALUE**: Verifies that pipe errors keep their text when converted.
#[test]
fn given_pipe_error_when_converted_then_becomes_pipe_variant_with_original_text() {
    // GIVEN: A pipe construction error
    let pipe_err = PipeBuilder::default().build().unwrap_err();
    let text = pipe_err.to_string();

    // WHEN: Converted
    let err = LauncherError::from(pipe_err);

    // THEN: Pipe variant carrying the original message
    match err {
        LauncherError::Pipe { message, .. } => assert_eq!(message, text),
        other => panic!("Expected LauncherError::Pipe, got {other:?}"),
    }
}

/// **VALUE**: Verifies that config errors surface through the Pipe variant.
#[test]
fn given_config_error_when_converted_then_becomes_pipe_variant() {
    // GIVEN: An invalid config
    let config = PipeConfig {
        version: 0,
        ..PipeConfig::default()
    };
    let config_err = config.validate().unwrap_err();

    // WHEN: Converted
    let err = LauncherError::from(config_err);

    // THEN: The display names the config problem
    assert!(matches!(err, LauncherError::Pipe { .. }));
    assert!(err.to_string().contains("Invalid version"), "{err}");
}
