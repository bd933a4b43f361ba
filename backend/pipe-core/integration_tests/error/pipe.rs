use pipe_core::{PipeBuilder, PipeError};

use std::error::Error;
use std::io::{Error as IoError, ErrorKind};

/// **VALUE**: Verifies that construction errors point at the caller's code.
///
/// **WHY THIS MATTERS**: `build` is `#[track_caller]`, so the location in the message
/// should be the line that called it, not somewhere inside the crate.
///
/// **BUG THIS CATCHES**: Would catch a lost `#[track_caller]` that makes every error
/// report the same internal line.
#[test]
fn given_invalid_app_data_when_displayed_then_includes_message_and_caller_location() {
    // GIVEN: A builder error
    let err = PipeBuilder::default()
        .with_app_name("")
        .with_app_version("1.0")
        .build()
        .unwrap_err();

    // WHEN: It is displayed
    let display = err.to_string();

    // THEN: It names the error kind and this file
    assert!(display.starts_with("Invalid App Data Error:"), "{display}");
    assert!(display.contains("pipe.rs"), "{display}");
    assert!(display.contains("integration_tests"), "{display}");
}

#[test]
fn given_invalid_args_when_displayed_then_names_the_offending_position() {
    // GIVEN: An empty argument at position 1
    let err = PipeBuilder::default()
        .with_app_name("app")
        .with_app_version("1.0")
        .with_args(["one.mp3", ""])
        .build()
        .unwrap_err();

    // THEN: The message names position 1
    let display = err.to_string();
    assert!(display.starts_with("Invalid Args Error:"), "{display}");
    assert!(display.contains("Argument 1"), "{display}");
}

/// **VALUE**: Verifies that IO errors keep their source chain.
#[test]
fn given_io_error_when_converted_then_source_is_preserved() {
    // GIVEN: An IO error
    let io = IoError::new(ErrorKind::PermissionDenied, "no access to pipe dir");

    // WHEN: Converted into a PipeError
    let err = PipeError::from(io);

    // THEN: The message and source survive
    assert!(err.to_string().contains("no access to pipe dir"));
    let source = err.source().expect("Io variant should carry a source");
    assert_eq!(
        source.downcast_ref::<IoError>().map(IoError::kind),
        Some(ErrorKind::PermissionDenied)
    );
}
