use crate::pipe::helpers::{builder, test_config, unique_app_name};

use pipe_core::{MESSAGE_TO_IGNORE, NO_RESPONSE_MESSAGE, PipeBuilder, PipeConfig, PipeError};

use tempfile::tempdir;

/// **VALUE**: Verifies that arguments that cannot be delivered are rejected up front.
///
/// **WHY THIS MATTERS**: An argument equal to a sentinel would be swallowed by the
/// receiver. An empty one is refused by send. Failing at construction tells the
/// caller immediately instead of losing the argument silently.
///
/// **BUG THIS CATCHES**: Would catch if undeliverable args slipped through and the
/// second instance exited believing it had forwarded them.
#[test]
fn given_undeliverable_args_when_built_then_returns_invalid_args() {
    let dir = tempdir().unwrap();
    let app = unique_app_name();

    for bad in ["", MESSAGE_TO_IGNORE, NO_RESPONSE_MESSAGE, "a\0b"] {
        // GIVEN: Args containing one undeliverable value
        let result = builder(&app, dir.path())
            .with_args(["ok.mp3", bad])
            .build();

        // THEN: Construction fails with InvalidArgs
        assert!(
            matches!(result, Err(PipeError::InvalidArgs { .. })),
            "Expected InvalidArgs for {bad:?}, got {result:?}"
        );
    }
}

/// **VALUE**: Verifies that identity data is validated before any resource is touched.
#[test]
fn given_bad_app_data_when_built_then_returns_invalid_app_data() {
    let dir = tempdir().unwrap();

    let cases = [
        ("", "1.0"),
        ("   ", "1.0"),
        ("app", ""),
        ("a/b", "1.0"),
        ("app", "1\\0"),
    ];

    for (name, version) in cases {
        // GIVEN: An invalid name or version
        let result = PipeBuilder::default()
            .with_app_name(name)
            .with_app_version(version)
            .with_config(test_config(dir.path()))
            .build();

        // THEN: Construction fails with InvalidAppData
        assert!(
            matches!(result, Err(PipeError::InvalidAppData { .. })),
            "Expected InvalidAppData for ({name:?}, {version:?}), got {result:?}"
        );
    }

    // AND: Nothing was created in the pipe directory
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// **VALUE**: Verifies that the builder demands both identity fields.
#[test]
fn given_builder_without_version_when_built_then_returns_invalid_app_data() {
    // GIVEN: A builder with a name but no version
    let result = PipeBuilder::default().with_app_name("app").build();

    // THEN: InvalidAppData
    assert!(matches!(result, Err(PipeError::InvalidAppData { .. })));
}

/// **VALUE**: Verifies that a bad config is reported as a config error.
#[test]
fn given_invalid_config_when_built_then_returns_config_error() {
    // GIVEN: A config with a zero write timeout
    let dir = tempdir().unwrap();
    let config = PipeConfig {
        write_timeout_ms: 0,
        ..test_config(dir.path())
    };

    // WHEN: Building with it
    let result = PipeBuilder::default()
        .with_app_name(unique_app_name())
        .with_app_version("1.0")
        .with_config(config)
        .build();

    // THEN: The config error surfaces
    assert!(matches!(result, Err(PipeError::Config(_))));
}

/// **VALUE**: Verifies that the simple constructor validates like the builder.
#[test]
fn given_reserved_arg_when_using_new_then_returns_invalid_args() {
    // GIVEN / WHEN: A reserved argument through Pipe::new
    let result = pipe_core::Pipe::new(
        &unique_app_name(),
        "1.0",
        Some(vec![NO_RESPONSE_MESSAGE.to_string()]),
        None,
    );

    // THEN: InvalidArgs, before any address is resolved
    assert!(matches!(result, Err(PipeError::InvalidArgs { .. })));
}
