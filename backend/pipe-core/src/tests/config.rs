use crate::config::PipeConfig;
use crate::error::ConfigError;

use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;

/// **VALUE**: Verifies that a missing config file yields defaults.
///
/// **WHY THIS MATTERS**: First launch never has a config file. Startup must not fail
/// because of it.
#[test]
fn given_missing_config_file_when_loaded_then_returns_defaults() {
    // GIVEN: An empty directory
    let dir = tempdir().unwrap();

    // WHEN: Loading
    let config = PipeConfig::load(dir.path()).unwrap();

    // THEN: Should equal the defaults
    assert_eq!(config, PipeConfig::default());
    assert_eq!(config.poll_window(), Duration::from_millis(10));
    assert_eq!(config.send_retry_budget(), Duration::from_millis(6_500));
}

/// **VALUE**: Verifies that a saved config loads back unchanged.
///
/// **BUG THIS CATCHES**: Would catch a serde rename or a missing field default that
/// silently resets a user's pipe directory.
#[test]
fn given_saved_config_when_loaded_then_values_survive() {
    // GIVEN: A customised config saved to disk
    let dir = tempdir().unwrap();
    let config = PipeConfig {
        pipe_dir: Some(PathBuf::from("/run/user/1000/custom")),
        poll_window_ms: 25,
        ..PipeConfig::default()
    };
    config.save(dir.path()).unwrap();

    // WHEN: Loading it again
    let loaded = PipeConfig::load(dir.path()).unwrap();

    // THEN: Should be identical, and no temp file should be left behind
    assert_eq!(loaded, config);
    assert!(!dir.path().join("pipe.json.tmp").exists());
}

/// **VALUE**: Verifies that a partial file fills the gaps with defaults.
#[test]
fn given_partial_config_file_when_loaded_then_missing_fields_use_defaults() {
    // GIVEN: A file that only sets the poll window
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pipe.json"), r#"{ "poll_window_ms": 50 }"#).unwrap();

    // WHEN: Loading
    let config = PipeConfig::load(dir.path()).unwrap();

    // THEN: The given field is honoured, the rest are defaults
    assert_eq!(config.poll_window_ms, 50);
    assert_eq!(config.write_timeout_ms, PipeConfig::default().write_timeout_ms);
}

/// **VALUE**: Verifies that a corrupt file is reported instead of silently ignored.
#[test]
fn given_corrupt_config_file_when_loaded_then_returns_parse_error() {
    // GIVEN: Invalid JSON on disk
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pipe.json"), "{ not json").unwrap();

    // WHEN: Loading
    let result = PipeConfig::load(dir.path());

    // THEN: Should be a parse error naming the file
    match result {
        Err(ConfigError::Parse { path, .. }) => assert!(path.ends_with("pipe.json")),
        other => panic!("Expected Parse error, got {other:?}"),
    }
}

/// **VALUE**: Verifies range validation.
///
/// **WHY THIS MATTERS**: A huge poll window would turn the non-blocking read into a
/// blocking one.
#[test]
fn given_out_of_range_values_when_validated_then_returns_validation_error() {
    let too_slow = PipeConfig {
        poll_window_ms: 5_000,
        ..PipeConfig::default()
    };
    let bad_version = PipeConfig {
        version: 0,
        ..PipeConfig::default()
    };
    let no_ttl = PipeConfig {
        pending_connection_ttl_ms: 0,
        ..PipeConfig::default()
    };

    assert!(matches!(
        too_slow.validate(),
        Err(ConfigError::Validation { .. })
    ));
    assert!(matches!(
        bad_version.validate(),
        Err(ConfigError::Validation { .. })
    ));
    assert!(matches!(
        no_ttl.validate(),
        Err(ConfigError::Validation { .. })
    ));
}

/// **VALUE**: Verifies that saving an invalid config is refused before touching disk.
#[test]
fn given_invalid_config_when_saved_then_nothing_is_written() {
    // GIVEN: An invalid config
    let dir = tempdir().unwrap();
    let config = PipeConfig {
        write_timeout_ms: 0,
        ..PipeConfig::default()
    };

    // WHEN: Saving
    let result = config.save(dir.path());

    // THEN: Should fail and leave no file
    assert!(result.is_err());
    assert!(!dir.path().join("pipe.json").exists());
}
