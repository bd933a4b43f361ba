// Unit tests for logger initialization
// Only failure paths touch initialize_internal, so no global logger is installed twice

use crate::error::LauncherError;
use crate::logger::{initialize, initialize_internal};

use tempfile::tempdir;

/// **VALUE**: Verifies that calling initialize() repeatedly never fails.
///
/// **WHY THIS MATTERS**: The binary and tests may both initialize logging. A second
/// call that errors or panics would crash startup.
///
/// **BUG THIS CATCHES**: Would catch removal of the Once/AtomicBool guards, which
/// makes fern fail when a global logger is set twice.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let dir = tempdir().unwrap();

    // WHEN: Calling initialize twice
    let first = initialize(dir.path());
    let second = initialize(dir.path());

    // THEN: Both return Ok
    assert!(first.is_ok(), "First initialization should succeed");
    assert!(second.is_ok(), "Second initialization should be a no-op");
}

/// **VALUE**: Verifies that an unusable log directory is reported, not panicked on.
///
/// **BUG THIS CATCHES**: Would catch if `fern::log_file()` were unwrapped.
#[cfg(unix)]
#[test]
fn given_invalid_log_dir_when_initializing_then_returns_launcher_error() {
    // GIVEN: A directory path beneath a device file
    let invalid_dir = std::path::PathBuf::from("/dev/null/invalid-path");

    // WHEN: Building the dispatch for it
    let result = initialize_internal(&invalid_dir);

    // THEN: A Launcher error naming the log file
    match result {
        Err(LauncherError::Launcher { message, .. }) => {
            assert!(message.contains("launcher.log"), "{message}");
        }
        other => panic!("Expected LauncherError::Launcher, got {other:?}"),
    }
}
