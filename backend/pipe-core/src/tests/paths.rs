// Tests touching PIPE_CORE_DIR run serially: the environment is process-wide.

use crate::PIPE_DIR_ENV;
use crate::address::paths::{PathSource, candidate_dirs};
use crate::config::PipeConfig;

use std::path::PathBuf;

use serial_test::serial;

/// **VALUE**: Verifies that a configured pipe dir is used exclusively.
///
/// **WHY THIS MATTERS**: Tests and sandboxed installs point the pipe at a private
/// directory. Falling through to the user's runtime dir would make them collide
/// with a real running instance.
#[test]
#[serial]
fn given_config_pipe_dir_when_candidates_listed_then_only_config_dir_returned() {
    // GIVEN: A config with an explicit directory
    let config = PipeConfig {
        pipe_dir: Some(PathBuf::from("/tmp/pipes-from-config")),
        ..PipeConfig::default()
    };

    // WHEN: Listing candidates
    let candidates = candidate_dirs("app", &config);

    // THEN: Exactly that directory, marked as coming from config
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, PathBuf::from("/tmp/pipes-from-config"));
    assert_eq!(candidates[0].source, PathSource::Config);
}

/// **VALUE**: Verifies the environment override.
#[test]
#[serial]
fn given_env_override_when_candidates_listed_then_env_dir_returned() {
    // GIVEN: PIPE_CORE_DIR set
    unsafe { std::env::set_var(PIPE_DIR_ENV, "/tmp/pipes-from-env") };

    // WHEN: Listing candidates with default config
    let candidates = candidate_dirs("app", &PipeConfig::default());

    // THEN: Only the env directory
    unsafe { std::env::remove_var(PIPE_DIR_ENV) };
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].path, PathBuf::from("/tmp/pipes-from-env"));
    assert_eq!(candidates[0].source, PathSource::EnvVar);
}

/// **VALUE**: Verifies that the per-app fallback directory is namespaced by app.
#[test]
#[serial]
fn given_no_overrides_when_candidates_listed_then_app_dir_contains_app_name() {
    // GIVEN: No overrides
    unsafe { std::env::remove_var(PIPE_DIR_ENV) };

    // WHEN: Listing candidates
    let candidates = candidate_dirs("my-app", &PipeConfig::default());

    // THEN: Any app-dir candidate ends with my-app/pipes
    for dir in candidates.iter().filter(|d| d.source == PathSource::AppDir) {
        assert!(dir.path.ends_with("my-app/pipes"), "Got {}", dir.path.display());
    }
}

/// **VALUE**: Verifies that missing pipe directories are created private to the user.
#[cfg(unix)]
#[test]
fn given_missing_dir_when_prepared_then_created_with_owner_only_permissions() {
    use crate::address::paths::prepare_dir;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    // GIVEN: A nested path that does not exist
    let root = tempdir().unwrap();
    let dir = root.path().join("a").join("pipes");

    // WHEN: Preparing it
    prepare_dir(&dir).unwrap();

    // THEN: It exists with mode 0700
    let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
    assert!(dir.is_dir());
    assert_eq!(mode & 0o777, 0o700);
}
