use crate::error::PipeError;
use crate::identity::{resolve, resolve_for_user, sanitize_scope};

/// **VALUE**: Verifies the channel name format.
///
/// **WHY THIS MATTERS**: Every instance of an application must derive the same name,
/// or a second launch will never find the first.
///
/// **BUG THIS CATCHES**: Would catch if name, version or user were dropped from the
/// channel name, letting different versions or users collide.
#[test]
fn given_identity_when_channel_name_derived_then_combines_name_version_and_user() {
    // GIVEN: A resolved identity for a known user
    let identity = resolve_for_user("picard-test", "2.9", "alice").unwrap();

    // WHEN: Deriving the channel name
    let name = identity.channel_name();

    // THEN: Should follow the documented pattern
    assert_eq!(name, "picard-test_v2.9_alice_pipe_file");
}

/// **VALUE**: Verifies that versions and users produce distinct channels.
#[test]
fn given_different_versions_or_users_when_resolved_then_channel_names_differ() {
    let base = resolve_for_user("app", "1.0", "alice").unwrap();
    let other_version = resolve_for_user("app", "1.1", "alice").unwrap();
    let other_user = resolve_for_user("app", "1.0", "bob").unwrap();

    assert_ne!(base.channel_name(), other_version.channel_name());
    assert_ne!(base.channel_name(), other_user.channel_name());
}

/// **VALUE**: Verifies that blank app names and versions are rejected.
///
/// **BUG THIS CATCHES**: Would catch if an empty name produced a pipe file named
/// `_v_user_pipe_file`, shared by every misconfigured application.
#[test]
fn given_blank_app_data_when_resolved_then_returns_invalid_app_data() {
    assert!(matches!(
        resolve("", "1.0"),
        Err(PipeError::InvalidAppData { .. })
    ));
    assert!(matches!(
        resolve("app", "   "),
        Err(PipeError::InvalidAppData { .. })
    ));
}

/// **VALUE**: Verifies that path separators in app data are rejected.
///
/// **WHY THIS MATTERS**: The channel name becomes a file name. A `/` would point the
/// socket at a different directory.
#[test]
fn given_app_name_with_separator_when_resolved_then_returns_invalid_app_data() {
    let result = resolve("../evil", "1.0");

    match result {
        Err(PipeError::InvalidAppData { message, .. }) => {
            assert!(message.contains("App name"), "Should name the field");
        }
        other => panic!("Expected InvalidAppData, got {other:?}"),
    }
}

/// **VALUE**: Verifies that user scopes are reduced to file-name-safe characters.
#[test]
fn given_unsafe_user_scope_when_sanitized_then_only_safe_characters_remain() {
    assert_eq!(sanitize_scope("DOMAIN\\jane doe"), "DOMAIN_jane_doe");
    assert_eq!(sanitize_scope("  "), "default");
    assert_eq!(sanitize_scope("a.b-c_d"), "a.b-c_d");
}
