//! Identity resolution.
//!
//! The channel name combines application name, version and user so that two
//! versions, or two users on one machine, never contend for the same pipe.

use crate::PIPE_FILE_SUFFIX;
use crate::error::PipeError;

use common::ErrorLocation;

use std::env;
use std::panic::Location;

const USER_ENV_VARS: [&str; 3] = ["USER", "USERNAME", "LOGNAME"];
const DEFAULT_USER_SCOPE: &str = "default";
const FORBIDDEN_CHARS: [char; 3] = ['/', '\\', '\0'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeIdentity {
    app_name: String,
    app_version: String,
    user_scope: String,
}

impl PipeIdentity {
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_version(&self) -> &str {
        &self.app_version
    }

    pub fn user_scope(&self) -> &str {
        &self.user_scope
    }

    /// Deterministic channel name, e.g. `picard_v2.9_alice_pipe_file`.
    pub fn channel_name(&self) -> String {
        format!(
            "{}_v{}_{}{PIPE_FILE_SUFFIX}",
            self.app_name, self.app_version, self.user_scope
        )
    }
}

/// Resolve the identity for the current user.
///
/// # Errors
///
/// Returns [`PipeError::InvalidAppData`] if `app_name` or `app_version` is
/// blank or contains a path separator or NUL.
#[track_caller]
pub fn resolve(app_name: &str, app_version: &str) -> Result<PipeIdentity, PipeError> {
    resolve_for_user(app_name, app_version, &current_user_scope())
}

/// Resolve the identity for an explicit user or session scope.
///
/// The scope is sanitised; an empty scope falls back to `default`.
#[track_caller]
pub fn resolve_for_user(
    app_name: &str,
    app_version: &str,
    user_scope: &str,
) -> Result<PipeIdentity, PipeError> {
    validate_app_field("App name", app_name)?;
    validate_app_field("App version", app_version)?;

    Ok(PipeIdentity {
        app_name: app_name.to_string(),
        app_version: app_version.to_string(),
        user_scope: sanitize_scope(user_scope),
    })
}

#[track_caller]
fn validate_app_field(field: &str, value: &str) -> Result<(), PipeError> {
    if value.trim().is_empty() {
        return Err(PipeError::InvalidAppData {
            message: format!("{field} cannot be empty"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    if let Some(bad) = value.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(PipeError::InvalidAppData {
            message: format!("{field} contains forbidden character {bad:?}: {value:?}"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(())
}

pub(crate) fn current_user_scope() -> String {
    USER_ENV_VARS
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_USER_SCOPE.to_string())
}

pub(crate) fn sanitize_scope(raw: &str) -> String {
    let sanitized: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        DEFAULT_USER_SCOPE.to_string()
    } else {
        sanitized
    }
}
