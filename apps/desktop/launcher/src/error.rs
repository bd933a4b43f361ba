use common::ErrorLocation;

use pipe_core::{ConfigError, PipeError};

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the launcher binary.
///
/// Pipe and config errors are flattened to their display text so the whole
/// enum stays serializable for structured logs.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum LauncherError {
    /// Error from this app
    #[error("Launcher Error: {message} {location}")]
    Launcher {
        message: String,
        location: ErrorLocation,
    },

    /// Error from pipe-core construction or configuration
    #[error("Pipe Error: {message} {location}")]
    Pipe {
        message: String,
        location: ErrorLocation,
    },

    /// Arguments could not be handed to the running instance in time
    #[error("Forward Error: {message} {location}")]
    Forward {
        message: String,
        location: ErrorLocation,
    },
}

impl From<PipeError> for LauncherError {
    #[track_caller]
    fn from(error: PipeError) -> Self {
        LauncherError::Pipe {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for LauncherError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        LauncherError::Pipe {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
