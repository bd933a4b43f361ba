use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors raised while constructing a [`Pipe`](crate::Pipe).
///
/// Runtime send/receive unavailability is never an error: it is reported
/// through `false` returns and sentinel messages.
#[derive(Debug, ThisError)]
pub enum PipeError {
    #[error("Invalid Args Error: {message} {location}")]
    InvalidArgs {
        message: String,
        location: ErrorLocation,
    },

    #[error("Invalid App Data Error: {message} {location}")]
    InvalidAppData {
        message: String,
        location: ErrorLocation,
    },

    #[error("No Destination Error: {message} {location}")]
    NoDestination {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<IoError> for PipeError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        PipeError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
            source: error,
        }
    }
}
