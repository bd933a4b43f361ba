use common::ErrorLocation;

use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Failures loading, saving or validating a [`PipeConfig`](crate::PipeConfig).
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("Pipe Config Read Error: {path}: {source} {location}")]
    Read {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Pipe Config Parse Error: {path}: {reason} {location}")]
    Parse {
        path: PathBuf,
        reason: String,
        location: ErrorLocation,
    },

    #[error("Pipe Config Write Error: {path}: {source} {location}")]
    Write {
        path: PathBuf,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Pipe Config Serialization Error: {reason} {location}")]
    Serialize {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Pipe Config Validation Error: {reason} {location}")]
    Validation {
        reason: String,
        location: ErrorLocation,
    },
}
