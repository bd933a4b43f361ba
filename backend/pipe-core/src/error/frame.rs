use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FrameError {
    #[error("Unknown Frame Tag Error: tag {tag:#04x} {location}")]
    UnknownTag { tag: u8, location: ErrorLocation },

    #[error("Oversized Frame Error: {length} bytes exceeds {max} {location}")]
    Oversized {
        length: usize,
        max: usize,
        location: ErrorLocation,
    },

    #[error("Invalid Utf8 Error: {message} {location}")]
    InvalidUtf8 {
        message: String,
        location: ErrorLocation,
    },
}
