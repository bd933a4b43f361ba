//! Shared building blocks for the pipe workspace.
//!
//! Every error enum in the workspace carries an [`ErrorLocation`] so that a
//! failure reported from a user's machine points at the exact call site that
//! produced it.
//!
//! ## Architecture
//!
//! - **common** (this crate): Cross-crate primitives with no business logic
//! - **pipe-core**: The single-instance pipe itself
//! - **launcher**: Application wiring, logging and the caller retry policy

pub mod error;

pub use error::error_location::ErrorLocation;

#[cfg(test)]
mod tests;
