// Library exports for testing
// The binary (main.rs) imports these as well

pub mod error;
pub mod forward;
pub mod logger;
pub mod serve;

/// Name the pipe is registered under.
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Instances of different versions never talk to each other.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
