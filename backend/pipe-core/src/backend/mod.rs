//! Channel backends.
//!
//! - Unix: Unix domain socket file, non-blocking, one connection per message
//! - Windows: named pipe, driven by a private current-thread tokio runtime
//!
//! Both expose the same [`ChannelBackend`] operations plus free functions to
//! open either end, probe an address for a live owner and remove a stale one.
//! Address resolution holds [`lock_for_claim`] while it does so.

use std::io::ErrorKind;
use std::time::Duration;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{ClaimLock, lock_for_claim, open_as_connector, open_as_listener, probe, reclaim};
#[cfg(windows)]
pub use windows::{ClaimLock, lock_for_claim, open_as_connector, open_as_listener, probe, reclaim};

/// One end of a local channel.
///
/// Implementations are not reentrant; the engine serialises access.
pub trait ChannelBackend: Send {
    fn path(&self) -> &str;

    /// Attempt one delivery of `frame` to the listener at [`path`](Self::path).
    ///
    /// Returns `false` straight away if nobody accepts the connection. Once
    /// connected, the write waits at most the configured write timeout.
    fn send(&self, frame: &[u8]) -> bool;

    /// Bytes of every connection that finished within `window`.
    ///
    /// Waits at most `window`; returns an empty list when nothing arrived.
    /// Connectors always return an empty list.
    fn receive(&mut self, window: Duration) -> Vec<Vec<u8>>;

    /// True once the listener found its address artifact removed and recreated it.
    fn unexpected_removal(&self) -> bool {
        false
    }

    /// Release OS resources. Idempotent. Errors are logged, not returned.
    fn close(&mut self);
}

/// What a connection attempt says about an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Someone accepted the connection.
    Live,
    /// The artifact exists but nobody is listening.
    Stale,
    /// Nothing exists at the address.
    Absent,
    /// The probe failed in a way that says nothing about ownership.
    Unknown(ErrorKind),
}
