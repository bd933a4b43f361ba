//! Pipe protocol engine.
//!
//! A [`Pipe`] is `Ready` from construction until [`Pipe::close`] (or drop),
//! after which it is `Closed` for good. Every operation makes at most one
//! attempt and returns promptly; retry policy belongs to the caller.

mod builder;

pub use builder::PipeBuilder;

use crate::address::{PipeAddress, Role};
use crate::backend::ChannelBackend;
use crate::codec::{self, FrameBuffer};
use crate::error::PipeError;
use crate::identity::PipeIdentity;
use crate::message::Message;

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, trace, warn};

enum PipeState {
    Ready(Box<dyn ChannelBackend>),
    Closed,
}

pub struct Pipe {
    identity: PipeIdentity,
    address: PipeAddress,
    role: Role,
    args: Vec<String>,
    poll_window: Duration,
    state: Mutex<PipeState>,
}

impl Pipe {
    /// Construct a pipe with default configuration.
    ///
    /// See [`PipeBuilder`] for the full set of options. Without arguments,
    /// pass `None::<Vec<String>>`.
    ///
    /// # Errors
    ///
    /// - [`PipeError::InvalidAppData`] for a blank or malformed name/version
    /// - [`PipeError::InvalidArgs`] for an argument that can never be delivered
    /// - [`PipeError::NoDestination`] if no address can be used
    #[track_caller]
    pub fn new<I, S>(
        app_name: &str,
        app_version: &str,
        args: Option<I>,
        forced_path: Option<&str>,
    ) -> Result<Self, PipeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = PipeBuilder::default()
            .with_app_name(app_name)
            .with_app_version(app_version);

        if let Some(args) = args {
            builder = builder.with_args(args);
        }
        if let Some(path) = forced_path {
            builder = builder.with_forced_path(path);
        }

        builder.build()
    }

    pub(crate) fn from_parts(
        identity: PipeIdentity,
        address: PipeAddress,
        role: Role,
        args: Vec<String>,
        poll_window: Duration,
        backend: Box<dyn ChannelBackend>,
    ) -> Self {
        Self {
            identity,
            address,
            role,
            args,
            poll_window,
            state: Mutex::new(PipeState::Ready(backend)),
        }
    }

    /// Effective channel address.
    pub fn path(&self) -> &str {
        self.address.path()
    }

    pub fn path_was_forced(&self) -> bool {
        self.address.is_forced()
    }

    pub fn address(&self) -> &PipeAddress {
        &self.address
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_pipe_owner(&self) -> bool {
        self.role == Role::Listener
    }

    pub fn identity(&self) -> &PipeIdentity {
        &self.identity
    }

    /// Arguments this process was started with.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// True if the listener's address artifact vanished and had to be recreated.
    pub fn unexpected_removal(&self) -> bool {
        match &*self.lock_state() {
            PipeState::Ready(backend) => backend.unexpected_removal(),
            PipeState::Closed => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(&*self.lock_state(), PipeState::Closed)
    }

    /// Make one non-blocking attempt to deliver `message`.
    ///
    /// Returns `true` only if the listener accepted the write. An empty
    /// message is never sent and returns `false`. The reserved strings are
    /// sent as their sentinel frames.
    pub fn send_to_pipe(&self, message: &str) -> bool {
        if message.is_empty() {
            trace!("Not sending empty message");
            return false;
        }

        let frame = match codec::encode(&Message::from_text(message)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Not sending message: {e}");
                return false;
            }
        };

        match &*self.lock_state() {
            PipeState::Ready(backend) => backend.send(&frame),
            PipeState::Closed => {
                debug!("Send on closed pipe {}", self.path());
                false
            }
        }
    }

    /// Poll for messages, sentinels included.
    ///
    /// Never empty: when nothing arrived the result is `[Message::NoResponse]`.
    pub fn read_messages(&self) -> Vec<Message> {
        let chunks = match &mut *self.lock_state() {
            PipeState::Ready(backend) => backend.receive(self.poll_window),
            PipeState::Closed => Vec::new(),
        };

        let mut messages = Vec::new();
        for chunk in chunks {
            let mut buffer = FrameBuffer::new();
            match buffer.push(&chunk) {
                Ok(decoded) => {
                    if !buffer.is_empty() {
                        debug!(
                            "Discarding {} bytes of an incomplete frame",
                            buffer.pending_bytes()
                        );
                    }
                    messages.extend(decoded);
                }
                Err(e) => warn!("Discarding malformed message on {}: {e}", self.path()),
            }
        }

        if messages.is_empty() {
            messages.push(Message::NoResponse);
        }
        messages
    }

    /// Poll for messages as strings.
    ///
    /// Sentinels appear as [`MESSAGE_TO_IGNORE`](crate::MESSAGE_TO_IGNORE) and
    /// [`NO_RESPONSE_MESSAGE`](crate::NO_RESPONSE_MESSAGE); filter them with
    /// [`is_application_message`](crate::message::is_application_message).
    pub fn read_from_pipe(&self) -> Vec<String> {
        self.read_messages()
            .into_iter()
            .map(Message::into_text)
            .collect()
    }

    /// Release the backend. Later sends return `false`, later reads only
    /// report [`Message::NoResponse`]. Safe to call more than once.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.lock_state(), PipeState::Closed);
        if let PipeState::Ready(mut backend) = previous {
            backend.close();
            debug!("Closed pipe {}", self.path());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PipeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipe")
            .field("identity", &self.identity)
            .field("address", &self.address)
            .field("role", &self.role)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}
