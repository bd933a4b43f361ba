//! Single-instance pipe.
//!
//! A second launch of an application uses this crate to hand its startup
//! arguments to the instance that is already running, then exits.
//!
//! The first process to construct a [`Pipe`] for a given application name,
//! version and user claims the channel address and becomes the
//! [`Role::Listener`]. Later processes detect the live listener and become
//! [`Role::Connector`]s. A socket file left behind by a crashed listener is
//! detected and reclaimed on the next startup.
//!
//! # Example
//!
//! ```no_run
//! use pipe_core::{Pipe, Role, message::is_application_message};
//!
//! let args = vec![String::from("song.mp3")];
//! let pipe = Pipe::new("player", "1.0", Some(args.clone()), None)?;
//!
//! if pipe.role() == Role::Connector {
//!     for arg in &args {
//!         while !pipe.send_to_pipe(arg) {}
//!     }
//! } else {
//!     for message in pipe.read_from_pipe() {
//!         if is_application_message(&message) {
//!             println!("open {message}");
//!         }
//!     }
//! }
//! # Ok::<(), pipe_core::PipeError>(())
//! ```

pub mod address;
pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod pipe;

#[cfg(test)]
mod tests;

pub use address::{PipeAddress, Role};
pub use config::PipeConfig;
pub use error::{ConfigError, FrameError, PipeError};
pub use identity::PipeIdentity;
pub use message::{MESSAGE_TO_IGNORE, Message, NO_RESPONSE_MESSAGE};
pub use pipe::{Pipe, PipeBuilder};

/// Suffix appended to every derived channel name.
pub const PIPE_FILE_SUFFIX: &str = "_pipe_file";

/// Environment variable that overrides the directory holding pipe files.
pub const PIPE_DIR_ENV: &str = "PIPE_CORE_DIR";

/// Namespace prefix for Windows named pipes.
pub const WINDOWS_PIPE_PREFIX: &str = r"\\.\pipe\";
