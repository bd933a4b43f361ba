//! Path/collision management.
//!
//! Decides where the channel lives and which role this process plays.
//! Listener election relies on the OS exclusive-create primitive (`bind` on
//! a Unix socket path, first-instance creation of a Windows named pipe), so
//! two processes racing for the same address cannot both win.
//!
//! Liveness of an existing address is tested by connecting to it: a refused
//! connection means the owner is gone and the artifact is stale.

pub mod paths;

use crate::backend::{self, ChannelBackend, Liveness};
use crate::config::PipeConfig;
use crate::error::PipeError;
use crate::identity::PipeIdentity;

use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use log::{debug, info, warn};
use uuid::Uuid;

/// Which side of the channel this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the address and services reads.
    Listener,
    /// Attached to another process's listener to send data.
    Connector,
}

/// Effective channel address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeAddress {
    canonical_path: String,
    is_forced: bool,
}

impl PipeAddress {
    pub fn new(canonical_path: impl Into<String>, is_forced: bool) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            is_forced,
        }
    }

    pub fn path(&self) -> &str {
        &self.canonical_path
    }

    /// True when the caller supplied the path or a fallback had to be used.
    pub fn is_forced(&self) -> bool {
        self.is_forced
    }
}

/// Outcome of address resolution: where, as what, and the opened backend.
pub(crate) struct Resolution {
    pub(crate) address: PipeAddress,
    pub(crate) role: Role,
    pub(crate) backend: Box<dyn ChannelBackend>,
}

enum Claim {
    Listener(Box<dyn ChannelBackend>),
    LiveOwner,
    Unavailable(IoError),
}

/// Compute the address and role for `identity` and open the backend.
///
/// # Errors
///
/// - [`PipeError::NoDestination`] if no address can be claimed or joined
/// - [`PipeError::Io`] if a forced path is unusable
#[track_caller]
pub(crate) fn resolve_address(
    identity: &PipeIdentity,
    forced_path: Option<&str>,
    args: &[String],
    config: &PipeConfig,
) -> Result<Resolution, PipeError> {
    if let Some(forced) = forced_path.filter(|path| !path.is_empty()) {
        return resolve_forced(forced, args, config);
    }

    let candidates = canonical_candidates(identity, config);
    if candidates.is_empty() {
        return Err(PipeError::NoDestination {
            message: format!("No pipe directory available for {}", identity.channel_name()),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    for path in &candidates {
        match claim_or_detect(path, config) {
            Claim::Listener(backend) => {
                info!("Claimed pipe {path}");
                return Ok(Resolution {
                    address: PipeAddress::new(path.as_str(), false),
                    role: Role::Listener,
                    backend,
                });
            }
            Claim::LiveOwner => {
                info!("Pipe {path} is owned by a running instance");
                return Ok(Resolution {
                    address: PipeAddress::new(path.as_str(), false),
                    role: Role::Connector,
                    backend: backend::open_as_connector(path, config)?,
                });
            }
            Claim::Unavailable(e) => {
                debug!("Canonical pipe {path} unavailable: {e}");
            }
        }
    }

    for canonical in &candidates {
        let fallback = fallback_path(canonical);
        match backend::open_as_listener(&fallback, config) {
            Ok(backend) => {
                warn!("Canonical pipe unavailable, listening on fallback {fallback}");
                return Ok(Resolution {
                    address: PipeAddress::new(fallback, true),
                    role: Role::Listener,
                    backend,
                });
            }
            Err(e) => debug!("Fallback pipe {fallback} unavailable: {e}"),
        }
    }

    Err(PipeError::NoDestination {
        message: format!("No usable pipe address for {}", identity.channel_name()),
        location: ErrorLocation::from(Location::caller()),
    })
}

#[track_caller]
fn resolve_forced(
    forced: &str,
    args: &[String],
    config: &PipeConfig,
) -> Result<Resolution, PipeError> {
    let address = PipeAddress::new(forced, true);

    if !args.is_empty() {
        debug!("Forced pipe {forced} with arguments to send, connecting");
        return Ok(Resolution {
            address,
            role: Role::Connector,
            backend: backend::open_as_connector(forced, config)?,
        });
    }

    match claim_or_detect(forced, config) {
        Claim::Listener(backend) => Ok(Resolution {
            address,
            role: Role::Listener,
            backend,
        }),
        Claim::LiveOwner => Ok(Resolution {
            address,
            role: Role::Connector,
            backend: backend::open_as_connector(forced, config)?,
        }),
        Claim::Unavailable(e) => Err(PipeError::Io {
            message: format!("Forced pipe path {forced} is unusable: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: e,
        }),
    }
}

/// Claim `path` exclusively, or find out who holds it.
///
/// Runs under the claim lock for `path`. A stale artifact is removed and the
/// claim retried exactly once.
fn claim_or_detect(path: &str, config: &PipeConfig) -> Claim {
    let _lock = match backend::lock_for_claim(path) {
        Ok(lock) => lock,
        Err(e) => return Claim::Unavailable(e),
    };

    match backend::open_as_listener(path, config) {
        Ok(listener) => return Claim::Listener(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse => {}
        Err(e) => return Claim::Unavailable(e),
    }

    match backend::probe(path) {
        Liveness::Live => return Claim::LiveOwner,
        Liveness::Absent => {}
        Liveness::Stale => {
            info!("Reclaiming stale pipe {path}");
            if let Err(e) = backend::reclaim(path) {
                warn!("Failed to remove stale pipe {path}: {e}");
                return Claim::Unavailable(e);
            }
        }
        Liveness::Unknown(kind) => {
            return Claim::Unavailable(IoError::new(
                kind,
                format!("cannot tell whether {path} has a live owner"),
            ));
        }
    }

    match backend::open_as_listener(path, config) {
        Ok(listener) => Claim::Listener(listener),
        Err(e) if e.kind() == ErrorKind::AddrInUse && backend::probe(path) == Liveness::Live => {
            debug!("Pipe {path} was claimed outside the claim lock");
            Claim::LiveOwner
        }
        Err(e) => Claim::Unavailable(e),
    }
}

#[cfg(unix)]
fn canonical_candidates(identity: &PipeIdentity, config: &PipeConfig) -> Vec<String> {
    let channel = identity.channel_name();

    paths::candidate_dirs(identity.app_name(), config)
        .into_iter()
        .filter_map(|dir| {
            if let Err(e) = paths::prepare_dir(&dir.path) {
                debug!("Skipping pipe dir {} ({}): {e}", dir.path.display(), dir.source);
                return None;
            }
            match dir.path.join(&channel).to_str() {
                Some(path) => Some(path.to_string()),
                None => {
                    debug!("Skipping non UTF-8 pipe dir {}", dir.path.display());
                    None
                }
            }
        })
        .collect()
}

#[cfg(windows)]
fn canonical_candidates(identity: &PipeIdentity, _config: &PipeConfig) -> Vec<String> {
    vec![format!("{}{}", crate::WINDOWS_PIPE_PREFIX, identity.channel_name())]
}

fn fallback_path(canonical: &str) -> String {
    format!("{canonical}_{}", Uuid::new_v4().simple())
}
