//! Second-instance side: hand our arguments to the running instance.

use crate::error::LauncherError;

use common::ErrorLocation;

use pipe_core::{MESSAGE_TO_IGNORE, Pipe};

use std::panic::Location;
use std::thread::sleep;
use std::time::{Duration, Instant};

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};

const FIRST_RETRY: Duration = Duration::from_millis(10);
const MAX_RETRY: Duration = Duration::from_millis(250);

/// Send every argument to the pipe's listener, retrying within `budget`.
///
/// The budget covers the whole batch, not each argument. Returns the number
/// of arguments delivered, which is `args.len()` on success.
///
/// # Errors
///
/// Returns [`LauncherError::Forward`] when the budget runs out. Arguments
/// sent before that point have been delivered; the rest have not.
#[track_caller]
pub fn forward_args(pipe: &Pipe, args: &[String], budget: Duration) -> Result<usize, LauncherError> {
    let deadline = Instant::now() + budget;

    for (delivered, arg) in args.iter().enumerate() {
        if !send_with_backoff(pipe, arg, deadline) {
            warn!(
                "Gave up forwarding to {} after {budget:?} ({delivered} of {} delivered)",
                pipe.path(),
                args.len()
            );
            wake_listener(pipe);

            return Err(LauncherError::Forward {
                message: format!(
                    "Running instance at {} did not accept {arg:?} within {budget:?}",
                    pipe.path()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        debug!("Forwarded {arg:?} to {}", pipe.path());
    }

    info!("Forwarded {} argument(s) to {}", args.len(), pipe.path());
    Ok(args.len())
}

fn send_with_backoff(pipe: &Pipe, message: &str, deadline: Instant) -> bool {
    let mut backoff = ExponentialBackoff {
        current_interval: FIRST_RETRY,
        initial_interval: FIRST_RETRY,
        max_interval: MAX_RETRY,
        max_elapsed_time: Some(deadline.saturating_duration_since(Instant::now())),
        ..Default::default()
    };

    loop {
        if pipe.send_to_pipe(message) {
            return true;
        }

        match backoff.next_backoff() {
            Some(duration) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                trace!("Send to {} refused, retrying after {duration:?}", pipe.path());
                sleep(duration.min(remaining));
            }
            None => return false,
        }
    }
}

/// A peer blocked mid-poll is woken so it can notice we gave up.
fn wake_listener(pipe: &Pipe) {
    if !pipe.send_to_pipe(MESSAGE_TO_IGNORE) {
        trace!("Wake-up message to {} was not accepted", pipe.path());
    }
}
