//! First-instance side: receive arguments forwarded by later launches.

use pipe_core::Pipe;
use pipe_core::message::is_application_message;

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};

/// Poll `pipe` until `stop` is set, passing every real message to `deliver`.
///
/// Sentinels are filtered out. Returns the number of delivered messages.
pub fn serve_until<F>(pipe: &Pipe, stop: &AtomicBool, mut deliver: F) -> usize
where
    F: FnMut(String),
{
    if !pipe.is_pipe_owner() {
        warn!("Not serving on {}: this instance does not own it", pipe.path());
        return 0;
    }

    info!("Serving forwarded arguments on {}", pipe.path());

    let mut delivered = 0;
    let mut removal_reported = false;

    while !stop.load(Ordering::SeqCst) {
        for message in pipe.read_from_pipe() {
            if is_application_message(&message) {
                debug!("Received {message:?}");
                deliver(message);
                delivered += 1;
            }
        }

        if !removal_reported && pipe.unexpected_removal() {
            error!(
                "Pipe file {} was removed while serving; it has been recreated",
                pipe.path()
            );
            removal_reported = true;
        }
    }

    info!("Stopped serving on {} after {delivered} message(s)", pipe.path());
    delivered
}
