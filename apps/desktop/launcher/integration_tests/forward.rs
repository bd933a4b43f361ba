use crate::helpers::{TEST_APP, TEST_VERSION, pipe_in};

use launcher::error::LauncherError;
use launcher::forward::forward_args;
use launcher::serve::serve_until;

use pipe_core::{PipeBuilder, Role};

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::tempdir;

const BUDGET: Duration = Duration::from_secs(5);

/// **VALUE**: Drives the launcher's two halves against each other.
///
/// **WHY THIS MATTERS**: This is what happens when a user opens three files while the
/// app is already running: the new launch forwards, the running one receives.
///
/// **BUG THIS CATCHES**: Would catch a forwarder that reports success before delivery,
/// or a server that drops messages between polls.
#[test]
fn given_running_instance_when_second_launch_forwards_args_then_all_are_served() {
    // GIVEN: A first instance serving on a background thread
    let dir = tempdir().unwrap();
    let first = pipe_in(dir.path(), &[]);
    assert_eq!(first.role(), Role::Listener);

    let args: Vec<String> = ["a.mp3", "b.flac", "c.ogg"]
        .into_iter()
        .map(String::from)
        .collect();
    let second = pipe_in(dir.path(), &["a.mp3", "b.flac", "c.ogg"]);
    assert_eq!(second.role(), Role::Connector);

    let stop = AtomicBool::new(false);
    let received = Mutex::new(Vec::new());

    thread::scope(|scope| {
        let server = scope.spawn(|| {
            serve_until(&first, &stop, |arg| {
                let mut received = received.lock().unwrap();
                received.push(arg);
                if received.len() == 3 {
                    stop.store(true, Ordering::SeqCst);
                }
            })
        });

        // WHEN: The second launch forwards its args
        let forwarded = forward_args(&second, &args, BUDGET).unwrap();

        // THEN: Everything was accepted and served
        assert_eq!(forwarded, 3);
        assert_eq!(server.join().unwrap(), 3);
    });

    let mut received = received.into_inner().unwrap();
    received.sort();
    assert_eq!(received, args);
}

/// **VALUE**: Verifies that forwarding gives up once the budget is spent.
///
/// **WHY THIS MATTERS**: If the running instance hung, the new launch must not hang
/// with it. It reports failure so the caller can start on its own.
#[test]
fn given_no_listener_when_forwarding_then_fails_within_budget() {
    // GIVEN: A connector forced onto a path nobody listens on
    let dir = tempdir().unwrap();
    let missing = dir.path().join("gone");
    let pipe = PipeBuilder::default()
        .with_app_name(TEST_APP)
        .with_app_version(TEST_VERSION)
        .with_args(["lost.mp3"])
        .with_forced_path(missing.to_str().unwrap())
        .build()
        .unwrap();

    // WHEN: Forwarding with a short budget
    let started = Instant::now();
    let result = forward_args(&pipe, &["lost.mp3".to_string()], Duration::from_millis(100));

    // THEN: A Forward error, reasonably promptly
    assert!(matches!(result, Err(LauncherError::Forward { .. })));
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// **VALUE**: Verifies that nothing to forward is trivially successful.
#[test]
fn given_no_args_when_forwarding_then_returns_zero() {
    let dir = tempdir().unwrap();
    let _first = pipe_in(dir.path(), &[]);
    let second = pipe_in(dir.path(), &[]);

    assert_eq!(forward_args(&second, &[], BUDGET).unwrap(), 0);
}
