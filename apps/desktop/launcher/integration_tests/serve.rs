use crate::helpers::pipe_in;

use launcher::serve::serve_until;

use pipe_core::{MESSAGE_TO_IGNORE, NO_RESPONSE_MESSAGE};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use tempfile::tempdir;

#[test]
fn given_stop_already_set_when_serving_then_returns_immediately() {
    // GIVEN: A listener and a raised stop flag
    let dir = tempdir().unwrap();
    let listener = pipe_in(dir.path(), &[]);
    let stop = AtomicBool::new(true);

    // WHEN / THEN: Nothing is served
    assert_eq!(serve_until(&listener, &stop, |_| panic!("no delivery expected")), 0);
}

/// **VALUE**: Verifies that only the owner serves.
///
/// **BUG THIS CATCHES**: Would catch a connector spinning forever on reads that can
/// never return data.
#[test]
fn given_connector_when_serving_then_returns_without_polling() {
    // GIVEN: A connector
    let dir = tempdir().unwrap();
    let _listener = pipe_in(dir.path(), &[]);
    let connector = pipe_in(dir.path(), &[]);
    let stop = AtomicBool::new(false);

    // WHEN / THEN: It refuses to serve
    assert_eq!(serve_until(&connector, &stop, |_| panic!("no delivery expected")), 0);
}

/// **VALUE**: Verifies that sentinels never reach the delivery callback.
///
/// **WHY THIS MATTERS**: The callback opens files. Handing it a sentinel would try to
/// open a file named after an internal control string.
#[test]
fn given_sentinels_and_payload_when_serving_then_only_payload_is_delivered() {
    // GIVEN: A listener, and a connector that sends sentinels before real data
    let dir = tempdir().unwrap();
    let listener = pipe_in(dir.path(), &[]);
    let connector = pipe_in(dir.path(), &[]);
    let stop = AtomicBool::new(false);

    let delivered = thread::scope(|scope| {
        let server = scope.spawn(|| {
            let mut seen = Vec::new();
            serve_until(&listener, &stop, |arg| {
                seen.push(arg);
                stop.store(true, Ordering::SeqCst);
            });
            seen
        });

        // WHEN: Sentinels then a payload are sent
        for message in [MESSAGE_TO_IGNORE, NO_RESPONSE_MESSAGE, "song.mp3"] {
            while !connector.send_to_pipe(message) {
                thread::yield_now();
            }
        }

        server.join().unwrap()
    });

    // THEN: Only the payload was delivered
    assert_eq!(delivered, vec![String::from("song.mp3")]);
}
