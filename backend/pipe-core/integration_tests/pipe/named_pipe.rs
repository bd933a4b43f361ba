//! Named-pipe specifics: a client that stalls mid-frame must not stretch polls.

use crate::pipe::helpers::{
    builder, receive_one, send_until_accepted, test_config, unique_app_name,
};

use pipe_core::PipeConfig;

use std::time::{Duration, Instant};

use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use tokio::net::windows::named_pipe::ClientOptions;
use tokio::runtime::Builder;

const POLL_BOUND: Duration = Duration::from_millis(250);

/// **VALUE**: Verifies that every poll returns within its window while a client
/// holds a half-written frame.
///
/// **WHY THIS MATTERS**: The running instance polls from its event loop. A poll that
/// waits on a slow client for longer than the configured window freezes the UI.
///
/// **BUG THIS CATCHES**: Would catch a read deadline that is independent of the
/// poll window, and a stalled client that blocks every later sender forever.
#[test]
fn given_stalled_client_when_polled_then_each_poll_stays_within_window() {
    // GIVEN: A listener with a short pending TTL and a client that wrote half a header
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let config = PipeConfig {
        pending_connection_ttl_ms: 200,
        ..test_config(dir.path())
    };
    let listener = builder(&app, dir.path()).with_config(config).build().unwrap();

    let runtime = Builder::new_current_thread().enable_all().build().unwrap();
    let mut stalled = {
        let _guard = runtime.enter();
        ClientOptions::new().open(listener.path()).unwrap()
    };
    runtime.block_on(stalled.write_all(&[0x01, 0x00])).unwrap();

    // WHEN / THEN: Polls stay bounded
    for _ in 0..5 {
        let started = Instant::now();
        let _ = listener.read_from_pipe();
        assert!(started.elapsed() < POLL_BOUND, "Poll took {:?}", started.elapsed());
    }

    // AND: Once the stalled client expires, a proper writer gets through
    let writer = builder(&app, dir.path()).build().unwrap();
    assert!(send_until_accepted(&writer, "after-stall.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("after-stall.mp3"));
    drop(stalled);
}
