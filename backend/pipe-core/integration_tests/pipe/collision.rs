//! Collision handling on the socket-file backend: stale artifacts, squatted
//! paths and files that change underneath a running listener.

use crate::pipe::helpers::{
    TEST_USER, TEST_VERSION, builder, receive_one, send_until_accepted, test_config,
    unique_app_name,
};

use pipe_core::message::is_application_message;
use pipe_core::{Pipe, PipeConfig, Role, identity};

use std::fs;
use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Barrier;
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, SockAddr, Socket, Type};
use tempfile::tempdir;

const CONTENDERS: usize = 6;
const RACE_ROUNDS: usize = 200;

fn canonical_path(app_name: &str, dir: &Path) -> PathBuf {
    let identity = identity::resolve_for_user(app_name, TEST_VERSION, TEST_USER).unwrap();
    dir.join(identity.channel_name())
}

/// **VALUE**: Verifies recovery after a crash left the socket file behind.
///
/// **WHY THIS MATTERS**: Without reclaiming, every launch after a crash would
/// believe another instance is running and exit after forwarding into the void.
///
/// **BUG THIS CATCHES**: Would catch if a leftover socket file were treated as a live
/// owner, or if the new listener ended up on a fallback path.
#[test]
fn given_stale_socket_file_when_pipe_starts_then_canonical_path_is_reclaimed() {
    // GIVEN: A socket file whose listener is gone
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let path = canonical_path(&app, dir.path());
    drop(UnixListener::bind(&path).unwrap());
    assert!(path.exists(), "Dropping a std listener leaves the file behind");

    // WHEN: A new instance starts
    let listener = builder(&app, dir.path()).build().unwrap();

    // THEN: It owns the canonical path
    assert_eq!(listener.role(), Role::Listener);
    assert!(!listener.path_was_forced());
    assert_eq!(Path::new(listener.path()), path);

    // AND: The reclaimed pipe works
    let writer = builder(&app, dir.path()).build().unwrap();
    assert!(send_until_accepted(&writer, "after-crash.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("after-crash.mp3"));
}

/// **VALUE**: Verifies that instances racing for a stale path end with one owner.
///
/// **WHY THIS MATTERS**: Selecting several files in a file manager starts several
/// instances at once. After a crash they all find the same stale socket file.
///
/// **BUG THIS CATCHES**: Would catch a reclaim that unlinks a socket another instance
/// has just bound. Both would then think they own the path, and one of them would
/// listen on a file nobody can reach.
#[test]
fn given_stale_socket_when_instances_start_simultaneously_then_exactly_one_listens() {
    for round in 0..RACE_ROUNDS {
        // GIVEN: A stale socket file at the canonical path
        let dir = tempdir().unwrap();
        let app = unique_app_name();
        let path = canonical_path(&app, dir.path());
        drop(UnixListener::bind(&path).unwrap());

        // WHEN: Several instances start at the same moment
        let barrier = Barrier::new(CONTENDERS);
        let pipes: Vec<Pipe> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CONTENDERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        builder(&app, dir.path()).build().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // THEN: Exactly one listens, everyone agrees on the canonical path
        let listeners: Vec<&Pipe> = pipes.iter().filter(|p| p.role() == Role::Listener).collect();
        assert_eq!(listeners.len(), 1, "Round {round}: expected a single owner");
        assert!(pipes.iter().all(|p| Path::new(p.path()) == path && !p.path_was_forced()));

        // AND: The socket file on disk is the owner's
        let connector = pipes
            .iter()
            .find(|p| p.role() == Role::Connector)
            .unwrap();
        assert!(send_until_accepted(connector, "race.mp3"));
        assert_eq!(receive_one(listeners[0]).as_deref(), Some("race.mp3"));
    }
}

/// **VALUE**: Verifies that a listener which stopped accepting cannot hang a sender.
///
/// **WHY THIS MATTERS**: A busy or frozen first instance stops draining its accept
/// queue. A second launch must get `false` back and move on.
///
/// **BUG THIS CATCHES**: Would catch a blocking connect, which waits in the kernel for
/// queue space that never frees up.
#[test]
fn given_full_accept_queue_when_sending_then_send_fails_promptly() {
    // GIVEN: A socket that listens with a tiny backlog and never accepts
    let dir = tempdir().unwrap();
    let path = dir.path().join("wedged");
    let wedged = Socket::new(Domain::UNIX, Type::STREAM, None).unwrap();
    wedged.bind(&SockAddr::unix(&path).unwrap()).unwrap();
    wedged.listen(1).unwrap();

    let config = PipeConfig {
        write_timeout_ms: 50,
        ..test_config(dir.path())
    };
    let writer = builder(&unique_app_name(), dir.path())
        .with_config(config)
        .with_args(["stuck.mp3"])
        .with_forced_path(path.to_str().unwrap())
        .build()
        .unwrap();

    // WHEN: Sending more times than the queue can hold
    let started = Instant::now();
    let results: Vec<bool> = (0..32).map(|_| writer.send_to_pipe("stuck.mp3")).collect();

    // THEN: Later sends fail, and nothing blocked for long
    assert!(results.iter().any(|sent| !sent), "A full queue should refuse sends");
    assert!(started.elapsed() < Duration::from_secs(10));
    drop(wedged);
}

/// **VALUE**: Verifies that a plain file squatting on the path is reclaimed too.
#[test]
fn given_regular_file_at_canonical_path_when_pipe_starts_then_it_is_replaced() {
    // GIVEN: A regular file at the canonical path
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let path = canonical_path(&app, dir.path());
    fs::write(&path, b"leftover").unwrap();

    // WHEN: A new instance starts
    let listener = builder(&app, dir.path()).build().unwrap();

    // THEN: The canonical path is claimed
    assert_eq!(listener.role(), Role::Listener);
    assert!(!listener.path_was_forced());
}

/// **VALUE**: Verifies the fallback when the canonical path cannot be reclaimed.
///
/// **WHY THIS MATTERS**: The instance must still start and be reachable. Others find
/// it through the forced path it reports.
///
/// **BUG THIS CATCHES**: Would catch a startup failure on an unremovable artifact,
/// or a fallback that is not reported as forced.
#[test]
fn given_unremovable_artifact_when_pipe_starts_then_it_listens_on_forced_fallback() {
    // GIVEN: A non-empty directory squatting on the canonical path
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let path = canonical_path(&app, dir.path());
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    // WHEN: A new instance starts
    let listener = builder(&app, dir.path()).build().unwrap();

    // THEN: It listens elsewhere and says so
    assert_eq!(listener.role(), Role::Listener);
    assert!(listener.path_was_forced());
    assert_ne!(Path::new(listener.path()), path);
    assert!(listener.path().starts_with(path.to_str().unwrap()));

    // AND: A writer that is told the path can reach it
    let writer = builder(&app, dir.path())
        .with_args(["fallback.mp3"])
        .with_forced_path(listener.path())
        .build()
        .unwrap();
    assert!(send_until_accepted(&writer, "fallback.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("fallback.mp3"));
}

/// **VALUE**: Verifies that closing and dropping clean up the socket file.
#[test]
fn given_listener_when_closed_or_dropped_then_socket_file_is_removed() {
    let dir = tempdir().unwrap();

    // GIVEN / WHEN: An explicitly closed listener
    let closed = builder(&unique_app_name(), dir.path()).build().unwrap();
    let closed_path = PathBuf::from(closed.path());
    assert!(closed_path.exists());
    closed.close();

    // THEN: Its file is gone
    assert!(!closed_path.exists());

    // GIVEN / WHEN: A dropped listener
    let dropped = builder(&unique_app_name(), dir.path()).build().unwrap();
    let dropped_path = PathBuf::from(dropped.path());
    drop(dropped);

    // THEN: Its file is gone as well
    assert!(!dropped_path.exists());
}

/// **VALUE**: Verifies that close never deletes a file it did not create.
///
/// **BUG THIS CATCHES**: Would catch an old instance removing the socket file of a
/// newer instance that took over the path, orphaning the newer one.
#[test]
fn given_path_replaced_by_foreign_file_when_closed_then_foreign_file_survives() {
    // GIVEN: A listener whose path now holds somebody else's file
    let dir = tempdir().unwrap();
    let listener = builder(&unique_app_name(), dir.path()).build().unwrap();
    let path = PathBuf::from(listener.path());
    let foreign = dir.path().join("foreign");
    fs::write(&foreign, b"not ours").unwrap();
    fs::rename(&foreign, &path).unwrap();

    // WHEN: The listener closes
    listener.close();

    // THEN: The foreign file is untouched
    assert_eq!(fs::read(&path).unwrap(), b"not ours");
}

/// **VALUE**: Verifies self-repair after the socket file is deleted at runtime.
///
/// **WHY THIS MATTERS**: Temp cleaners delete files in runtime directories. The
/// instance must stay reachable and tell its owner what happened.
#[test]
fn given_socket_file_deleted_when_polled_then_file_is_recreated_and_flagged() {
    // GIVEN: A listener whose socket file was deleted
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    assert!(!listener.unexpected_removal());
    fs::remove_file(listener.path()).unwrap();

    // WHEN: The listener polls
    let _ = listener.read_from_pipe();

    // THEN: The file is back and the removal is reported
    assert!(Path::new(listener.path()).exists());
    assert!(listener.unexpected_removal());

    // AND: Messages flow again
    let writer = builder(&app, dir.path()).build().unwrap();
    assert_eq!(writer.role(), Role::Connector);
    assert!(send_until_accepted(&writer, "repaired.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("repaired.mp3"));
}

/// **VALUE**: Verifies that a writer stalled mid-frame does not block others.
///
/// **BUG THIS CATCHES**: Would catch a listener that waits on one connection until it
/// completes, starving every later sender.
#[test]
fn given_half_written_connection_when_another_writer_sends_then_message_is_delivered() {
    // GIVEN: A raw connection that wrote part of a header and stalls
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let mut stalled = UnixStream::connect(listener.path()).unwrap();
    stalled.write_all(&[0x01, 0x00]).unwrap();

    // WHEN: A proper writer sends
    let writer = builder(&app, dir.path()).build().unwrap();
    assert!(send_until_accepted(&writer, "unblocked.mp3"));

    // THEN: The message arrives while the stalled connection is still open
    assert_eq!(receive_one(&listener).as_deref(), Some("unblocked.mp3"));
    drop(stalled);
}

/// **VALUE**: Verifies that a malformed connection is dropped without surfacing data.
#[test]
fn given_malformed_frame_when_polled_then_nothing_is_surfaced_and_pipe_keeps_working() {
    // GIVEN: A raw connection that sends an unknown tag and closes
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    {
        let mut garbage = UnixStream::connect(listener.path()).unwrap();
        garbage.write_all(&[0xFF, 0x00, 0x00, 0x00, 0x01, b'x']).unwrap();
    }

    // WHEN: The listener polls a few times
    for _ in 0..10 {
        let polled = listener.read_from_pipe();

        // THEN: No application message ever appears
        assert!(polled.iter().all(|m| !is_application_message(m)));
    }

    // AND: Proper messages still flow
    let writer = builder(&app, dir.path()).build().unwrap();
    assert!(send_until_accepted(&writer, "still-fine.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("still-fine.mp3"));
}
