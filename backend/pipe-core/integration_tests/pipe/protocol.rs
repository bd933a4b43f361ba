use crate::pipe::helpers::{
    builder, receive_one, send_until_accepted, test_config, unique_app_name, MAX_ATTEMPTS,
    TEST_USER, TEST_VERSION,
};

use pipe_core::codec::MAX_FRAME_BODY;
use pipe_core::message::is_application_message;
use pipe_core::{MESSAGE_TO_IGNORE, Message, NO_RESPONSE_MESSAGE, Pipe, PipeBuilder, Role};

use std::collections::BTreeSet;
use std::thread;

use tempfile::tempdir;

/// **VALUE**: Walks the canonical single-instance scenario end to end.
///
/// **WHY THIS MATTERS**: This is the whole point of the crate. The first launch owns
/// the pipe, the second launch finds it and hands over a file path.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The second instance does not detect the live listener
/// - The two instances derive different paths
/// - A sent path is lost or altered in transit
#[test]
fn given_two_instances_when_second_sends_path_then_first_receives_it() {
    // GIVEN: The first instance of picard-test 2.9
    let dir = tempdir().unwrap();
    let first = PipeBuilder::default()
        .with_app_name("picard-test")
        .with_app_version("2.9")
        .with_user_scope(TEST_USER)
        .with_config(test_config(dir.path()))
        .build()
        .unwrap();

    assert_eq!(first.role(), Role::Listener, "First instance should listen");
    assert!(!first.path_was_forced(), "Canonical path should be used");

    // GIVEN: A second instance with the same identity
    let second = PipeBuilder::default()
        .with_app_name("picard-test")
        .with_app_version("2.9")
        .with_user_scope(TEST_USER)
        .with_config(test_config(dir.path()))
        .build()
        .unwrap();

    assert_eq!(second.role(), Role::Connector, "Second instance should connect");
    assert_eq!(second.path(), first.path(), "Both should share the path");
    assert!(!second.path_was_forced());

    // WHEN: The second instance sends a path
    assert!(send_until_accepted(&second, "hello.mp3"));

    // THEN: The first instance receives exactly that path
    assert_eq!(receive_one(&first).as_deref(), Some("hello.mp3"));
}

/// **VALUE**: Races a writer thread against a reader thread for many messages.
///
/// **WHY THIS MATTERS**: In production the listener polls on its own schedule while
/// the second instance retries. Neither side may deadlock, and nothing may arrive
/// garbled.
///
/// **BUG THIS CATCHES**: Would catch lost frames, torn reads across polls, and lock
/// contention that stalls one side forever.
#[test]
fn given_concurrent_reader_and_writer_when_racing_then_every_message_arrives_intact() {
    // GIVEN: A listener and a connector
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();
    assert_eq!(writer.role(), Role::Connector);

    let messages = [
        "it",
        "tests",
        "pipe",
        "my_music_file.mp3",
        "last-case",
        "/home/user/Music/Ünïcödé - track.flac",
    ];

    for message in messages {
        // WHEN: Writer and reader run concurrently
        let received = thread::scope(|scope| {
            let reader = scope.spawn(|| receive_one(&listener));
            let sender = scope.spawn(|| send_until_accepted(&writer, message));

            assert!(sender.join().unwrap(), "Send should be accepted");
            reader.join().unwrap()
        });

        // THEN: The exact message arrives
        assert_eq!(received.as_deref(), Some(message));
    }
}

/// **VALUE**: Verifies that a payload at the frame size limit is delivered whole.
///
/// **WHY THIS MATTERS**: A payload far larger than the kernel socket buffer cannot be
/// written in one go. The sender has to keep writing while the listener drains.
///
/// **BUG THIS CATCHES**: Would catch a sender that gives up on the first short write,
/// which makes every large argument undeliverable no matter how often it retries.
#[test]
fn given_payload_at_frame_limit_when_sent_then_listener_receives_it_whole() {
    // GIVEN: A listener, a connector and a payload of exactly the limit
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();
    let payload = "a".repeat(MAX_FRAME_BODY);

    // WHEN: The listener polls while the connector sends
    let received = thread::scope(|scope| {
        let reader = scope.spawn(|| receive_one(&listener));
        let sender = scope.spawn(|| send_until_accepted(&writer, &payload));

        assert!(sender.join().unwrap(), "Large send should be accepted");
        reader.join().unwrap()
    });

    // THEN: The exact payload arrives
    let received = received.expect("Large payload should arrive");
    assert_eq!(received.len(), MAX_FRAME_BODY);
    assert!(received == payload, "Payload should arrive unaltered");
}

/// **VALUE**: Verifies that a payload over the limit is refused without touching the OS.
#[test]
fn given_payload_over_frame_limit_when_sent_then_returns_false() {
    // GIVEN: A listener and a connector
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();

    // WHEN / THEN: One byte over the limit is refused
    assert!(!writer.send_to_pipe(&"a".repeat(MAX_FRAME_BODY + 1)));

    // AND: Nothing arrives
    let polled = listener.read_from_pipe();
    assert!(polled.iter().all(|m| !is_application_message(m)));
}

/// **VALUE**: Verifies that several writers can share one listener.
///
/// **WHY THIS MATTERS**: A user selecting many files in a file manager can launch many
/// instances at once. Each one must get its argument through.
#[test]
fn given_several_connectors_when_sending_concurrently_then_listener_receives_all() {
    // GIVEN: A listener and four connectors
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writers: Vec<_> = (0..4)
        .map(|_| builder(&app, dir.path()).build().unwrap())
        .collect();

    // WHEN: Each connector sends its own message concurrently
    thread::scope(|scope| {
        for (index, writer) in writers.iter().enumerate() {
            scope.spawn(move || {
                assert!(send_until_accepted(writer, &format!("file-{index}.mp3")));
            });
        }
    });

    // THEN: The listener eventually drains all four
    let mut received = BTreeSet::new();
    for _ in 0..MAX_ATTEMPTS {
        for message in listener.read_from_pipe() {
            if is_application_message(&message) {
                received.insert(message);
            }
        }
        if received.len() == 4 {
            break;
        }
    }

    let expected: BTreeSet<String> = (0..4).map(|i| format!("file-{i}.mp3")).collect();
    assert_eq!(received, expected);
}

/// **VALUE**: Verifies that an empty message is never sent.
///
/// **BUG THIS CATCHES**: Would catch if an empty string reached the backend and was
/// reported as success, making the caller believe an argument was delivered.
#[test]
fn given_empty_message_when_sent_then_returns_false() {
    // GIVEN: A live listener and a connector
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();

    // WHEN / THEN: Empty sends fail from either side
    assert!(!writer.send_to_pipe(""));
    assert!(!listener.send_to_pipe(""));

    // AND: Nothing shows up on the listener
    let polled = listener.read_from_pipe();
    assert!(polled.iter().all(|m| !is_application_message(m)));
}

/// **VALUE**: Verifies that polling an idle listener is harmless and repeatable.
///
/// **WHY THIS MATTERS**: The running instance polls forever. Every idle poll must
/// return promptly with the explicit no-response sentinel, never block or fail.
#[test]
fn given_idle_listener_when_polled_repeatedly_then_only_no_response_is_returned() {
    // GIVEN: A listener nobody writes to
    let dir = tempdir().unwrap();
    let listener = builder(&unique_app_name(), dir.path()).build().unwrap();

    // WHEN / THEN: Every poll reports no response
    for _ in 0..20 {
        assert_eq!(listener.read_from_pipe(), vec![NO_RESPONSE_MESSAGE.to_string()]);
    }
}

/// **VALUE**: Verifies that sentinels never masquerade as payload.
///
/// **WHY THIS MATTERS**: A writer that times out sends MESSAGE_TO_IGNORE to wake the
/// reader. The reader must recognise it and keep waiting for real data.
///
/// **BUG THIS CATCHES**: Would catch if a sentinel were decoded as `Message::Payload`
/// and opened as a file.
#[test]
fn given_sentinels_sent_when_read_then_they_decode_as_sentinels_not_payload() {
    // GIVEN: A listener and connector
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();

    // WHEN: Both sentinels and then a real message are sent
    assert!(send_until_accepted(&writer, MESSAGE_TO_IGNORE));
    assert!(send_until_accepted(&writer, NO_RESPONSE_MESSAGE));
    assert!(send_until_accepted(&writer, "real.mp3"));

    // THEN: The only payload ever seen is the real message
    let mut payloads = Vec::new();
    for _ in 0..MAX_ATTEMPTS {
        for message in listener.read_messages() {
            if let Message::Payload(text) = message {
                payloads.push(text);
            }
        }
        if !payloads.is_empty() {
            break;
        }
    }
    assert_eq!(payloads, vec![String::from("real.mp3")]);
}

/// **VALUE**: Verifies that a connector has nothing to read.
#[test]
fn given_connector_when_polled_then_returns_no_response() {
    // GIVEN: A connector
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let _listener = builder(&app, dir.path()).build().unwrap();
    let writer = builder(&app, dir.path()).build().unwrap();

    // WHEN / THEN: Reads on the connector only report no response
    assert_eq!(writer.read_messages(), vec![Message::NoResponse]);
}

/// **VALUE**: Verifies the Closed state is terminal.
///
/// **BUG THIS CATCHES**: Would catch a closed pipe that still sends, or a double close
/// that panics during shutdown.
#[test]
fn given_closed_pipe_when_used_then_sends_fail_and_reads_report_no_response() {
    // GIVEN: A listener that is closed twice
    let dir = tempdir().unwrap();
    let listener = builder(&unique_app_name(), dir.path()).build().unwrap();
    listener.close();
    listener.close();

    // WHEN / THEN: It is inert
    assert!(listener.is_closed());
    assert!(!listener.send_to_pipe("late.mp3"));
    assert_eq!(listener.read_messages(), vec![Message::NoResponse]);
}

/// **VALUE**: Verifies pairing through an explicit path, as a second process does when
/// the first one had to fall back.
#[test]
fn given_listener_path_when_forced_without_args_then_pipe_connects_and_delivers() {
    // GIVEN: A listener
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let listener = builder(&app, dir.path()).build().unwrap();

    // WHEN: Another pipe is forced onto the listener's path with no args
    let writer = builder(&app, dir.path())
        .with_forced_path(listener.path())
        .build()
        .unwrap();

    // THEN: It connects, reports a forced path and can deliver
    assert_eq!(writer.role(), Role::Connector);
    assert!(writer.path_was_forced());
    assert!(send_until_accepted(&writer, "forced.mp3"));
    assert_eq!(receive_one(&listener).as_deref(), Some("forced.mp3"));
}

/// **VALUE**: Verifies that a forced path with arguments always connects.
#[test]
fn given_forced_path_with_args_when_built_then_role_is_connector() {
    // GIVEN: A path nobody listens on
    let dir = tempdir().unwrap();
    let path = dir.path().join("nobody-home");

    // WHEN: Building with args and that forced path
    let pipe = builder(&unique_app_name(), dir.path())
        .with_args(["a.mp3"])
        .with_forced_path(path.to_str().unwrap())
        .build()
        .unwrap();

    // THEN: Connector, and sends fail since nobody listens
    assert_eq!(pipe.role(), Role::Connector);
    assert!(pipe.path_was_forced());
    assert_eq!(pipe.args(), ["a.mp3".to_string()]);
    assert!(!pipe.send_to_pipe("a.mp3"));
}

/// **VALUE**: Verifies that the simple constructor takes any iterable of strings.
#[test]
fn given_str_array_args_when_using_new_then_args_are_kept_in_order() {
    // GIVEN: A forced path nobody listens on
    let dir = tempdir().unwrap();
    let path = dir.path().join("nobody-home");

    // WHEN: Constructing with an array of &str
    let pipe = Pipe::new(
        &unique_app_name(),
        TEST_VERSION,
        Some(["one.mp3", "two.mp3"]),
        path.to_str(),
    )
    .unwrap();

    // THEN: Connector holding both args
    assert_eq!(pipe.role(), Role::Connector);
    assert_eq!(pipe.args(), ["one.mp3".to_string(), "two.mp3".to_string()]);
}

/// **VALUE**: Verifies that different versions get independent channels.
#[test]
fn given_two_versions_when_both_start_then_both_listen_on_different_paths() {
    // GIVEN: One app, two versions
    let dir = tempdir().unwrap();
    let app = unique_app_name();
    let old = builder(&app, dir.path()).build().unwrap();
    let new = builder(&app, dir.path())
        .with_app_version(format!("{TEST_VERSION}.1"))
        .build()
        .unwrap();

    // THEN: Neither sees the other
    assert_eq!(old.role(), Role::Listener);
    assert_eq!(new.role(), Role::Listener);
    assert_ne!(old.path(), new.path());
}
