// Unit tests for the wire codec
// End-to-end framing over real sockets is covered in integration_tests/pipe

use crate::codec::{FrameBuffer, HEADER_SIZE, MAX_FRAME_BODY, encode};
use crate::error::FrameError;
use crate::message::Message;

/// **VALUE**: Verifies that a frame delivered in single-byte reads still decodes.
///
/// **WHY THIS MATTERS**: The listener reads whatever the socket has at each poll.
/// A path sent by a second instance can arrive split across polls.
///
/// **BUG THIS CATCHES**: Would catch if FrameBuffer consumes a header before the
/// body is complete, or drops buffered bytes between pushes.
#[test]
fn given_frame_split_into_single_bytes_when_pushed_then_decodes_once_complete() {
    // GIVEN: An encoded payload frame
    let frame = encode(&Message::from_text("hello.mp3")).unwrap();
    let mut buffer = FrameBuffer::new();

    // WHEN: Pushing all but the last byte one at a time
    for byte in &frame[..frame.len() - 1] {
        let decoded = buffer.push(&[*byte]).unwrap();
        assert!(decoded.is_empty(), "Should not decode a partial frame");
    }

    // THEN: The final byte completes the message
    let decoded = buffer.push(&frame[frame.len() - 1..]).unwrap();
    assert_eq!(decoded, vec![Message::Payload(String::from("hello.mp3"))]);
    assert!(buffer.is_empty(), "Nothing should remain buffered");
}

/// **VALUE**: Verifies that several frames in one read decode in order.
///
/// **BUG THIS CATCHES**: Would catch if the decoder stops after the first frame
/// and silently leaves the rest in the buffer.
#[test]
fn given_back_to_back_frames_when_pushed_together_then_all_decode_in_order() {
    // GIVEN: A payload followed by both sentinels
    let mut bytes = Vec::new();
    for message in [
        Message::from_text("first"),
        Message::Ignore,
        Message::NoResponse,
    ] {
        bytes.extend_from_slice(&encode(&message).unwrap());
    }

    // WHEN: Pushing them as one chunk
    let decoded = FrameBuffer::new().push(&bytes).unwrap();

    // THEN: All three come out in order
    assert_eq!(
        decoded,
        vec![
            Message::Payload(String::from("first")),
            Message::Ignore,
            Message::NoResponse
        ]
    );
}

/// **VALUE**: Verifies that sentinels travel as empty-bodied frames.
///
/// **WHY THIS MATTERS**: Sentinels are tags, not text. If they were sent as payload
/// text, a real argument could be mistaken for one.
#[test]
fn given_sentinel_when_encoded_then_frame_is_header_only() {
    // WHEN: Encoding the keep-alive sentinel
    let frame = encode(&Message::Ignore).unwrap();

    // THEN: Only the header is present, with a zero length
    assert_eq!(frame.len(), HEADER_SIZE);
    assert_eq!(&frame[1..], &[0, 0, 0, 0]);
}

/// **VALUE**: Verifies that unknown tags are rejected.
///
/// **BUG THIS CATCHES**: Would catch if garbage from an unrelated client on the
/// socket were decoded as an argument to open.
#[test]
fn given_unknown_tag_when_pushed_then_returns_unknown_tag_error() {
    // GIVEN: A header with tag 0x7f
    let bytes = [0x7f, 0, 0, 0, 1, b'x'];

    // WHEN: Decoding
    let result = FrameBuffer::new().push(&bytes);

    // THEN: Should fail with the offending tag
    match result {
        Err(FrameError::UnknownTag { tag, .. }) => assert_eq!(tag, 0x7f),
        other => panic!("Expected UnknownTag, got {other:?}"),
    }
}

/// **VALUE**: Verifies that an oversized length is rejected from the header alone.
///
/// **WHY THIS MATTERS**: The listener must not buffer gigabytes because a header
/// claims a huge body.
#[test]
fn given_length_above_limit_when_pushed_then_returns_oversized_error() {
    // GIVEN: A payload header announcing MAX_FRAME_BODY + 1 bytes
    let length = (MAX_FRAME_BODY as u32 + 1).to_be_bytes();
    let bytes = [0x01, length[0], length[1], length[2], length[3]];

    // WHEN: Decoding just the header
    let result = FrameBuffer::new().push(&bytes);

    // THEN: Should fail immediately
    assert!(matches!(result, Err(FrameError::Oversized { .. })));
}

/// **VALUE**: Verifies that payload bytes must be UTF-8.
#[test]
fn given_invalid_utf8_payload_when_pushed_then_returns_utf8_error() {
    // GIVEN: A payload frame whose body is not UTF-8
    let bytes = [0x01, 0, 0, 0, 2, 0xff, 0xfe];

    // WHEN: Decoding
    let result = FrameBuffer::new().push(&bytes);

    // THEN: Should fail with InvalidUtf8
    assert!(matches!(result, Err(FrameError::InvalidUtf8 { .. })));
}

/// **VALUE**: Verifies that a payload frame spelling a reserved string decodes as a sentinel.
///
/// **WHY THIS MATTERS**: Sentinel isolation must hold even against a peer that frames
/// the reserved text as ordinary payload.
#[test]
fn given_payload_frame_with_reserved_text_when_decoded_then_yields_sentinel() {
    // GIVEN: A hand-built payload frame whose body is the NUL keep-alive string
    let bytes = [0x01, 0, 0, 0, 1, 0x00];

    // WHEN: Decoding
    let decoded = FrameBuffer::new().push(&bytes).unwrap();

    // THEN: Should surface as Ignore, never as payload
    assert_eq!(decoded, vec![Message::Ignore]);
}

/// **VALUE**: Verifies that encoding refuses payloads above the frame limit.
#[test]
fn given_oversized_payload_when_encoded_then_returns_error() {
    // GIVEN: A payload one byte over the limit
    let payload = "a".repeat(MAX_FRAME_BODY + 1);

    // WHEN: Encoding
    let result = encode(&Message::Payload(payload));

    // THEN: Should be rejected
    assert!(matches!(result, Err(FrameError::Oversized { .. })));
}
