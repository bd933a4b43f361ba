use crate::message::{MESSAGE_TO_IGNORE, Message, NO_RESPONSE_MESSAGE, is_application_message};

/// **VALUE**: Verifies that the reserved strings map onto their sentinel variants.
///
/// **WHY THIS MATTERS**: A writer that gives up sends `MESSAGE_TO_IGNORE` to wake the
/// reader. If that string were encoded as payload, the listener would try to open
/// a file named "\0".
///
/// **BUG THIS CATCHES**: Would catch if the reserved constants drift from the match
/// arms in `Message::from_text`.
#[test]
fn given_reserved_strings_when_converted_then_map_to_sentinels() {
    // WHEN / THEN: Each reserved value becomes its sentinel
    assert_eq!(Message::from_text(MESSAGE_TO_IGNORE), Message::Ignore);
    assert_eq!(Message::from_text(NO_RESPONSE_MESSAGE), Message::NoResponse);

    // AND: Anything else stays payload
    assert_eq!(
        Message::from("song.flac"),
        Message::Payload(String::from("song.flac"))
    );
}

/// **VALUE**: Verifies that sentinels render back to the exact reserved strings.
///
/// **WHY THIS MATTERS**: `read_from_pipe` returns strings, and callers filter with
/// equality against the constants. The round trip must be exact.
#[test]
fn given_sentinels_when_rendered_as_text_then_match_reserved_constants() {
    assert_eq!(Message::Ignore.into_text(), MESSAGE_TO_IGNORE);
    assert_eq!(Message::NoResponse.as_text(), NO_RESPONSE_MESSAGE);
}

/// **VALUE**: Verifies that `into_payload` only yields real application data.
#[test]
fn given_messages_when_taking_payload_then_sentinels_and_empty_are_dropped() {
    assert_eq!(
        Message::Payload(String::from("a.mp3")).into_payload(),
        Some(String::from("a.mp3"))
    );
    assert_eq!(Message::Payload(String::new()).into_payload(), None);
    assert_eq!(Message::Ignore.into_payload(), None);
    assert_eq!(Message::NoResponse.into_payload(), None);
}

/// **VALUE**: Verifies the string-level filter used by callers of `read_from_pipe`.
#[test]
fn given_read_strings_when_filtered_then_only_application_messages_pass() {
    // GIVEN: Typical poll output
    let polled = [NO_RESPONSE_MESSAGE, MESSAGE_TO_IGNORE, "", "track.ogg"];

    // WHEN: Filtering
    let kept: Vec<&str> = polled
        .into_iter()
        .filter(|text| is_application_message(text))
        .collect();

    // THEN: Only the real path survives
    assert_eq!(kept, vec!["track.ogg"]);
}
