//! Messages carried by the pipe.
//!
//! Two strings are reserved by the protocol and must be identical in every
//! cooperating process. On the wire they travel as distinct frame tags, so a
//! payload can never be confused with them once decoded.

use std::fmt::{Display, Formatter, Result as FormatResult};

/// Keep-alive token. Sent by a caller that gives up waiting so a peer stuck
/// in a poll loop wakes up. Never application payload.
pub const MESSAGE_TO_IGNORE: &str = "\0";

/// Synthesized by a read that found nothing to deliver.
pub const NO_RESPONSE_MESSAGE: &str = "No response from FIFO";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Payload(String),
    Ignore,
    NoResponse,
}

impl Message {
    /// Map raw text onto the tagged form, recognising the reserved strings.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        match text.as_str() {
            MESSAGE_TO_IGNORE => Message::Ignore,
            NO_RESPONSE_MESSAGE => Message::NoResponse,
            _ => Message::Payload(text),
        }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Message::Payload(text) => text,
            Message::Ignore => MESSAGE_TO_IGNORE,
            Message::NoResponse => NO_RESPONSE_MESSAGE,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Message::Payload(text) => text,
            sentinel => sentinel.as_text().to_string(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Message::Payload(_))
    }

    /// Application payload, or `None` for a sentinel or an empty payload.
    pub fn into_payload(self) -> Option<String> {
        match self {
            Message::Payload(text) if !text.is_empty() => Some(text),
            _ => None,
        }
    }

    pub fn is_reserved(text: &str) -> bool {
        text == MESSAGE_TO_IGNORE || text == NO_RESPONSE_MESSAGE
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Message::from_text(text)
    }
}

impl Display for Message {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            Message::Payload(text) => write!(formatter, "{text}"),
            Message::Ignore => write!(formatter, "<ignore>"),
            Message::NoResponse => write!(formatter, "<no response>"),
        }
    }
}

/// True for strings returned by [`Pipe::read_from_pipe`](crate::Pipe::read_from_pipe)
/// that carry real application data.
pub fn is_application_message(text: &str) -> bool {
    !text.is_empty() && !Message::is_reserved(text)
}
