//! Wire codec.
//!
//! Every message travels as one frame:
//!
//! ```text
//! ┌───────┬───────────┬──────────────┐
//! │ Tag   │ Length    │ Body         │
//! │ 1 byte│ uint32 BE │ Length bytes │
//! └───────┴───────────┴──────────────┘
//! ```
//!
//! Sentinels have their own tags and an empty body, so decoding never has to
//! compare payload text against reserved values.

use crate::error::FrameError;
use crate::message::Message;

use common::ErrorLocation;

use std::panic::Location;

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HEADER_SIZE: usize = 5;

/// Largest accepted frame body (1 MiB). Startup arguments are paths and URLs.
pub const MAX_FRAME_BODY: usize = 1024 * 1024;

/// Upper bound on bytes buffered for a single connection before it is dropped.
pub const MAX_CONNECTION_BYTES: usize = HEADER_SIZE + MAX_FRAME_BODY;

const TAG_PAYLOAD: u8 = 0x01;
const TAG_IGNORE: u8 = 0x02;
const TAG_NO_RESPONSE: u8 = 0x03;

/// Encode one message into a frame.
///
/// # Errors
///
/// Returns [`FrameError::Oversized`] if the payload exceeds [`MAX_FRAME_BODY`].
#[track_caller]
pub fn encode(message: &Message) -> Result<Bytes, FrameError> {
    let (tag, body): (u8, &[u8]) = match message {
        Message::Payload(text) => (TAG_PAYLOAD, text.as_bytes()),
        Message::Ignore => (TAG_IGNORE, &[]),
        Message::NoResponse => (TAG_NO_RESPONSE, &[]),
    };

    if body.len() > MAX_FRAME_BODY {
        return Err(FrameError::Oversized {
            length: body.len(),
            max: MAX_FRAME_BODY,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut frame = BytesMut::with_capacity(HEADER_SIZE + body.len());
    frame.put_u8(tag);
    frame.put_u32(body.len() as u32);
    frame.put_slice(body);
    Ok(frame.freeze())
}

/// Accumulates bytes from a connection and yields complete messages.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` and extract every complete frame.
    ///
    /// A trailing partial frame stays buffered for the next push.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] on an unknown tag, an oversized length or a
    /// payload that is not UTF-8. The buffer is unusable afterwards.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Message>, FrameError> {
        self.buffer.extend_from_slice(data);

        let mut messages = Vec::new();
        while let Some(message) = self.try_extract_one()? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[track_caller]
    fn try_extract_one(&mut self) -> Result<Option<Message>, FrameError> {
        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut header = &self.buffer[..HEADER_SIZE];
        let tag = header.get_u8();
        let length = header.get_u32() as usize;

        if !matches!(tag, TAG_PAYLOAD | TAG_IGNORE | TAG_NO_RESPONSE) {
            return Err(FrameError::UnknownTag {
                tag,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if length > MAX_FRAME_BODY {
            return Err(FrameError::Oversized {
                length,
                max: MAX_FRAME_BODY,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.buffer.len() < HEADER_SIZE + length {
            return Ok(None);
        }

        self.buffer.advance(HEADER_SIZE);
        let body = self.buffer.split_to(length);

        let message = match tag {
            TAG_IGNORE => Message::Ignore,
            TAG_NO_RESPONSE => Message::NoResponse,
            _ => {
                let text = String::from_utf8(body.to_vec()).map_err(|e| {
                    FrameError::InvalidUtf8 {
                        message: e.to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;
                // A peer that framed a reserved string as payload still gets a sentinel.
                Message::from_text(text)
            }
        };

        Ok(Some(message))
    }
}
