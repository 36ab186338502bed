//! Text codec for relay frames.
//!
//! Wire format:
//!
//! ```text
//! COMMAND\n
//! key:value\n
//! ...\n
//! \n
//! body\0
//! ```
//!
//! Bare end-of-line characters between frames are heart-beats and are skipped.

use bytes::{Buf, BytesMut};
use thiserror::Error;

use crate::frames::{Command, Frame, Headers};

/// Maximum size of a single buffered frame (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frame terminator byte.
pub const TERMINATOR: u8 = 0;

/// Protocol errors that can occur during decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The input carries no command line.
    #[error("Malformed frame: missing command line")]
    MalformedFrame,

    /// Buffered frame exceeds the maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// Frame bytes are not valid UTF-8.
    #[error("Invalid UTF-8 in frame: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

fn is_eol(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Decode a single frame from text.
///
/// Header lines without a colon are kept with the whole line as the key and an
/// empty value. When a header repeats, the first occurrence wins. An empty body
/// decodes as `None`.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] if there is no command line.
pub fn decode(raw: &str) -> Result<Frame, ProtocolError> {
    let raw = raw.trim_start_matches(is_eol);
    let raw = match raw.find('\0') {
        Some(end) => &raw[..end],
        None => raw,
    };

    let (command_line, mut rest) = match raw.split_once('\n') {
        Some((line, rest)) => (line, Some(rest)),
        None => (raw, None),
    };

    let command = command_line.trim_end_matches('\r');
    if command.is_empty() {
        return Err(ProtocolError::MalformedFrame);
    }

    let mut headers = Headers::new();
    let mut body = None;

    while let Some(remaining) = rest {
        let (line, next) = match remaining.split_once('\n') {
            Some((line, next)) => (line, Some(next)),
            None => (remaining, None),
        };

        let line = line.trim();
        if line.is_empty() {
            body = next.filter(|b| !b.is_empty()).map(str::to_string);
            break;
        }

        let (key, value) = line.split_once(':').unwrap_or((line, ""));
        headers
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());

        rest = next;
    }

    Ok(Frame {
        command: Command::from(command),
        headers,
        body,
    })
}

/// Encode a frame to its wire text, including the terminator.
#[must_use]
pub fn encode(frame: &Frame) -> String {
    let mut out = String::with_capacity(encoded_len(frame));

    out.push_str(frame.command.as_str());
    out.push('\n');
    for (key, value) in &frame.headers {
        out.push_str(key);
        out.push(':');
        out.push_str(value);
        out.push('\n');
    }
    out.push('\n');
    if let Some(body) = &frame.body {
        out.push_str(body);
    }
    out.push('\0');

    out
}

/// Encode a frame into an existing buffer.
pub fn encode_into(frame: &Frame, buf: &mut BytesMut) {
    buf.extend_from_slice(encode(frame).as_bytes());
}

fn encoded_len(frame: &Frame) -> usize {
    let headers: usize = frame
        .headers
        .iter()
        .map(|(k, v)| k.len() + v.len() + 2)
        .sum();
    frame.command.as_str().len() + 1 + headers + 1 + frame.body.as_ref().map_or(0, String::len) + 1
}

fn skip_heart_beats(buf: &mut BytesMut) {
    let leading = buf
        .iter()
        .take_while(|b| **b == b'\n' || **b == b'\r')
        .count();
    buf.advance(leading);
}

/// Try to decode one terminated frame from a buffer, advancing it past the
/// frame if one is complete.
///
/// Returns `Ok(None)` if more data is needed. A frame that fails to decode is
/// still consumed, so the next call continues with the following frame.
///
/// # Errors
///
/// Returns an error if the buffered frame is too large or cannot be decoded.
/// An oversized unterminated frame clears the buffer.
pub fn decode_from(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    skip_heart_beats(buf);
    if buf.is_empty() {
        return Ok(None);
    }

    let Some(end) = buf.iter().position(|b| *b == TERMINATOR) else {
        if buf.len() > MAX_FRAME_SIZE {
            let len = buf.len();
            buf.clear();
            return Err(ProtocolError::FrameTooLarge(len));
        }
        return Ok(None);
    };

    let raw = buf.split_to(end + 1);
    if end > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(end));
    }

    let text = std::str::from_utf8(&raw[..end])?;
    decode(text).map(Some)
}

/// Decode whatever remains in the buffer as a final, unterminated frame.
///
/// Used when the input ends (for example, at the end of a WebSocket message)
/// without a trailing terminator. Returns `Ok(None)` if only heart-beats remain.
///
/// # Errors
///
/// Returns an error if the remainder is too large or cannot be decoded.
pub fn decode_eof(buf: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
    if let Some(frame) = decode_from(buf)? {
        return Ok(Some(frame));
    }
    skip_heart_beats(buf);
    if buf.is_empty() {
        return Ok(None);
    }

    let raw = buf.split();
    if raw.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(raw.len()));
    }
    let text = std::str::from_utf8(&raw)?;
    decode(text).map(Some)
}
