//! Frame types for the relay protocol.
//!
//! A frame is a command word, a set of `key:value` headers and an optional
//! text body. Frames are a subset of STOMP 1.2.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::version::{HeartBeat, PROTOCOL_VERSION};

/// Well-known header names.
pub mod headers {
    pub const ID: &str = "id";
    pub const DESTINATION: &str = "destination";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const VERSION: &str = "version";
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const HEART_BEAT: &str = "heart-beat";
}

/// Content type stamped on every delivered MESSAGE frame.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Frame header map.
///
/// Sorted so that encoding is deterministic.
pub type Headers = BTreeMap<String, String>;

/// Frame commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// STOMP 1.2 alias of `CONNECT`.
    Stomp,
    Subscribe,
    Unsubscribe,
    Send,
    Disconnect,
    /// Server reply to a handshake.
    Connected,
    /// Server delivery of a published body.
    Message,
    /// Any command word outside the vocabulary, kept verbatim.
    Other(String),
}

impl Command {
    /// Wire representation of the command.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Send => "SEND",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Other(word) => word,
        }
    }
}

impl FromStr for Command {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "SEND" => Command::Send,
            "DISCONNECT" => Command::Disconnect,
            "CONNECTED" => Command::Connected,
            "MESSAGE" => Command::Message,
            other => Command::Other(other.to_string()),
        })
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(command) => command,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame command.
    pub command: Command,
    /// Frame headers, unique by name.
    pub headers: Headers,
    /// Optional opaque body.
    pub body: Option<String>,
}

impl Frame {
    /// Create a frame with no headers and no body.
    #[must_use]
    pub fn new(command: impl Into<Command>) -> Self {
        Self {
            command: command.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Add a header, replacing any previous value.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Look up a header that must be present and non-empty.
    #[must_use]
    pub fn required_header(&self, name: &str) -> Option<&str> {
        self.header(name).filter(|v| !v.is_empty())
    }

    /// Create a CONNECT frame.
    #[must_use]
    pub fn connect() -> Self {
        Frame::new(Command::Connect)
            .with_header(headers::ACCEPT_VERSION, PROTOCOL_VERSION.to_string())
    }

    /// Create a SUBSCRIBE frame.
    #[must_use]
    pub fn subscribe(id: impl Into<String>, destination: impl Into<String>) -> Self {
        Frame::new(Command::Subscribe)
            .with_header(headers::ID, id)
            .with_header(headers::DESTINATION, destination)
    }

    /// Create an UNSUBSCRIBE frame.
    #[must_use]
    pub fn unsubscribe(id: impl Into<String>) -> Self {
        Frame::new(Command::Unsubscribe).with_header(headers::ID, id)
    }

    /// Create a SEND frame.
    #[must_use]
    pub fn send(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Frame::new(Command::Send)
            .with_header(headers::DESTINATION, destination)
            .with_body(body)
    }

    /// Create a DISCONNECT frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// Create a CONNECTED frame.
    #[must_use]
    pub fn connected(version: impl fmt::Display, heart_beat: HeartBeat) -> Self {
        Frame::new(Command::Connected)
            .with_header(headers::VERSION, version.to_string())
            .with_header(headers::HEART_BEAT, heart_beat.to_string())
    }

    /// Create a MESSAGE frame for a subscriber.
    #[must_use]
    pub fn message(
        subscription: impl Into<String>,
        destination: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Frame::new(Command::Message)
            .with_header(headers::SUBSCRIPTION, subscription)
            .with_header(headers::DESTINATION, destination)
            .with_header(headers::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .with_body(body)
    }
}
