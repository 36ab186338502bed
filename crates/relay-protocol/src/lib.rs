//! # relay-protocol
//!
//! Wire protocol definitions for the relay.
//!
//! Frames are a text subset of STOMP 1.2: a command line, `key:value` header
//! lines, a blank line, an optional body and a NUL terminator.
//!
//! ## Commands
//!
//! - `CONNECT` / `CONNECTED` - Handshake
//! - `SUBSCRIBE` / `UNSUBSCRIBE` - Destination membership
//! - `SEND` / `MESSAGE` - Publish and deliver
//! - `DISCONNECT` - Session teardown
//!
//! ## Example
//!
//! ```rust
//! use relay_protocol::{codec, Frame};
//!
//! let frame = Frame::send("/topic/chat", r#"{"content":"hello"}"#);
//!
//! let encoded = codec::encode(&frame);
//! let decoded = codec::decode(&encoded).unwrap();
//! assert_eq!(frame, decoded);
//! ```

pub mod codec;
pub mod frames;
pub mod version;

pub use codec::{decode, encode, ProtocolError};
pub use frames::{headers, Command, Frame, Headers, CONTENT_TYPE_JSON};
pub use version::{HeartBeat, Version, PROTOCOL_VERSION};
