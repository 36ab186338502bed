//! # relay-core
//!
//! Sessions, subscriptions and frame dispatch for the relay.
//!
//! - **Session** - One connected client and the subscriptions it owns
//! - **Subscription** - A session's interest in one destination
//! - **Registry** - Destination to subscription index shared by all sessions
//! - **Relay** - Per-frame state machine and fan-out
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Session   │────▶│    Relay    │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        ▲                   │
//!        │   MESSAGE frames  │
//!        └───── FrameSink ◀──┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use relay_protocol::Frame;
//! use tenvis_relay_core::{Registry, Relay};
//! use tokio::sync::mpsc;
//!
//! let relay = Relay::new(Arc::new(Registry::new()));
//!
//! let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
//! let mut session = relay.open_session(tx);
//! relay.handle_frame(&mut session, Frame::subscribe("0", "/topic/chat")).unwrap();
//!
//! relay.publish("/topic/chat", "{}");
//! assert!(rx.try_recv().is_ok());
//! ```

pub mod registry;
pub mod relay;
pub mod session;
pub mod sink;
pub mod subscription;

pub use registry::{Registry, RegistryConfig, RegistryError, RegistryStats};
pub use relay::{Disposition, Relay, RelayConfig, RelayError};
pub use session::{Peer, Session, SessionId, SessionState};
pub use sink::{DeliveryError, FrameSink};
pub use subscription::{Subscription, SubscriptionKey};
