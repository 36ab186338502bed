//! Server-side state for one connected client.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use relay_protocol::Frame;
use tracing::debug;

use crate::registry::Registry;
use crate::sink::{DeliveryError, FrameSink};
use crate::subscription::Subscription;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a process-unique session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// The transport handle of a session.
pub struct Peer {
    id: SessionId,
    sink: Box<dyn FrameSink>,
}

impl Peer {
    /// The session this peer belongs to.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue a frame for this peer's connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection has gone away.
    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.sink.deliver(frame)
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport accepted, no frame processed yet.
    Unconnected,
    /// At least one frame processed.
    Connected,
    /// Disconnected; owns no subscriptions.
    Closed,
}

/// One connected client.
///
/// The session map is only touched by the connection's own worker. Every
/// subscription in it is also present in the shared [`Registry`]. Closing or
/// dropping the session removes them from the registry.
pub struct Session {
    peer: Arc<Peer>,
    subscriptions: HashMap<String, Subscription>,
    state: SessionState,
    registry: Arc<Registry>,
}

impl Session {
    pub(crate) fn new(registry: Arc<Registry>, sink: Box<dyn FrameSink>) -> Self {
        Self {
            peer: Arc::new(Peer {
                id: SessionId::generate(),
                sink,
            }),
            subscriptions: HashMap::new(),
            state: SessionState::Unconnected,
            registry,
        }
    }

    /// The session id.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.peer.id
    }

    /// The session's transport handle.
    #[must_use]
    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Look up a subscription by id.
    #[must_use]
    pub fn subscription(&self, id: &str) -> Option<&Subscription> {
        self.subscriptions.get(id)
    }

    /// Iterate over the session's subscriptions.
    pub fn subscriptions(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.values()
    }

    /// Number of subscriptions owned by the session.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub(crate) fn mark_connected(&mut self) {
        if self.state == SessionState::Unconnected {
            self.state = SessionState::Connected;
        }
    }

    pub(crate) fn insert(&mut self, subscription: Subscription) {
        self.subscriptions
            .insert(subscription.id().to_string(), subscription);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Subscription> {
        self.subscriptions.remove(id)
    }

    /// Remove every subscription from the registry and close the session.
    ///
    /// Returns the number of subscriptions removed. Calling this on a closed
    /// session does nothing.
    pub(crate) fn close(&mut self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.state = SessionState::Closed;

        let removed = self.registry.remove_all(self.subscriptions.values());
        self.subscriptions.clear();

        debug!(connection = %self.id(), subscriptions = removed, "Session closed");
        removed
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id())
            .field("state", &self.state)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
