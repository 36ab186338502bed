//! Subscriptions: a session's interest in one destination.

use std::sync::{Arc, Weak};

use crate::session::{Peer, SessionId};

/// Registry key of a subscription.
///
/// Subscription ids are chosen by the client and only unique within a session,
/// so the owning session is part of the key.
pub type SubscriptionKey = (SessionId, String);

/// A live subscription.
///
/// Holds a non-owning reference to the owning session's peer, which is used to
/// route delivered frames.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: String,
    destination: String,
    owner: SessionId,
    peer: Weak<Peer>,
}

impl Subscription {
    /// Create a subscription owned by `peer`.
    #[must_use]
    pub fn new(id: impl Into<String>, destination: impl Into<String>, peer: &Arc<Peer>) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            owner: peer.id(),
            peer: Arc::downgrade(peer),
        }
    }

    /// The client-assigned subscription id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The subscribed destination.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The owning session.
    #[must_use]
    pub fn owner(&self) -> SessionId {
        self.owner
    }

    /// Key under which the registry stores this subscription.
    #[must_use]
    pub fn key(&self) -> SubscriptionKey {
        (self.owner, self.id.clone())
    }

    /// The owning peer, if its session is still alive.
    #[must_use]
    pub fn peer(&self) -> Option<Arc<Peer>> {
        self.peer.upgrade()
    }
}
