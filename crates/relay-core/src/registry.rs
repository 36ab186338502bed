//! Subscription registry shared by all sessions.
//!
//! Maps each destination to the subscriptions interested in it. Each
//! destination bucket is guarded by its `DashMap` shard, so concurrent
//! subscribe, unsubscribe and fan-out lookups on one destination are mutually
//! exclusive while other destinations proceed in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::session::SessionId;
use crate::subscription::{Subscription, SubscriptionKey};

/// Maximum destination length.
pub const MAX_DESTINATION_LENGTH: usize = 1024;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Invalid destination name.
    #[error("Invalid destination: {0}")]
    InvalidDestination(&'static str),

    /// Maximum number of destinations reached.
    #[error("Maximum destinations reached")]
    MaxDestinationsReached,
}

/// Validate a destination name.
///
/// # Errors
///
/// Returns an error message if the destination is invalid.
pub fn validate_destination(destination: &str) -> Result<(), &'static str> {
    if destination.is_empty() {
        return Err("Destination cannot be empty");
    }
    if destination.len() > MAX_DESTINATION_LENGTH {
        return Err("Destination too long");
    }
    Ok(())
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum number of destinations with at least one subscriber.
    pub max_destinations: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_destinations: 10_000,
        }
    }
}

type Bucket = HashMap<SubscriptionKey, Subscription>;

/// Destination to subscription index.
///
/// Empty buckets are removed as soon as their last subscription leaves.
pub struct Registry {
    destinations: DashMap<String, Bucket>,
    destination_count: AtomicUsize,
    config: RegistryConfig,
}

impl Registry {
    /// Create a new registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        info!("Creating registry with config: {:?}", config);
        Self {
            destinations: DashMap::new(),
            destination_count: AtomicUsize::new(0),
            config,
        }
    }

    /// Add a subscription under its destination.
    ///
    /// Adding the same subscription twice leaves a single entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination is invalid or the destination limit
    /// is reached.
    pub fn add(&self, subscription: Subscription) -> Result<(), RegistryError> {
        let destination = subscription.destination();
        validate_destination(destination).map_err(RegistryError::InvalidDestination)?;

        // The limit is checked under the shard lock of the new destination.
        let mut bucket = match self.destinations.entry(destination.to_string()) {
            Entry::Occupied(occupied) => occupied.into_ref(),
            Entry::Vacant(vacant) => {
                self.reserve_destination()?;
                debug!(destination = %destination, "Creating destination");
                vacant.insert(Bucket::new())
            }
        };
        bucket.insert(subscription.key(), subscription.clone());

        trace!(
            destination = %subscription.destination(),
            subscription = %subscription.id(),
            connection = %subscription.owner(),
            subscribers = bucket.len(),
            "Added subscription"
        );

        Ok(())
    }

    fn reserve_destination(&self) -> Result<(), RegistryError> {
        let max = self.config.max_destinations;
        self.destination_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|_| RegistryError::MaxDestinationsReached)
    }

    /// Remove a subscription.
    ///
    /// Returns `true` if it was present. Removing an absent subscription is a
    /// no-op.
    pub fn remove(&self, subscription: &Subscription) -> bool {
        let destination = subscription.destination();

        let removed = match self.destinations.get_mut(destination) {
            Some(mut bucket) => bucket.remove(&subscription.key()).is_some(),
            None => return false,
        };

        if self
            .destinations
            .remove_if(destination, |_, bucket| bucket.is_empty())
            .is_some()
        {
            self.destination_count.fetch_sub(1, Ordering::AcqRel);
            debug!(destination = %destination, "Deleted empty destination");
        }

        removed
    }

    /// Remove several subscriptions, returning how many were present.
    pub fn remove_all<'a>(
        &self,
        subscriptions: impl IntoIterator<Item = &'a Subscription>,
    ) -> usize {
        subscriptions
            .into_iter()
            .filter(|subscription| self.remove(subscription))
            .count()
    }

    /// Snapshot of the subscriptions for a destination.
    ///
    /// The bucket lock is released before returning, so callers can deliver
    /// without holding it.
    #[must_use]
    pub fn subscribers(&self, destination: &str) -> Vec<Subscription> {
        self.destinations
            .get(destination)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Check whether a specific subscription is registered.
    #[must_use]
    pub fn contains(&self, subscription: &Subscription) -> bool {
        self.destinations
            .get(subscription.destination())
            .is_some_and(|bucket| bucket.contains_key(&subscription.key()))
    }

    /// All subscriptions owned by a session, across destinations.
    #[must_use]
    pub fn session_subscriptions(&self, session: SessionId) -> Vec<Subscription> {
        self.destinations
            .iter()
            .flat_map(|bucket| {
                bucket
                    .values()
                    .filter(|s| s.owner() == session)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Check if a destination has any subscribers.
    #[must_use]
    pub fn destination_exists(&self, destination: &str) -> bool {
        self.destinations.contains_key(destination)
    }

    /// Get the subscriber count for a destination.
    #[must_use]
    pub fn subscriber_count(&self, destination: &str) -> usize {
        self.destinations
            .get(destination)
            .map(|bucket| bucket.len())
            .unwrap_or(0)
    }

    /// Get all destination names.
    #[must_use]
    pub fn destinations(&self) -> Vec<String> {
        self.destinations.iter().map(|e| e.key().clone()).collect()
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            destination_count: self.destination_count.load(Ordering::Acquire),
            total_subscriptions: self.destinations.iter().map(|b| b.len()).sum(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry statistics.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    /// Number of destinations with subscribers.
    pub destination_count: usize,
    /// Total number of subscriptions.
    pub total_subscriptions: usize,
}
