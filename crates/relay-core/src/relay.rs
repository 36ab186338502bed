//! The relay: per-session frame dispatch and fan-out.
//!
//! | Command       | Effect                                       | Reply     |
//! |---------------|----------------------------------------------|-----------|
//! | `CONNECT`     | none                                         | CONNECTED |
//! | `SUBSCRIBE`   | add to session map and registry              | none      |
//! | `UNSUBSCRIBE` | remove from session map and registry         | none      |
//! | `SEND`        | deliver MESSAGE to every subscriber          | none      |
//! | `DISCONNECT`  | remove all session subscriptions, close      | none      |
//!
//! Frames missing required headers are dropped without replying to the sender.

use std::sync::Arc;

use relay_protocol::{headers, Command, Frame, HeartBeat, Version, PROTOCOL_VERSION};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::registry::{Registry, RegistryError};
use crate::session::Session;
use crate::sink::FrameSink;
use crate::subscription::Subscription;

/// Reasons a frame was dropped.
///
/// None of these are reported to the sender.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required header is absent or empty.
    #[error("{command} frame missing required header '{header}'")]
    MissingHeader {
        /// Command of the dropped frame.
        command: Command,
        /// Name of the missing header.
        header: &'static str,
    },

    /// SEND frame without a body.
    #[error("SEND frame to {0} has no body")]
    MissingBody(String),

    /// UNSUBSCRIBE for an id the session does not own.
    #[error("Unknown subscription id: {0}")]
    UnknownSubscription(String),

    /// Maximum subscriptions per session reached.
    #[error("Maximum subscriptions per session reached")]
    MaxSubscriptionsReached,

    /// Frame received after the session disconnected.
    #[error("Session is closed")]
    SessionClosed,

    /// Registry rejected the subscription.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// What processing a frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// CONNECTED reply queued.
    Connected,
    /// Subscription created (or replaced).
    Subscribed,
    /// Subscription removed.
    Unsubscribed,
    /// Body fanned out to this many subscribers.
    Delivered(usize),
    /// Session closed by DISCONNECT.
    Disconnected,
    /// Unrecognized command, nothing done.
    Ignored,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Version advertised in CONNECTED frames.
    pub version: Version,
    /// Heart-beat advertised in CONNECTED frames.
    pub heart_beat: HeartBeat,
    /// Maximum subscriptions per session.
    pub max_subscriptions_per_session: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            version: PROTOCOL_VERSION,
            heart_beat: HeartBeat::DISABLED,
            max_subscriptions_per_session: 100,
        }
    }
}

/// The protocol state machine.
///
/// One relay is shared by every connection of a server. Each connection's
/// worker owns its [`Session`] and feeds it frames in arrival order.
pub struct Relay {
    registry: Arc<Registry>,
    config: RelayConfig,
}

impl Relay {
    /// Create a relay over a registry with default configuration.
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_config(registry, RelayConfig::default())
    }

    /// Create a relay with custom configuration.
    #[must_use]
    pub fn with_config(registry: Arc<Registry>, config: RelayConfig) -> Self {
        Self { registry, config }
    }

    /// The shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Create a session for a newly accepted connection.
    pub fn open_session(&self, sink: impl FrameSink + 'static) -> Session {
        let session = Session::new(Arc::clone(&self.registry), Box::new(sink));
        info!(connection = %session.id(), "Client connected");
        session
    }

    /// Tear down a session after its transport closed.
    ///
    /// Safe to call after DISCONNECT or more than once.
    pub fn close_session(&self, session: &mut Session) {
        let was_open = !session.is_closed();
        let removed = session.close();
        if was_open {
            info!(connection = %session.id(), subscriptions = removed, "Client disconnected");
        }
    }

    /// Process one decoded frame for a session.
    ///
    /// # Errors
    ///
    /// Returns the reason the frame was dropped. A dropped frame leaves the
    /// session and the registry unchanged and nothing is sent to the client.
    pub fn handle_frame(
        &self,
        session: &mut Session,
        frame: Frame,
    ) -> Result<Disposition, RelayError> {
        if session.is_closed() {
            return Err(RelayError::SessionClosed);
        }
        session.mark_connected();

        match frame.command {
            Command::Connect | Command::Stomp => Ok(self.connect(session, &frame)),
            Command::Subscribe => self.subscribe(session, &frame),
            Command::Unsubscribe => self.unsubscribe(session, &frame),
            Command::Send => self.send(session, &frame),
            Command::Disconnect => {
                self.close_session(session);
                Ok(Disposition::Disconnected)
            }
            _ => {
                debug!(connection = %session.id(), command = %frame.command, "Ignoring frame");
                Ok(Disposition::Ignored)
            }
        }
    }

    fn connect(&self, session: &Session, frame: &Frame) -> Disposition {
        let client_heart_beat = frame
            .header(headers::HEART_BEAT)
            .and_then(|hb| hb.parse::<HeartBeat>().ok())
            .unwrap_or_default();
        debug!(
            connection = %session.id(),
            accept_version = frame.header(headers::ACCEPT_VERSION).unwrap_or("-"),
            heart_beat = %client_heart_beat,
            "Connect"
        );

        let reply = Frame::connected(self.config.version, self.config.heart_beat);
        if let Err(e) = session.peer().deliver(reply) {
            warn!(connection = %session.id(), error = %e, "Failed to queue CONNECTED frame");
        }
        Disposition::Connected
    }

    fn subscribe(&self, session: &mut Session, frame: &Frame) -> Result<Disposition, RelayError> {
        let id = require(frame, headers::ID)?;
        let destination = require(frame, headers::DESTINATION)?;

        let previous = session.subscription(id).cloned();
        if previous.is_none()
            && session.subscription_count() >= self.config.max_subscriptions_per_session
        {
            return Err(RelayError::MaxSubscriptionsReached);
        }

        // Reusing an id replaces the earlier subscription, but only once the
        // new one is registered. Same destination means same registry key.
        let subscription = Subscription::new(id, destination, session.peer());
        self.registry.add(subscription.clone())?;
        if let Some(previous) = previous {
            if previous.destination() != destination {
                self.registry.remove(&previous);
            }
            debug!(connection = %session.id(), subscription = %id, "Replaced subscription");
        }
        session.insert(subscription);

        debug!(
            connection = %session.id(),
            subscription = %id,
            destination = %destination,
            "Subscribed"
        );
        Ok(Disposition::Subscribed)
    }

    fn unsubscribe(&self, session: &mut Session, frame: &Frame) -> Result<Disposition, RelayError> {
        let id = require(frame, headers::ID)?;

        let subscription = session
            .remove(id)
            .ok_or_else(|| RelayError::UnknownSubscription(id.to_string()))?;
        self.registry.remove(&subscription);

        debug!(
            connection = %session.id(),
            subscription = %id,
            destination = %subscription.destination(),
            "Unsubscribed"
        );
        Ok(Disposition::Unsubscribed)
    }

    fn send(&self, session: &Session, frame: &Frame) -> Result<Disposition, RelayError> {
        let destination = require(frame, headers::DESTINATION)?;
        let body = frame
            .body
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| RelayError::MissingBody(destination.to_string()))?;

        let count = self.publish(destination, body);
        debug!(
            connection = %session.id(),
            destination = %destination,
            recipients = count,
            "Published"
        );
        Ok(Disposition::Delivered(count))
    }

    /// Deliver a body to every subscriber of a destination.
    ///
    /// Each subscriber receives its own MESSAGE frame carrying its
    /// subscription id. Returns the number of frames queued. Subscribers whose
    /// connection has gone away are skipped.
    pub fn publish(&self, destination: &str, body: &str) -> usize {
        let mut delivered = 0;

        for subscription in self.registry.subscribers(destination) {
            let Some(peer) = subscription.peer() else {
                continue;
            };
            let message = Frame::message(subscription.id(), destination, body);
            match peer.deliver(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    trace!(connection = %peer.id(), error = %e, "Skipping closed subscriber");
                }
            }
        }

        delivered
    }
}

fn require<'a>(frame: &'a Frame, header: &'static str) -> Result<&'a str, RelayError> {
    frame
        .required_header(header)
        .ok_or_else(|| RelayError::MissingHeader {
            command: frame.command.clone(),
            header,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{RegistryConfig, MAX_DESTINATION_LENGTH};
    use crate::session::SessionState;
    use relay_protocol::{codec, CONTENT_TYPE_JSON};
    use tokio::sync::mpsc;

    struct Client {
        session: Session,
        rx: mpsc::UnboundedReceiver<Frame>,
    }

    impl Client {
        fn open(relay: &Relay) -> Self {
            let (tx, rx) = mpsc::unbounded_channel::<Frame>();
            Self {
                session: relay.open_session(tx),
                rx,
            }
        }

        fn drain(&mut self) -> Vec<Frame> {
            let mut frames = Vec::new();
            while let Ok(frame) = self.rx.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    fn relay() -> Relay {
        Relay::new(Arc::new(Registry::new()))
    }

    #[test]
    fn test_connect_replies_connected() {
        let relay = relay();
        let mut client = Client::open(&relay);
        assert_eq!(client.session.state(), SessionState::Unconnected);

        let result = relay.handle_frame(&mut client.session, Frame::connect());
        assert_eq!(result.unwrap(), Disposition::Connected);
        assert_eq!(client.session.state(), SessionState::Connected);

        let frames = client.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[0].header(headers::VERSION), Some("1.2"));
        assert_eq!(frames[0].header(headers::HEART_BEAT), Some("0,0"));
    }

    #[test]
    fn test_stomp_alias_replies_connected() {
        let relay = relay();
        let mut client = Client::open(&relay);

        let result = relay.handle_frame(&mut client.session, Frame::new(Command::Stomp));
        assert_eq!(result.unwrap(), Disposition::Connected);
        assert_eq!(client.drain()[0].command, Command::Connected);
    }

    #[test]
    fn test_subscribe_unsubscribe_symmetry() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("x", "/topic/d"))
            .unwrap();
        let sub = client.session.subscription("x").cloned().unwrap();
        assert!(relay.registry().contains(&sub));

        let result = relay.handle_frame(&mut client.session, Frame::unsubscribe("x"));
        assert_eq!(result.unwrap(), Disposition::Unsubscribed);
        assert!(client.session.subscription("x").is_none());
        assert!(!relay.registry().contains(&sub));
        assert_eq!(relay.registry().subscriber_count("/topic/d"), 0);
    }

    #[test]
    fn test_fan_out() {
        let relay = relay();
        let mut a = Client::open(&relay);
        let mut b = Client::open(&relay);
        let mut c = Client::open(&relay);
        let mut publisher = Client::open(&relay);

        relay
            .handle_frame(&mut a.session, Frame::subscribe("sub-a", "/topic/t"))
            .unwrap();
        relay
            .handle_frame(&mut b.session, Frame::subscribe("sub-b", "/topic/t"))
            .unwrap();
        relay
            .handle_frame(&mut c.session, Frame::subscribe("sub-c", "/topic/other"))
            .unwrap();

        let result = relay.handle_frame(&mut publisher.session, Frame::send("/topic/t", "hello"));
        assert_eq!(result.unwrap(), Disposition::Delivered(2));

        for (client, id) in [(&mut a, "sub-a"), (&mut b, "sub-b")] {
            let frames = client.drain();
            assert_eq!(frames.len(), 1);
            let message = &frames[0];
            assert_eq!(message.command, Command::Message);
            assert_eq!(message.header(headers::SUBSCRIPTION), Some(id));
            assert_eq!(message.header(headers::DESTINATION), Some("/topic/t"));
            assert_eq!(message.header(headers::CONTENT_TYPE), Some(CONTENT_TYPE_JSON));
            assert_eq!(message.body.as_deref(), Some("hello"));
        }
        assert!(c.drain().is_empty());
        assert!(publisher.drain().is_empty());
    }

    #[test]
    fn test_publisher_receives_own_message_when_subscribed() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/echo"))
            .unwrap();
        relay
            .handle_frame(&mut client.session, Frame::send("/topic/echo", "ping"))
            .unwrap();

        let frames = client.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].body.as_deref(), Some("ping"));
    }

    #[test]
    fn test_body_passes_through_unmodified() {
        let relay = relay();
        let mut sub = Client::open(&relay);
        let mut publisher = Client::open(&relay);

        relay
            .handle_frame(&mut sub.session, Frame::subscribe("0", "/topic/raw"))
            .unwrap();

        let body = "not json {\n  at all";
        relay
            .handle_frame(&mut publisher.session, Frame::send("/topic/raw", body))
            .unwrap();

        let frames = sub.drain();
        let encoded = codec::encode(&frames[0]);
        assert_eq!(codec::decode(&encoded).unwrap().body.as_deref(), Some(body));
    }

    #[test]
    fn test_disconnect_cleanup_is_total() {
        let relay = relay();
        let mut client = Client::open(&relay);
        let mut other = Client::open(&relay);

        let subscriptions = [
            ("0", "/topic/a"),
            ("1", "/topic/b"),
            ("2", "/topic/a"),
            ("3", "/queue/c"),
        ];
        for (id, destination) in subscriptions {
            relay
                .handle_frame(&mut client.session, Frame::subscribe(id, destination))
                .unwrap();
        }
        relay
            .handle_frame(&mut other.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();

        let result = relay.handle_frame(&mut client.session, Frame::disconnect());
        assert_eq!(result.unwrap(), Disposition::Disconnected);
        assert!(client.session.is_closed());
        assert_eq!(client.session.subscription_count(), 0);

        let registry = relay.registry();
        assert!(registry.session_subscriptions(client.session.id()).is_empty());
        assert_eq!(registry.subscriber_count("/topic/a"), 1);
        assert!(!registry.destination_exists("/topic/b"));
        assert!(!registry.destination_exists("/queue/c"));
    }

    #[test]
    fn test_idempotent_cleanup() {
        let relay = relay();
        let mut client = Client::open(&relay);
        let mut other = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay
            .handle_frame(&mut other.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();

        relay
            .handle_frame(&mut client.session, Frame::disconnect())
            .unwrap();
        let after_first = relay.registry().stats();

        assert!(matches!(
            relay.handle_frame(&mut client.session, Frame::disconnect()),
            Err(RelayError::SessionClosed)
        ));
        relay.close_session(&mut client.session);
        relay.close_session(&mut client.session);

        let after_all = relay.registry().stats();
        assert_eq!(after_first.destination_count, after_all.destination_count);
        assert_eq!(after_first.total_subscriptions, after_all.total_subscriptions);
        assert_eq!(after_all.total_subscriptions, 1);
    }

    #[test]
    fn test_transport_close_cleans_up() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay.close_session(&mut client.session);

        assert!(!relay.registry().destination_exists("/topic/a"));
    }

    #[test]
    fn test_order_preserved_per_publisher() {
        let relay = relay();
        let mut sub = Client::open(&relay);
        let mut publisher = Client::open(&relay);

        relay
            .handle_frame(&mut sub.session, Frame::subscribe("0", "/topic/seq"))
            .unwrap();
        for i in 0..10 {
            relay
                .handle_frame(&mut publisher.session, Frame::send("/topic/seq", i.to_string()))
                .unwrap();
        }

        let bodies: Vec<_> = sub
            .drain()
            .into_iter()
            .filter_map(|f| f.body)
            .collect();
        let expected: Vec<_> = (0..10).map(|i| i.to_string()).collect();
        assert_eq!(bodies, expected);
    }

    #[test]
    fn test_subscribe_missing_destination_is_dropped() {
        let relay = relay();
        let mut client = Client::open(&relay);
        let mut sub = Client::open(&relay);

        relay
            .handle_frame(&mut sub.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();

        let frame = Frame::new(Command::Subscribe).with_header(headers::ID, "1");
        assert!(matches!(
            relay.handle_frame(&mut client.session, frame),
            Err(RelayError::MissingHeader {
                header: headers::DESTINATION,
                ..
            })
        ));
        assert_eq!(client.session.subscription_count(), 0);
        assert_eq!(relay.registry().stats().total_subscriptions, 1);
        assert!(client.drain().is_empty());

        let result =
            relay.handle_frame(&mut client.session, Frame::send("/topic/a", "still works"));
        assert_eq!(result.unwrap(), Disposition::Delivered(1));
        assert_eq!(sub.drain().len(), 1);
    }

    #[test]
    fn test_missing_headers_are_dropped() {
        let relay = relay();
        let mut client = Client::open(&relay);

        let no_id = Frame::new(Command::Subscribe).with_header(headers::DESTINATION, "/topic/a");
        assert!(relay.handle_frame(&mut client.session, no_id).is_err());

        let empty_id = Frame::subscribe("", "/topic/a");
        assert!(relay.handle_frame(&mut client.session, empty_id).is_err());

        let unsubscribe = Frame::new(Command::Unsubscribe);
        assert!(relay.handle_frame(&mut client.session, unsubscribe).is_err());

        let no_destination = Frame::new(Command::Send).with_body("x");
        assert!(relay.handle_frame(&mut client.session, no_destination).is_err());

        let no_body = Frame::new(Command::Send).with_header(headers::DESTINATION, "/topic/a");
        assert!(matches!(
            relay.handle_frame(&mut client.session, no_body),
            Err(RelayError::MissingBody(_))
        ));

        assert!(client.drain().is_empty());
        assert_eq!(relay.registry().stats().total_subscriptions, 0);
        assert!(!client.session.is_closed());
    }

    #[test]
    fn test_unknown_subscription_is_ignored() {
        let relay = relay();
        let mut client = Client::open(&relay);

        assert!(matches!(
            relay.handle_frame(&mut client.session, Frame::unsubscribe("nope")),
            Err(RelayError::UnknownSubscription(_))
        ));
        assert!(!client.session.is_closed());
    }

    #[test]
    fn test_send_to_unknown_destination() {
        let relay = relay();
        let mut client = Client::open(&relay);

        let result = relay.handle_frame(&mut client.session, Frame::send("/topic/void", "x"));
        assert_eq!(result.unwrap(), Disposition::Delivered(0));
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let relay = relay();
        let mut client = Client::open(&relay);

        let result = relay.handle_frame(&mut client.session, Frame::new("BEGIN"));
        assert_eq!(result.unwrap(), Disposition::Ignored);
        assert!(client.drain().is_empty());
    }

    #[test]
    fn test_resubscribe_same_id_replaces() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/b"))
            .unwrap();

        assert_eq!(client.session.subscription_count(), 1);
        assert!(!relay.registry().destination_exists("/topic/a"));
        assert_eq!(relay.registry().subscriber_count("/topic/b"), 1);
    }

    #[test]
    fn test_resubscribe_same_destination_keeps_one_entry() {
        let relay = relay();
        let mut client = Client::open(&relay);

        for _ in 0..2 {
            relay
                .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
                .unwrap();
        }

        assert_eq!(relay.registry().subscriber_count("/topic/a"), 1);
        relay.publish("/topic/a", "{}");
        assert_eq!(client.drain().len(), 1);
    }

    #[test]
    fn test_rejected_resubscribe_keeps_existing_subscription() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();

        let long = format!("/topic/{}", "a".repeat(MAX_DESTINATION_LENGTH));
        assert!(matches!(
            relay.handle_frame(&mut client.session, Frame::subscribe("0", long)),
            Err(RelayError::Registry(RegistryError::InvalidDestination(_)))
        ));

        assert_eq!(client.session.subscription("0").unwrap().destination(), "/topic/a");
        assert_eq!(relay.registry().subscriber_count("/topic/a"), 1);
        assert_eq!(relay.publish("/topic/a", "{}"), 1);
    }

    #[test]
    fn test_resubscribe_over_destination_limit_keeps_existing_subscription() {
        let relay = Relay::new(Arc::new(Registry::with_config(RegistryConfig {
            max_destinations: 1,
        })));
        let mut client = Client::open(&relay);
        let mut other = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay
            .handle_frame(&mut other.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();

        assert!(matches!(
            relay.handle_frame(&mut client.session, Frame::subscribe("0", "/topic/b")),
            Err(RelayError::Registry(RegistryError::MaxDestinationsReached))
        ));

        assert_eq!(client.session.subscription("0").unwrap().destination(), "/topic/a");
        assert_eq!(relay.registry().subscriber_count("/topic/a"), 2);
        assert!(!relay.registry().destination_exists("/topic/b"));
        assert_eq!(relay.publish("/topic/a", "{}"), 2);
    }

    #[test]
    fn test_max_subscriptions_per_session() {
        let relay = Relay::with_config(
            Arc::new(Registry::new()),
            RelayConfig {
                max_subscriptions_per_session: 2,
                ..Default::default()
            },
        );
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay
            .handle_frame(&mut client.session, Frame::subscribe("1", "/topic/b"))
            .unwrap();
        assert!(matches!(
            relay.handle_frame(&mut client.session, Frame::subscribe("2", "/topic/c")),
            Err(RelayError::MaxSubscriptionsReached)
        ));
        // Replacing an existing id is still allowed
        relay
            .handle_frame(&mut client.session, Frame::subscribe("1", "/topic/c"))
            .unwrap();
        assert_eq!(client.session.subscription_count(), 2);
    }

    #[test]
    fn test_closed_subscriber_is_skipped() {
        let relay = relay();
        let mut gone = Client::open(&relay);
        let mut live = Client::open(&relay);

        relay
            .handle_frame(&mut gone.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        relay
            .handle_frame(&mut live.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        drop(gone.rx);

        assert_eq!(relay.publish("/topic/a", "x"), 1);
        assert_eq!(live.drain().len(), 1);
    }

    #[test]
    fn test_dropped_session_leaves_no_entries() {
        let relay = relay();
        let mut client = Client::open(&relay);

        relay
            .handle_frame(&mut client.session, Frame::subscribe("0", "/topic/a"))
            .unwrap();
        drop(client);

        assert_eq!(relay.registry().stats().total_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let relay = Arc::new(relay());
        let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
        let mut subscriber = relay.open_session(tx);
        relay
            .handle_frame(&mut subscriber, Frame::subscribe("0", "/topic/hot"))
            .unwrap();

        let mut tasks = Vec::new();
        for n in 0..8 {
            let relay = Arc::clone(&relay);
            tasks.push(tokio::spawn(async move {
                let (tx, _rx) = mpsc::unbounded_channel::<Frame>();
                let mut session = relay.open_session(tx);
                for i in 0..50 {
                    let id = i.to_string();
                    relay
                        .handle_frame(&mut session, Frame::subscribe(id.clone(), "/topic/hot"))
                        .unwrap();
                    relay
                        .handle_frame(&mut session, Frame::send("/topic/hot", format!("{n}-{i}")))
                        .unwrap();
                    relay
                        .handle_frame(&mut session, Frame::unsubscribe(id))
                        .unwrap();
                }
                relay.close_session(&mut session);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 8 * 50);
        assert_eq!(relay.registry().subscriber_count("/topic/hot"), 1);
    }
}
