//! Shared fixtures for the relay benchmarks.

use std::sync::Arc;

use relay_protocol::Frame;
use tenvis_relay_core::{Registry, Relay, Session};
use tokio::sync::mpsc;

/// A session together with the receiving end of its outbound queue.
pub struct BenchClient {
    pub session: Session,
    pub rx: mpsc::UnboundedReceiver<Frame>,
}

impl BenchClient {
    /// Open a session on the relay.
    #[must_use]
    pub fn open(relay: &Relay) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Frame>();
        Self {
            session: relay.open_session(tx),
            rx,
        }
    }

    /// Discard every queued frame, returning how many there were.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

/// A relay with `subscribers` sessions subscribed to `destination`.
///
/// # Panics
///
/// Panics if a fixture subscription is rejected.
#[must_use]
pub fn relay_with_subscribers(destination: &str, subscribers: usize) -> (Relay, Vec<BenchClient>) {
    let relay = Relay::new(Arc::new(Registry::new()));
    let clients = (0..subscribers)
        .map(|i| {
            let mut client = BenchClient::open(&relay);
            relay
                .handle_frame(
                    &mut client.session,
                    Frame::subscribe(format!("sub-{i}"), destination),
                )
                .expect("fixture subscribe");
            client
        })
        .collect();
    (relay, clients)
}
