//! Outbound delivery seam between the relay and a transport.

use relay_protocol::Frame;
use thiserror::Error;
use tokio::sync::mpsc;

/// Delivery errors.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The receiving connection has gone away.
    #[error("Connection closed")]
    Closed,
}

/// Where a session's outbound frames go.
///
/// Delivery is fire-and-forget: implementations queue the frame and return
/// without waiting on the network.
pub trait FrameSink: Send + Sync {
    /// Queue a frame for the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Closed`] if the connection no longer accepts
    /// frames.
    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError>;
}

impl FrameSink for mpsc::UnboundedSender<Frame> {
    fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.send(frame).map_err(|_| DeliveryError::Closed)
    }
}
