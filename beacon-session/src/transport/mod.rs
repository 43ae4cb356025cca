mod local_relay;
mod transport_event;

pub use local_relay::{LocalEndpoint, LocalRelay};
pub use transport_event::TransportEvent;

use crate::error::TransportError;
use async_trait::async_trait;
use beacon_core::{MemberKey, RoomCode, SignalEvent};
use tokio::sync::mpsc;

/// Topic name for a room's signaling channel.
pub fn room_topic(code: &RoomCode) -> String {
    format!("room-{code}")
}

/// One member's endpoint into the broadcast relay.
///
/// Delivery semantics the core is built against: at-most-once, FIFO per
/// sender, no ordering across senders or event types, and no echo of the
/// member's own broadcasts.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// The presence key this endpoint is known by.
    fn member_key(&self) -> &MemberKey;

    /// Join a topic and receive its event stream. `TransportEvent::Subscribed`
    /// arrives once the relay has acknowledged the subscription.
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;

    /// Start advertising this member on the topic's presence channel.
    async fn track_presence(&self, topic: &str) -> Result<(), TransportError>;

    async fn broadcast(&self, topic: &str, event: SignalEvent) -> Result<(), TransportError>;

    async fn leave(&self, topic: &str) -> Result<(), TransportError>;
}
