use crate::transport::SignalingTransport;
use beacon_core::{RoomCode, SignalEvent};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fire-and-forget liveness heartbeat on the discovery topic.
///
/// Broadcasts `room-active` immediately when spawned (the caller spawns it on
/// subscription confirmation) and then on every interval tick. No delivery
/// guarantee is expected or checked.
pub struct PresenceAnnouncer;

impl PresenceAnnouncer {
    pub fn spawn(
        transport: Arc<dyn SignalingTransport>,
        discovery_topic: String,
        room_code: RoomCode,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let event = SignalEvent::RoomActive {
                    room_code: room_code.clone(),
                    timestamp: Utc::now().timestamp_millis(),
                };
                match transport.broadcast(&discovery_topic, event).await {
                    Ok(()) => debug!(room = %room_code, "room-active heartbeat sent"),
                    Err(e) => warn!("room-active broadcast failed: {e}"),
                }
            }
        })
    }
}
