use crate::error::TransportError;
use crate::transport::{SignalingTransport, TransportEvent};
use async_trait::async_trait;
use beacon_core::{MemberKey, OnlineMarker, PresenceSet, SignalEvent};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

struct RelayMember {
    key: MemberKey,
    joined_at: DateTime<Utc>,
    tracked: bool,
    tx: mpsc::Sender<TransportEvent>,
}

/// In-process topic hub standing in for the remote relay service.
///
/// Faithful to the real thing where it matters to the core: per-sender FIFO,
/// no self-echo, presence syncs delivered wholesale, and every payload pushed
/// through the JSON wire codec.
#[derive(Default)]
pub struct LocalRelay {
    topics: DashMap<String, Vec<RelayMember>>,
}

impl LocalRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn endpoint(self: &Arc<Self>, member_key: MemberKey) -> LocalEndpoint {
        LocalEndpoint {
            relay: Arc::clone(self),
            member_key,
        }
    }

    fn presence_snapshot(&self, topic: &str) -> PresenceSet {
        let mut set = PresenceSet::default();
        if let Some(members) = self.topics.get(topic) {
            for member in members.iter().filter(|m| m.tracked) {
                set.insert(
                    member.key.clone(),
                    OnlineMarker {
                        joined_at: member.joined_at,
                    },
                );
            }
        }
        set
    }

    async fn sync_presence(&self, topic: &str) {
        let set = self.presence_snapshot(topic);
        let targets: Vec<mpsc::Sender<TransportEvent>> = match self.topics.get(topic) {
            Some(members) => members.iter().map(|m| m.tx.clone()).collect(),
            None => return,
        };
        for tx in targets {
            let _ = tx.send(TransportEvent::PresenceSync(set.clone())).await;
        }
    }
}

/// A [`LocalRelay`] handle scoped to one member key.
#[derive(Clone)]
pub struct LocalEndpoint {
    relay: Arc<LocalRelay>,
    member_key: MemberKey,
}

#[async_trait]
impl SignalingTransport for LocalEndpoint {
    fn member_key(&self) -> &MemberKey {
        &self.member_key
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let (tx, rx) = mpsc::channel(64);
        // Ack goes in first so no concurrent presence sync can precede it.
        tx.send(TransportEvent::Subscribed)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        let mut members = self.relay.topics.entry(topic.to_string()).or_default();
        members.retain(|m| m.key != self.member_key);
        members.push(RelayMember {
            key: self.member_key.clone(),
            joined_at: Utc::now(),
            tracked: false,
            tx,
        });
        Ok(rx)
    }

    async fn track_presence(&self, topic: &str) -> Result<(), TransportError> {
        let found = match self.relay.topics.get_mut(topic) {
            Some(mut members) => {
                let mut found = false;
                for member in members.iter_mut() {
                    if member.key == self.member_key {
                        member.tracked = true;
                        found = true;
                    }
                }
                found
            }
            None => false,
        };
        if !found {
            return Err(TransportError::NotSubscribed(topic.to_string()));
        }
        self.relay.sync_presence(topic).await;
        Ok(())
    }

    async fn broadcast(&self, topic: &str, event: SignalEvent) -> Result<(), TransportError> {
        // Round-trip through the wire codec so in-process runs exercise the
        // same JSON shapes the remote relay carries.
        let raw = serde_json::to_string(&event).map_err(|e| TransportError::Codec(e.to_string()))?;
        let event: SignalEvent =
            serde_json::from_str(&raw).map_err(|e| TransportError::Codec(e.to_string()))?;

        let targets: Vec<mpsc::Sender<TransportEvent>> = match self.relay.topics.get(topic) {
            Some(members) => members
                .iter()
                .filter(|m| m.key != self.member_key)
                .map(|m| m.tx.clone())
                .collect(),
            None => Vec::new(),
        };
        for tx in targets {
            if tx.send(TransportEvent::Signal(event.clone())).await.is_err() {
                warn!(topic, "dropping broadcast to a gone member");
            }
        }
        Ok(())
    }

    async fn leave(&self, topic: &str) -> Result<(), TransportError> {
        let was_tracked = match self.relay.topics.get_mut(topic) {
            Some(mut members) => {
                let tracked = members
                    .iter()
                    .any(|m| m.key == self.member_key && m.tracked);
                members.retain(|m| m.key != self.member_key);
                tracked
            }
            None => false,
        };
        if was_tracked {
            self.relay.sync_presence(topic).await;
        }
        Ok(())
    }
}
