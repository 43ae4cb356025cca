use crate::error::SessionError;
use crate::media::{MediaConnector, MediaEvent};
use crate::spectator::SpectatorConnection;
use beacon_core::{IceCandidate, ParticipantId, SessionDescription, SignalEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Independent one-way negotiations toward each connected spectator, keyed by
/// participant id. Every inbound spectator event resolves its connection by
/// explicit lookup; unknown or stale ids are dropped with a warning.
pub struct SpectatorFanout {
    connector: Arc<dyn MediaConnector>,
    media_tx: mpsc::Sender<MediaEvent>,
    connections: HashMap<ParticipantId, SpectatorConnection>,
}

impl SpectatorFanout {
    pub fn new(connector: Arc<dyn MediaConnector>, media_tx: mpsc::Sender<MediaEvent>) -> Self {
        Self {
            connector,
            media_tx,
            connections: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// A viewer announced readiness: open one new connection and return the
    /// tagged offer to broadcast. No-op while local media is missing.
    pub async fn on_spectator_ready(
        &mut self,
    ) -> Result<Option<(ParticipantId, SignalEvent)>, SessionError> {
        if !self.connector.media_ready() {
            warn!("spectator ready before local media, ignoring");
            return Ok(None);
        }
        let participant_id = ParticipantId::new();
        let (connection, offer) = SpectatorConnection::open(
            self.connector.as_ref(),
            participant_id.clone(),
            self.media_tx.clone(),
        )
        .await?;
        self.connections.insert(participant_id.clone(), connection);
        info!(
            participant = %participant_id,
            total = self.connections.len(),
            "spectator connection opened"
        );
        Ok(Some((
            participant_id.clone(),
            SignalEvent::Offer {
                offer,
                participant_id: Some(participant_id),
            },
        )))
    }

    pub async fn on_spectator_answer(
        &mut self,
        participant_id: &ParticipantId,
        answer: SessionDescription,
    ) {
        let Some(connection) = self.connections.get_mut(participant_id) else {
            warn!(participant = %participant_id, "spectator answer for unknown connection, dropping");
            return;
        };
        connection.accept_answer(answer).await;
    }

    pub async fn on_spectator_candidate(
        &mut self,
        participant_id: &ParticipantId,
        candidate: IceCandidate,
    ) {
        let Some(connection) = self.connections.get_mut(participant_id) else {
            warn!(participant = %participant_id, "spectator candidate for unknown connection, dropping");
            return;
        };
        connection.take_candidate(candidate).await;
    }

    /// Close and drop one connection, e.g. when its link reports failure.
    pub async fn remove(&mut self, participant_id: &ParticipantId) {
        let Some(mut connection) = self.connections.remove(participant_id) else {
            return;
        };
        connection.close().await;
        info!(
            participant = %participant_id,
            remaining = self.connections.len(),
            "spectator connection removed"
        );
    }

    /// Tear down every fan-out connection. Applied on call end.
    pub async fn close_all(&mut self) {
        for (_, mut connection) in self.connections.drain() {
            connection.close().await;
        }
    }
}
