use crate::error::SessionError;
use crate::media::{LinkOrigin, MediaConnector, MediaEvent, MediaLink};
use crate::negotiation::SignalingState;
use beacon_core::{IceCandidate, ParticipantId, SessionDescription};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One one-way fan-out connection toward a spectator.
///
/// Shares the host's local tracks by reference and negotiates independently
/// of the primary session. Candidate handling follows the same buffering
/// invariant as the primary path.
pub struct SpectatorConnection {
    participant_id: ParticipantId,
    link: Arc<dyn MediaLink>,
    state: SignalingState,
    remote_description_set: bool,
    answered: bool,
    pending_candidates: VecDeque<IceCandidate>,
}

impl SpectatorConnection {
    /// Build the link, create and apply the offer, and return it for
    /// broadcast. The connection starts with the offer outstanding.
    pub(crate) async fn open(
        connector: &dyn MediaConnector,
        participant_id: ParticipantId,
        media_tx: mpsc::Sender<MediaEvent>,
    ) -> Result<(Self, SessionDescription), SessionError> {
        let link = connector
            .connect(LinkOrigin::Spectator(participant_id.clone()), media_tx)
            .await?;
        let offer = link.create_offer().await?;
        link.set_local_description(offer.clone()).await?;
        Ok((
            Self {
                participant_id,
                link,
                state: SignalingState::HaveLocalOffer,
                remote_description_set: false,
                answered: false,
                pending_candidates: VecDeque::new(),
            },
            offer,
        ))
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    pub(crate) async fn accept_answer(&mut self, answer: SessionDescription) {
        if self.state != SignalingState::HaveLocalOffer {
            warn!(
                participant = %self.participant_id,
                state = ?self.state,
                "ignoring spectator answer, no offer outstanding"
            );
            return;
        }
        if self.answered {
            warn!(participant = %self.participant_id, "ignoring duplicate spectator answer");
            return;
        }
        if let Err(e) = self.link.set_remote_description(answer).await {
            warn!(participant = %self.participant_id, "spectator answer rejected: {e}");
            return;
        }
        self.remote_description_set = true;
        self.flush().await;
        self.answered = true;
        self.state = SignalingState::Stable;
        debug!(participant = %self.participant_id, "spectator negotiation stable");
    }

    pub(crate) async fn take_candidate(&mut self, candidate: IceCandidate) {
        if !self.remote_description_set {
            self.pending_candidates.push_back(candidate);
            debug!(
                participant = %self.participant_id,
                buffered = self.pending_candidates.len(),
                "spectator candidate buffered until answer"
            );
            return;
        }
        if let Err(e) = self.link.add_ice_candidate(candidate).await {
            warn!(participant = %self.participant_id, "spectator candidate rejected: {e}");
        }
    }

    async fn flush(&mut self) {
        while let Some(candidate) = self.pending_candidates.pop_front() {
            if let Err(e) = self.link.add_ice_candidate(candidate).await {
                warn!(
                    participant = %self.participant_id,
                    "buffered spectator candidate rejected: {e}"
                );
            }
        }
    }

    pub(crate) async fn close(&mut self) {
        self.state = SignalingState::Closed;
        self.pending_candidates.clear();
        if let Err(e) = self.link.close().await {
            warn!(participant = %self.participant_id, "spectator link close failed: {e}");
        }
    }
}
