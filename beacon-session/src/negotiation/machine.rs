use crate::error::SessionError;
use crate::media::{LinkOrigin, MediaConnector, MediaEvent, MediaLink};
use crate::negotiation::NegotiationEvent;
use crate::role::RoleAssignment;
use beacon_core::{IceCandidate, SessionDescription, SignalEvent};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// The primary two-way negotiation.
///
/// Owns the signaling state, the underlying peer link, and the candidate
/// buffer. Consumes [`NegotiationEvent`]s through [`apply`](Self::apply) and
/// returns the broadcasts the caller must put on the relay; protocol-sequence
/// violations are warn-logged no-ops, never errors.
pub struct Negotiation {
    state: SignalingState,
    link: Option<Arc<dyn MediaLink>>,
    remote_description_set: bool,
    received_answer: bool,
    pending_candidates: VecDeque<IceCandidate>,
    assignment: RoleAssignment,
    connector: Arc<dyn MediaConnector>,
    media_tx: mpsc::Sender<MediaEvent>,
}

impl Negotiation {
    pub fn new(
        assignment: RoleAssignment,
        connector: Arc<dyn MediaConnector>,
        media_tx: mpsc::Sender<MediaEvent>,
    ) -> Self {
        Self {
            state: SignalingState::Stable,
            link: None,
            remote_description_set: false,
            received_answer: false,
            pending_candidates: VecDeque::new(),
            assignment,
            connector,
            media_tx,
        }
    }

    pub fn state(&self) -> SignalingState {
        self.state
    }

    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    pub fn received_answer(&self) -> bool {
        self.received_answer
    }

    pub fn pending_candidate_count(&self) -> usize {
        self.pending_candidates.len()
    }

    /// Single entry point for every negotiation input. Returns the events to
    /// broadcast on the room topic.
    pub async fn apply(
        &mut self,
        event: NegotiationEvent,
    ) -> Result<Vec<SignalEvent>, SessionError> {
        match event {
            NegotiationEvent::IntentToCall => self.start_offer().await,
            NegotiationEvent::OfferReceived(offer) => self.accept_offer(offer).await,
            NegotiationEvent::AnswerReceived(answer) => self.accept_answer(answer).await,
            NegotiationEvent::CandidateReceived(candidate) => self.take_candidate(candidate).await,
        }
    }

    /// Tear down the link and all buffered state. Applied on call end; the
    /// machine stays `Closed` until dropped.
    pub async fn close(&mut self) {
        self.state = SignalingState::Closed;
        self.remote_description_set = false;
        self.received_answer = false;
        self.pending_candidates.clear();
        if let Some(link) = self.link.take() {
            if let Err(e) = link.close().await {
                warn!("primary link close failed: {e}");
            }
        }
    }

    async fn start_offer(&mut self) -> Result<Vec<SignalEvent>, SessionError> {
        if self.state != SignalingState::Stable {
            warn!(state = ?self.state, "ignoring call intent, offer already outstanding");
            return Ok(Vec::new());
        }
        self.received_answer = false;
        let link = self.ensure_link().await?;
        let offer = link.create_offer().await?;
        link.set_local_description(offer.clone()).await?;
        self.state = SignalingState::HaveLocalOffer;
        debug!("local offer applied, broadcasting");
        Ok(vec![SignalEvent::Offer {
            offer,
            participant_id: None,
        }])
    }

    async fn accept_offer(&mut self, offer: SessionDescription) -> Result<Vec<SignalEvent>, SessionError> {
        if self.state == SignalingState::Closed {
            warn!("ignoring offer on closed session");
            return Ok(Vec::new());
        }
        if self.state != SignalingState::Stable {
            // Last-offer-wins: the receiving side always yields. Politeness is
            // recorded but not consulted here.
            info!(
                state = ?self.state,
                politeness = ?self.assignment.politeness,
                "glare, rolling back to accept incoming offer"
            );
            self.rollback_to_stable().await;
        }
        let link = self.ensure_link().await?;
        self.state = SignalingState::HaveRemoteOffer;
        link.set_remote_description(offer).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;
        let answer = link.create_answer().await?;
        link.set_local_description(answer.clone()).await?;
        self.state = SignalingState::Stable;
        debug!("remote offer answered");
        Ok(vec![SignalEvent::Answer { answer }])
    }

    async fn accept_answer(
        &mut self,
        answer: SessionDescription,
    ) -> Result<Vec<SignalEvent>, SessionError> {
        if self.state != SignalingState::HaveLocalOffer {
            warn!(state = ?self.state, "ignoring answer, no local offer outstanding");
            return Ok(Vec::new());
        }
        if self.received_answer {
            warn!("ignoring duplicate answer");
            return Ok(Vec::new());
        }
        let Some(link) = self.link.clone() else {
            warn!("ignoring answer, no link");
            return Ok(Vec::new());
        };
        link.set_remote_description(answer).await?;
        self.remote_description_set = true;
        self.flush_candidates().await;
        self.received_answer = true;
        self.state = SignalingState::Stable;
        debug!("answer applied, negotiation stable");
        Ok(Vec::new())
    }

    /// Candidates may only reach the link once a remote description exists;
    /// anything earlier is deferred as a contiguous, order-preserving suffix.
    async fn take_candidate(
        &mut self,
        candidate: IceCandidate,
    ) -> Result<Vec<SignalEvent>, SessionError> {
        let ready = self.remote_description_set;
        match self.link.clone() {
            Some(link) if ready => {
                if let Err(e) = link.add_ice_candidate(candidate).await {
                    warn!("candidate rejected by link: {e}");
                }
            }
            _ => {
                self.pending_candidates.push_back(candidate);
                debug!(
                    buffered = self.pending_candidates.len(),
                    "candidate buffered until remote description"
                );
            }
        }
        Ok(Vec::new())
    }

    async fn ensure_link(&mut self) -> Result<Arc<dyn MediaLink>, SessionError> {
        if let Some(link) = self.link.clone() {
            return Ok(link);
        }
        let link = self
            .connector
            .connect(LinkOrigin::Primary, self.media_tx.clone())
            .await?;
        self.link = Some(link.clone());
        Ok(link)
    }

    /// Local rollback for glare. The opaque media capability need not support
    /// in-place SDP rollback, so the link is discarded and rebuilt; buffered
    /// remote candidates belong to the incoming offer's sender and survive.
    async fn rollback_to_stable(&mut self) {
        if let Some(link) = self.link.take() {
            if let Err(e) = link.close().await {
                warn!("discarding rolled-back link failed: {e}");
            }
        }
        self.remote_description_set = false;
        self.received_answer = false;
        self.state = SignalingState::Stable;
    }

    /// Apply every buffered candidate in arrival order. Best-effort: a
    /// rejected candidate is logged and skipped, the rest still apply.
    async fn flush_candidates(&mut self) {
        if self.pending_candidates.is_empty() {
            return;
        }
        let Some(link) = self.link.clone() else {
            return;
        };
        debug!(count = self.pending_candidates.len(), "flushing buffered candidates");
        while let Some(candidate) = self.pending_candidates.pop_front() {
            if let Err(e) = link.add_ice_candidate(candidate).await {
                warn!("buffered candidate rejected: {e}");
            }
        }
    }
}
