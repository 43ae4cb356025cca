use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::{LinkOrigin, LinkState, MediaConnector, MediaEvent, TrackKind};
use crate::negotiation::{Negotiation, NegotiationEvent, SignalingState};
use crate::presence::PresenceAnnouncer;
use crate::registry::RoomRegistry;
use crate::role::{RoleAssignment, assign_role};
use crate::session::{SessionCommand, SpectatorInvite};
use crate::spectator::SpectatorFanout;
use crate::transport::{SignalingTransport, TransportEvent, room_topic};
use beacon_core::{ParticipantId, RoomCode, SignalEvent, SpectatorToken};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::{debug, error, info, warn};

/// Lifecycle notifications for the embedding application.
#[derive(Debug, Clone)]
pub enum SessionNotice {
    SubscriptionConfirmed,
    /// Someone else is tracked on the room topic.
    PeerPresent,
    /// Primary negotiation reached `Stable` with a remote description set.
    NegotiationStable,
    PrimaryLinkState(LinkState),
    SpectatorJoined(ParticipantId),
    SpectatorClosed(ParticipantId),
    CallEnded,
}

/// Cloneable handle for talking to a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    notices: broadcast::Sender<SessionNotice>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub async fn end_call(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::EndCall)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn share_spectator_link(&self) -> Result<SpectatorInvite, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::ShareSpectatorLink { reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    pub async fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::SetTrackEnabled { kind, enabled })
            .await
            .map_err(|_| SessionError::Closed)
    }
}

/// One joined room: the session context object owning role, negotiation,
/// fan-out and the trait seams. Everything mutates on the `run` loop;
/// cross-handler races are resolved by the state guards inside the
/// negotiation and fan-out, not locks.
pub struct Session {
    config: SessionConfig,
    room_code: RoomCode,
    assignment: RoleAssignment,
    transport: Arc<dyn SignalingTransport>,
    registry: Arc<dyn RoomRegistry>,
    connector: Arc<dyn MediaConnector>,
    negotiation: Negotiation,
    spectators: SpectatorFanout,
    transport_rx: mpsc::Receiver<TransportEvent>,
    media_rx: mpsc::Receiver<MediaEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    notices: broadcast::Sender<SessionNotice>,
    announcer: Option<JoinHandle<()>>,
    /// Latest presence sync showed at least one other member.
    peer_present: bool,
}

impl Session {
    /// Assign a role against the registry, subscribe the room topic, and
    /// return the session ready to [`run`](Self::run) plus its handle.
    pub async fn join(
        room_code: RoomCode,
        transport: Arc<dyn SignalingTransport>,
        registry: Arc<dyn RoomRegistry>,
        connector: Arc<dyn MediaConnector>,
        config: SessionConfig,
    ) -> Result<(Self, SessionHandle), SessionError> {
        let assignment = assign_role(registry.as_ref(), &room_code).await;
        let transport_rx = transport.subscribe(&room_topic(&room_code)).await?;

        let (media_tx, media_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (notices, _) = broadcast::channel(64);

        let negotiation = Negotiation::new(assignment, connector.clone(), media_tx.clone());
        let spectators = SpectatorFanout::new(connector.clone(), media_tx);

        let handle = SessionHandle {
            commands: command_tx,
            notices: notices.clone(),
        };
        let session = Self {
            config,
            room_code,
            assignment,
            transport,
            registry,
            connector,
            negotiation,
            spectators,
            transport_rx,
            media_rx,
            command_rx,
            notices,
            announcer: None,
            peer_present: false,
        };
        Ok((session, handle))
    }

    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    pub fn assignment(&self) -> RoleAssignment {
        self.assignment
    }

    /// Session event loop. Runs until an end-call command arrives or the
    /// command channel is dropped.
    pub async fn run(mut self) {
        info!(room = %self.room_code, role = ?self.assignment.role, "session loop started");

        // Single re-armed timer for the initiator's delayed first-offer retry.
        let offer_fallback = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(offer_fallback);
        let mut fallback_armed = false;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => {
                            debug!("session handle dropped, ending call");
                            self.end_call().await;
                            break;
                        }
                    }
                }

                event = self.transport_rx.recv() => {
                    match event {
                        Some(event) => {
                            self.handle_transport_event(
                                event,
                                offer_fallback.as_mut(),
                                &mut fallback_armed,
                            )
                            .await;
                        }
                        None => {
                            warn!("relay stream closed, ending call");
                            self.end_call().await;
                            break;
                        }
                    }
                }

                Some(event) = self.media_rx.recv() => {
                    self.handle_media_event(event).await;
                }

                () = offer_fallback.as_mut(), if fallback_armed => {
                    fallback_armed = false;
                    self.try_initial_offer().await;
                }
            }
        }

        info!(room = %self.room_code, "session loop finished");
    }

    /// Returns true when the loop should stop.
    async fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::EndCall => {
                self.end_call().await;
                true
            }
            SessionCommand::ShareSpectatorLink { reply } => {
                let invite = self.issue_spectator_invite().await;
                let _ = reply.send(invite);
                false
            }
            SessionCommand::SetTrackEnabled { kind, enabled } => {
                let now = self.connector.set_track_enabled(kind, enabled);
                debug!(?kind, enabled = now, "local track toggled");
                false
            }
        }
    }

    async fn handle_transport_event(
        &mut self,
        event: TransportEvent,
        offer_fallback: Pin<&mut Sleep>,
        fallback_armed: &mut bool,
    ) {
        match event {
            TransportEvent::Subscribed => {
                debug!(room = %self.room_code, "room subscription confirmed");
                if let Err(e) = self.transport.track_presence(&room_topic(&self.room_code)).await {
                    warn!("presence tracking failed: {e}");
                }
                self.spawn_announcer();
                self.notify(SessionNotice::SubscriptionConfirmed);
                // One retry in case presence sync beats local media readiness.
                if self.assignment.is_initiator() {
                    offer_fallback.reset(Instant::now() + self.config.offer_fallback_delay);
                    *fallback_armed = true;
                }
            }
            TransportEvent::PresenceSync(set) => {
                let others = set.others(self.transport.member_key());
                self.peer_present = !others.is_empty();
                if others.is_empty() {
                    return;
                }
                self.notify(SessionNotice::PeerPresent);
                if self.assignment.is_initiator()
                    && !self.negotiation.has_link()
                    && self.connector.media_ready()
                {
                    debug!("presence shows a peer, creating offer");
                    self.drive_negotiation(NegotiationEvent::IntentToCall).await;
                }
            }
            TransportEvent::Signal(signal) => self.handle_signal(signal).await,
            TransportEvent::Closed => {
                warn!(room = %self.room_code, "relay dropped the subscription");
            }
        }
    }

    async fn handle_signal(&mut self, signal: SignalEvent) {
        match signal {
            SignalEvent::Offer {
                offer,
                participant_id: None,
            } => {
                self.drive_negotiation(NegotiationEvent::OfferReceived(offer)).await;
            }
            SignalEvent::Offer {
                participant_id: Some(id),
                ..
            } => {
                // Fan-out offers are addressed to viewers, not to us.
                debug!(participant = %id, "ignoring spectator-directed offer");
            }
            SignalEvent::Answer { answer } => {
                self.drive_negotiation(NegotiationEvent::AnswerReceived(answer)).await;
            }
            SignalEvent::IceCandidate { candidate } => {
                self.drive_negotiation(NegotiationEvent::CandidateReceived(candidate)).await;
            }
            SignalEvent::SpectatorReady => match self.spectators.on_spectator_ready().await {
                Ok(Some((id, offer_event))) => {
                    self.broadcast_all(vec![offer_event]).await;
                    self.notify(SessionNotice::SpectatorJoined(id));
                }
                Ok(None) => {}
                Err(e) => warn!("failed to open spectator connection: {e}"),
            },
            SignalEvent::SpectatorAnswer {
                answer,
                participant_id,
            } => {
                self.spectators.on_spectator_answer(&participant_id, answer).await;
            }
            SignalEvent::SpectatorIce {
                candidate,
                participant_id,
            } => {
                self.spectators
                    .on_spectator_candidate(&participant_id, candidate)
                    .await;
            }
            SignalEvent::ParticipantIce { .. } => {
                // Host-to-viewer traffic looping back on the shared topic.
            }
            SignalEvent::RoomActive { .. } => {
                // Discovery chatter; nothing to do inside a joined room.
            }
        }
    }

    async fn handle_media_event(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::CandidateGenerated {
                origin: LinkOrigin::Primary,
                candidate,
            } => {
                self.broadcast_all(vec![SignalEvent::IceCandidate { candidate }]).await;
            }
            MediaEvent::CandidateGenerated {
                origin: LinkOrigin::Spectator(participant_id),
                candidate,
            } => {
                self.broadcast_all(vec![SignalEvent::ParticipantIce {
                    participant_id,
                    candidate,
                }])
                .await;
            }
            MediaEvent::LinkStateChanged {
                origin: LinkOrigin::Primary,
                state,
            } => {
                self.notify(SessionNotice::PrimaryLinkState(state));
            }
            MediaEvent::LinkStateChanged {
                origin: LinkOrigin::Spectator(participant_id),
                state: LinkState::Disconnected | LinkState::Failed | LinkState::Closed,
            } => {
                self.spectators.remove(&participant_id).await;
                self.notify(SessionNotice::SpectatorClosed(participant_id));
            }
            MediaEvent::LinkStateChanged {
                origin: LinkOrigin::Spectator(_),
                ..
            } => {}
        }
    }

    async fn drive_negotiation(&mut self, event: NegotiationEvent) {
        let was_settled = self.negotiation.state() == SignalingState::Stable
            && self.negotiation.remote_description_set();
        match self.negotiation.apply(event).await {
            Ok(outbound) => {
                self.broadcast_all(outbound).await;
                let settled = self.negotiation.state() == SignalingState::Stable
                    && self.negotiation.remote_description_set();
                if settled && !was_settled {
                    self.notify(SessionNotice::NegotiationStable);
                }
            }
            // In-flight description failures are survivable; the next inbound
            // message retries implicitly.
            Err(e) => warn!("negotiation step failed: {e}"),
        }
    }

    /// Re-attempt the presence-triggered offer once, for the case where the
    /// sync fired before local media was ready.
    async fn try_initial_offer(&mut self) {
        if self.assignment.is_initiator()
            && self.peer_present
            && !self.negotiation.has_link()
            && self.connector.media_ready()
        {
            debug!("initial offer fallback firing");
            self.drive_negotiation(NegotiationEvent::IntentToCall).await;
        }
    }

    async fn issue_spectator_invite(&mut self) -> Result<SpectatorInvite, SessionError> {
        let token =
            SpectatorToken::generate(self.room_code.clone(), self.config.spectator_token_ttl);
        self.registry.insert_spectator_token(&token).await?;
        let url = token.viewer_url(&self.config.viewer_base_url);
        info!(room = %self.room_code, "spectator link issued");
        Ok(SpectatorInvite { token, url })
    }

    async fn broadcast_all(&self, events: Vec<SignalEvent>) {
        let topic = room_topic(&self.room_code);
        for event in events {
            if let Err(e) = self.transport.broadcast(&topic, event).await {
                warn!("broadcast failed: {e}");
            }
        }
    }

    fn spawn_announcer(&mut self) {
        if self.announcer.is_some() {
            return;
        }
        self.announcer = Some(PresenceAnnouncer::spawn(
            self.transport.clone(),
            self.config.discovery_topic.clone(),
            self.room_code.clone(),
            self.config.presence_interval,
        ));
    }

    async fn end_call(&mut self) {
        info!(room = %self.room_code, "ending call");
        if let Some(announcer) = self.announcer.take() {
            announcer.abort();
        }
        self.negotiation.close().await;
        self.spectators.close_all().await;
        if let Err(e) = self.registry.set_room_active(&self.room_code, false).await {
            error!("failed to mark room inactive: {e}");
        }
        if let Err(e) = self.transport.leave(&room_topic(&self.room_code)).await {
            warn!("failed to leave room topic: {e}");
        }
        self.notify(SessionNotice::CallEnded);
    }

    fn notify(&self, notice: SessionNotice) {
        // Send fails only when nobody subscribed, which is fine.
        let _ = self.notices.send(notice);
    }
}
