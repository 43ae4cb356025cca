mod loopback;
mod rtc;

pub use loopback::{LoopbackConnector, LoopbackLink};
pub use rtc::{RtcConfig, RtcConnector, RtcLink};

use crate::error::MediaError;
use async_trait::async_trait;
use beacon_core::{IceCandidate, ParticipantId, SessionDescription};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Which connection a media event belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOrigin {
    Primary,
    Spectator(ParticipantId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Events emitted by live links into the session loop.
#[derive(Debug, Clone)]
pub enum MediaEvent {
    CandidateGenerated {
        origin: LinkOrigin,
        candidate: IceCandidate,
    },
    LinkStateChanged {
        origin: LinkOrigin,
        state: LinkState,
    },
}

/// One peer-to-peer media connection, driven through the opaque
/// offer/answer/candidate surface of the underlying transport.
#[async_trait]
pub trait MediaLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, MediaError>;
    async fn create_answer(&self) -> Result<SessionDescription, MediaError>;
    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), MediaError>;
    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), MediaError>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), MediaError>;
    async fn close(&self) -> Result<(), MediaError>;
}

/// Factory for [`MediaLink`]s sharing one set of local tracks.
///
/// Every link built by a connector attaches the same track references; the
/// primary connection and all spectator fan-out connections see mute toggles
/// and track replacement without per-link calls from the session core.
#[async_trait]
pub trait MediaConnector: Send + Sync {
    /// Local capture is ready, so offers may be created.
    fn media_ready(&self) -> bool;

    /// Toggle a local track kind; returns the resulting enabled state.
    fn set_track_enabled(&self, kind: TrackKind, enabled: bool) -> bool;

    fn track_enabled(&self, kind: TrackKind) -> bool;

    /// Build a new link wired to push its candidate/state events, tagged
    /// with `origin`, into `events`.
    async fn connect(
        &self,
        origin: LinkOrigin,
        events: mpsc::Sender<MediaEvent>,
    ) -> Result<Arc<dyn MediaLink>, MediaError>;
}
