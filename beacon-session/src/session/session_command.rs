use crate::error::SessionError;
use crate::media::TrackKind;
use beacon_core::SpectatorToken;
use tokio::sync::oneshot;

/// A freshly issued spectator token plus the viewer URL composed from it.
#[derive(Debug, Clone)]
pub struct SpectatorInvite {
    pub token: SpectatorToken,
    pub url: String,
}

/// Commands the embedding application sends into a running session.
#[derive(Debug)]
pub enum SessionCommand {
    /// Tear the call down: close all links, mark the room inactive.
    EndCall,
    /// Issue and persist a spectator token, replying with the viewer link.
    ShareSpectatorLink {
        reply: oneshot::Sender<Result<SpectatorInvite, SessionError>>,
    },
    /// Mute/unmute a local track kind across every live link.
    SetTrackEnabled { kind: TrackKind, enabled: bool },
}
