use crate::model::{ParticipantId, RoomCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A session description as produced/consumed by the media capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Discovered network path descriptor, exchanged to establish connectivity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

/// Broadcast protocol spoken over a room topic.
///
/// Spectator-path events always carry the `participant_id` of the fan-out
/// connection they belong to; receivers resolve the connection by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum SignalEvent {
    /// Primary offer when `participant_id` is absent, fan-out offer otherwise.
    Offer {
        offer: SessionDescription,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant_id: Option<ParticipantId>,
    },
    Answer {
        answer: SessionDescription,
    },
    /// A viewer announcing it is ready to receive a one-way feed.
    SpectatorReady,
    SpectatorAnswer {
        answer: SessionDescription,
        participant_id: ParticipantId,
    },
    IceCandidate {
        candidate: IceCandidate,
    },
    /// Viewer-side candidate for one fan-out connection.
    SpectatorIce {
        candidate: IceCandidate,
        participant_id: ParticipantId,
    },
    /// Host-side candidate addressed to one fan-out connection.
    ParticipantIce {
        participant_id: ParticipantId,
        candidate: IceCandidate,
    },
    /// Liveness heartbeat on the discovery topic.
    RoomActive {
        room_code: RoomCode,
        timestamp: i64,
    },
}
