mod participant;
mod presence;
mod room;
mod signaling;
mod spectator;

pub use participant::{MemberKey, ParticipantId};
pub use presence::{OnlineMarker, PresenceSet};
pub use room::{RoomCode, RoomCodeError, RoomRecord};
pub use signaling::{IceCandidate, SdpKind, SessionDescription, SignalEvent};
pub use spectator::SpectatorToken;
