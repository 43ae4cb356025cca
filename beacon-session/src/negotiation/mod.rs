mod event;
mod machine;

pub use event::NegotiationEvent;
pub use machine::{Negotiation, SignalingState};
