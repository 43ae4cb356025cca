use beacon_core::{IceCandidate, SessionDescription};

/// Inputs to the primary negotiation: local call intent, or a message from
/// the relay. Every guard lives behind [`Negotiation::apply`], so handlers
/// never inspect signaling state themselves.
///
/// [`Negotiation::apply`]: crate::negotiation::Negotiation::apply
#[derive(Debug, Clone)]
pub enum NegotiationEvent {
    /// Local intent to start the call (presence trigger or its timed retry).
    IntentToCall,
    OfferReceived(SessionDescription),
    AnswerReceived(SessionDescription),
    CandidateReceived(IceCandidate),
}
