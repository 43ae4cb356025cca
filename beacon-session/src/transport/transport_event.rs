use beacon_core::{PresenceSet, SignalEvent};

/// Events a subscribed endpoint receives from the relay.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Subscription acknowledged.
    Subscribed,
    /// A broadcast from another member of the topic.
    Signal(SignalEvent),
    /// Wholesale refresh of the topic's tracked members.
    PresenceSync(PresenceSet),
    /// The relay dropped the subscription.
    Closed,
}
