use std::time::Duration;

/// Tunables for one joined session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between `room-active` heartbeats on the discovery topic.
    pub presence_interval: Duration,
    /// Delay before the initiator re-attempts its first offer, covering the
    /// case where presence sync fires before local media is ready.
    pub offer_fallback_delay: Duration,
    /// Validity window written into issued spectator tokens.
    pub spectator_token_ttl: chrono::Duration,
    /// Topic the announcer advertises on, separate from the room topic.
    pub discovery_topic: String,
    /// Base URL spectator links are composed against.
    pub viewer_base_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            presence_interval: Duration::from_secs(5),
            offer_fallback_delay: Duration::from_millis(800),
            spectator_token_ttl: chrono::Duration::hours(24),
            discovery_topic: "room-discovery".to_owned(),
            viewer_base_url: "https://spectators.example".to_owned(),
        }
    }
}
