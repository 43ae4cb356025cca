use crate::model::RoomCode;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One-time association between a spectator link and a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectatorToken {
    pub room_code: RoomCode,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SpectatorToken {
    pub fn generate(room_code: RoomCode, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            room_code,
            token: Uuid::new_v4().simple().to_string(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Viewer URL carrying the room code and token as query parameters.
    pub fn viewer_url(&self, base: &str) -> String {
        format!(
            "{}?roomCode={}&token={}",
            base.trim_end_matches('/'),
            self.room_code,
            self.token
        )
    }
}
