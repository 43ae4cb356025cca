use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Short human-shareable code scoping a signaling topic and its registry record.
///
/// Accepts 4-6 alphanumeric characters; generation produces the classic
/// 4-digit numeric form.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
pub struct RoomCode(String);

#[derive(Debug, Error)]
pub enum RoomCodeError {
    #[error("room code must be 4-6 alphanumeric characters, got {0:?}")]
    Invalid(String),
}

impl RoomCode {
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let code = input.trim();
        let valid = (4..=6).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(RoomCodeError::Invalid(input.to_string()));
        }
        Ok(Self(code.to_string()))
    }

    /// Random 4-digit code in 1000..=9999.
    pub fn generate() -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        let seed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Self(format!("{}", 1000 + seed % 9000))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registry record per room code. Never hard-deleted; termination flips
/// `is_active` back to false so the next joiner becomes the initiator again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    pub room_code: RoomCode,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    pub fn new(room_code: RoomCode, is_active: bool) -> Self {
        let now = Utc::now();
        Self {
            room_code,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }
}
