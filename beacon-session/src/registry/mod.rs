mod memory;

pub use memory::MemoryRegistry;

use crate::error::RegistryError;
use async_trait::async_trait;
use beacon_core::{RoomCode, RoomRecord, SpectatorToken};

/// External key-value store holding room records and spectator tokens.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    async fn get_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, RegistryError>;

    /// Create or replace the record for `code` with the given active flag.
    async fn upsert_room(&self, code: &RoomCode, is_active: bool)
    -> Result<RoomRecord, RegistryError>;

    async fn set_room_active(&self, code: &RoomCode, active: bool) -> Result<(), RegistryError>;

    async fn insert_spectator_token(&self, token: &SpectatorToken) -> Result<(), RegistryError>;
}
