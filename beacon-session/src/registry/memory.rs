use crate::error::RegistryError;
use crate::registry::RoomRegistry;
use async_trait::async_trait;
use beacon_core::{RoomCode, RoomRecord, SpectatorToken};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process registry backend for tests and demos.
#[derive(Default)]
pub struct MemoryRegistry {
    rooms: DashMap<RoomCode, RoomRecord>,
    tokens: DashMap<String, SpectatorToken>,
    unavailable: AtomicBool,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail, to exercise degraded paths.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Backend("registry unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomRegistry for MemoryRegistry {
    async fn get_room(&self, code: &RoomCode) -> Result<Option<RoomRecord>, RegistryError> {
        self.check_available()?;
        Ok(self.rooms.get(code).map(|r| r.value().clone()))
    }

    async fn upsert_room(
        &self,
        code: &RoomCode,
        is_active: bool,
    ) -> Result<RoomRecord, RegistryError> {
        self.check_available()?;
        let record = RoomRecord::new(code.clone(), is_active);
        self.rooms.insert(code.clone(), record.clone());
        Ok(record)
    }

    async fn set_room_active(&self, code: &RoomCode, active: bool) -> Result<(), RegistryError> {
        self.check_available()?;
        if let Some(mut record) = self.rooms.get_mut(code) {
            record.is_active = active;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_spectator_token(&self, token: &SpectatorToken) -> Result<(), RegistryError> {
        self.check_available()?;
        self.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }
}
