use crate::error::RegistryError;
use crate::registry::RoomRegistry;
use beacon_core::RoomCode;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns session start and drives the first offer.
    Initiator,
    /// Defers to the party already in the room.
    Responder,
}

/// Negotiation-conflict tie-break role. Tracked for diagnostics; the current
/// glare policy yields unconditionally and does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Politeness {
    Polite,
    Impolite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role: Role,
    pub politeness: Politeness,
}

impl RoleAssignment {
    pub fn initiator() -> Self {
        Self {
            role: Role::Initiator,
            politeness: Politeness::Impolite,
        }
    }

    pub fn responder() -> Self {
        Self {
            role: Role::Responder,
            politeness: Politeness::Polite,
        }
    }

    pub fn is_initiator(&self) -> bool {
        self.role == Role::Initiator
    }
}

/// Decide the local party's role from registry state.
///
/// Whoever finds the room missing or inactive owns the (re)start and drives
/// the offer; a party joining a live room defers. Registry failures degrade
/// to responder so two parties can never race to create the same room.
pub async fn assign_role(registry: &dyn RoomRegistry, code: &RoomCode) -> RoleAssignment {
    match registry.get_room(code).await {
        Ok(None) => match registry.upsert_room(code, true).await {
            Ok(_) => {
                info!(room = %code, "room created, joining as initiator");
                RoleAssignment::initiator()
            }
            Err(e) => degraded(e),
        },
        Ok(Some(room)) if !room.is_active => match registry.set_room_active(code, true).await {
            Ok(()) => {
                info!(room = %code, "room reactivated, joining as initiator");
                RoleAssignment::initiator()
            }
            Err(e) => degraded(e),
        },
        Ok(Some(_)) => {
            info!(room = %code, "room already active, joining as responder");
            RoleAssignment::responder()
        }
        Err(e) => degraded(e),
    }
}

fn degraded(error: RegistryError) -> RoleAssignment {
    error!("registry error during role assignment, assuming responder: {error}");
    RoleAssignment::responder()
}
