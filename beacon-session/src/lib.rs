pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod presence;
pub mod registry;
pub mod role;
pub mod session;
pub mod spectator;
pub mod transport;

pub use config::SessionConfig;
pub use error::{MediaError, RegistryError, SessionError, TransportError};
pub use role::{Politeness, Role, RoleAssignment, assign_role};
pub use session::{Session, SessionCommand, SessionHandle, SessionNotice, SpectatorInvite};
