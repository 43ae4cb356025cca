mod session;
mod session_command;

pub use session::{Session, SessionHandle, SessionNotice};
pub use session_command::{SessionCommand, SpectatorInvite};
