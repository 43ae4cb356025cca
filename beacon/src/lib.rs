pub use beacon_core::model::RoomCode;

pub mod model {
    pub use beacon_core::model::*;
}

#[cfg(feature = "session")]
pub mod session {
    pub use beacon_session::*;
}
