use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not subscribed to topic {0:?}")]
    NotSubscribed(String),
    #[error("relay send failed: {0}")]
    Send(String),
    #[error("relay payload rejected: {0}")]
    Codec(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("local media is not ready")]
    NotReady,
    #[error("description rejected: {0}")]
    Sdp(String),
    #[error("peer link error: {0}")]
    Link(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("session is closed")]
    Closed,
}
