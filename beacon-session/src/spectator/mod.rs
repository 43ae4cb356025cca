mod connection;
mod fanout;

pub use connection::SpectatorConnection;
pub use fanout::SpectatorFanout;
