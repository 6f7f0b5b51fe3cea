pub mod client;
pub mod config;
pub mod pool;
pub mod transport;

pub use client::{PlayerApi, PlayerProtocolClient};
pub use config::{ClientPoolConfig, PlayerTimeouts};
pub use pool::ClientPool;
pub use transport::{PlayerRequest, PlayerTransport};
