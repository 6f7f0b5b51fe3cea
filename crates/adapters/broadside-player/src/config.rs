use std::time::Duration;

/// Per-operation deadlines for calls to a player. Each call gets its own
/// deadline; nothing carries over between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerTimeouts {
    pub ready: Duration,
    pub shot: Duration,
    pub shots: Duration,
    pub finished: Duration,
}

impl Default for PlayerTimeouts {
    fn default() -> Self {
        Self {
            ready: Duration::from_secs(30),
            shot: Duration::from_secs(5),
            shots: Duration::from_secs(15),
            finished: Duration::from_secs(10),
        }
    }
}

/// Settings for the per-base-URL HTTP client pool.
#[derive(Debug, Clone)]
pub struct ClientPoolConfig {
    /// Upper bound on cached clients; the least recently used one is dropped first.
    pub max_clients: usize,
    /// Clients unused for this long are evicted.
    pub idle_ttl: Duration,
    pub user_agent: String,
}

impl Default for ClientPoolConfig {
    fn default() -> Self {
        Self {
            max_clients: 64,
            idle_ttl: Duration::from_secs(600),
            user_agent: format!("broadside/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
