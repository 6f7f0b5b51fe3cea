use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use broadside_core::error::ArenaError;

use crate::config::ClientPoolConfig;

struct PooledClient {
    client: reqwest::Client,
    last_used: Instant,
}

/// HTTP clients keyed by player base URL, so connections to a player are
/// reused across the calls of a tournament.
pub struct ClientPool {
    config: ClientPoolConfig,
    clients: Mutex<HashMap<String, PooledClient>>,
}

impl ClientPool {
    pub fn new(config: ClientPoolConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client for `base_url`, created on first use.
    pub fn client_for(&self, base_url: &str) -> Result<reqwest::Client, ArenaError> {
        let key = pool_key(base_url);
        let now = Instant::now();
        let mut clients = self.clients.lock();

        if let Some(entry) = clients.get_mut(&key) {
            entry.last_used = now;
            return Ok(entry.client.clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .pool_idle_timeout(self.config.idle_ttl)
            .build()
            .map_err(|e| ArenaError::CommunicationFailure {
                url: key.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        while clients.len() >= self.config.max_clients.max(1) {
            let Some(oldest) = clients
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            clients.remove(&oldest);
            tracing::debug!(base_url = %oldest, "Evicted least recently used player client");
        }

        clients.insert(
            key,
            PooledClient {
                client: client.clone(),
                last_used: now,
            },
        );
        Ok(client)
    }

    /// Drop clients idle for longer than the configured TTL. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now())
    }

    fn evict_idle_at(&self, now: Instant) -> usize {
        let ttl = self.config.idle_ttl;
        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_used) < ttl);
        before - clients.len()
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn pool_key(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Periodically evict idle clients until the pool is dropped everywhere else.
pub fn spawn_eviction_task(pool: Arc<ClientPool>, interval: Duration) -> tokio::task::JoinHandle<()> {
    let pool = Arc::downgrade(&pool);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(pool) = pool.upgrade() else {
                break;
            };
            let evicted = pool.evict_idle();
            if evicted > 0 {
                tracing::debug!(evicted, remaining = pool.len(), "Evicted idle player clients");
            }
        }
    })
}
