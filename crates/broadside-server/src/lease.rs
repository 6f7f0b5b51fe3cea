//! Per-player mutual exclusion for tournaments.
//!
//! A lease is a time-bounded lock on a player id. Only one live lease may
//! exist per id; a lease that is not renewed before it expires is treated as
//! released and the next acquire succeeds.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;

use broadside_core::error::ArenaError;

pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(60);

/// A held lease. The token is only valid for the player id it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub player_id: String,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// Distributed lock keyed by player id.
#[async_trait]
pub trait LeaseCoordinator: Send + Sync {
    /// Take the lock for `player_id`. Fails with `LeaseConflict` while
    /// another live lease exists.
    async fn acquire(&self, player_id: &str, duration: Duration) -> Result<Lease, ArenaError>;

    /// Extend a live lease by its original duration. Fails with
    /// `LeaseExpired` when the token is unknown, foreign, or expired.
    async fn renew(&self, player_id: &str, token: &str) -> Result<Lease, ArenaError>;

    /// Give up the lease but keep the lock object.
    async fn release(&self, player_id: &str, token: &str) -> Result<(), ArenaError>;

    /// Give up the lease and remove the lock object.
    async fn delete(&self, player_id: &str, token: &str) -> Result<(), ArenaError>;
}

struct Held {
    token: String,
    expires_at: OffsetDateTime,
    duration: Duration,
}

#[derive(Default)]
struct LockObject {
    held: Option<Held>,
}

/// In-process [`LeaseCoordinator`]: one lock object per player id.
#[derive(Default)]
pub struct MemoryLeaseCoordinator {
    locks: Mutex<HashMap<String, LockObject>>,
}

impl MemoryLeaseCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn has_lock_object(&self, player_id: &str) -> bool {
        self.locks.lock().contains_key(player_id)
    }
}

fn expired(player_id: &str) -> ArenaError {
    ArenaError::LeaseExpired {
        player_id: player_id.to_string(),
    }
}

#[async_trait]
impl LeaseCoordinator for MemoryLeaseCoordinator {
    async fn acquire(&self, player_id: &str, duration: Duration) -> Result<Lease, ArenaError> {
        let now = OffsetDateTime::now_utc();
        let mut locks = self.locks.lock();
        let lock = locks.entry(player_id.to_string()).or_default();

        if let Some(ref held) = lock.held
            && held.expires_at > now
        {
            return Err(ArenaError::LeaseConflict {
                player_id: player_id.to_string(),
            });
        }

        let token = uuid::Uuid::new_v4().to_string();
        let expires_at = now + duration;
        lock.held = Some(Held {
            token: token.clone(),
            expires_at,
            duration,
        });
        tracing::debug!(player_id, %expires_at, "Lease acquired");
        Ok(Lease {
            player_id: player_id.to_string(),
            token,
            expires_at,
        })
    }

    async fn renew(&self, player_id: &str, token: &str) -> Result<Lease, ArenaError> {
        let now = OffsetDateTime::now_utc();
        let mut locks = self.locks.lock();
        let held = locks
            .get_mut(player_id)
            .and_then(|lock| lock.held.as_mut())
            .filter(|held| held.token == token && held.expires_at > now)
            .ok_or_else(|| expired(player_id))?;

        held.expires_at = now + held.duration;
        tracing::debug!(player_id, expires_at = %held.expires_at, "Lease renewed");
        Ok(Lease {
            player_id: player_id.to_string(),
            token: held.token.clone(),
            expires_at: held.expires_at,
        })
    }

    async fn release(&self, player_id: &str, token: &str) -> Result<(), ArenaError> {
        let mut locks = self.locks.lock();
        let lock = locks
            .get_mut(player_id)
            .filter(|lock| lock.held.as_ref().is_some_and(|h| h.token == token))
            .ok_or_else(|| expired(player_id))?;
        lock.held = None;
        tracing::debug!(player_id, "Lease released");
        Ok(())
    }

    async fn delete(&self, player_id: &str, token: &str) -> Result<(), ArenaError> {
        let mut locks = self.locks.lock();
        let owns = locks
            .get(player_id)
            .and_then(|lock| lock.held.as_ref())
            .is_some_and(|h| h.token == token);
        if !owns {
            return Err(expired(player_id));
        }
        locks.remove(player_id);
        tracing::debug!(player_id, "Lease deleted");
        Ok(())
    }
}
