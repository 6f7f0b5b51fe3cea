//! In-process player and lease doubles for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use broadside_core::error::ArenaError;
use broadside_core::game::Game;
use broadside_core::index::BoardIndex;
use broadside_core::test_helpers::sweep_target;
use broadside_player::PlayerApi;

use crate::lease::{Lease, LeaseCoordinator, MemoryLeaseCoordinator};
use crate::store::{Entity, Table};

#[derive(Debug, Default)]
pub struct FakeCalls {
    pub ready: usize,
    pub shots: usize,
    /// Game ids of every `get_shots` batch, in call order.
    pub batches: Vec<Vec<uuid::Uuid>>,
    /// Shot counts of every game reported finished.
    pub finished: Vec<u32>,
}

/// A player answering from memory: it sweeps the board row-major unless
/// told to misbehave.
#[derive(Default)]
pub struct FakePlayer {
    pub ready_fails: bool,
    pub shots_fail: bool,
    pub finished_fails: bool,
    /// Always answer with this square instead of sweeping.
    pub stuck_on: Option<BoardIndex>,
    pub calls: Mutex<FakeCalls>,
}

impl FakePlayer {
    pub fn sweeping() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_shots() -> Arc<Self> {
        Arc::new(Self {
            shots_fail: true,
            ..Self::default()
        })
    }

    fn next_shot(&self, game: &Game) -> Result<BoardIndex, ArenaError> {
        if self.shots_fail {
            return Err(ArenaError::UnexpectedStatus {
                status: 500,
                body: "boom".to_string(),
            });
        }
        if let Some(idx) = self.stuck_on {
            return Ok(idx);
        }
        sweep_target(&game.board().snapshot())
            .ok_or_else(|| ArenaError::invalid_shot(None, "board exhausted"))
    }
}

#[async_trait]
impl PlayerApi for FakePlayer {
    async fn get_ready(
        &self,
        _url: &str,
        _api_key: Option<&str>,
        _number_of_games: u32,
    ) -> Result<(), ArenaError> {
        self.calls.lock().ready += 1;
        if self.ready_fails {
            return Err(ArenaError::Timeout {
                url: "http://fake/getReady".to_string(),
                timeout: Duration::from_secs(1),
            });
        }
        Ok(())
    }

    async fn get_shot(
        &self,
        _url: &str,
        game: &Game,
        _api_key: Option<&str>,
    ) -> Result<BoardIndex, ArenaError> {
        self.calls.lock().shots += 1;
        self.next_shot(game)
    }

    async fn get_shots(
        &self,
        _url: &str,
        games: &[&Game],
        _api_key: Option<&str>,
    ) -> Result<Vec<BoardIndex>, ArenaError> {
        self.calls
            .lock()
            .batches
            .push(games.iter().map(|g| g.id()).collect());
        games.iter().map(|g| self.next_shot(g)).collect()
    }

    async fn finished(
        &self,
        _url: &str,
        games: &[&Game],
        _api_key: Option<&str>,
    ) -> Result<(), ArenaError> {
        self.calls
            .lock()
            .finished
            .extend(games.iter().map(|g| g.shot_count()));
        if self.finished_fails {
            return Err(ArenaError::UnexpectedStatus {
                status: 404,
                body: String::new(),
            });
        }
        Ok(())
    }
}

/// Memory leases that count renew and release calls.
#[derive(Default)]
pub struct CountingLeases {
    pub inner: MemoryLeaseCoordinator,
    pub renewals: AtomicUsize,
    pub releases: AtomicUsize,
    /// Let this many renewals through, then fail the rest as if the lease
    /// had expired.
    pub fail_renewals_after: Option<usize>,
}

impl CountingLeases {
    pub fn renewals(&self) -> usize {
        self.renewals.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LeaseCoordinator for CountingLeases {
    async fn acquire(&self, player_id: &str, duration: Duration) -> Result<Lease, ArenaError> {
        self.inner.acquire(player_id, duration).await
    }

    async fn renew(&self, player_id: &str, token: &str) -> Result<Lease, ArenaError> {
        let renewal = self.renewals.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_renewals_after.is_some_and(|allowed| renewal > allowed) {
            return Err(ArenaError::LeaseExpired {
                player_id: player_id.to_string(),
            });
        }
        self.inner.renew(player_id, token).await
    }

    async fn release(&self, player_id: &str, token: &str) -> Result<(), ArenaError> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release(player_id, token).await
    }

    async fn delete(&self, player_id: &str, token: &str) -> Result<(), ArenaError> {
        self.inner.delete(player_id, token).await
    }
}

/// A table whose every operation fails, standing in for an unreachable store.
pub struct FailingTable;

fn unavailable() -> ArenaError {
    ArenaError::Storage("table unavailable".to_string())
}

#[async_trait]
impl<E: Entity> Table<E> for FailingTable {
    async fn add(&self, _entity: E) -> Result<(), ArenaError> {
        Err(unavailable())
    }

    async fn get_single(&self, _partition: &str, _row: &str) -> Result<Option<E>, ArenaError> {
        Err(unavailable())
    }

    async fn get(&self, _partition: &str) -> Result<Vec<E>, ArenaError> {
        Err(unavailable())
    }

    async fn replace(&self, _entity: E) -> Result<(), ArenaError> {
        Err(unavailable())
    }

    async fn delete(&self, _partition: &str, _row: &str) -> Result<(), ArenaError> {
        Err(unavailable())
    }
}
