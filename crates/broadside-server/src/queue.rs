use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};

use broadside_core::error::ArenaError;

use crate::tournament::{TournamentMessage, TournamentRunner};

/// Producer side of the tournament queue.
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<TournamentMessage>,
}

impl QueueSender {
    /// Enqueue a tournament. Waits while the queue is full; fails once the
    /// worker side is gone.
    pub async fn send(&self, message: TournamentMessage) -> Result<(), ArenaError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ArenaError::QueueClosed)
    }

    /// Messages waiting to be picked up.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

pub struct QueueReceiver {
    rx: mpsc::Receiver<TournamentMessage>,
}

pub fn channel(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Pull messages and run up to `concurrency` tournaments at once, each on
/// its own task. Stops once every sender is dropped and running
/// tournaments have finished.
pub fn spawn_worker(
    runner: Arc<TournamentRunner>,
    receiver: QueueReceiver,
    concurrency: usize,
) -> JoinHandle<()> {
    let mut rx = receiver.rx;
    tokio::spawn(async move {
        let permits = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut running = JoinSet::new();

        while let Some(message) = rx.recv().await {
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let runner = Arc::clone(&runner);
            running.spawn(async move {
                let _permit = permit;
                let player_id = message.player_id.clone();
                let outcome = runner.run(message).await;
                tracing::info!(player_id = %player_id, ?outcome, "Tournament run ended");
            });

            while let Some(result) = running.try_join_next() {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Tournament task failed");
                }
            }
        }

        while let Some(result) = running.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Tournament task failed");
            }
        }
        tracing::info!("Tournament queue closed, worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use broadside_core::test_helpers::single_ship_board;
    use broadside_player::PlayerApi;
    use time::OffsetDateTime;

    use crate::config::TournamentConfig;
    use crate::lease::{LeaseCoordinator, MemoryLeaseCoordinator};
    use crate::store::{MEASUREMENT_PARTITION, Stores};
    use crate::testing::FakePlayer;

    fn message(player_id: &str, lease_token: String) -> TournamentMessage {
        TournamentMessage {
            player_id: player_id.to_string(),
            player_name: player_id.to_uppercase(),
            web_api_url: "http://player.test".to_string(),
            api_key: None,
            lease_token,
            lease_end: OffsetDateTime::now_utc() + Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn send_fails_when_worker_gone() {
        let (tx, rx) = channel(4);
        drop(rx);
        let err = tx
            .send(message("p1", "t".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err, ArenaError::QueueClosed);
    }

    #[tokio::test]
    async fn depth_counts_waiting_messages() {
        let (tx, _rx) = channel(4);
        assert_eq!(tx.depth(), 0);
        tx.send(message("p1", "t".to_string())).await.unwrap();
        tx.send(message("p2", "t".to_string())).await.unwrap();
        assert_eq!(tx.depth(), 2);
    }

    #[tokio::test]
    async fn worker_runs_every_queued_tournament() {
        let leases = Arc::new(MemoryLeaseCoordinator::new());
        let stores = Stores::in_memory([]);
        let config = TournamentConfig {
            games: 3,
            ..TournamentConfig::default()
        };
        let runner = TournamentRunner::new(
            FakePlayer::sweeping() as Arc<dyn PlayerApi>,
            Arc::clone(&leases) as Arc<dyn LeaseCoordinator>,
            stores.clone(),
            config,
        )
        .with_board_factory(Arc::new(|| single_ship_board(2)));

        let (tx, rx) = channel(8);
        let worker = spawn_worker(Arc::new(runner), rx, 2);

        for id in ["p1", "p2", "p3"] {
            let lease = leases.acquire(id, Duration::from_secs(60)).await.unwrap();
            tx.send(message(id, lease.token)).await.unwrap();
        }
        drop(tx);
        tokio::time::timeout(Duration::from_secs(10), worker)
            .await
            .expect("worker should stop after the queue closes")
            .unwrap();

        let measured = stores.measurements.get(MEASUREMENT_PARTITION).await.unwrap();
        assert_eq!(measured.len(), 3);
        assert!(measured.iter().all(|m| m.avg_number_of_shots == 2.0));

        // Every lease was released when its run ended.
        for id in ["p1", "p2", "p3"] {
            leases.acquire(id, Duration::from_secs(60)).await.unwrap();
        }
    }
}
