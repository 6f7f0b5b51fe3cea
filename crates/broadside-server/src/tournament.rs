use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use broadside_core::error::ArenaError;
use broadside_player::PlayerApi;

use crate::config::TournamentConfig;
use crate::lease::LeaseCoordinator;
use crate::orchestrator::{BoardFactory, GameOrchestrator, RoundObserver};
use crate::store::{Stores, TournamentMeasurement};

/// Queue message starting one tournament. The lease in it is already held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMessage {
    pub player_id: String,
    pub player_name: String,
    pub web_api_url: String,
    pub api_key: Option<String>,
    pub lease_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub lease_end: OffsetDateTime,
}

/// How a tournament run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// All games played (failed ones charged the penalty); measurement recorded.
    Completed { total_shots: u64, average: f64 },
    /// The player failed `getReady`.
    NotReady,
    /// Too many failed games.
    Aborted { errors: u32 },
    /// The lease could not be renewed.
    LeaseLost,
}

/// Runs one tournament per queue message: ready the player, play the trial
/// games sequentially while keeping the lease alive, record the average.
pub struct TournamentRunner {
    player: Arc<dyn PlayerApi>,
    leases: Arc<dyn LeaseCoordinator>,
    stores: Stores,
    orchestrator: GameOrchestrator,
    config: TournamentConfig,
}

impl TournamentRunner {
    pub fn new(
        player: Arc<dyn PlayerApi>,
        leases: Arc<dyn LeaseCoordinator>,
        stores: Stores,
        config: TournamentConfig,
    ) -> Self {
        let orchestrator = GameOrchestrator::new(Arc::clone(&player), config.max_rounds);
        Self {
            player,
            leases,
            stores,
            orchestrator,
            config,
        }
    }

    pub fn with_board_factory(mut self, new_board: BoardFactory) -> Self {
        self.orchestrator = self.orchestrator.with_board_factory(new_board);
        self
    }

    /// Renew the message's lease when forced or when it is about to expire.
    /// Otherwise the message comes back unchanged and the coordinator is not called.
    pub async fn renew_lease(
        &self,
        message: TournamentMessage,
        force: bool,
    ) -> Result<TournamentMessage, ArenaError> {
        let renew_at = message.lease_end - self.config.renewal_threshold();
        if !force && OffsetDateTime::now_utc() < renew_at {
            return Ok(message);
        }
        let lease = self
            .leases
            .renew(&message.player_id, &message.lease_token)
            .await?;
        tracing::debug!(
            player_id = %message.player_id,
            lease_end = %lease.expires_at,
            "Renewed tournament lease"
        );
        Ok(TournamentMessage {
            lease_token: lease.token,
            lease_end: lease.expires_at,
            ..message
        })
    }

    /// Run the tournament described by `message`, then release its lease.
    /// A message whose lease is no longer held ends as
    /// [`RunOutcome::LeaseLost`] without contacting the player.
    pub async fn run(&self, message: TournamentMessage) -> RunOutcome {
        tracing::info!(
            player_id = %message.player_id,
            games = self.config.games,
            "Starting tournament"
        );
        // Queued messages can outlive their lease.
        let message = match self.renew_lease(message.clone(), true).await {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::error!(
                    player_id = %message.player_id,
                    error = %e,
                    "Lease no longer held, tournament skipped"
                );
                self.log(&message, format!("Tournament skipped, lease lost: {e}"))
                    .await;
                return RunOutcome::LeaseLost;
            },
        };
        let mut keeper = LeaseKeeper {
            runner: self,
            message,
        };
        let outcome = self.play(&mut keeper).await;

        let message = &keeper.message;
        if let Err(e) = self
            .leases
            .release(&message.player_id, &message.lease_token)
            .await
        {
            tracing::warn!(player_id = %message.player_id, error = %e, "Failed to release lease");
        }
        outcome
    }

    async fn play(&self, keeper: &mut LeaseKeeper<'_>) -> RunOutcome {
        let message = keeper.message.clone();
        let player_id = message.player_id.as_str();
        let url = message.web_api_url.as_str();
        let api_key = message.api_key.as_deref();
        let games = self.config.games;

        if let Err(e) = self.player.get_ready(url, api_key, games).await {
            tracing::error!(player_id, error = %e, "Player is not ready, tournament aborted");
            self.log(&message, format!("Player is not ready: {e}")).await;
            return RunOutcome::NotReady;
        }

        let mut total_shots: u64 = 0;
        let mut errors: u32 = 0;
        for game_number in 1..=games {
            match self
                .orchestrator
                .play_game(url, api_key, Some(&mut *keeper))
                .await
            {
                Ok(shots) => total_shots += u64::from(shots),
                Err(e) if e.is_lease_error() => {
                    tracing::error!(player_id, error = %e, "Lost tournament lease, tournament aborted");
                    self.log(&message, format!("Tournament aborted, lease lost: {e}"))
                        .await;
                    return RunOutcome::LeaseLost;
                },
                Err(e) => {
                    errors += 1;
                    total_shots += u64::from(self.config.penalty_shots);
                    tracing::warn!(player_id, game_number, errors, error = %e, "Game failed");
                    self.log(&message, format!("Error in game {game_number}: {e}"))
                        .await;
                    if errors > self.config.max_errors {
                        tracing::error!(player_id, errors, "Too many errors, tournament aborted");
                        self.log(
                            &message,
                            format!("Tournament aborted after {errors} failed games"),
                        )
                        .await;
                        return RunOutcome::Aborted { errors };
                    }
                },
            }
        }

        let average = total_shots as f64 / f64::from(games);
        let measurement = TournamentMeasurement {
            player_id: message.player_id.clone(),
            player_name: message.player_name.clone(),
            avg_number_of_shots: average,
            last_measurement: OffsetDateTime::now_utc(),
        };
        tracing::info!(player_id, total_shots, average, errors, "Tournament finished");
        let entry = match self.stores.upsert_measurement(measurement).await {
            Ok(()) => format!(
                "Finished tournament: {total_shots} shots in total, {average:.2} on average"
            ),
            Err(e) => {
                tracing::error!(player_id, error = %e, "Failed to store measurement");
                format!(
                    "Measurement not stored ({total_shots} shots in total, \
                     {average:.2} on average): {e}"
                )
            },
        };
        self.log(&message, entry).await;

        RunOutcome::Completed {
            total_shots,
            average,
        }
    }

    async fn log(&self, message: &TournamentMessage, text: String) {
        if let Err(e) = self
            .stores
            .append_log(&message.player_id, text, Some(&message.web_api_url))
            .await
        {
            tracing::warn!(player_id = %message.player_id, error = %e, "Failed to append log entry");
        }
    }
}

/// Renews the lease between rounds, carrying the latest lease state.
struct LeaseKeeper<'a> {
    runner: &'a TournamentRunner,
    message: TournamentMessage,
}

#[async_trait]
impl<'a> RoundObserver for LeaseKeeper<'a> {
    async fn round_complete(&mut self) -> Result<(), ArenaError> {
        self.message = self.runner.renew_lease(self.message.clone(), false).await?;
        Ok(())
    }
}
