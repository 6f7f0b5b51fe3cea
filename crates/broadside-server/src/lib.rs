pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod lease;
pub mod orchestrator;
pub mod queue;
pub mod state;
pub mod store;
pub mod tournament;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use broadside_player::{ClientPool, PlayerApi, PlayerProtocolClient, PlayerTransport};

use config::ServerConfig;
use lease::{LeaseCoordinator, MemoryLeaseCoordinator};
use queue::QueueReceiver;
use state::AppState;
use store::{PlayerRecord, Stores};
use tournament::TournamentRunner;

/// The background half of the app, started by the caller.
pub struct Worker {
    pub runner: Arc<TournamentRunner>,
    pub receiver: QueueReceiver,
    pub pool: Arc<ClientPool>,
}

/// Build the Axum router, application state, and tournament worker from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState, Worker) {
    let pool = Arc::new(ClientPool::new(config.player.pool_config()));
    let player: Arc<dyn PlayerApi> = Arc::new(PlayerProtocolClient::new(
        PlayerTransport::new(Arc::clone(&pool)),
        config.player.timeouts(),
    ));
    let leases: Arc<dyn LeaseCoordinator> = Arc::new(MemoryLeaseCoordinator::new());
    let stores = Stores::in_memory(config.players.iter().cloned().map(PlayerRecord::from));

    let runner = Arc::new(TournamentRunner::new(
        player,
        Arc::clone(&leases),
        stores.clone(),
        config.tournament.clone(),
    ));
    let (queue, receiver) = queue::channel(config.queue.capacity);

    let state = AppState {
        stores,
        leases,
        queue,
        config: Arc::new(config),
    };
    let worker = Worker {
        runner,
        receiver,
        pool,
    };
    (router(state.clone()), state, worker)
}

pub fn router(state: AppState) -> Router<()> {
    let api_routes = Router::new()
        .route(
            "/players/{player_id}/tournaments",
            post(api::start_tournament),
        )
        .route("/players/{player_id}/measurement", get(api::get_measurement))
        .route("/players/{player_id}/log", get(api::get_log));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api_routes)
        .with_state(state)
}
