use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use broadside_player::pool::spawn_eviction_task;
use broadside_server::build_app;
use broadside_server::config::ServerConfig;
use broadside_server::queue::spawn_worker;

#[tokio::main]
async fn main() {
    let json_logs = std::env::var("BROADSIDE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    let config = ServerConfig::load();
    config.validate();

    let listen_addr = config.listen_addr.clone();
    let eviction_interval = config.player.eviction_interval();
    let concurrency = config.queue.concurrency;
    let players = config.players.len();

    let (app, _state, worker) = build_app(config);
    spawn_eviction_task(Arc::clone(&worker.pool), eviction_interval);
    spawn_worker(worker.runner, worker.receiver, concurrency);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %listen_addr, error = %e, "Failed to bind listener");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %listen_addr, players, concurrency, "Broadside server listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
