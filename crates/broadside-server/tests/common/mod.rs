use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;

use broadside_core::protocol::{FinishedGame, ShotRequest};
use broadside_core::test_helpers::sweep_target;
use broadside_player::{
    ClientPool, ClientPoolConfig, PlayerProtocolClient, PlayerTimeouts, PlayerTransport,
};

use broadside_server::build_app;
use broadside_server::config::{PlayerSeed, ServerConfig, TournamentConfig};
use broadside_server::queue::spawn_worker;
use broadside_server::state::AppState;

/// How the mock player answers shot requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// First unknown square, row-major.
    Sweep,
    /// 500 with body "boom" on every call.
    Fail,
    /// Sweep, but only after sleeping.
    Slow(Duration),
    /// `getShots` answers one shot fewer than requested.
    ShortBatch,
    /// Answer with text that is not a board index.
    Garbage,
}

#[derive(Debug, Default)]
pub struct Calls {
    /// Raw query of every call, keyed by operation.
    pub queries: Vec<(&'static str, HashMap<String, String>)>,
    pub shots: usize,
    pub batches: Vec<Vec<ShotRequest>>,
    pub finished: Vec<FinishedGame>,
}

impl Calls {
    pub fn queries_for(&self, operation: &str) -> Vec<&HashMap<String, String>> {
        self.queries
            .iter()
            .filter(|(op, _)| *op == operation)
            .map(|(_, q)| q)
            .collect()
    }
}

#[derive(Clone)]
struct MockState {
    behavior: Behavior,
    calls: Arc<Mutex<Calls>>,
}

/// A player service implementing the shooter protocol on a random local port.
pub struct MockPlayer {
    pub addr: SocketAddr,
    pub calls: Arc<Mutex<Calls>>,
    _server: tokio::task::JoinHandle<()>,
}

impl MockPlayer {
    pub async fn start(behavior: Behavior) -> Self {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let state = MockState {
            behavior,
            calls: Arc::clone(&calls),
        };
        let app = Router::new()
            .route("/api/getReady", get(ready))
            .route("/api/getShot", post(shot))
            .route("/api/getShots", post(shots))
            .route("/api/finished", post(finished))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            calls,
            _server: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }
}

fn boom() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn ready(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.calls.lock().queries.push(("getReady", query));
    if state.behavior == Behavior::Fail {
        return boom();
    }
    StatusCode::OK.into_response()
}

async fn shot(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    Json(request): Json<ShotRequest>,
) -> Response {
    {
        let mut calls = state.calls.lock();
        calls.queries.push(("getShot", query));
        calls.shots += 1;
    }
    match state.behavior {
        Behavior::Fail => boom(),
        Behavior::Garbage => Json("Z0").into_response(),
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(answer(&request)).into_response()
        },
        Behavior::Sweep | Behavior::ShortBatch => Json(answer(&request)).into_response(),
    }
}

async fn shots(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    Json(requests): Json<Vec<ShotRequest>>,
) -> Response {
    let mut answers: Vec<String> = requests.iter().map(answer).collect();
    {
        let mut calls = state.calls.lock();
        calls.queries.push(("getShots", query));
        calls.batches.push(requests);
    }
    match state.behavior {
        Behavior::Fail => boom(),
        Behavior::ShortBatch => {
            answers.pop();
            Json(answers).into_response()
        },
        Behavior::Garbage => Json(vec!["Z0"; answers.len()]).into_response(),
        Behavior::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(answers).into_response()
        },
        Behavior::Sweep => Json(answers).into_response(),
    }
}

async fn finished(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    Json(games): Json<Vec<FinishedGame>>,
) -> StatusCode {
    let mut calls = state.calls.lock();
    calls.queries.push(("finished", query));
    calls.finished.extend(games);
    StatusCode::OK
}

fn answer(request: &ShotRequest) -> String {
    sweep_target(&request.board)
        .map(|idx| idx.to_string())
        .unwrap_or_default()
}

/// Protocol client with short deadlines, for tests.
pub fn protocol_client(shot_timeout: Duration) -> PlayerProtocolClient {
    let timeouts = PlayerTimeouts {
        ready: Duration::from_secs(5),
        shot: shot_timeout,
        shots: shot_timeout,
        finished: Duration::from_secs(5),
    };
    let pool = Arc::new(ClientPool::new(ClientPoolConfig::default()));
    PlayerProtocolClient::new(PlayerTransport::new(pool), timeouts)
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a server with a running worker.
    pub async fn new(config: ServerConfig) -> Self {
        Self::start(config, true).await
    }

    /// Start a server whose queue has no worker, so every enqueue fails.
    pub async fn without_worker(config: ServerConfig) -> Self {
        Self::start(config, false).await
    }

    async fn start(config: ServerConfig, with_worker: bool) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let concurrency = config.queue.concurrency;
        let (app, state, worker) = build_app(config);
        if with_worker {
            spawn_worker(worker.runner, worker.receiver, concurrency);
        } else {
            drop(worker);
        }

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Config with one registered player pointing at `web_api_url`.
pub fn config_with_player(id: &str, web_api_url: &str, games: u32) -> ServerConfig {
    ServerConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        tournament: TournamentConfig {
            games,
            ..TournamentConfig::default()
        },
        players: vec![PlayerSeed {
            id: id.to_string(),
            name: format!("Player {id}"),
            web_api_url: web_api_url.to_string(),
            api_key: Some("secret".to_string()),
        }],
        ..ServerConfig::default()
    }
}
