use std::time::Duration;

use serde::Deserialize;

use broadside_player::{ClientPoolConfig, PlayerTimeouts};

const DEFAULT_CONFIG_PATH: &str = "broadside.toml";

/// Top-level server configuration, loaded from `broadside.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub player: PlayerConfig,
    pub tournament: TournamentConfig,
    pub queue: QueueConfig,
    /// Players known to the in-memory registry at startup.
    pub players: Vec<PlayerSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            player: PlayerConfig::default(),
            tournament: TournamentConfig::default(),
            queue: QueueConfig::default(),
            players: Vec::new(),
        }
    }
}

/// How the engine talks to players: per-call deadlines and client pooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub ready_timeout_ms: u64,
    pub shot_timeout_ms: u64,
    pub shots_timeout_ms: u64,
    pub finished_timeout_ms: u64,
    pub max_clients: usize,
    pub client_idle_secs: u64,
    pub eviction_interval_secs: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        let timeouts = PlayerTimeouts::default();
        let pool = ClientPoolConfig::default();
        Self {
            ready_timeout_ms: timeouts.ready.as_millis() as u64,
            shot_timeout_ms: timeouts.shot.as_millis() as u64,
            shots_timeout_ms: timeouts.shots.as_millis() as u64,
            finished_timeout_ms: timeouts.finished.as_millis() as u64,
            max_clients: pool.max_clients,
            client_idle_secs: pool.idle_ttl.as_secs(),
            eviction_interval_secs: 60,
        }
    }
}

impl PlayerConfig {
    pub fn timeouts(&self) -> PlayerTimeouts {
        PlayerTimeouts {
            ready: Duration::from_millis(self.ready_timeout_ms),
            shot: Duration::from_millis(self.shot_timeout_ms),
            shots: Duration::from_millis(self.shots_timeout_ms),
            finished: Duration::from_millis(self.finished_timeout_ms),
        }
    }

    pub fn pool_config(&self) -> ClientPoolConfig {
        ClientPoolConfig {
            max_clients: self.max_clients,
            idle_ttl: Duration::from_secs(self.client_idle_secs),
            ..ClientPoolConfig::default()
        }
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs)
    }
}

/// Shape of one tournament run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TournamentConfig {
    /// Trial games per tournament.
    pub games: u32,
    /// Shots charged for a game that failed.
    pub penalty_shots: u32,
    /// Failed games tolerated; one more aborts the run.
    pub max_errors: u32,
    /// Rounds after which a single game is given up.
    pub max_rounds: u32,
    pub lease_duration_secs: u64,
    /// Renew the lease once it is this close to expiring.
    pub renewal_threshold_secs: u64,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            games: 100,
            penalty_shots: 200,
            max_errors: 5,
            max_rounds: 200,
            lease_duration_secs: 60,
            renewal_threshold_secs: 20,
        }
    }
}

impl TournamentConfig {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }

    pub fn renewal_threshold(&self) -> Duration {
        Duration::from_secs(self.renewal_threshold_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Tournaments (for different players) running at once.
    pub concurrency: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            concurrency: 4,
        }
    }
}

/// A player registered at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSeed {
    pub id: String,
    pub name: String,
    pub web_api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ServerConfig {
    /// Every invalid setting, as a human-readable message.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }

        let p = &self.player;
        for (name, value) in [
            ("player.ready_timeout_ms", p.ready_timeout_ms),
            ("player.shot_timeout_ms", p.shot_timeout_ms),
            ("player.shots_timeout_ms", p.shots_timeout_ms),
            ("player.finished_timeout_ms", p.finished_timeout_ms),
            ("player.client_idle_secs", p.client_idle_secs),
            ("player.eviction_interval_secs", p.eviction_interval_secs),
        ] {
            if value == 0 {
                problems.push(format!("{name} must be > 0"));
            }
        }
        if p.max_clients == 0 {
            problems.push("player.max_clients must be > 0".to_string());
        }

        let t = &self.tournament;
        if t.games == 0 {
            problems.push("tournament.games must be > 0".to_string());
        }
        if t.max_rounds == 0 {
            problems.push("tournament.max_rounds must be > 0".to_string());
        }
        if t.lease_duration_secs == 0 {
            problems.push("tournament.lease_duration_secs must be > 0".to_string());
        }
        if t.renewal_threshold_secs >= t.lease_duration_secs {
            problems.push(
                "tournament.renewal_threshold_secs must be below lease_duration_secs".to_string(),
            );
        }

        if self.queue.capacity == 0 {
            problems.push("queue.capacity must be > 0".to_string());
        }
        if self.queue.concurrency == 0 {
            problems.push("queue.concurrency must be > 0".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for seed in &self.players {
            if seed.id.trim().is_empty() {
                problems.push("players: id must not be blank".to_string());
            } else if !seen.insert(seed.id.as_str()) {
                problems.push(format!("players: duplicate id {:?}", seed.id));
            }
            if seed.web_api_url.trim().is_empty() {
                problems.push(format!("players: {:?} has no web_api_url", seed.id));
            }
        }

        problems
    }

    /// Validate configuration, exiting on the first invalid setting.
    pub fn validate(&self) {
        let problems = self.problems();
        for problem in &problems {
            tracing::error!("{problem}");
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }

        if self.players.iter().any(|p| p.api_key.is_some()) {
            tracing::warn!("Player API keys are set in the config file; keep it out of version control");
        }
    }

    /// Load config from `broadside.toml` (or `BROADSIDE_CONFIG`) if it exists,
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path =
            std::env::var("BROADSIDE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "Failed to parse configuration: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No configuration file found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("BROADSIDE_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }

        // Tournament overrides
        if let Ok(val) = std::env::var("BROADSIDE_GAMES")
            && let Ok(n) = val.parse::<u32>()
        {
            config.tournament.games = n;
        }
        if let Ok(val) = std::env::var("BROADSIDE_MAX_ERRORS")
            && let Ok(n) = val.parse::<u32>()
        {
            config.tournament.max_errors = n;
        }
        if let Ok(val) = std::env::var("BROADSIDE_MAX_ROUNDS")
            && let Ok(n) = val.parse::<u32>()
        {
            config.tournament.max_rounds = n;
        }

        // Player call overrides
        if let Ok(val) = std::env::var("BROADSIDE_SHOT_TIMEOUT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.player.shot_timeout_ms = n;
        }
        if let Ok(val) = std::env::var("BROADSIDE_SHOTS_TIMEOUT_MS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.player.shots_timeout_ms = n;
        }

        if let Ok(val) = std::env::var("BROADSIDE_QUEUE_CONCURRENCY")
            && let Ok(n) = val.parse::<usize>()
        {
            config.queue.concurrency = n;
        }

        config
    }
}
