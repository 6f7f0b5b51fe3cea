use async_trait::async_trait;

use broadside_core::error::ArenaError;
use broadside_core::game::Game;
use broadside_core::index::BoardIndex;
use broadside_core::protocol::{
    API_KEY_PARAM, FINISHED_PATH, FinishedGame, GET_READY_PATH, GET_SHOT_PATH, GET_SHOTS_PATH,
    NUMBER_OF_GAMES_PARAM, ShotRequest,
};

use crate::config::PlayerTimeouts;
use crate::transport::{PlayerRequest, PlayerTransport};

/// The shooter protocol as seen by the engine. Implementations never
/// recover errors; they surface every failure to the caller.
#[async_trait]
pub trait PlayerApi: Send + Sync {
    /// Announce a tournament of `number_of_games` games.
    async fn get_ready(
        &self,
        url: &str,
        api_key: Option<&str>,
        number_of_games: u32,
    ) -> Result<(), ArenaError>;

    async fn get_shot(
        &self,
        url: &str,
        game: &Game,
        api_key: Option<&str>,
    ) -> Result<BoardIndex, ArenaError>;

    /// One shot per game, in the order of `games`.
    async fn get_shots(
        &self,
        url: &str,
        games: &[&Game],
        api_key: Option<&str>,
    ) -> Result<Vec<BoardIndex>, ArenaError>;

    async fn finished(
        &self,
        url: &str,
        games: &[&Game],
        api_key: Option<&str>,
    ) -> Result<(), ArenaError>;
}

/// [`PlayerApi`] over HTTP.
#[derive(Clone)]
pub struct PlayerProtocolClient {
    transport: PlayerTransport,
    timeouts: PlayerTimeouts,
}

impl PlayerProtocolClient {
    pub fn new(transport: PlayerTransport, timeouts: PlayerTimeouts) -> Self {
        Self {
            transport,
            timeouts,
        }
    }
}

#[async_trait]
impl PlayerApi for PlayerProtocolClient {
    async fn get_ready(
        &self,
        url: &str,
        api_key: Option<&str>,
        number_of_games: u32,
    ) -> Result<(), ArenaError> {
        let request = PlayerRequest::get(GET_READY_PATH)
            .with_query(NUMBER_OF_GAMES_PARAM, number_of_games.to_string());
        self.transport
            .execute(url, with_api_key(request, api_key), self.timeouts.ready)
            .await?;
        Ok(())
    }

    async fn get_shot(
        &self,
        url: &str,
        game: &Game,
        api_key: Option<&str>,
    ) -> Result<BoardIndex, ArenaError> {
        let request = PlayerRequest::post_json(GET_SHOT_PATH, &game.shot_request())?;
        let body = self
            .transport
            .execute(url, with_api_key(request, api_key), self.timeouts.shot)
            .await?;
        parse_shot(&body)
    }

    async fn get_shots(
        &self,
        url: &str,
        games: &[&Game],
        api_key: Option<&str>,
    ) -> Result<Vec<BoardIndex>, ArenaError> {
        let requests: Vec<ShotRequest> = games.iter().map(|g| g.shot_request()).collect();
        let request = PlayerRequest::post_json(GET_SHOTS_PATH, &requests)?;
        let body = self
            .transport
            .execute(url, with_api_key(request, api_key), self.timeouts.shots)
            .await?;
        parse_shots(&body, games.len())
    }

    async fn finished(
        &self,
        url: &str,
        games: &[&Game],
        api_key: Option<&str>,
    ) -> Result<(), ArenaError> {
        let reports: Vec<FinishedGame> = games.iter().map(|g| g.finished_report()).collect();
        let request = PlayerRequest::post_json(FINISHED_PATH, &reports)?;
        self.transport
            .execute(url, with_api_key(request, api_key), self.timeouts.finished)
            .await?;
        Ok(())
    }
}

fn with_api_key(request: PlayerRequest, api_key: Option<&str>) -> PlayerRequest {
    match api_key {
        Some(key) if !key.is_empty() => request.with_query(API_KEY_PARAM, key),
        _ => request,
    }
}

const EXCERPT_CHARS: usize = 64;

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}

/// Decode a `getShot` answer: a JSON string holding a board index.
pub fn parse_shot(body: &str) -> Result<BoardIndex, ArenaError> {
    if body.trim().is_empty() {
        return Err(ArenaError::invalid_shot(None, "empty response body"));
    }
    let text: Option<String> = serde_json::from_str(body).map_err(|e| {
        ArenaError::invalid_shot(Some(&excerpt(body)), format!("not a JSON string: {e}"))
    })?;
    parse_index(text.as_deref())
}

/// Decode a `getShots` answer: a JSON array with exactly `expected` board indices.
pub fn parse_shots(body: &str, expected: usize) -> Result<Vec<BoardIndex>, ArenaError> {
    if body.trim().is_empty() {
        return Err(ArenaError::invalid_shot(None, "missing shot array"));
    }
    let shots: Option<Vec<Option<String>>> = serde_json::from_str(body).map_err(|e| {
        ArenaError::invalid_shot(
            Some(&excerpt(body)),
            format!("not a JSON array of strings: {e}"),
        )
    })?;
    let Some(shots) = shots else {
        return Err(ArenaError::invalid_shot(None, "missing shot array"));
    };
    if shots.len() != expected {
        return Err(ArenaError::invalid_shot(
            None,
            format!("expected {expected} shots, got {}", shots.len()),
        ));
    }
    shots.iter().map(|s| parse_index(s.as_deref())).collect()
}

fn parse_index(text: Option<&str>) -> Result<BoardIndex, ArenaError> {
    match text {
        None | Some("") => Err(ArenaError::invalid_shot(None, "empty shot")),
        Some(text) => text
            .parse()
            .map_err(|e: broadside_core::index::ParseBoardIndexError| {
                ArenaError::invalid_shot(Some(&excerpt(text)), e.to_string())
            }),
    }
}
