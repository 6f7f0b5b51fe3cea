use std::sync::Arc;

use async_trait::async_trait;

use broadside_core::board::Board;
use broadside_core::error::ArenaError;
use broadside_core::game::Game;
use broadside_player::PlayerApi;

/// Produces the hidden board for each new game.
pub type BoardFactory = Arc<dyn Fn() -> Board + Send + Sync>;

/// Hook run after every round, e.g. to keep a lease alive. An error stops
/// the game and is returned to the caller unchanged.
#[async_trait]
pub trait RoundObserver: Send {
    async fn round_complete(&mut self) -> Result<(), ArenaError>;
}

/// Drives games against one player until every ship is sunk.
pub struct GameOrchestrator {
    player: Arc<dyn PlayerApi>,
    new_board: BoardFactory,
    max_rounds: u32,
}

impl GameOrchestrator {
    pub fn new(player: Arc<dyn PlayerApi>, max_rounds: u32) -> Self {
        Self {
            player,
            new_board: Arc::new(Board::random_fleet),
            max_rounds,
        }
    }

    pub fn with_board_factory(mut self, new_board: BoardFactory) -> Self {
        self.new_board = new_board;
        self
    }

    /// Play one game shot by shot. Returns the number of shots taken.
    pub async fn play_game(
        &self,
        url: &str,
        api_key: Option<&str>,
        mut observer: Option<&mut dyn RoundObserver>,
    ) -> Result<u32, ArenaError> {
        let mut game = Game::new((self.new_board)());
        let mut rounds = 0;

        while game.is_in_progress() {
            if rounds >= self.max_rounds {
                return Err(ArenaError::RoundLimitExceeded { rounds });
            }
            let shot = self.player.get_shot(url, &game, api_key).await?;
            game.apply_shot(shot);
            rounds += 1;
            if let Some(observer) = observer.as_deref_mut() {
                observer.round_complete().await?;
            }
        }

        self.notify_finished(url, &[&game], api_key).await;
        Ok(game.shot_count())
    }

    /// Play `n` games at once, asking for one shot per unfinished game each
    /// round in a single batched call. Returns shot counts in game order.
    pub async fn play_simultaneous_games(
        &self,
        url: &str,
        n: usize,
        api_key: Option<&str>,
        mut observer: Option<&mut dyn RoundObserver>,
    ) -> Result<Vec<u32>, ArenaError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut games: Vec<Game> = (0..n).map(|_| Game::new((self.new_board)())).collect();
        let mut rounds = 0;

        loop {
            let active: Vec<usize> = games
                .iter()
                .enumerate()
                .filter(|(_, g)| g.is_in_progress())
                .map(|(i, _)| i)
                .collect();
            if active.is_empty() {
                break;
            }
            if rounds >= self.max_rounds {
                return Err(ArenaError::RoundLimitExceeded { rounds });
            }

            let batch: Vec<&Game> = active.iter().map(|&i| &games[i]).collect();
            let shots = self.player.get_shots(url, &batch, api_key).await?;
            if shots.len() != active.len() {
                return Err(ArenaError::invalid_shot(
                    None,
                    format!("expected {} shots, got {}", active.len(), shots.len()),
                ));
            }
            for (&i, shot) in active.iter().zip(shots) {
                games[i].apply_shot(shot);
            }
            rounds += 1;
            if let Some(observer) = observer.as_deref_mut() {
                observer.round_complete().await?;
            }
        }

        let all: Vec<&Game> = games.iter().collect();
        self.notify_finished(url, &all, api_key).await;
        Ok(games.iter().map(Game::shot_count).collect())
    }

    async fn notify_finished(&self, url: &str, games: &[&Game], api_key: Option<&str>) {
        if let Err(e) = self.player.finished(url, games, api_key).await {
            tracing::warn!(url, games = games.len(), error = %e, "Finished notification failed");
        }
    }
}
