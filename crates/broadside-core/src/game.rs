use uuid::Uuid;

use crate::board::{Board, GameState, ShotOutcome};
use crate::index::BoardIndex;
use crate::protocol::{FinishedGame, ShotRequest};

/// One trial game: a hidden board plus the append-only log of shots fired at it.
#[derive(Debug, Clone)]
pub struct Game {
    id: Uuid,
    board: Board,
    shots: Vec<BoardIndex>,
}

impl Game {
    pub fn new(board: Board) -> Self {
        Self {
            id: Uuid::new_v4(),
            board,
            shots: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn state(&self) -> GameState {
        self.board.state()
    }

    pub fn is_in_progress(&self) -> bool {
        self.state() == GameState::InProgress
    }

    /// Record a shot. Repeated squares still count as a shot taken.
    pub fn apply_shot(&mut self, index: BoardIndex) -> ShotOutcome {
        self.shots.push(index);
        self.board.shoot(index)
    }

    pub fn shots(&self) -> &[BoardIndex] {
        &self.shots
    }

    pub fn shot_count(&self) -> u32 {
        self.shots.len() as u32
    }

    pub fn last_shot(&self) -> Option<BoardIndex> {
        self.shots.last().copied()
    }

    /// Payload asking the player for the next shot.
    pub fn shot_request(&self) -> ShotRequest {
        ShotRequest {
            game_id: self.id,
            last_shot: self.last_shot(),
            board: self.board.snapshot(),
        }
    }

    pub fn finished_report(&self) -> FinishedGame {
        FinishedGame {
            game_id: self.id,
            board: self.board.snapshot(),
            number_of_shots: self.shot_count(),
        }
    }
}
