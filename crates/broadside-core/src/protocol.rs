//! Wire types for the shooter protocol spoken by players under test.
//!
//! All bodies are camelCase JSON. Every call may carry the player's API key
//! in the `code` query parameter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::index::BoardIndex;

pub const GET_READY_PATH: &str = "getReady";
pub const GET_SHOT_PATH: &str = "getShot";
pub const GET_SHOTS_PATH: &str = "getShots";
pub const FINISHED_PATH: &str = "finished";

/// Query parameter carrying the player's API key.
pub const API_KEY_PARAM: &str = "code";
/// Query parameter of `getReady` announcing the tournament size.
pub const NUMBER_OF_GAMES_PARAM: &str = "numberOfGames";

/// One round's request for a shot in a single game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotRequest {
    pub game_id: Uuid,
    pub last_shot: Option<BoardIndex>,
    /// Shooter's view of the board, see [`crate::board::Board::snapshot`].
    pub board: String,
}

/// Final state of one game, posted to `finished`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedGame {
    pub game_id: Uuid,
    pub board: String,
    pub number_of_shots: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shot_request_wire_shape() {
        let req = ShotRequest {
            game_id: Uuid::nil(),
            last_shot: Some("C4".parse().unwrap()),
            board: " ".repeat(100),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["gameId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["lastShot"], "C4");
        assert_eq!(json["board"].as_str().unwrap().len(), 100);
    }

    #[test]
    fn first_round_has_null_last_shot() {
        let req = ShotRequest {
            game_id: Uuid::nil(),
            last_shot: None,
            board: String::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["lastShot"].is_null());
    }

    #[test]
    fn finished_game_wire_shape() {
        let done = FinishedGame {
            game_id: Uuid::nil(),
            board: "W".repeat(100),
            number_of_shots: 42,
        };
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["numberOfShots"], 42);
        assert!(json.get("number_of_shots").is_none());
    }
}
