pub mod board;
pub mod error;
pub mod game;
pub mod index;
pub mod protocol;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::board::{Board, Orientation, Ship};
    use crate::index::BoardIndex;

    /// A board holding one horizontal ship of `len` squares starting at A1.
    /// Sweeping row-major sinks it in exactly `len` shots.
    pub fn single_ship_board(len: usize) -> Board {
        let origin = BoardIndex::new(0).expect("A1 is on the board");
        let ship = Ship::new(origin, len, Orientation::Horizontal).expect("ship fits in row 1");
        Board::with_ships(vec![ship]).expect("single ship never overlaps")
    }

    /// First unknown square of a board snapshot, scanning row-major.
    /// This is the shot a well-behaved sweeping player answers with.
    pub fn sweep_target(snapshot: &str) -> Option<BoardIndex> {
        snapshot
            .chars()
            .position(|c| c == ' ')
            .and_then(BoardIndex::new)
    }

}
