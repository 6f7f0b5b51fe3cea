use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of rows and columns on a board.
pub const BOARD_SIDE: usize = 10;

/// Number of squares on a board.
pub const BOARD_CELLS: usize = BOARD_SIDE * BOARD_SIDE;

const COLUMN_LETTERS: &[u8; BOARD_SIDE] = b"ABCDEFGHIJ";

/// A square on the board, stored row-major (`row * 10 + column`).
///
/// The canonical text form is a column letter followed by a row number,
/// e.g. `A1` for the top-left square and `J10` for the bottom-right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoardIndex(u8);

impl BoardIndex {
    /// Create an index from its row-major position. Returns `None` when out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < BOARD_CELLS).then_some(Self(index as u8))
    }

    /// Create an index from zero-based column and row.
    pub fn from_coords(column: usize, row: usize) -> Option<Self> {
        if column < BOARD_SIDE && row < BOARD_SIDE {
            Some(Self((row * BOARD_SIDE + column) as u8))
        } else {
            None
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn column(self) -> usize {
        self.index() % BOARD_SIDE
    }

    pub fn row(self) -> usize {
        self.index() / BOARD_SIDE
    }

    /// Every square on the board in row-major order.
    pub fn all() -> impl Iterator<Item = BoardIndex> {
        (0..BOARD_CELLS).map(|i| Self(i as u8))
    }
}

impl fmt::Display for BoardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = COLUMN_LETTERS[self.column()] as char;
        write!(f, "{letter}{}", self.row() + 1)
    }
}

/// Returned when text is not a canonical board index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseBoardIndexError {
    pub text: String,
}

impl fmt::Display for ParseBoardIndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid board index {:?} (expected column A-J followed by row 1-10)",
            self.text
        )
    }
}

impl std::error::Error for ParseBoardIndexError {}

impl FromStr for BoardIndex {
    type Err = ParseBoardIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseBoardIndexError {
            text: s.to_string(),
        };

        let mut chars = s.chars();
        let column = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some(letter @ 'A'..='J') => letter as usize - 'A' as usize,
            _ => return Err(invalid()),
        };

        // Row digits: "1".."10" only, so no signs, whitespace, or leading zeros.
        let digits = chars.as_str();
        if digits.is_empty()
            || digits.len() > 2
            || digits.starts_with('0')
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        let row: usize = digits.parse().map_err(|_| invalid())?;
        if !(1..=BOARD_SIDE).contains(&row) {
            return Err(invalid());
        }

        Self::from_coords(column, row - 1).ok_or_else(invalid)
    }
}

impl Serialize for BoardIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BoardIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
