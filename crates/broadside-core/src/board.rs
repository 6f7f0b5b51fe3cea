use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::index::{BOARD_CELLS, BOARD_SIDE, BoardIndex};

/// Ship lengths of the standard fleet.
pub const FLEET: [usize; 5] = [5, 4, 3, 3, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A ship occupying a straight run of squares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    cells: Vec<BoardIndex>,
}

impl Ship {
    /// Place a ship of `length` starting at `origin`. Returns `None` if any
    /// square would fall off the board or the length is zero.
    pub fn new(origin: BoardIndex, length: usize, orientation: Orientation) -> Option<Self> {
        if length == 0 {
            return None;
        }
        let cells = (0..length)
            .map(|offset| match orientation {
                Orientation::Horizontal => {
                    BoardIndex::from_coords(origin.column() + offset, origin.row())
                },
                Orientation::Vertical => {
                    BoardIndex::from_coords(origin.column(), origin.row() + offset)
                },
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Self { cells })
    }

    pub fn cells(&self) -> &[BoardIndex] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// What the shooter knows about a square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SquareContent {
    Unknown,
    Water,
    Hit,
    SunkenShip,
}

impl SquareContent {
    /// Character used for the square in a board snapshot.
    pub fn as_char(self) -> char {
        match self {
            Self::Unknown => ' ',
            Self::Water => 'W',
            Self::Hit => 'H',
            Self::SunkenShip => 'X',
        }
    }
}

/// Termination state of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    InProgress,
    AllShipsSunken,
}

/// Result of applying one shot to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    Miss,
    Hit,
    Sunk,
    /// The square was already shot; the board is unchanged.
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    EmptyFleet,
    Overlap(BoardIndex),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFleet => write!(f, "a board needs at least one ship"),
            Self::Overlap(idx) => write!(f, "ships overlap at {idx}"),
        }
    }
}

impl std::error::Error for BoardError {}

/// A 10x10 board holding the hidden fleet and every shot fired at it.
#[derive(Debug, Clone)]
pub struct Board {
    ships: Vec<Ship>,
    /// Ship number occupying each square.
    occupant: [Option<u8>; BOARD_CELLS],
    shot: [bool; BOARD_CELLS],
}

impl Board {
    /// Build a board from explicitly placed ships.
    pub fn with_ships(ships: Vec<Ship>) -> Result<Self, BoardError> {
        if ships.is_empty() {
            return Err(BoardError::EmptyFleet);
        }
        let mut occupant = [None; BOARD_CELLS];
        for (number, ship) in ships.iter().enumerate() {
            for cell in ship.cells() {
                let slot = &mut occupant[cell.index()];
                if slot.is_some() {
                    return Err(BoardError::Overlap(*cell));
                }
                *slot = Some(number as u8);
            }
        }
        Ok(Self {
            ships,
            occupant,
            shot: [false; BOARD_CELLS],
        })
    }

    /// Place the standard fleet at random, non-overlapping positions.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut occupied = [false; BOARD_CELLS];
        let mut ships = Vec::with_capacity(FLEET.len());
        for length in FLEET {
            // The standard fleet covers 17 of 100 squares, so rejection sampling
            // always finds a free run quickly.
            loop {
                let orientation = if rng.random_bool(0.5) {
                    Orientation::Horizontal
                } else {
                    Orientation::Vertical
                };
                let column = rng.random_range(0..BOARD_SIDE);
                let row = rng.random_range(0..BOARD_SIDE);
                let Some(ship) = BoardIndex::from_coords(column, row)
                    .and_then(|origin| Ship::new(origin, length, orientation))
                else {
                    continue;
                };
                if ship.cells().iter().any(|c| occupied[c.index()]) {
                    continue;
                }
                for cell in ship.cells() {
                    occupied[cell.index()] = true;
                }
                ships.push(ship);
                break;
            }
        }

        let mut occupant = [None; BOARD_CELLS];
        for (number, ship) in ships.iter().enumerate() {
            for cell in ship.cells() {
                occupant[cell.index()] = Some(number as u8);
            }
        }
        Self {
            ships,
            occupant,
            shot: [false; BOARD_CELLS],
        }
    }

    /// Random standard fleet using the thread-local generator.
    pub fn random_fleet() -> Self {
        Self::random(&mut rand::rng())
    }

    /// Fire at a square.
    pub fn shoot(&mut self, index: BoardIndex) -> ShotOutcome {
        let i = index.index();
        if self.shot[i] {
            return ShotOutcome::Repeated;
        }
        self.shot[i] = true;
        match self.occupant[i] {
            None => ShotOutcome::Miss,
            Some(number) if self.is_sunk(number as usize) => ShotOutcome::Sunk,
            Some(_) => ShotOutcome::Hit,
        }
    }

    pub fn state(&self) -> GameState {
        if (0..self.ships.len()).all(|n| self.is_sunk(n)) {
            GameState::AllShipsSunken
        } else {
            GameState::InProgress
        }
    }

    /// Total number of squares covered by ships.
    pub fn ship_cells(&self) -> usize {
        self.ships.iter().map(Ship::len).sum()
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn is_shot(&self, index: BoardIndex) -> bool {
        self.shot[index.index()]
    }

    /// The shooter's view of a square.
    pub fn square(&self, index: BoardIndex) -> SquareContent {
        let i = index.index();
        if !self.shot[i] {
            return SquareContent::Unknown;
        }
        match self.occupant[i] {
            None => SquareContent::Water,
            Some(number) if self.is_sunk(number as usize) => SquareContent::SunkenShip,
            Some(_) => SquareContent::Hit,
        }
    }

    /// Shooter's view of the whole board: 100 characters, row-major.
    pub fn snapshot(&self) -> String {
        BoardIndex::all()
            .map(|idx| self.square(idx).as_char())
            .collect()
    }

    fn is_sunk(&self, number: usize) -> bool {
        self.ships[number]
            .cells()
            .iter()
            .all(|c| self.shot[c.index()])
    }
}
