//! The 15×15 Gomoku board and win detection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::GameError;
use crate::types::Side;

pub const BOARD_SIZE: usize = 15;

/// One board cell: empty, or a stone belonging to a side.
pub type Cell = Option<Side>;

/// A board coordinate. `Ord` is row-major, matching reading order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for CellPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Scan directions for win detection; each is paired with its inverse.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Row-major grid of cells, serialized as a plain array of arrays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Board([[Cell; BOARD_SIZE]; BOARD_SIZE]);

impl Board {
    pub fn new() -> Self {
        Board([[None; BOARD_SIZE]; BOARD_SIZE])
    }

    pub fn in_bounds(pos: CellPos) -> bool {
        pos.row < BOARD_SIZE && pos.col < BOARD_SIZE
    }

    /// Whether a stone may legally land here: on the board and unoccupied.
    pub fn is_open(&self, pos: CellPos) -> bool {
        Self::in_bounds(pos) && self.0[pos.row][pos.col].is_none()
    }

    /// The cell at `pos`. Callers must pass an in-bounds position.
    pub fn cell(&self, pos: CellPos) -> Cell {
        self.0[pos.row][pos.col]
    }

    pub fn place(&mut self, pos: CellPos, side: Side) -> Result<(), GameError> {
        if !self.is_open(pos) {
            return Err(GameError::IllegalPosition(pos));
        }
        self.0[pos.row][pos.col] = Some(side);
        Ok(())
    }

    /// Whether the stone at `pos` completes a run of five or more for `side`.
    ///
    /// Counts contiguous same-side stones in both directions along each of
    /// the four axes. Runs longer than five (overlines) also win.
    pub fn is_win(&self, pos: CellPos, side: Side) -> bool {
        for (dr, dc) in DIRECTIONS {
            let run = 1 + self.run_length(pos, side, dr, dc) + self.run_length(pos, side, -dr, -dc);
            if run >= 5 {
                return true;
            }
        }
        false
    }

    /// Contiguous same-side stones from `pos` (exclusive) along one direction,
    /// probing at most four steps.
    fn run_length(&self, pos: CellPos, side: Side, dr: isize, dc: isize) -> usize {
        let mut count = 0;
        for step in 1..5 {
            let row = pos.row as isize + step * dr;
            let col = pos.col as isize + step * dc;
            if row < 0 || col < 0 {
                break;
            }
            let probe = CellPos::new(row as usize, col as usize);
            if !Self::in_bounds(probe) || self.0[probe.row][probe.col] != Some(side) {
                break;
            }
            count += 1;
        }
        count
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
