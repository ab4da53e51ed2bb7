//! A perfect solver for the board game 'Connect 4'
//!
//! This solver uses an exhaustive game tree search (negamax with alpha-beta
//! pruning, move ordering and a transposition table) to find the exact
//! game-theoretic score of any reachable position.
//!
//! # Basic Usage
//!
//! ```
//! use connect4_solver::{bitboard::BitBoard, solver::Solver};
//!
//!# use std::error::Error;
//!# fn main() -> Result<(), Box<dyn Error>> {
//! let board = BitBoard::from_moves("112233")?;
//! let mut solver = Solver::new();
//!
//! assert_eq!(solver.solve(&board, false), 18);
//! assert_eq!(solver.best_move(&board), Some(3));
//!# Ok(())
//!# }
//! ```

use static_assertions::*;
pub use anyhow;

pub mod bitboard;

pub mod move_sorter;

pub mod transposition_table;

pub mod solver;

mod test;

/// The width of the game board in tiles
pub const WIDTH: usize = 7;

/// The height of the game board in tiles
pub const HEIGHT: usize = 6;

// ensure that the given dimensions fit in a u64 for the bitboard representation
const_assert!(WIDTH * (HEIGHT + 1) < 64);
// position keys must fit in the 56 bits stored by the transposition table
const_assert!(WIDTH * (HEIGHT + 1) <= 56);
// every score from -(WIDTH * HEIGHT) / 2 to (WIDTH * HEIGHT + 1) / 2 must fit in 1..=255
const_assert!(WIDTH * HEIGHT + 1 <= u8::MAX as usize);
// moves are written as one digit per column
const_assert!(WIDTH < 10);
