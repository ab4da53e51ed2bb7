//! Bit-packed board representation and the win/threat primitives built on it
//!
//! Each column takes `HEIGHT + 1` bits, bottom cell first, with the extra
//! guard bit on top keeping shifted patterns from spilling into the next
//! column:
//!
//! ```text
//! .  .  .  .  .  .  .
//! 5 12 19 26 33 40 47
//! 4 11 18 25 32 39 46
//! 3 10 17 24 31 38 45
//! 2  9 16 23 30 37 44
//! 1  8 15 22 29 36 43
//! 0  7 14 21 28 35 42
//! ```

use anyhow::{anyhow, Result};

use std::fmt;

use crate::{HEIGHT, WIDTH};

mod static_masks {
    use crate::{HEIGHT, WIDTH};

    pub const fn bottom_mask() -> u64 {
        let mut mask = 0;
        let mut column = 0;
        while column < WIDTH {
            mask |= 1 << (column * (HEIGHT + 1));
            column += 1;
        }
        mask
    }
    pub const fn full_board_mask() -> u64 {
        bottom_mask() * ((1 << HEIGHT as u64) - 1)
    }
}

/// The contents of a single board cell, relative to the player to move
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Cell {
    Mover,
    Opponent,
    Empty,
}

/// A Connect 4 position
///
/// The board is a plain `Copy` value: searches explore a branch by copying
/// the board and playing on the copy, moves are never taken back.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BitBoard {
    // mask of the current player's tiles
    player_mask: u64,
    // mask of all tiles
    board_mask: u64,
    num_moves: usize,
}

impl BitBoard {
    /// Creates an empty board
    pub fn new() -> Self {
        Self {
            player_mask: 0,
            board_mask: 0,
            num_moves: 0,
        }
    }

    /// Creates a board from a sequence of 1-indexed columns, e.g. `"4453"`
    ///
    /// Fails on characters that are not a column, on full columns and on
    /// moves played after the game has already been won.
    pub fn from_moves<S: AsRef<str>>(moves: S) -> Result<Self> {
        let mut board = Self::new();

        for column_char in moves.as_ref().chars() {
            match column_char.to_digit(10).map(|c| c as usize) {
                Some(column @ 1..=WIDTH) => {
                    let column = column - 1;
                    if !board.playable(column) {
                        return Err(anyhow!("Invalid move, column {} full", column + 1));
                    }
                    // abort if the position is won at any point
                    if board.is_winning_move(column) {
                        return Err(anyhow!("Invalid position, game is over"));
                    }
                    board.play_column(column);
                }
                _ => return Err(anyhow!("could not parse '{}' as a valid move", column_char)),
            }
        }
        Ok(board)
    }

    /// Creates a board directly from its masks
    ///
    /// The masks must come from a reachable position, e.g. `player_mask()`
    /// and `board_mask()` of another board. Only checked in debug builds.
    pub fn from_masks(player_mask: u64, board_mask: u64, num_moves: usize) -> Self {
        debug_assert_eq!(player_mask & !board_mask, 0);
        debug_assert_eq!(board_mask & !static_masks::full_board_mask(), 0);
        debug_assert_eq!(board_mask.count_ones() as usize, num_moves);
        debug_assert!((0..WIDTH).all(|column| {
            let tiles = board_mask & Self::column_mask(column);
            tiles & (tiles + Self::bottom_mask(column)) == 0
        }));
        Self {
            player_mask,
            board_mask,
            num_moves,
        }
    }

    pub fn player_mask(&self) -> u64 {
        self.player_mask
    }

    pub fn board_mask(&self) -> u64 {
        self.board_mask
    }

    pub fn num_moves(&self) -> usize {
        self.num_moves
    }

    pub fn top_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1) + (HEIGHT - 1))
    }

    pub fn bottom_mask(column: usize) -> u64 {
        1 << (column * (HEIGHT + 1))
    }

    pub fn column_mask(column: usize) -> u64 {
        ((1 << HEIGHT) - 1) << (column * (HEIGHT + 1))
    }

    /// Returns true if the column still has an empty cell
    pub fn playable(&self, column: usize) -> bool {
        Self::top_mask(column) & self.board_mask == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_moves == WIDTH * HEIGHT
    }

    /// Plays a single-cell move bitmap for the current player
    ///
    /// The move must be the lowest empty cell of a non-full column, this is
    /// not checked.
    pub fn play(&mut self, move_bitmap: u64) {
        // switch the current player
        self.player_mask ^= self.board_mask;
        // add a cell of the previous player to the correct column
        self.board_mask |= move_bitmap;
        self.num_moves += 1;
    }

    /// Plays in the lowest empty cell of a column, which must be playable
    pub fn play_column(&mut self, column: usize) {
        self.play((self.board_mask + Self::bottom_mask(column)) & Self::column_mask(column));
    }

    /// Bitmap of every cell that can be played this turn
    pub fn possible_moves(&self) -> u64 {
        (self.board_mask + static_masks::bottom_mask()) & static_masks::full_board_mask()
    }

    /// Returns true if the current player has a move that wins immediately
    pub fn can_win_next(&self) -> bool {
        self.winning_positions() & self.possible_moves() != 0
    }

    /// Returns true if playing in this column wins immediately
    pub fn is_winning_move(&self, column: usize) -> bool {
        self.winning_positions() & self.possible_moves() & Self::column_mask(column) != 0
    }

    /// Bitmap of the moves that do not hand the opponent an immediate win
    ///
    /// Must not be called when the current player can win immediately.
    /// Returns 0 when every move loses, i.e. the opponent has two threats
    /// that cannot both be blocked.
    pub fn non_losing_moves(&self) -> u64 {
        debug_assert!(!self.can_win_next());
        let mut possible_moves = self.possible_moves();
        let opponent_winning_positions = self.opponent_winning_positions();
        let forced_moves = possible_moves & opponent_winning_positions;

        if forced_moves != 0 {
            // if more than one forced move exists, you can't prevent the opponent winning
            if forced_moves & (forced_moves - 1) != 0 {
                return 0;
            } else {
                possible_moves = forced_moves
            }
        }
        // avoid playing below an opponent's winning move
        possible_moves & !(opponent_winning_positions >> 1)
    }

    /// Move ordering heuristic: the number of open three-alignments the
    /// current player has after playing `candidate`
    pub fn move_score(&self, candidate: u64) -> i32 {
        compute_winning_positions(self.player_mask | candidate, self.board_mask).count_ones() as i32
    }

    /// Key for the transposition table, unique for every reachable position
    pub fn key(&self) -> u64 {
        self.player_mask + self.board_mask
    }

    /// Returns the owner of the cell at `row` (counted from the bottom) of `column`
    pub fn cell(&self, column: usize, row: usize) -> Cell {
        let tile_mask = Self::bottom_mask(column) << row;
        if self.board_mask & tile_mask == 0 {
            Cell::Empty
        } else if self.player_mask & tile_mask != 0 {
            Cell::Mover
        } else {
            Cell::Opponent
        }
    }

    // empty cells that would complete an alignment for the current player
    fn winning_positions(&self) -> u64 {
        compute_winning_positions(self.player_mask, self.board_mask)
    }

    // empty cells that would complete an alignment for the opponent
    fn opponent_winning_positions(&self) -> u64 {
        compute_winning_positions(self.player_mask ^ self.board_mask, self.board_mask)
    }
}

/// Computes the bitmap of empty cells that complete a four-alignment for the
/// player owning `position`
///
/// Only cells inside the board and not yet occupied in `board_mask` are
/// reported, whether or not they are currently playable.
pub fn compute_winning_positions(position: u64, board_mask: u64) -> u64 {
    // vertical
    // find the top ends of 3-alignemnts
    let mut r = (position << 1) & (position << 2) & (position << 3);

    // horizontal, then both diagonals
    for &shift in [HEIGHT + 1, HEIGHT, HEIGHT + 2].iter() {
        let mut p = (position << shift) & (position << (2 * shift));
        // find the right ends of 3-alignments
        r |= p & (position << (3 * shift));
        // find holes of the type ...O O _ O...
        r |= p & (position >> shift);

        p = (position >> shift) & (position >> (2 * shift));
        // find the left ends of 3-alignments
        r |= p & (position >> (3 * shift));
        // find holes of the type ...O _ O O...
        r |= p & (position << shift);
    }

    r & (static_masks::full_board_mask() ^ board_mask)
}

impl Default for BitBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BitBoard {
    /// Draws the board top row first, `X` for the first player and `O` for the second
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (mover, opponent) = if self.num_moves % 2 == 0 {
            ('X', 'O')
        } else {
            ('O', 'X')
        };
        for row in (0..HEIGHT).rev() {
            for column in 0..WIDTH {
                let symbol = match self.cell(column, row) {
                    Cell::Mover => mover,
                    Cell::Opponent => opponent,
                    Cell::Empty => '.',
                };
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
