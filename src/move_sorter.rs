//! A tiny priority container used to order the moves of one search node

use crate::WIDTH;

/// Holds up to `WIDTH` moves sorted by score
///
/// Moves come back highest score first. For equal scores the move added
/// last comes back first.
pub struct MoveSorter {
    size: usize,
    // move bitmap and score, sorted by ascending score
    moves: [(u64, i32); WIDTH],
}

impl MoveSorter {
    pub fn new() -> Self {
        Self {
            size: 0,
            moves: [(0, 0); WIDTH],
        }
    }

    /// Inserts a move, keeping the container sorted
    pub fn add(&mut self, new_move: u64, score: i32) {
        debug_assert!(self.size < WIDTH);
        let mut pos = self.size;
        self.size += 1;
        while pos != 0 && self.moves[pos - 1].1 > score {
            self.moves[pos] = self.moves[pos - 1];
            pos -= 1;
        }
        self.moves[pos] = (new_move, score);
    }

    /// Removes and returns the remaining move with the highest score, or 0
    /// once the container is empty
    pub fn get_next(&mut self) -> u64 {
        match self.size {
            0 => 0,
            _ => {
                self.size -= 1;
                self.moves[self.size].0
            }
        }
    }

    pub fn reset(&mut self) {
        self.size = 0;
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Default for MoveSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for MoveSorter {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        match self.get_next() {
            0 => None,
            next_move => Some(next_move),
        }
    }
}
