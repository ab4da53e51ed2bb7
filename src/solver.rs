//! An agent to solve the game of Connect 4

use log::{debug, trace};

use std::cmp::Ordering;

use crate::{
    bitboard::BitBoard, move_sorter::MoveSorter, transposition_table::TranspositionTable, HEIGHT,
    WIDTH,
};

/// The number of cells on the board
const CELLS: i32 = (WIDTH * HEIGHT) as i32;

/// The lowest score any position can be given, used as the offset for
/// transposition table values
const LOWEST_SCORE: i32 = -CELLS / 2;

/// Column order used for search and tie breaking
pub const COLUMN_ORDER: [usize; WIDTH] = move_order();

/// Returns the columns ordered from the middle outwards, as
/// the middle columns are often better moves
pub const fn move_order() -> [usize; WIDTH] {
    let mut move_order = [0; WIDTH];
    let mut i = 0;
    while i < WIDTH {
        move_order[i] = (WIDTH / 2) + (i % 2) * (i / 2 + 1) - (1 - i % 2) * (i / 2);
        i += 1;
    }
    move_order
}

/// An agent to solve Connect 4 positions
///
/// # Notes
/// This agent uses a classical game tree search with various optimisations to
/// find the mathematically best move(s) in any position, thus 'solving' the game.
/// A `Solver` owns its transposition table; create one per thread.
///
/// # Position Scoring
/// Scores are given from the point of view of the player to move. If that player
/// wins with their final tile (their 21st tile on a 7x6 board) the score is 1, or -1
/// if the opponent wins with their final tile. Earlier wins have scores further from 0:
/// winning with the N-th tile of your own scores 22 - N. A drawn position has a score of 0
#[derive(Clone)]
pub struct Solver {
    /// The number of nodes searched by this `Solver` so far (for diagnostics only)
    pub node_count: usize,
    transposition_table: TranspositionTable,
}

impl Solver {
    /// Creates a new `Solver` with a default sized transposition table
    pub fn new() -> Self {
        Self::with_transposition_table(TranspositionTable::new())
    }

    /// Creates a new `Solver` whose transposition table holds `size` entries
    pub fn with_table_size(size: usize) -> Self {
        Self::with_transposition_table(TranspositionTable::with_capacity(size))
    }

    /// Creates a new `Solver` with a given transposition table
    pub fn with_transposition_table(transposition_table: TranspositionTable) -> Self {
        Self {
            node_count: 0,
            transposition_table,
        }
    }

    /// Clears the transposition table and node counter, to be called between
    /// unrelated searches
    pub fn reset(&mut self) {
        debug!(
            "Resetting solver after {} nodes ({} table entries)",
            self.node_count,
            self.transposition_table.capacity()
        );
        self.transposition_table.reset();
        self.node_count = 0;
    }

    /// Performs game tree search
    ///
    /// Returns the score of the position (see [Position Scoring]) if it lies
    /// within `(alpha, beta)`, otherwise an upper bound when it is `<= alpha`
    /// or a lower bound when it is `>= beta`.
    ///
    /// The window must not be empty and the current player must not be able
    /// to win immediately, `solve` handles that case.
    ///
    /// [Position Scoring]: #position-scoring
    pub fn negamax(&mut self, board: &BitBoard, mut alpha: i32, mut beta: i32) -> i32 {
        debug_assert!(alpha < beta);
        debug_assert!(!board.can_win_next());
        self.node_count += 1;

        let num_moves = board.num_moves() as i32;

        // look for moves that don't give the opponent a next turn win
        let non_losing_moves = board.non_losing_moves();
        if non_losing_moves == 0 {
            return -(CELLS - num_moves) / 2;
        }

        // neither player can win with the last two tiles
        if num_moves >= CELLS - 2 {
            return 0;
        }

        // lower bound of score, the opponent cannot win on their next move
        let min = -(CELLS - 2 - num_moves) / 2;
        if alpha < min {
            alpha = min;
            // if the lower bound is higher than beta, we can prune the exploration
            if alpha >= beta {
                return alpha;
            }
        }

        // upper bound of score, we cannot win on this move
        let mut max = (CELLS - 1 - num_moves) / 2;
        // a cached value is an upper bound from an earlier search of this position
        let key = board.key();
        let value = self.transposition_table.get(key) as i32;
        if value != 0 {
            max = value + LOWEST_SCORE - 1;
        }
        if beta > max {
            // clamp beta to calculated upper bound
            beta = max;
            // if the upper bound is lower than alpha, we can prune the exploration
            if alpha >= beta {
                return beta;
            }
        }

        let mut moves = MoveSorter::new();
        // reversing move order to put edges first reduces the amount of sorting
        // as these moves are worse on average
        for &column in COLUMN_ORDER.iter().rev() {
            let candidate = non_losing_moves & BitBoard::column_mask(column);
            if candidate != 0 {
                moves.add(candidate, board.move_score(candidate));
            }
        }

        // search the next level of the tree
        for move_bitmap in moves {
            let mut next = *board;
            next.play(move_bitmap);
            // the search window is flipped for the other player
            let score = -self.negamax(&next, -beta, -alpha);
            // if a child node's score is better than beta, we can prune the tree
            // here because a perfect opponent will not pick this branch
            if score >= beta {
                return score;
            }
            if score > alpha {
                alpha = score;
            }
        }

        // offset of one to prevent putting a 0, which represents an empty entry
        let value = alpha - LOWEST_SCORE + 1;
        debug_assert!(value > 0 && value <= u8::MAX as i32);
        self.transposition_table.put(key, value as u8);
        alpha
    }

    /// Calculates the exact score of a position with a series of null-window searches
    ///
    /// With `weak` set only the outcome is computed: 1 for a win, 0 for a draw
    /// and -1 for a loss.
    pub fn solve(&mut self, board: &BitBoard, weak: bool) -> i32 {
        let num_moves = board.num_moves() as i32;

        // check for win for current player on this move
        if board.can_win_next() {
            let score = (CELLS + 1 - num_moves) / 2;
            return if weak { 1 } else { score };
        }

        let (mut min, mut max) = if weak {
            (-1, 1)
        } else {
            (-(CELLS - num_moves) / 2, (CELLS + 1 - num_moves) / 2)
        };

        // iteratively narrow the search window
        while min < max {
            let mut mid = min + (max - min) / 2;
            // tweak the search value for both negative and positive searches,
            // most positions score close to 0
            if mid <= 0 && min / 2 < mid {
                mid = min / 2
            } else if mid >= 0 && max / 2 > mid {
                mid = max / 2
            }

            // use a null-window to determine if the actual score is greater or less that mid
            let r = self.negamax(board, mid, mid + 1);
            debug!(
                "Null window at {}: result {}, bounds [{}, {}], {} nodes",
                mid, r, min, max, self.node_count
            );

            // r is not necessarily the exact true score, but its value indicates
            // whether the true score is above or below the search target
            if r <= mid {
                // actual score <= mid
                max = r
            } else {
                // actual score > mid
                min = r;
            }
        }

        if weak {
            // bounds found by a weak search may overshoot [-1, 1]
            min.signum()
        } else {
            // min and max should be equal here
            min
        }
    }

    /// Scores every column from the point of view of the player to move
    ///
    /// Full columns are `None`. Winning moves are scored without searching.
    pub fn analyze(&mut self, board: &BitBoard, weak: bool) -> [Option<i32>; WIDTH] {
        let num_moves = board.num_moves() as i32;
        let mut scores = [None; WIDTH];

        for column in 0..WIDTH {
            if !board.playable(column) {
                continue;
            }
            let score = if board.is_winning_move(column) {
                if weak {
                    1
                } else {
                    (CELLS + 1 - num_moves) / 2
                }
            } else {
                let mut next = *board;
                next.play_column(column);
                -self.solve(&next, weak)
            };
            trace!("Column {}: score {}", column + 1, score);
            scores[column] = Some(score);
        }
        scores
    }

    /// Finds the best column to play, preferring central columns between
    /// equally scored moves
    ///
    /// Returns `None` if the board is full.
    pub fn best_move(&mut self, board: &BitBoard) -> Option<usize> {
        // no need to search if the game can be won right away
        if let Some(&column) = COLUMN_ORDER
            .iter()
            .find(|&&column| board.playable(column) && board.is_winning_move(column))
        {
            return Some(column);
        }

        let scores = self.analyze(board, false);
        let mut best: Option<(i32, usize)> = None;
        for &column in COLUMN_ORDER.iter() {
            if let Some(score) = scores[column] {
                if best.map_or(true, |(best_score, _)| score > best_score) {
                    best = Some((score, column));
                }
            }
        }
        best.map(|(_, column)| column)
    }

    /// Converts a position score to the number of tiles the player to move
    /// still places before the game ends under perfect play
    pub fn score_to_win_distance(board: &BitBoard, score: i32) -> usize {
        let num_moves = board.num_moves() as i32;
        debug_assert!(score >= -(CELLS - num_moves) / 2 && score <= (CELLS + 1 - num_moves) / 2);
        let distance = match score.cmp(&0) {
            Ordering::Equal => (CELLS + 1 - num_moves) / 2,
            Ordering::Greater => (CELLS + 1 - num_moves) / 2 + 1 - score,
            Ordering::Less => (CELLS - num_moves) / 2 + 1 + score,
        };
        distance as usize
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}
