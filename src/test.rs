#[cfg(test)]
pub mod test {
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::{BufRead, BufReader};
    use std::time::{Duration, Instant};

    use crate::bitboard::{compute_winning_positions, BitBoard, Cell};
    use crate::move_sorter::MoveSorter;
    use crate::solver::{move_order, Solver};
    use crate::transposition_table::TranspositionTable;
    use crate::{HEIGHT, WIDTH};

    // filled without any alignment, so a draw
    const DRAWN_GAME: &str = "141724165222235463442116413773377573556656";

    // small table so the tests don't allocate 64MB each
    const TEST_TABLE_SIZE: usize = 1048573;

    fn load_test_data(path: &str) -> Result<Vec<(String, i32)>> {
        let file = BufReader::new(File::open(path)?);
        let mut positions = vec![];

        for line in file.lines() {
            let line = line?;
            let mut test_data = line.split_whitespace();
            let moves = test_data
                .next()
                .ok_or_else(|| anyhow!("invalid test data: {}", line))?;
            let score = test_data
                .next()
                .ok_or_else(|| anyhow!("invalid test data: {}", line))?
                .parse::<i32>()?;
            positions.push((moves.to_owned(), score));
        }
        Ok(positions)
    }

    fn run_test_data(name: &str, path: &str) -> Result<()> {
        let mut times = vec![];
        let mut posis = vec![];
        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);

        for (moves, score) in load_test_data(path)? {
            let board = BitBoard::from_moves(&moves)?;
            solver.reset();
            let start_time = Instant::now();
            let calc = solver.solve(&board, false);
            let finish_time = Instant::now();
            assert_eq!(score, calc, "wrong score for {}", moves);
            times.push(finish_time - start_time);
            posis.push(solver.node_count);

            assert_eq!(score.signum(), solver.solve(&board, true), "wrong outcome for {}", moves);
        }

        println!(
            "{}:\nMean time: {:.6}ms, Mean no. of positions: {}, kpos/s: {}",
            name,
            (times.iter().sum::<Duration>() / times.len() as u32).as_secs_f64() * 1000.0,
            posis.iter().sum::<usize>() as f64 / posis.len() as f64,
            posis
                .iter()
                .zip(times.iter())
                .map(|(p, t)| *p as f64 / t.as_secs_f64())
                .sum::<f64>()
                / (1000.0 * posis.len() as f64)
        );
        Ok(())
    }

    fn bits(bitmap: u64) -> usize {
        bitmap.count_ones() as usize
    }

    #[test]
    pub fn parse_moves() -> Result<()> {
        let board = BitBoard::from_moves("4453")?;
        assert_eq!(board.num_moves(), 4);
        assert_eq!(board.cell(3, 0), Cell::Mover);
        assert_eq!(board.cell(3, 1), Cell::Opponent);
        assert_eq!(board.cell(4, 0), Cell::Mover);
        assert_eq!(board.cell(2, 0), Cell::Opponent);
        assert_eq!(board.cell(2, 1), Cell::Empty);

        assert!(BitBoard::from_moves("48").is_err());
        assert!(BitBoard::from_moves("4a").is_err());
        assert!(BitBoard::from_moves("40").is_err());
        // seventh tile in a column
        assert!(BitBoard::from_moves("1111111").is_err());
        // moves after a vertical four
        assert!(BitBoard::from_moves("1212121").is_err());
        Ok(())
    }

    #[test]
    pub fn board_invariants() -> Result<()> {
        let mut board = BitBoard::new();
        for (i, column_char) in DRAWN_GAME.chars().enumerate() {
            let column = column_char.to_digit(10).ok_or_else(|| anyhow!("bad fixture"))? as usize - 1;
            assert!(board.playable(column));
            let previous = board;
            board.play_column(column);

            assert_eq!(board.num_moves(), i + 1);
            assert_eq!(bits(board.board_mask()), board.num_moves());
            assert_eq!(board.player_mask() & !board.board_mask(), 0);
            // the player to move owns what the previous mover did not
            assert_eq!(board.player_mask(), previous.player_mask() ^ previous.board_mask());
            // columns stay contiguous from the bottom
            for column in 0..WIDTH {
                let tiles = board.board_mask() & BitBoard::column_mask(column);
                assert_eq!(tiles & (tiles + BitBoard::bottom_mask(column)), 0);
            }
        }
        assert!(board.is_full());
        assert_eq!(board.possible_moves(), 0);
        assert!((0..WIDTH).all(|column| !board.playable(column)));
        Ok(())
    }

    #[test]
    pub fn key_injectivity() {
        // walk every position of up to 8 tiles
        let mut keys: HashMap<u64, (u64, u64)> = HashMap::new();
        let mut stack = vec![BitBoard::new()];

        while let Some(board) = stack.pop() {
            let masks = (board.player_mask(), board.board_mask());
            match keys.get(&board.key()) {
                Some(&seen) => {
                    assert_eq!(seen, masks, "key collision for {:#x}", board.key());
                    continue;
                }
                None => {
                    keys.insert(board.key(), masks);
                }
            }
            if board.num_moves() == 8 {
                continue;
            }
            for column in 0..WIDTH {
                if board.playable(column) {
                    let mut next = board;
                    next.play_column(column);
                    stack.push(next);
                }
            }
        }
        assert!(keys.len() > 100_000);
    }

    #[test]
    pub fn winning_positions() {
        // three in a row with a hole: X X _ X on the bottom row
        let position = BitBoard::bottom_mask(0) | BitBoard::bottom_mask(1) | BitBoard::bottom_mask(3);
        assert_eq!(compute_winning_positions(position, position), BitBoard::bottom_mask(2));

        // vertical three only threatens the cell on top
        let position = 0b111;
        assert_eq!(compute_winning_positions(position, position), 0b1000);

        // the guard row is never reported
        let position = 0b111000;
        assert_eq!(compute_winning_positions(position, position), 0);

        let tile = |column: usize, row: usize| BitBoard::bottom_mask(column) << row;

        // descending diagonal, each step is a shift of HEIGHT
        let position = tile(0, 3) | tile(1, 2) | tile(2, 1);
        assert_eq!(compute_winning_positions(position, position), tile(3, 0));

        // ascending diagonal, each step is a shift of HEIGHT + 2
        let position = tile(0, 0) | tile(1, 1) | tile(2, 2);
        assert_eq!(compute_winning_positions(position, position), tile(3, 3));

        // ascending diagonal with a hole
        let position = tile(0, 0) | tile(1, 1) | tile(3, 3);
        assert_eq!(compute_winning_positions(position, position), tile(2, 2));
    }

    #[test]
    pub fn rebuild_from_masks() -> Result<()> {
        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);

        for (moves, score) in load_test_data("test_data/end_game.txt")?.iter().take(3) {
            let board = BitBoard::from_moves(moves)?;
            let copy = BitBoard::from_masks(board.player_mask(), board.board_mask(), board.num_moves());
            assert_eq!(copy, board);
            assert_eq!(copy.key(), board.key());

            solver.reset();
            assert_eq!(solver.solve(&copy, false), *score);
        }
        Ok(())
    }

    #[test]
    #[should_panic]
    pub fn from_masks_rejects_stray_player_tiles() {
        // a player tile on an empty cell
        BitBoard::from_masks(0b10, 0b1, 1);
    }

    #[test]
    pub fn immediate_win() -> Result<()> {
        let board = BitBoard::from_moves("121212")?;
        assert!(board.can_win_next());
        assert!(board.is_winning_move(0));
        assert!((1..WIDTH).all(|column| !board.is_winning_move(column)));

        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);
        let score = solver.solve(&board, false);
        assert_eq!(score, ((WIDTH * HEIGHT + 1 - 6) / 2) as i32);
        assert_eq!(solver.solve(&board, true), 1);
        assert_eq!(solver.best_move(&board), Some(0));
        assert_eq!(Solver::score_to_win_distance(&board, score), 1);
        Ok(())
    }

    #[test]
    pub fn double_threat() -> Result<()> {
        // first player has an open three on the bottom row
        let board = BitBoard::from_moves("33445")?;
        assert!(!board.can_win_next());
        assert_eq!(board.non_losing_moves(), 0);

        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);
        let score = solver.solve(&board, false);
        assert_eq!(score, -(((WIDTH * HEIGHT - 5) / 2) as i32));
        assert!(score < 0);
        assert_eq!(solver.solve(&board, true), -1);
        assert_eq!(Solver::score_to_win_distance(&board, score), 1);
        Ok(())
    }

    #[test]
    pub fn forced_move() -> Result<()> {
        let board = BitBoard::from_moves("11223")?;
        assert!(!board.can_win_next());
        assert_eq!(board.non_losing_moves(), BitBoard::bottom_mask(3));
        Ok(())
    }

    #[test]
    pub fn avoid_playing_under_threat() -> Result<()> {
        // first player threatens the second cell of column 4
        let board = BitBoard::from_moves("1211233")?;
        assert!(!board.can_win_next());
        assert_eq!(
            board.non_losing_moves(),
            board.possible_moves() & !BitBoard::bottom_mask(3)
        );
        Ok(())
    }

    #[test]
    pub fn move_score() -> Result<()> {
        let board = BitBoard::from_moves("1717")?;
        let candidate = board.possible_moves() & BitBoard::column_mask(0);
        assert_eq!(board.move_score(candidate), 1);
        let candidate = board.possible_moves() & BitBoard::column_mask(3);
        assert_eq!(board.move_score(candidate), 0);
        Ok(())
    }

    #[test]
    pub fn display() -> Result<()> {
        let board = BitBoard::from_moves("443")?;
        let text = board.to_string();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), HEIGHT);
        assert_eq!(rows[HEIGHT - 1], "..XX...");
        assert_eq!(rows[HEIGHT - 2], "...O...");
        Ok(())
    }

    #[test]
    pub fn column_order() {
        assert_eq!(move_order(), [3, 4, 2, 5, 1, 6, 0]);
    }

    #[test]
    pub fn transposition_table() {
        let mut table = TranspositionTable::with_capacity(7);
        assert_eq!(table.get(3), 0);

        table.put(3, 42);
        assert_eq!(table.get(3), 42);
        // same slot, different key
        assert_eq!(table.get(10), 0);

        table.put(3, 43);
        assert_eq!(table.get(3), 43);

        // a colliding key evicts the previous one
        table.put(10, 7);
        assert_eq!(table.get(10), 7);
        assert_eq!(table.get(3), 0);

        table.put(5, 1);
        table.put((1 << 56) - 1, 255);
        assert_eq!(table.get((1 << 56) - 1), 255);

        table.reset();
        for key in [3, 5, 10, (1 << 56) - 1].iter() {
            assert_eq!(table.get(*key), 0);
        }
    }

    #[test]
    #[should_panic]
    pub fn transposition_table_rejects_wide_keys() {
        let mut table = TranspositionTable::with_capacity(7);
        table.put(1 << 56, 1);
    }

    #[test]
    pub fn move_sorter() {
        let scores = [3, 1, 4, 1, 5, 9, 2];
        let mut sorter = MoveSorter::new();
        for (i, &score) in scores.iter().enumerate() {
            sorter.add(1 << i, score);
        }
        assert_eq!(sorter.len(), WIDTH);

        let mut last = i32::MAX;
        let mut popped = vec![];
        for _ in 0..WIDTH {
            let next_move = sorter.get_next();
            assert_ne!(next_move, 0);
            let score = scores[next_move.trailing_zeros() as usize];
            assert!(score <= last);
            last = score;
            popped.push(next_move);
        }
        // the later of two equal scores comes out first
        assert_eq!(popped[WIDTH - 2..], [1u64 << 3, 1 << 1]);
        assert_eq!(sorter.get_next(), 0);
        assert_eq!(sorter.get_next(), 0);

        sorter.add(1, 0);
        sorter.add(2, 0);
        sorter.reset();
        assert!(sorter.is_empty());
        assert_eq!(sorter.next(), None);

        sorter.add(4, 2);
        sorter.add(8, 6);
        assert_eq!(sorter.collect::<Vec<_>>(), vec![8, 4]);
    }

    #[test]
    pub fn draw() -> Result<()> {
        let board = BitBoard::from_moves(DRAWN_GAME)?;
        assert!(board.is_full());

        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);
        assert_eq!(solver.solve(&board, false), 0);
        assert_eq!(solver.solve(&board, true), 0);
        assert_eq!(solver.analyze(&board, false), [None; WIDTH]);
        assert_eq!(solver.best_move(&board), None);
        assert_eq!(Solver::score_to_win_distance(&board, 0), 0);
        Ok(())
    }

    #[test]
    #[should_panic]
    pub fn negamax_rejects_empty_window() {
        let board = BitBoard::from_moves("11223").unwrap();
        let mut solver = Solver::with_table_size(7);
        solver.negamax(&board, 1, 1);
    }

    #[test]
    #[should_panic]
    pub fn negamax_rejects_won_position() {
        let board = BitBoard::from_moves("121212").unwrap();
        let mut solver = Solver::with_table_size(7);
        solver.negamax(&board, 0, 1);
    }

    #[test]
    pub fn deterministic_solve() -> Result<()> {
        let positions = load_test_data("test_data/end_game.txt")?;
        let mut warm = Solver::with_table_size(TEST_TABLE_SIZE);

        for (moves, score) in positions.iter().take(4) {
            let board = BitBoard::from_moves(moves)?;
            // answers must not depend on what an earlier search left in the table
            assert_eq!(warm.solve(&board, false), *score);
            assert_eq!(warm.solve(&board, false), *score);

            let mut fresh = Solver::with_table_size(TEST_TABLE_SIZE);
            assert_eq!(fresh.solve(&board, true), score.signum());
            assert_eq!(fresh.solve(&board, false), *score);
        }
        Ok(())
    }

    #[test]
    pub fn analysis() -> Result<()> {
        let mut solver = Solver::with_table_size(TEST_TABLE_SIZE);

        for (moves, score) in load_test_data("test_data/end_game.txt")?.iter().take(6) {
            let board = BitBoard::from_moves(moves)?;
            let scores = solver.analyze(&board, false);

            for column in 0..WIDTH {
                assert_eq!(scores[column].is_some(), board.playable(column));
            }
            let best = scores.iter().filter_map(|&s| s).max();
            assert_eq!(best, Some(*score), "analysis disagrees for {}", moves);

            let best_move = solver
                .best_move(&board)
                .ok_or_else(|| anyhow!("no move found for {}", moves))?;
            assert_eq!(scores[best_move], Some(*score));

            let mut next = board;
            next.play_column(best_move);
            assert!(board.is_winning_move(best_move) || -solver.solve(&next, false) == *score);
        }
        Ok(())
    }

    #[test]
    pub fn win_distance() -> Result<()> {
        let board = BitBoard::from_moves("112233")?;
        assert_eq!(Solver::score_to_win_distance(&board, 18), 1);
        assert_eq!(Solver::score_to_win_distance(&board, 17), 2);
        assert_eq!(Solver::score_to_win_distance(&board, 0), 18);

        let board = BitBoard::new();
        // first player wins with their 21st tile
        assert_eq!(Solver::score_to_win_distance(&board, 1), 21);
        // second player wins with their 4th tile
        assert_eq!(Solver::score_to_win_distance(&board, -18), 4);
        Ok(())
    }

    #[test]
    #[should_panic]
    pub fn win_distance_rejects_impossible_score() {
        let board = BitBoard::from_moves("112233").unwrap();
        Solver::score_to_win_distance(&board, -25);
    }

    #[test]
    pub fn end_game() -> Result<()> {
        run_test_data("End game", "test_data/end_game.txt")
    }

    #[test]
    pub fn middle_game() -> Result<()> {
        run_test_data("Middle game", "test_data/middle_game.txt")
    }

    #[test]
    #[ignore = "solves the empty board, takes minutes"]
    pub fn full_search() {
        let board = BitBoard::new();
        let mut solver = Solver::new();
        let start_time = Instant::now();
        let calc = solver.solve(&board, true);
        let finish_time = Instant::now();
        let time = finish_time - start_time;
        let posis = solver.node_count;

        println!(
            "Full game search\n Time: {:.6}s, No. of positions: {}, kpos/s: {}",
            time.as_secs_f64(),
            posis,
            posis as f64 / (1000.0 * time.as_secs_f64())
        );
        assert_eq!(calc, 1);
    }
}
