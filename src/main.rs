use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};
use rayon::prelude::*;

use std::cmp::Ordering;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use connect4_solver::{
    bitboard::BitBoard, solver::Solver, transposition_table::DEFAULT_TABLE_SIZE, WIDTH,
};

mod game;
use game::*;

/// Perfect play Connect 4 solver
#[derive(Parser, Debug)]
#[command(name = "connect4", version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Transposition table entries per solver, a prime works best
    #[arg(long, default_value_t = DEFAULT_TABLE_SIZE, global = true)]
    table_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve a position given as a sequence of 1-indexed columns, e.g. 4453
    Solve {
        #[arg(default_value = "")]
        moves: String,

        /// Only compute win/draw/loss
        #[arg(long)]
        weak: bool,
    },
    /// Play a game in the terminal
    Play {
        /// Let the solver play as player 1
        #[arg(long)]
        ai_first: bool,

        /// Let the solver play as player 2
        #[arg(long)]
        ai_second: bool,
    },
    /// Solve every `moves score` line of a file and check the scores
    Bench {
        file: PathBuf,

        /// Number of worker threads, defaults to one per core
        #[arg(long)]
        threads: Option<usize>,

        /// Only check win/draw/loss
        #[arg(long)]
        weak: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .init();

    match cli.command {
        Command::Solve { moves, weak } => solve(&moves, weak, cli.table_size),
        Command::Play {
            ai_first,
            ai_second,
        } => play((ai_first, ai_second), cli.table_size),
        Command::Bench {
            file,
            threads,
            weak,
        } => bench(&file, threads, weak, cli.table_size),
    }
}

fn describe_score(board: &BitBoard, score: i32, weak: bool) {
    let (mover, opponent) = if board.num_moves() % 2 == 0 {
        (1, 2)
    } else {
        (2, 1)
    };
    if weak {
        match score.cmp(&0) {
            Ordering::Greater => println!("Player {} can force a win.", mover),
            Ordering::Less => println!("Player {} can force a win.", opponent),
            Ordering::Equal => println!("Player {} can at best force a draw.", mover),
        }
        return;
    }

    let win_distance = Solver::score_to_win_distance(board, score);
    let move_string = if win_distance == 1 { "move" } else { "moves" };
    match score.cmp(&0) {
        Ordering::Greater => println!(
            "Player {} can force a win in at most {} {}.",
            mover, win_distance, move_string
        ),
        Ordering::Less => println!(
            "Player {} can force a win in at most {} {}.",
            opponent, win_distance, move_string
        ),
        Ordering::Equal => println!(
            "Player {} can at best force a draw, {} {} remaining",
            mover, win_distance, move_string
        ),
    }
}

fn solve(moves: &str, weak: bool, table_size: usize) -> Result<()> {
    let board = BitBoard::from_moves(moves)?;
    print!("{}", board);

    if board.is_full() {
        println!("The board is full, the game is drawn");
        return Ok(());
    }

    let mut solver = Solver::with_table_size(table_size);
    let start_time = Instant::now();
    let score = solver.solve(&board, weak);
    info!(
        "Solved in {:.3}s, {} positions searched",
        start_time.elapsed().as_secs_f64(),
        solver.node_count
    );
    println!("Score: {}", score);
    describe_score(&board, score, weak);

    let scores = solver.analyze(&board, weak);
    let columns: Vec<String> = (1..=WIDTH).map(|column| format!("{:>4}", column)).collect();
    let values: Vec<String> = scores
        .iter()
        .map(|score| match score {
            Some(score) => format!("{:>4}", score),
            None => format!("{:>4}", "-"),
        })
        .collect();
    println!("Column:{}", columns.concat());
    println!("Score: {}", values.concat());

    if !weak {
        if let Some(column) = solver.best_move(&board) {
            println!("Best move: {}", column + 1);
        }
    }
    Ok(())
}

fn play(ai_players: (bool, bool), table_size: usize) -> Result<()> {
    let mut game = Game::new();
    // one solver for the whole game so the transposition table is re-used
    let mut solver = Solver::with_table_size(table_size);

    let stdin = stdin();

    println!("Welcome to Connect 4\n");
    if ai_players.0 || ai_players.1 {
        println!("There are no opening rules, expect early AI moves to take several minutes");
    }

    // game loop
    loop {
        game.display()?;

        match game.state {
            GameState::Playing => {
                let next_move =
                    // AI player
                    if (game.player_one() && ai_players.0) || (!game.player_one() && ai_players.1) {
                        println!("AI is thinking...");
                        stdout().flush()?;

                        // slow down play if both players are AI
                        if ai_players == (true, true) {
                            std::thread::sleep(Duration::new(3, 0));
                        }

                        let best_move = solver
                            .best_move(&game.board)
                            .ok_or_else(|| anyhow!("no playable column left"))?;
                        let mut next = game.board;
                        next.play_column(best_move);
                        let score = if game.board.is_winning_move(best_move) {
                            solver.solve(&game.board, false)
                        } else {
                            -solver.solve(&next, false)
                        };
                        describe_score(&game.board, score, false);

                        println!("Best move: {}", best_move + 1);
                        best_move + 1

                    // human player
                    } else {
                        print!("Move input > ");
                        stdout().flush()?;
                        let mut input_str = String::new();
                        stdin.lock().read_line(&mut input_str)?;

                        match input_str.trim().parse::<usize>() {
                            Err(_) => {
                                println!("Invalid number: {}", input_str.trim());
                                continue;
                            }
                            Ok(column) => column,
                        }
                    };

                if let Err(err) = game.play_checked(next_move) {
                    println!("{}", err);
                    // try the move again
                    continue;
                }
            }

            // end states
            GameState::PlayerOneWin => {
                println!("Player 1 wins! ({})", game.moves);
                break;
            }
            GameState::PlayerTwoWin => {
                println!("Player 2 wins! ({})", game.moves);
                break;
            }
            GameState::Draw => {
                println!("Draw! ({})", game.moves);
                break;
            }
        }
    }
    Ok(())
}

fn load_positions(path: &Path) -> Result<Vec<(BitBoard, i32, String)>> {
    let file = BufReader::new(File::open(path)?);
    let mut positions = vec![];

    for (number, line) in file.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let mut test_data = line.split_whitespace();
        let moves = test_data
            .next()
            .ok_or_else(|| anyhow!("line {}: invalid test data: {}", number + 1, line))?;
        let score = test_data
            .next()
            .ok_or_else(|| anyhow!("line {}: missing score: {}", number + 1, line))?
            .parse::<i32>()
            .map_err(|err| anyhow!("line {}: {}", number + 1, err))?;
        let board =
            BitBoard::from_moves(moves).map_err(|err| anyhow!("line {}: {}", number + 1, err))?;
        positions.push((board, score, moves.to_owned()));
    }
    Ok(positions)
}

fn bench(path: &Path, threads: Option<usize>, weak: bool, table_size: usize) -> Result<()> {
    let positions = load_positions(path)?;
    if positions.is_empty() {
        return Err(anyhow!("no positions found in {}", path.display()));
    }
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    info!(
        "Solving {} positions on {} threads",
        positions.len(),
        rayon::current_num_threads()
    );

    let progress = ProgressBar::new(positions.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("Solving positions: {bar:40.cyan/blue} {pos}/{len} ~{eta} remaining")
            .progress_chars("█▓▒░  "),
    );

    let start = Instant::now();
    // every worker gets its own solver, transposition tables are never shared
    let results: Vec<(i32, usize, Duration)> = positions
        .par_iter()
        .map_init(
            || Solver::with_table_size(table_size),
            |solver, (board, _, _)| {
                solver.reset();
                let start_time = Instant::now();
                let score = solver.solve(board, weak);
                let time = start_time.elapsed();
                progress.inc(1);
                (score, solver.node_count, time)
            },
        )
        .collect();
    progress.finish();

    let mut mismatches = 0;
    for ((_, expected, moves), (score, _, _)) in positions.iter().zip(results.iter()) {
        let expected = if weak { expected.signum() } else { *expected };
        if expected != *score {
            error!("{}: expected {}, calculated {}", moves, expected, score);
            mismatches += 1;
        }
    }

    let times: Vec<Duration> = results.iter().map(|r| r.2).collect();
    let posis: Vec<usize> = results.iter().map(|r| r.1).collect();
    println!(
        "Solved {} positions in {:.3}s\nMean time: {:.6}ms, Mean no. of positions: {}, kpos/s: {}",
        positions.len(),
        start.elapsed().as_secs_f64(),
        (times.iter().sum::<Duration>() / times.len() as u32).as_secs_f64() * 1000.0,
        posis.iter().sum::<usize>() as f64 / posis.len() as f64,
        posis
            .iter()
            .zip(times.iter())
            .map(|(p, t)| *p as f64 / t.as_secs_f64())
            .sum::<f64>()
            / (1000.0 * posis.len() as f64)
    );

    if mismatches > 0 {
        return Err(anyhow!(
            "{} of {} positions scored incorrectly",
            mismatches,
            positions.len()
        ));
    }
    Ok(())
}
