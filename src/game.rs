use anyhow::{anyhow, Result};
use crossterm::{
    cursor::MoveTo,
    style::{style, Attribute, Color, PrintStyledContent},
    QueueableCommand,
};

use std::io::{stdout, Write};

use connect4_solver::{
    bitboard::{BitBoard, Cell},
    HEIGHT, WIDTH,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GameState {
    Playing,
    PlayerOneWin,
    PlayerTwoWin,
    Draw,
}

/// A game in progress, driving a `BitBoard` one column at a time
pub struct Game {
    pub board: BitBoard,
    pub moves: String,
    pub state: GameState,
}

impl Game {
    pub fn new() -> Self {
        Self {
            board: BitBoard::new(),
            moves: String::new(),
            state: GameState::Playing,
        }
    }

    pub fn player_one(&self) -> bool {
        self.board.num_moves() % 2 == 0
    }

    pub fn play_checked(&mut self, column_one_indexed: usize) -> Result<GameState> {
        if self.state != GameState::Playing {
            return Err(anyhow!("The game is already over"));
        }
        if column_one_indexed < 1 || column_one_indexed > WIDTH {
            return Err(anyhow!(
                "Invalid move, column {} out of range. Columns must be between 1 and {}",
                column_one_indexed,
                WIDTH
            ));
        }
        let column = column_one_indexed - 1;
        if !self.board.playable(column) {
            return Err(anyhow!("Invalid move, column {} full", column_one_indexed));
        }

        let winning = self.board.is_winning_move(column);
        let player_one = self.player_one();
        self.board.play_column(column);
        self.moves.push_str(&column_one_indexed.to_string());

        self.state = if winning {
            if player_one {
                GameState::PlayerOneWin
            } else {
                GameState::PlayerTwoWin
            }
        } else if self.board.is_full() {
            GameState::Draw
        } else {
            GameState::Playing
        };
        Ok(self.state)
    }

    pub fn display(&self) -> Result<()> {
        let mut stdout = stdout();

        let cols: String = (1..=WIDTH).map(|x| x.to_string()).collect();
        stdout.queue(PrintStyledContent(style(cols + "\n")))?;
        for _ in 0..HEIGHT {
            stdout.queue(PrintStyledContent(style("\n")))?;
        }
        stdout.flush()?;

        let (origin_x, origin_y) = crossterm::cursor::position()?;
        let player_one = self.player_one();

        for row in 0..HEIGHT {
            for column in 0..WIDTH {
                let colour = match self.board.cell(column, row) {
                    Cell::Empty => Color::DarkBlue,
                    Cell::Mover if player_one => Color::Red,
                    Cell::Opponent if !player_one => Color::Red,
                    _ => Color::Yellow,
                };
                stdout
                    .queue(MoveTo(origin_x + column as u16, origin_y - row as u16))?
                    .queue(PrintStyledContent(
                        style("O")
                            .attribute(Attribute::Bold)
                            .on(Color::DarkBlue)
                            .with(colour),
                    ))?;
            }
        }
        stdout
            .queue(MoveTo(origin_x + WIDTH as u16, origin_y))?
            .queue(PrintStyledContent(style("\n")))?;
        stdout.flush()?;
        Ok(())
    }
}
