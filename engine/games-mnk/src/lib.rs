//! The m-n-k game: a generalised tic-tac-toe on an m-by-n board where the
//! goal is to be the first to connect k marks in a row, horizontally,
//! vertically or diagonally.
//!
//! The game has perfect information, so its determinisation is a plain
//! clone. It drives the sequential-move search paths of the engine and, as
//! a two-player game, the multi-observer solver as well.

use std::fmt;

use ismcts::{Game, Player, PomGame};

/// Board cell index, row-major from the top-left corner.
pub type Cell = usize;

/// Direction vectors checked for winning sequences.
const STRIDES: [(isize, isize); 4] = [
    (0, 1),  // horizontal
    (1, 0),  // vertical
    (1, 1),  // descending diagonal
    (-1, 1), // ascending diagonal
];

#[derive(Debug, Clone)]
pub struct MnkGame {
    columns: usize,
    rows: usize,
    win_length: usize,
    board: Vec<Vec<Option<Player>>>,
    moves: Vec<Cell>,
    player: Player,
    /// Final score for player 0 once the game is decided: 1 win, 0 loss,
    /// 0.5 draw.
    result: Option<f64>,
}

impl MnkGame {
    /// Standard 3×3 tic-tac-toe.
    pub fn new() -> Self {
        Self::with_dimensions(3, 3, 3)
    }

    /// An m-by-n board requiring k in a row.
    pub fn with_dimensions(columns: usize, rows: usize, win_length: usize) -> Self {
        Self {
            columns,
            rows,
            win_length,
            board: vec![vec![None; columns]; rows],
            moves: (0..columns * rows).collect(),
            player: 0,
            result: None,
        }
    }

    /// Build a mid-game position from a textual board: one string per row,
    /// `.` for an empty cell, `0` or `1` for a mark of that player. Rows
    /// must be equally long.
    ///
    /// # Panics
    ///
    /// Panics on an empty, ragged or otherwise malformed description; this
    /// is a fixture constructor for tests and examples.
    pub fn from_position(rows: &[&str], win_length: usize, to_move: Player) -> Self {
        assert!(!rows.is_empty(), "empty board description");
        let columns = rows[0].len();
        let mut board = Vec::with_capacity(rows.len());
        let mut moves = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), columns, "ragged board description");
            let mut cells = Vec::with_capacity(columns);
            for (c, ch) in row.chars().enumerate() {
                cells.push(match ch {
                    '.' => {
                        moves.push(r * columns + c);
                        None
                    }
                    '0' => Some(0),
                    '1' => Some(1),
                    other => panic!("unexpected board character {other:?}"),
                });
            }
            board.push(cells);
        }
        Self {
            columns,
            rows: rows.len(),
            win_length,
            board,
            moves,
            player: to_move,
            result: None,
        }
    }

    fn row(&self, cell: Cell) -> usize {
        cell / self.columns
    }

    fn column(&self, cell: Cell) -> usize {
        cell % self.columns
    }

    fn mark(&self, row: isize, column: isize) -> Option<Player> {
        if row < 0 || column < 0 || row >= self.rows as isize || column >= self.columns as isize {
            return None;
        }
        self.board[row as usize][column as usize]
    }

    /// Whether placing at `cell` completed a winning sequence for `player`:
    /// count outward in both directions along every stride. The run must be
    /// exactly `win_length` long; a move bridging two runs into a longer one
    /// does not win.
    fn is_winning_move(&self, cell: Cell, player: Player) -> bool {
        let r0 = self.row(cell) as isize;
        let c0 = self.column(cell) as isize;
        STRIDES.iter().any(|&(dr, dc)| {
            let mut count = 1;
            for sign in [-1, 1] {
                let (mut r, mut c) = (r0 + sign * dr, c0 + sign * dc);
                while self.mark(r, c) == Some(player) {
                    count += 1;
                    r += sign * dr;
                    c += sign * dc;
                }
            }
            count == self.win_length
        })
    }
}

impl Default for MnkGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Game for MnkGame {
    type Move = Cell;

    fn clone_randomised(&self, _observer: Player) -> Self {
        // Nothing is hidden; the information set is a single state
        self.clone()
    }

    fn current_player(&self) -> Player {
        self.player
    }

    fn valid_moves(&self) -> Vec<Cell> {
        if self.result.is_none() {
            self.moves.clone()
        } else {
            Vec::new()
        }
    }

    fn do_move(&mut self, mv: Cell) {
        let position = self
            .moves
            .iter()
            .position(|&candidate| candidate == mv)
            .unwrap_or_else(|| panic!("illegal move {mv}"));
        self.moves.remove(position);

        let (row, column) = (self.row(mv), self.column(mv));
        self.board[row][column] = Some(self.player);

        if self.is_winning_move(mv, self.player) {
            self.result = Some(if self.player == 0 { 1.0 } else { 0.0 });
        } else if self.moves.is_empty() {
            self.result = Some(0.5);
        } else {
            self.player = 1 - self.player;
        }
    }

    fn result(&self, player: Player) -> f64 {
        let score = self.result.expect("result queried on an unfinished game");
        if player == 0 {
            score
        } else {
            1.0 - score
        }
    }
}

impl PomGame for MnkGame {
    fn players(&self) -> Vec<Player> {
        vec![0, 1]
    }
}

impl fmt::Display for MnkGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.board {
            for cell in row {
                match cell {
                    Some(player) => write!(f, "{player:>3}")?,
                    None => write!(f, "{:>3}", ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_board_offers_every_cell() {
        let game = MnkGame::new();
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.valid_moves(), (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn moves_alternate_players_and_shrink_the_move_list() {
        let mut game = MnkGame::new();
        game.do_move(4);
        assert_eq!(game.current_player(), 1);
        assert_eq!(game.valid_moves().len(), 8);
        assert!(!game.valid_moves().contains(&4));

        game.do_move(0);
        assert_eq!(game.current_player(), 0);
        assert_eq!(game.valid_moves().len(), 7);
    }

    #[test]
    #[should_panic(expected = "illegal move")]
    fn occupied_cells_are_rejected() {
        let mut game = MnkGame::new();
        game.do_move(4);
        game.do_move(4);
    }

    #[test]
    fn row_win_ends_the_game() {
        let mut game = MnkGame::new();
        // Player 0 takes the top row
        for mv in [0, 3, 1, 4, 2] {
            game.do_move(mv);
        }
        assert!(game.valid_moves().is_empty());
        assert_eq!(game.result(0), 1.0);
        assert_eq!(game.result(1), 0.0);
    }

    #[test]
    fn column_and_diagonal_wins_are_detected() {
        let mut by_column = MnkGame::from_position(&["0..", "0.1", "..1"], 3, 0);
        by_column.do_move(6);
        assert_eq!(by_column.result(0), 1.0);

        let mut by_diagonal = MnkGame::from_position(&["1.0", ".10", "..."], 3, 1);
        by_diagonal.do_move(8);
        assert_eq!(by_diagonal.result(1), 1.0);
        assert_eq!(by_diagonal.result(0), 0.0);
    }

    #[test]
    fn full_board_without_winner_is_a_draw() {
        let mut game = MnkGame::from_position(&["010", "100", "01."], 3, 1);
        game.do_move(8);
        assert!(game.valid_moves().is_empty());
        assert_eq!(game.result(0), 0.5);
        assert_eq!(game.result(1), 0.5);
    }

    #[test]
    fn from_position_exposes_exactly_the_empty_cells() {
        let game = MnkGame::from_position(&[".1.", "100", "00."], 3, 1);
        assert_eq!(game.valid_moves(), vec![0, 2, 8]);
        assert_eq!(game.current_player(), 1);
    }

    #[test]
    fn randomised_clone_is_the_same_position() {
        let game = MnkGame::from_position(&[".1.", "100", "00."], 3, 1);
        let clone = game.clone_randomised(1);
        assert_eq!(clone.valid_moves(), game.valid_moves());
        assert_eq!(clone.current_player(), game.current_player());
    }

    #[test]
    fn both_players_are_enumerated() {
        assert_eq!(MnkGame::new().players(), vec![0, 1]);
    }

    #[test]
    fn display_renders_one_line_per_row() {
        let game = MnkGame::new();
        assert_eq!(game.to_string().lines().count(), 3);
    }
}
