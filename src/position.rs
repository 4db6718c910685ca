//! Go position representation and move execution.
//!
//! This module is the rules core used by [`crate::rules::GoRules`]:
//! - Board state as a 1D array with padding, sized at runtime
//! - Stone placement and capture resolution
//! - Ko rule enforcement and suicide rejection
//! - Capture simulation that never touches the board
//! - Area scoring
//!
//! Unlike an engine that swaps colors every move, stones are stored with their
//! absolute color, since the reconciler compares them against a physical board.

use thiserror::Error;

use crate::board::{BoardCoordinate, Color, Stones, all_coordinates};
use crate::constants::{DEFAULT_KOMI, MAX_BOARD_SIZE, MIN_BOARD_SIZE};

/// A point on the board, represented as an index into the padded 1D array.
pub type Point = usize;

/// Pass move marker (index 0 is padding, so safe to use).
pub const PASS_MOVE: Point = 0;

/// Black stone.
pub const STONE_BLACK: u8 = b'X';

/// White stone.
pub const STONE_WHITE: u8 = b'O';

/// Empty point.
pub const EMPTY: u8 = b'.';

/// Out of bounds (padding).
pub const OUT: u8 = b' ';

/// Reason a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move: point off the board")]
    OffBoard,
    #[error("illegal move: point not empty")]
    Occupied,
    #[error("illegal move: retakes ko")]
    Ko,
    #[error("illegal move: suicide")]
    Suicide,
}

fn stone_byte(color: Color) -> u8 {
    match color {
        Color::Black => STONE_BLACK,
        Color::White => STONE_WHITE,
    }
}

fn byte_color(c: u8) -> Option<Color> {
    match c {
        STONE_BLACK => Some(Color::Black),
        STONE_WHITE => Some(Color::White),
        _ => None,
    }
}

/// A Go position (board state).
///
/// Rows are stored top first: the padded index of `(col, row)` is
/// `(size - row + 1) * (size + 1) + col`. Row 0 and column 0 of the
/// array, plus one trailing row, are padding.
#[derive(Clone, Debug)]
pub struct Position {
    size: usize,
    /// Board state: 'X' = black, 'O' = white, '.' = empty, ' ' = out of bounds
    pub color: Vec<u8>,
    /// Player to move
    pub to_play: Color,
    /// Number of moves and passes played (0 = start of game)
    pub n: usize,
    /// Ko point (0 if no ko)
    pub ko: Point,
    /// Consecutive passes ending at the last move
    pub passes: usize,
    /// Number of handicap stones placed
    pub handicap: usize,
    /// Komi (compensation points for White)
    pub komi: f32,
}

impl Position {
    /// Create an empty position.
    ///
    /// # Panics
    /// If `size` is outside the supported range.
    pub fn new(size: usize) -> Self {
        assert!(
            (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size),
            "unsupported board size {size}"
        );
        let stride = size + 1;
        let mut color = vec![OUT; (size + 1) * (size + 2) + 1];
        for row in 1..=size {
            for col in 1..=size {
                color[row * stride + col] = EMPTY;
            }
        }
        Position {
            size,
            color,
            to_play: Color::Black,
            n: 0,
            ko: 0,
            passes: 0,
            handicap: 0,
            komi: DEFAULT_KOMI,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Padded index of an on-board coordinate.
    pub fn point(&self, c: BoardCoordinate) -> Option<Point> {
        c.is_on_board(self.size)
            .then(|| (self.size - c.row + 1) * (self.size + 1) + c.col)
    }

    /// Board coordinate of a padded index.
    pub fn coord(&self, pt: Point) -> BoardCoordinate {
        let stride = self.size + 1;
        BoardCoordinate::new(pt % stride, self.size + 1 - pt / stride)
    }

    pub fn stone_at(&self, c: BoardCoordinate) -> Option<Color> {
        self.point(c).and_then(|pt| byte_color(self.color[pt]))
    }

    pub fn stones(&self, color: Color) -> Stones {
        all_coordinates(self.size)
            .filter(|&c| self.stone_at(c) == Some(color))
            .collect()
    }

    /// True when no stone has ever been placed and no move played.
    pub fn is_fresh(&self) -> bool {
        self.n == 0 && self.color.iter().all(|&c| c == EMPTY || c == OUT)
    }

    /// Get the 4 orthogonal neighbors (N, E, S, W) of a point.
    #[inline]
    fn neighbors(&self, pt: Point) -> [Point; 4] {
        let stride = self.size + 1;
        [pt - stride, pt + 1, pt + stride, pt - 1]
    }

    /// Check if a point is "eyeish" (all orthogonal neighbors one color or padding).
    ///
    /// Returns the color of the surrounding stones. May return a color for false eyes.
    pub fn is_eyeish(&self, pt: Point) -> Option<Color> {
        let mut eyecolor = None;
        for n in self.neighbors(pt) {
            match self.color[n] {
                OUT => continue,
                EMPTY => return None,
                c => match eyecolor {
                    None => eyecolor = byte_color(c),
                    Some(e) if Some(e) != byte_color(c) => return None,
                    Some(_) => {}
                },
            }
        }
        eyecolor
    }

    /// Flood-fill the group at `start`, returning its stones and liberty count.
    fn group(&self, start: Point) -> (Vec<Point>, usize) {
        let color = self.color[start];
        let mut stack = vec![start];
        let mut visited = vec![false; self.color.len()];
        let mut liberty_visited = vec![false; self.color.len()];
        let mut stones = Vec::new();
        let mut libs = 0;

        while let Some(pt) = stack.pop() {
            if visited[pt] {
                continue;
            }
            visited[pt] = true;
            stones.push(pt);
            for n in self.neighbors(pt) {
                match self.color[n] {
                    EMPTY => {
                        if !liberty_visited[n] {
                            liberty_visited[n] = true;
                            libs += 1;
                        }
                    }
                    c if c == color && !visited[n] => stack.push(n),
                    _ => {}
                }
            }
        }
        (stones, libs)
    }

    /// Number of liberties of the group containing `pt`.
    pub fn group_liberties(&self, pt: Point) -> usize {
        self.group(pt).1
    }

    /// Validate a move without playing it and return the stones it would capture.
    ///
    /// A neighboring enemy group is captured when `pt` is its last liberty.
    /// Without captures, the move is suicide if `pt` has no empty neighbor and
    /// every friendly neighbor group would lose its last liberty.
    pub fn check_move(&self, pt: Point, color: Color) -> Result<Vec<Point>, MoveError> {
        if pt == PASS_MOVE || pt >= self.color.len() || self.color[pt] == OUT {
            return Err(MoveError::OffBoard);
        }
        if self.color[pt] != EMPTY {
            return Err(MoveError::Occupied);
        }
        if pt == self.ko && color == self.to_play {
            return Err(MoveError::Ko);
        }

        let own = stone_byte(color);
        let enemy = stone_byte(color.opponent());
        let mut captured: Vec<Point> = Vec::new();
        let mut has_liberty = false;

        for n in self.neighbors(pt) {
            match self.color[n] {
                EMPTY => has_liberty = true,
                c if c == enemy && !captured.contains(&n) => {
                    let (stones, libs) = self.group(n);
                    if libs == 1 {
                        captured.extend(stones);
                    }
                }
                c if c == own => {
                    if self.group_liberties(n) > 1 {
                        has_liberty = true;
                    }
                }
                _ => {}
            }
        }

        if captured.is_empty() && !has_liberty {
            return Err(MoveError::Suicide);
        }
        Ok(captured)
    }

    pub fn is_legal(&self, c: BoardCoordinate, color: Color) -> bool {
        self.point(c)
            .is_some_and(|pt| self.check_move(pt, color).is_ok())
    }

    /// Stones that playing `c` for `color` would capture. The position is not modified.
    pub fn captures_if_played(&self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError> {
        let pt = self.point(c).ok_or(MoveError::OffBoard)?;
        let captured = self.check_move(pt, color)?;
        Ok(captured.into_iter().map(|p| self.coord(p)).collect())
    }

    /// Play a move for `color`, resolve captures, and hand the turn to the opponent.
    pub fn play(&mut self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError> {
        let pt = self.point(c).ok_or(MoveError::OffBoard)?;
        let captured = self.check_move(pt, color)?;

        // Check if playing into enemy eye (for ko detection)
        let in_enemy_eye = self.is_eyeish(pt) == Some(color.opponent());

        self.color[pt] = stone_byte(color);
        for &r in &captured {
            self.color[r] = EMPTY;
        }

        // Set ko if captured exactly one stone in an eye
        self.ko = if captured.len() == 1 && in_enemy_eye {
            captured[0]
        } else {
            0
        };

        self.to_play = color.opponent();
        self.n += 1;
        self.passes = 0;
        Ok(captured.into_iter().map(|p| self.coord(p)).collect())
    }

    /// Execute a pass move. The ko is cleared on pass.
    pub fn pass(&mut self) {
        self.to_play = self.to_play.opponent();
        self.n += 1;
        self.passes += 1;
        self.ko = 0;
    }

    /// Place handicap stones on a fresh board; White moves next.
    ///
    /// # Panics
    /// If any move has been played or any stone placed already.
    pub fn place_handicap(&mut self, stones: &Stones) {
        assert!(self.is_fresh(), "handicap stones can only be placed on a fresh board");
        for &c in stones {
            if let Some(pt) = self.point(c) {
                self.color[pt] = STONE_BLACK;
            }
        }
        self.handicap = stones.len();
        if !stones.is_empty() {
            self.to_play = Color::White;
        }
    }

    /// Place a fixed setup position on a fresh board; Black moves next.
    pub fn setup(&mut self, blacks: &Stones, whites: &Stones) {
        assert!(self.is_fresh(), "setup stones can only be placed on a fresh board");
        for (stones, byte) in [(blacks, STONE_BLACK), (whites, STONE_WHITE)] {
            for &c in stones {
                if let Some(pt) = self.point(c) {
                    self.color[pt] = byte;
                }
            }
        }
        self.to_play = Color::Black;
    }

    /// Area score from Black's point of view (positive = Black leads), komi included.
    ///
    /// Each player counts their stones plus the empty regions bordered only by
    /// their stones. Regions touching both colors are neutral. Dead stones are
    /// not removed. Returns `None` when the board holds no stones at all.
    pub fn score(&self) -> Option<f32> {
        let mut black = 0i32;
        let mut white = 0i32;
        let mut visited = vec![false; self.color.len()];

        for pt in 0..self.color.len() {
            match self.color[pt] {
                STONE_BLACK => black += 1,
                STONE_WHITE => white += 1,
                EMPTY if !visited[pt] => {
                    let (size, borders) = self.empty_region(pt, &mut visited);
                    match borders {
                        (true, false) => black += size,
                        (false, true) => white += size,
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        if black == 0 && white == 0 {
            return None;
        }
        Some(black as f32 - white as f32 - self.komi)
    }

    /// Flood-fill an empty region; returns its size and whether it touches (black, white).
    fn empty_region(&self, start: Point, visited: &mut [bool]) -> (i32, (bool, bool)) {
        let mut stack = vec![start];
        let mut size = 0;
        let mut borders = (false, false);
        while let Some(pt) = stack.pop() {
            if visited[pt] {
                continue;
            }
            visited[pt] = true;
            size += 1;
            for n in self.neighbors(pt) {
                match self.color[n] {
                    EMPTY if !visited[n] => stack.push(n),
                    STONE_BLACK => borders.0 = true,
                    STONE_WHITE => borders.1 = true,
                    _ => {}
                }
            }
        }
        (size, borders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(pos: &Position, v: &str) -> BoardCoordinate {
        BoardCoordinate::parse(v, pos.size()).unwrap()
    }

    fn play_all(pos: &mut Position, moves: &[&str]) {
        for mv in moves {
            let color = pos.to_play;
            if *mv == "pass" {
                pos.pass();
            } else {
                let c = at(pos, mv);
                pos.play(c, color).unwrap();
            }
        }
    }

    #[test]
    fn test_empty_position() {
        let pos = Position::new(9);
        assert_eq!(pos.stone_at(BoardCoordinate::new(5, 5)), None);
        assert_eq!(pos.n, 0);
        assert_eq!(pos.ko, 0);
        assert!(pos.is_fresh());
    }

    #[test]
    fn test_point_coord_roundtrip() {
        for size in [2, 9, 13, 19] {
            let pos = Position::new(size);
            for c in all_coordinates(size) {
                let pt = pos.point(c).unwrap();
                assert_eq!(pos.color[pt], EMPTY);
                assert_eq!(pos.coord(pt), c);
            }
        }
    }

    #[test]
    #[should_panic(expected = "unsupported board size")]
    fn test_rejects_oversized_board() {
        Position::new(20);
    }

    #[test]
    fn test_play_move_basic() {
        let mut pos = Position::new(9);
        let c = at(&pos, "D4");
        assert!(pos.play(c, Color::Black).unwrap().is_empty());
        assert_eq!(pos.n, 1);
        assert_eq!(pos.to_play, Color::White);
        assert_eq!(pos.stone_at(c), Some(Color::Black));
        assert_eq!(pos.play(c, Color::White), Err(MoveError::Occupied));
    }

    #[test]
    fn test_play_move_suicide() {
        let mut pos = Position::new(9);
        play_all(&mut pos, &["A2", "H8", "B1"]);
        let corner = at(&pos, "A1");
        assert_eq!(pos.play(corner, Color::White), Err(MoveError::Suicide));
        assert_eq!(pos.stone_at(corner), None);
    }

    #[test]
    fn test_capture() {
        let mut pos = Position::new(9);
        play_all(&mut pos, &["C3", "D3", "E3", "D4", "D2", "H8", "C4", "H9"]);
        // D3 is surrounded by C3, E3, D2; D4 connects it upward
        let captured = pos.play(at(&pos, "D5"), Color::Black).unwrap();
        assert!(captured.is_empty());
        play_all(&mut pos, &["J9"]);
        let captured = pos.play(at(&pos, "E4"), Color::Black).unwrap();
        let expected: Stones = [at(&pos, "D3"), at(&pos, "D4")].into_iter().collect();
        assert_eq!(captured, expected);
        assert_eq!(pos.stone_at(at(&pos, "D3")), None);
    }

    #[test]
    fn test_captures_if_played_is_pure() {
        let mut pos = Position::new(9);
        play_all(&mut pos, &["E6", "E5", "D5", "H8", "F5"]);
        pos.to_play = Color::Black;
        let before = pos.color.clone();
        let captured = pos.captures_if_played(at(&pos, "E4"), Color::Black).unwrap();
        let expected: Stones = [at(&pos, "E5")].into_iter().collect();
        assert_eq!(captured, expected);
        assert_eq!(pos.color, before);
        assert_eq!(pos.to_play, Color::Black);
    }

    #[test]
    fn test_ko_rule() {
        let mut pos = Position::new(9);
        // White D4 ends up inside Black's mouth at D5 C4 D3
        play_all(&mut pos, &["D5", "E5", "C4", "F4", "D3", "E3", "H8", "D4"]);
        let captured = pos.play(at(&pos, "E4"), Color::Black).unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(pos.ko, pos.point(at(&pos, "D4")).unwrap());
        // Immediate retake is ko
        assert_eq!(pos.play(at(&pos, "D4"), Color::White), Err(MoveError::Ko));
        // After a ko threat exchange the retake is allowed
        play_all(&mut pos, &["J1", "J2"]);
        assert_eq!(pos.play(at(&pos, "D4"), Color::White).unwrap().len(), 1);
    }

    #[test]
    fn test_group_liberties() {
        let mut pos = Position::new(9);
        let c = at(&pos, "D4");
        pos.play(c, Color::Black).unwrap();
        let pt = pos.point(c).unwrap();
        assert_eq!(pos.group_liberties(pt), 4);
        let corner = at(&pos, "A1");
        pos.play(corner, Color::White).unwrap();
        assert_eq!(pos.group_liberties(pos.point(corner).unwrap()), 2);
    }

    #[test]
    fn test_is_eyeish() {
        let mut pos = Position::new(9);
        let corner = pos.point(at(&pos, "A1")).unwrap();
        assert_eq!(pos.is_eyeish(corner), None);
        play_all(&mut pos, &["A2", "H8", "B1"]);
        assert_eq!(pos.is_eyeish(corner), Some(Color::Black));
    }

    #[test]
    fn test_handicap_hands_turn_to_white() {
        let mut pos = Position::new(9);
        let stones: Stones = [at(&pos, "C3"), at(&pos, "G7")].into_iter().collect();
        pos.place_handicap(&stones);
        assert_eq!(pos.handicap, 2);
        assert_eq!(pos.to_play, Color::White);
        assert_eq!(pos.stones(Color::Black), stones);
    }

    #[test]
    #[should_panic(expected = "fresh board")]
    fn test_handicap_on_started_game_panics() {
        let mut pos = Position::new(9);
        pos.pass();
        pos.place_handicap(&Stones::new());
    }

    #[test]
    fn test_area_score() {
        let mut pos = Position::new(3);
        pos.komi = 0.5;
        // Black wall on column B, White stone at C2
        pos.setup(
            &[BoardCoordinate::new(2, 1), BoardCoordinate::new(2, 2), BoardCoordinate::new(2, 3)]
                .into_iter()
                .collect(),
            &[BoardCoordinate::new(3, 2)].into_iter().collect(),
        );
        // Black: 3 stones + column A (3) = 6; White: 1 stone, C1/C3 touch both
        assert_eq!(pos.score(), Some(6.0 - 1.0 - 0.5));
    }

    #[test]
    fn test_empty_board_is_unscorable() {
        assert_eq!(Position::new(9).score(), None);
    }
}
