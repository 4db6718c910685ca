//! Rules-engine capability driven by the reconciler.
//!
//! The reconciler only talks to [`RulesEngine`]; [`GoRules`] is the bundled
//! implementation built on [`Position`], keeping the move record needed for
//! game-record export next to the board.

use crate::board::{BoardCoordinate, Color, StoneConfiguration, Stones, all_coordinates};
use crate::constants::DEFAULT_KOMI;
use crate::position::{MoveError, Position};
use crate::sgf::{self, GameRecord, RecordInfo, RecordedMove};

pub trait RulesEngine {
    fn size(&self) -> usize;

    fn to_play(&self) -> Color;

    fn stone_at(&self, c: BoardCoordinate) -> Option<Color>;

    fn stones(&self, color: Color) -> Stones {
        all_coordinates(self.size())
            .filter(|&c| self.stone_at(c) == Some(color))
            .collect()
    }

    /// Snapshot of the current board.
    fn configuration(&self) -> StoneConfiguration {
        StoneConfiguration::from_stones(self.size(), self.stones(Color::Black), self.stones(Color::White))
    }

    fn is_legal(&self, c: BoardCoordinate, color: Color) -> bool;

    /// Stones that playing `c` would capture, without changing the board.
    fn captures_if_played(&self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError>;

    /// Apply a move; returns the captured stones.
    fn play(&mut self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError>;

    /// Pass for the player to move.
    fn pass(&mut self);

    /// Number of passes in a row at the end of the record.
    fn consecutive_passes(&self) -> usize;

    fn is_end_of_game(&self) -> bool {
        self.consecutive_passes() >= 2
    }

    /// Start over on an empty board of the same size.
    ///
    /// # Panics
    /// If White has already played.
    fn reset(&mut self);

    /// # Panics
    /// If the board is not fresh.
    fn place_handicap(&mut self, stones: &Stones);

    /// # Panics
    /// If the board is not fresh.
    fn setup_position(&mut self, blacks: &Stones, whites: &Stones);

    /// Area score from Black's side, komi included; `None` if unscorable.
    fn score(&self) -> Option<f32>;

    /// Record that `color` resigned.
    fn record_resignation(&mut self, color: Color);

    fn set_result(&mut self, result: &str);

    fn result(&self) -> &str;

    fn export_record(&self, info: &RecordInfo) -> String;
}

/// Default rules engine: Chinese-style area scoring with simple ko.
#[derive(Clone, Debug)]
pub struct GoRules {
    pos: Position,
    komi: f32,
    handicap: Stones,
    setup_black: Stones,
    setup_white: Stones,
    moves: Vec<RecordedMove>,
    result: String,
}

impl GoRules {
    pub fn new(size: usize) -> Self {
        Self::with_komi(size, DEFAULT_KOMI)
    }

    pub fn with_komi(size: usize, komi: f32) -> Self {
        let mut pos = Position::new(size);
        pos.komi = komi;
        Self {
            pos,
            komi,
            handicap: Stones::new(),
            setup_black: Stones::new(),
            setup_white: Stones::new(),
            moves: Vec::new(),
            result: String::new(),
        }
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn moves(&self) -> &[RecordedMove] {
        &self.moves
    }

    pub fn position(&self) -> &Position {
        &self.pos
    }
}

impl RulesEngine for GoRules {
    fn size(&self) -> usize {
        self.pos.size()
    }

    fn to_play(&self) -> Color {
        self.pos.to_play
    }

    fn stone_at(&self, c: BoardCoordinate) -> Option<Color> {
        self.pos.stone_at(c)
    }

    fn stones(&self, color: Color) -> Stones {
        self.pos.stones(color)
    }

    fn is_legal(&self, c: BoardCoordinate, color: Color) -> bool {
        self.pos.is_legal(c, color)
    }

    fn captures_if_played(&self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError> {
        self.pos.captures_if_played(c, color)
    }

    fn play(&mut self, c: BoardCoordinate, color: Color) -> Result<Stones, MoveError> {
        let captured = self.pos.play(c, color)?;
        self.moves.push(RecordedMove::Play(color, c));
        Ok(captured)
    }

    fn pass(&mut self) {
        self.moves.push(RecordedMove::Pass(self.pos.to_play));
        self.pos.pass();
    }

    fn consecutive_passes(&self) -> usize {
        self.pos.passes
    }

    fn reset(&mut self) {
        assert!(
            self.pos.stones(Color::White).is_empty() && self.setup_white.is_empty(),
            "cannot reset a game in progress"
        );
        *self = Self::with_komi(self.size(), self.komi);
    }

    fn place_handicap(&mut self, stones: &Stones) {
        self.pos.place_handicap(stones);
        self.handicap = stones.clone();
    }

    fn setup_position(&mut self, blacks: &Stones, whites: &Stones) {
        self.pos.setup(blacks, whites);
        self.setup_black = blacks.clone();
        self.setup_white = whites.clone();
    }

    fn score(&self) -> Option<f32> {
        self.pos.score()
    }

    fn record_resignation(&mut self, color: Color) {
        self.moves.push(RecordedMove::Resign(color));
    }

    fn set_result(&mut self, result: &str) {
        self.result = result.to_string();
    }

    fn result(&self) -> &str {
        &self.result
    }

    fn export_record(&self, info: &RecordInfo) -> String {
        let record = GameRecord {
            size: self.size(),
            komi: self.komi,
            handicap: &self.handicap,
            setup_black: &self.setup_black,
            setup_white: &self.setup_white,
            moves: &self.moves,
            result: &self.result,
        };
        sgf::write_record(&record, info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(col: usize, row: usize) -> BoardCoordinate {
        BoardCoordinate::new(col, row)
    }

    #[test]
    fn moves_are_recorded() {
        let mut rules = GoRules::new(9);
        rules.play(c(3, 3), Color::Black).unwrap();
        rules.pass();
        assert_eq!(
            rules.moves(),
            &[RecordedMove::Play(Color::Black, c(3, 3)), RecordedMove::Pass(Color::White)]
        );
        assert_eq!(rules.consecutive_passes(), 1);
        assert!(!rules.is_end_of_game());
        rules.pass();
        assert!(rules.is_end_of_game());
    }

    #[test]
    fn illegal_moves_leave_no_trace() {
        let mut rules = GoRules::new(9);
        rules.play(c(3, 3), Color::Black).unwrap();
        assert_eq!(rules.play(c(3, 3), Color::White), Err(MoveError::Occupied));
        assert_eq!(rules.moves().len(), 1);
    }

    #[test]
    fn reset_keeps_size_and_komi() {
        let mut rules = GoRules::with_komi(13, 0.5);
        rules.place_handicap(&[c(4, 4), c(10, 10)].into_iter().collect());
        rules.reset();
        assert_eq!(rules.size(), 13);
        assert_eq!(rules.komi(), 0.5);
        assert!(rules.configuration().is_empty());
        assert_eq!(rules.to_play(), Color::Black);
    }

    #[test]
    #[should_panic(expected = "cannot reset a game in progress")]
    fn reset_after_white_panics() {
        let mut rules = GoRules::new(9);
        rules.play(c(3, 3), Color::Black).unwrap();
        rules.play(c(7, 7), Color::White).unwrap();
        rules.reset();
    }

    #[test]
    fn configuration_matches_board() {
        let mut rules = GoRules::new(9);
        rules.setup_position(&[c(1, 1)].into_iter().collect(), &[c(9, 9)].into_iter().collect());
        let config = rules.configuration();
        assert_eq!(config.get(c(1, 1)), Some(Color::Black));
        assert_eq!(config.get(c(9, 9)), Some(Color::White));
        assert_eq!(config.stones(Color::Black).len(), 1);
    }
}
