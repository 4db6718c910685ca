//! Game state reconciler.
//!
//! [`Game`] owns the canonical rules state and decides, for every scanned
//! [`StoneConfiguration`], whether the physical board shows a legal
//! continuation of the game. It never trusts the scan blindly: the only way a
//! configuration changes the canonical state is through a single legal move,
//! a handicap re-placement before White's first stone, or the completion of a
//! pending capture.
//!
//! A capturing move is applied as soon as the new stone is seen. If the
//! captured stones are still on the physical board, the game waits in
//! [`Phase::CapturePending`] until a scan shows exactly the canonical board.

use std::fs;
use std::path::Path;

use log::{debug, info, warn};

use crate::board::{BoardCoordinate, Color, StoneConfiguration, Stones};
use crate::constants::UNSCORABLE_RESULT;
use crate::rules::{GoRules, RulesEngine};
use crate::sgf::RecordInfo;

/// Outcome of one reconciliation attempt. The canonical state is the source
/// of truth for what actually happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateResult {
    Legal,
    Illegal,
}

/// Stones that must be lifted off the physical board before play continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureObligation {
    /// Color that played the capturing move.
    pub capturer: Color,
    pub stones: Stones,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No white stone seen yet; black stones may be rearranged freely.
    AwaitingHandicapStones,
    Normal,
    CapturePending(CaptureObligation),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("setup is for a {found}x{found} board but the game is {expected}x{expected}")]
    InvalidSetup { expected: usize, found: usize },
}

/// Stones added and removed per color between two configurations.
#[derive(Debug, Default)]
struct Changes {
    added: [Stones; 2],
    removed: [Stones; 2],
}

fn slot(color: Color) -> usize {
    match color {
        Color::Black => 0,
        Color::White => 1,
    }
}

impl Changes {
    fn between(before: &StoneConfiguration, after: &StoneConfiguration) -> Self {
        let mut changes = Self::default();
        for color in [Color::Black, Color::White] {
            let old = before.stones(color);
            let new = after.stones(color);
            changes.added[slot(color)] = new.difference(&old).copied().collect();
            changes.removed[slot(color)] = old.difference(&new).copied().collect();
        }
        changes
    }

    fn added(&self, color: Color) -> &Stones {
        &self.added[slot(color)]
    }

    fn removed(&self, color: Color) -> &Stones {
        &self.removed[slot(color)]
    }

    fn is_empty(&self) -> bool {
        self.added.iter().chain(&self.removed).all(Stones::is_empty)
    }
}

/// Result string for a final score from Black's side.
///
/// `"0"` for a draw, otherwise the winner's letter and the margin with three
/// significant digits, e.g. `"B+3.5"` or `"W+12"`.
pub fn format_score(score: Option<f32>) -> String {
    match score {
        None => UNSCORABLE_RESULT.to_string(),
        Some(s) if s == 0.0 => "0".to_string(),
        Some(s) => {
            let winner = if s < 0.0 { Color::White } else { Color::Black };
            format!("{}+{}", winner.letter(), significant(s.abs() as f64, 3))
        }
    }
}

/// `printf("%.*g")`-style formatting of a positive value.
fn significant(v: f64, digits: usize) -> String {
    let digits = digits.max(1);
    let sci = format!("{:.*e}", digits - 1, v);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= digits as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exp.abs())
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        trim_zeros(&format!("{v:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// The canonical game, fed by scanned configurations and user commands.
#[derive(Clone, Debug)]
pub struct Game<R: RulesEngine = GoRules> {
    rules: R,
    phase: Phase,
    finished: bool,
}

impl Game<GoRules> {
    /// A fresh game on an empty board.
    ///
    /// # Panics
    /// If `size` is outside the supported range.
    pub fn new(size: usize) -> Self {
        Self::from_rules(GoRules::new(size))
    }

    pub fn with_komi(size: usize, komi: f32) -> Self {
        Self::from_rules(GoRules::with_komi(size, komi))
    }

    /// A game starting from an initial configuration.
    ///
    /// Black-only setups are placed as handicap and further black changes are
    /// accepted until White's first stone; setups with white stones are fixed
    /// starting positions with Black to move.
    pub fn with_setup(size: usize, setup: &StoneConfiguration) -> Result<Self, GameError> {
        if setup.size() != size {
            return Err(GameError::InvalidSetup {
                expected: size,
                found: setup.size(),
            });
        }
        let mut game = Self::new(size);
        let whites = setup.stones(Color::White);
        if whites.is_empty() {
            game.place_black_stones(&setup.stones(Color::Black));
        } else {
            game.rules.setup_position(&setup.stones(Color::Black), &whites);
            game.phase = Phase::Normal;
        }
        Ok(game)
    }
}

impl<R: RulesEngine> Game<R> {
    /// Wrap an existing rules engine. The handicap phase is active only if
    /// White has no stone on its board.
    pub fn from_rules(rules: R) -> Self {
        let phase = if rules.stones(Color::White).is_empty() {
            Phase::AwaitingHandicapStones
        } else {
            Phase::Normal
        };
        Self {
            rules,
            phase,
            finished: false,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn capture_obligation(&self) -> Option<&CaptureObligation> {
        match &self.phase {
            Phase::CapturePending(obligation) => Some(obligation),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Canonical board.
    pub fn board(&self) -> StoneConfiguration {
        self.rules.configuration()
    }

    /// Player expected to act next. While a capture is pending this is still
    /// the capturing player; the turn passes once the stones are removed.
    pub fn to_play(&self) -> Color {
        match &self.phase {
            Phase::CapturePending(obligation) => obligation.capturer,
            _ => self.rules.to_play(),
        }
    }

    /// Game result, empty while the game is running.
    pub fn result(&self) -> &str {
        self.rules.result()
    }

    /// Interpret a freshly scanned configuration.
    pub fn reconcile(&mut self, config: &StoneConfiguration) -> UpdateResult {
        if config.size() != self.rules.size() {
            warn!(
                "ignoring {0}x{0} configuration for a {1}x{1} game",
                config.size(),
                self.rules.size()
            );
            return UpdateResult::Illegal;
        }

        let board = self.rules.configuration();
        let changes = Changes::between(&board, config);
        debug!(
            "reconcile: +{}B +{}W -{}B -{}W in {:?}",
            changes.added(Color::Black).len(),
            changes.added(Color::White).len(),
            changes.removed(Color::Black).len(),
            changes.removed(Color::White).len(),
            self.phase
        );

        if self.finished {
            if changes.is_empty() {
                return UpdateResult::Legal;
            }
            info!("game is over; board changes are ignored");
            return UpdateResult::Illegal;
        }

        match &self.phase {
            Phase::CapturePending(obligation) => {
                if *config == board {
                    debug!("capture of {} stone(s) completed", obligation.stones.len());
                    self.phase = Phase::Normal;
                    UpdateResult::Legal
                } else {
                    info!("waiting for {} captured stone(s) to be removed", obligation.stones.len());
                    UpdateResult::Illegal
                }
            }
            Phase::AwaitingHandicapStones if config.stones(Color::White).is_empty() => {
                let blacks = config.stones(Color::Black);
                if blacks.is_empty() {
                    debug!("no black stones seen; keeping the current placement");
                } else if blacks != self.rules.stones(Color::Black) {
                    self.rules.reset();
                    self.place_black_stones(&blacks);
                }
                UpdateResult::Legal
            }
            Phase::AwaitingHandicapStones => {
                debug!("first white stone seen; handicap placement closed");
                self.phase = Phase::Normal;
                self.reconcile_move(&changes)
            }
            Phase::Normal => self.reconcile_move(&changes),
        }
    }

    /// Place black stones on a fresh board: a lone stone is an ordinary first
    /// move, several stones are handicap.
    fn place_black_stones(&mut self, blacks: &Stones) {
        match blacks.len() {
            0 => {}
            1 => {
                for &c in blacks {
                    if let Err(e) = self.rules.play(c, Color::Black) {
                        warn!("opening stone {} rejected: {e}", c.vertex());
                    }
                }
            }
            n => {
                debug!("placing {n} handicap stones");
                self.rules.place_handicap(blacks);
            }
        }
    }

    fn reconcile_move(&mut self, changes: &Changes) -> UpdateResult {
        let added_black = changes.added(Color::Black);
        let added_white = changes.added(Color::White);
        match (added_black.len(), added_white.len()) {
            (0, 0) => {
                if changes.is_empty() {
                    UpdateResult::Legal
                } else {
                    info!("stones removed without a move");
                    UpdateResult::Illegal
                }
            }
            (1, 0) => self.play_move(first(added_black), Color::Black, changes),
            (0, 1) => self.play_move(first(added_white), Color::White, changes),
            (b, w) => {
                info!("{b} black and {w} white stones added at once");
                UpdateResult::Illegal
            }
        }
    }

    fn play_move(&mut self, c: Option<BoardCoordinate>, color: Color, changes: &Changes) -> UpdateResult {
        let Some(c) = c else {
            return UpdateResult::Illegal;
        };
        if self.rules.to_play() != color {
            info!("{color:?} played {} out of turn", c.vertex());
            return UpdateResult::Illegal;
        }
        let captured = match self.rules.captures_if_played(c, color) {
            Ok(captured) => captured,
            Err(e) => {
                info!("{color:?} {}: {e}", c.vertex());
                return UpdateResult::Illegal;
            }
        };

        let removed_own = changes.removed(color);
        let removed_opp = changes.removed(color.opponent());

        if captured.is_empty() {
            if !removed_own.is_empty() || !removed_opp.is_empty() {
                info!("{} captures nothing but stones were removed", c.vertex());
                return UpdateResult::Illegal;
            }
            return self.apply(c, color);
        }

        if !removed_own.is_empty() {
            info!("{color:?} stones removed while {color:?} captures");
            return UpdateResult::Illegal;
        }
        if !removed_opp.is_subset(&captured) {
            info!("removed stones are not captured by {}", c.vertex());
            return UpdateResult::Illegal;
        }

        if self.apply(c, color) == UpdateResult::Illegal {
            return UpdateResult::Illegal;
        }
        if *removed_opp == captured {
            return UpdateResult::Legal;
        }

        let remaining: Stones = captured.difference(removed_opp).copied().collect();
        debug!("{} captures; {} stone(s) still on the board", c.vertex(), remaining.len());
        self.phase = Phase::CapturePending(CaptureObligation {
            capturer: color,
            stones: remaining,
        });
        UpdateResult::Illegal
    }

    fn apply(&mut self, c: BoardCoordinate, color: Color) -> UpdateResult {
        match self.rules.play(c, color) {
            Ok(_) => {
                debug!("{color:?} {}", c.vertex());
                UpdateResult::Legal
            }
            Err(e) => {
                info!("{color:?} {}: {e}", c.vertex());
                UpdateResult::Illegal
            }
        }
    }

    /// Pass for the player to move. Two passes in a row end and score the game.
    /// Rejected while a capture is pending or after the game has ended.
    pub fn pass(&mut self) -> UpdateResult {
        if self.finished {
            return UpdateResult::Illegal;
        }
        if let Phase::CapturePending(obligation) = &self.phase {
            info!("pass rejected: {} captured stone(s) still on the board", obligation.stones.len());
            return UpdateResult::Illegal;
        }
        self.phase = Phase::Normal;
        self.rules.pass();
        if self.rules.is_end_of_game() {
            let result = format_score(self.rules.score());
            info!("game ended by passes: {result}");
            self.rules.set_result(&result);
            self.finished = true;
        }
        UpdateResult::Legal
    }

    /// The player reported by [`Game::to_play`] resigns; while a capture is
    /// pending that is the capturer. The obligation is dropped.
    pub fn resign(&mut self) -> String {
        if self.finished {
            return self.result().to_string();
        }
        let loser = self.to_play();
        self.phase = Phase::Normal;
        let result = format!("{}+R", loser.opponent().letter());
        self.rules.record_resignation(loser);
        self.rules.set_result(&result);
        self.finished = true;
        info!("{loser:?} resigned: {result}");
        result
    }

    /// End the game now by two passes and return the result.
    pub fn finish(&mut self) -> String {
        if !self.finished {
            self.phase = Phase::Normal;
            self.pass();
            self.pass();
        }
        self.result().to_string()
    }

    /// Write the game record as SGF. Returns `false` if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>, black: &str, white: &str, game_name: &str) -> bool {
        let path = path.as_ref();
        let sgf = self.rules.export_record(&RecordInfo::new(black, white, game_name));
        match fs::write(path, sgf) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not save game to {}: {e}", path.display());
                false
            }
        }
    }
}

fn first(stones: &Stones) -> Option<BoardCoordinate> {
    stones.iter().next().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_uses_three_significant_digits() {
        assert_eq!(format_score(Some(3.5)), "B+3.5");
        assert_eq!(format_score(Some(-0.5)), "W+0.5");
        assert_eq!(format_score(Some(11.0)), "B+11");
        assert_eq!(format_score(Some(-361.0)), "W+361");
        assert_eq!(format_score(Some(123.5)), "B+124");
        assert_eq!(format_score(Some(1234.0)), "B+1.23e+03");
        assert_eq!(format_score(Some(0.0)), "0");
        assert_eq!(format_score(None), UNSCORABLE_RESULT);
    }

    #[test]
    fn changes_split_by_color() {
        let before = StoneConfiguration::from_diagram(&["X . .", ". O .", ". . ."]).unwrap();
        let after = StoneConfiguration::from_diagram(&["X . O", ". . .", "X . ."]).unwrap();
        let changes = Changes::between(&before, &after);
        assert_eq!(changes.added(Color::Black).len(), 1);
        assert_eq!(changes.added(Color::White).len(), 1);
        assert_eq!(changes.removed(Color::White).len(), 1);
        assert!(changes.removed(Color::Black).is_empty());
        assert!(Changes::between(&after, &after).is_empty());
    }

    #[test]
    fn setup_size_must_match() {
        let setup = StoneConfiguration::empty(13);
        assert_eq!(
            Game::with_setup(9, &setup).unwrap_err(),
            GameError::InvalidSetup { expected: 9, found: 13 }
        );
    }

    #[test]
    fn setup_with_white_starts_normal() {
        let setup = StoneConfiguration::from_diagram(&["X . .", ". O .", ". . ."]).unwrap();
        let game = Game::with_setup(3, &setup).unwrap();
        assert_eq!(game.phase(), &Phase::Normal);
        assert_eq!(game.board(), setup);
        assert_eq!(game.to_play(), Color::Black);
    }

    #[test]
    fn resign_names_the_other_player() {
        let mut game = Game::new(9);
        assert_eq!(game.resign(), "W+R");
        assert!(game.is_finished());
        assert_eq!(game.pass(), UpdateResult::Illegal);
        assert_eq!(game.finish(), "W+R");
    }
}
