//! Augmented Go: keeps a digital game record in sync with a physical board.
//!
//! A camera frame goes through the vision pipeline ([`vision::scan`]) and
//! becomes a [`board::StoneConfiguration`]. The reconciler ([`game::Game`])
//! compares it with the canonical game and accepts it only if it is a legal
//! continuation: one new stone, a completed capture, or a handicap setup.
//!
//! ## Modules
//!
//! - [`constants`] - Board-size bounds, komi and vision tuning values
//! - [`board`] - Colors, coordinates and stone configurations
//! - [`position`] - Go rules core (captures, ko, suicide, area scoring)
//! - [`rules`] - Rules-engine capability used by the reconciler
//! - [`sgf`] - Game-record export
//! - [`game`] - Game state reconciler
//! - [`vision`] - Rectification, grid detection and stone classification
//! - [`session`] - Mutex-guarded scan context and scanner thread
//! - [`logger`] - Logger setup for the binary
//!
//! ## Example
//!
//! ```
//! use augmented_go::board::{BoardCoordinate, Color, StoneConfiguration};
//! use augmented_go::game::{Game, UpdateResult};
//!
//! let mut game = Game::new(9);
//! let seen = StoneConfiguration::empty(9)
//!     .with_stone(BoardCoordinate::new(3, 3), Color::Black)
//!     .with_stone(BoardCoordinate::new(7, 7), Color::Black);
//!
//! // Two black stones before White's first move are a handicap.
//! assert_eq!(game.reconcile(&seen), UpdateResult::Legal);
//! assert_eq!(game.to_play(), Color::White);
//! ```

pub mod board;
pub mod constants;
pub mod game;
pub mod logger;
pub mod position;
pub mod rules;
pub mod session;
pub mod sgf;
pub mod vision;
