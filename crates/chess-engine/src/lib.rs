//! Bitboard chess engine core.
//!
//! This crate provides:
//! - [`Position`] - immutable board state with incrementally maintained
//!   polyglot keys and material signature
//! - [`MoveGen`] - lazy, ranked legal move generation in several modes
//! - [`Searcher`] - negamax with alpha-beta pruning and quiescence
//! - [`Game`] - a controller playing two engine players against each other
//!
//! # Example
//!
//! ```
//! use chess_engine::{EngineConfig, Game, Position, Searcher};
//!
//! let position = Position::standard();
//! assert_eq!(position.hash(), 0x463B96181691FC9C);
//!
//! let report = Searcher::default().search(&position, 2);
//! assert!(report.best_move.is_some());
//!
//! let mut game = Game::standard(&EngineConfig::default());
//! game.make_move_uci("e2e4").unwrap();
//! ```

pub mod attacks;
mod bitboard;
mod config;
mod error;
pub mod eval;
mod game;
pub mod material;
pub mod movegen;
pub mod polyglot;
mod position;
pub mod search;

pub use bitboard::Bitboard;
pub use config::{ConfigError, EngineConfig};
pub use error::EngineError;
pub use game::{DrawReason, Game, GameError, GameResult, Player};
pub use movegen::perft::{perft, perft_divide};
pub use movegen::{legal_moves, GenMode, MoveGen, MoveList};
pub use position::Position;
pub use search::{is_mate_score, SearchLimits, SearchReport, Searcher, CHECKMATE, MAX_PLY};
