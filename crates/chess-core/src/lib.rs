//! Core types for chess.
//!
//! This crate provides the vocabulary shared by the engine and its callers:
//! - [`Piece`], [`PieceKind`] and [`Color`] for piece representation
//! - [`Square`], [`File`], and [`Rank`] for board coordinates
//! - [`CastlingRights`] and [`Move`] for game state and moves
//! - [`Placement`] with FEN and piece-list setup

mod castling;
pub mod fen;
mod mov;
mod piece;
mod placement;
mod color;
mod square;

pub use castling::CastlingRights;
pub use color::Color;
pub use fen::{FenError, STARTPOS};
pub use mov::{Move, MoveFlag};
pub use piece::{Piece, PieceKind};
pub use placement::{Placement, SetupError};
pub use square::{File, Rank, Square};
