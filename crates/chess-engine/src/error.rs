//! Engine error types.

use chess_core::{FenError, Move, SetupError};
use thiserror::Error;

/// Errors raised by position construction and move application.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("illegal move {0}")]
    IllegalMove(Move),

    #[error("position is not the result of a null move")]
    NotNullMove,

    /// Incrementally maintained state disagrees with a from-scratch
    /// recomputation. Always a bug in move application.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Fen(#[from] FenError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}
