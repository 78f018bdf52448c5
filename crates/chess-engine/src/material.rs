//! Material signature.
//!
//! Each (color, kind) pair gets a weight so that the sum over all pieces
//! uniquely describes the material on the board for counts up to the
//! standard set: one slot per pawn count 0-8, then powers of three above
//! that for the pieces that normally come in pairs.

use chess_core::Piece;

/// Weights indexed by `[color][kind]`.
const WEIGHTS: [[u32; 6]; 2] = [
    [1, 81, 729, 6561, 59049, 0],
    [9, 243, 2187, 19683, 118098, 0],
];

/// Number of distinct signatures of the standard material set and below.
pub const MATERIAL_SIGNATURES: u32 = 2 * 118098;

#[inline]
pub fn weight(piece: Piece) -> u32 {
    WEIGHTS[piece.color.index()][piece.kind.index()]
}

/// Sums the weights of `pieces`.
pub fn signature(pieces: impl IntoIterator<Item = Piece>) -> u32 {
    pieces.into_iter().map(weight).sum()
}
