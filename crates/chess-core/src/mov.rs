//! Move representation.

use crate::{Piece, PieceKind, Square};
use std::fmt;

/// Flags for special move types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveFlag {
    Normal = 0,
    /// Pawn advance of two squares from its starting rank.
    DoublePush = 1,
    EnPassant = 2,
    CastleKingside = 3,
    CastleQueenside = 4,
    PromoteKnight = 5,
    PromoteBishop = 6,
    PromoteRook = 7,
    PromoteQueen = 8,
}

impl MoveFlag {
    const fn from_bits(bits: u32) -> MoveFlag {
        match bits {
            1 => MoveFlag::DoublePush,
            2 => MoveFlag::EnPassant,
            3 => MoveFlag::CastleKingside,
            4 => MoveFlag::CastleQueenside,
            5 => MoveFlag::PromoteKnight,
            6 => MoveFlag::PromoteBishop,
            7 => MoveFlag::PromoteRook,
            8 => MoveFlag::PromoteQueen,
            _ => MoveFlag::Normal,
        }
    }

    /// Returns the flag promoting to `kind`, if `kind` is a legal promotion.
    #[inline]
    pub const fn promotion(kind: PieceKind) -> Option<MoveFlag> {
        match kind {
            PieceKind::Knight => Some(MoveFlag::PromoteKnight),
            PieceKind::Bishop => Some(MoveFlag::PromoteBishop),
            PieceKind::Rook => Some(MoveFlag::PromoteRook),
            PieceKind::Queen => Some(MoveFlag::PromoteQueen),
            _ => None,
        }
    }

    /// Returns the promotion piece kind if this is a promotion flag.
    #[inline]
    pub const fn promotion_kind(self) -> Option<PieceKind> {
        match self {
            MoveFlag::PromoteKnight => Some(PieceKind::Knight),
            MoveFlag::PromoteBishop => Some(PieceKind::Bishop),
            MoveFlag::PromoteRook => Some(PieceKind::Rook),
            MoveFlag::PromoteQueen => Some(PieceKind::Queen),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.promotion_kind().is_some()
    }

    #[inline]
    pub const fn is_castling(self) -> bool {
        matches!(self, MoveFlag::CastleKingside | MoveFlag::CastleQueenside)
    }
}

/// A chess move.
///
/// Packed into 32 bits:
///
/// | bits  | field          |
/// |-------|----------------|
/// | 0-5   | from square    |
/// | 6-11  | to square      |
/// | 12-15 | flag           |
/// | 16-19 | moved piece    |
/// | 20-23 | captured piece |
///
/// The moved piece is never empty, so every real move is non-zero and
/// [`Move::NULL`] cannot collide with one.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move(u32);

impl Move {
    /// Placeholder value; never a legal move.
    pub const NULL: Move = Move(0);

    /// Creates a move.
    #[inline]
    pub const fn new(
        from: Square,
        to: Square,
        flag: MoveFlag,
        piece: Piece,
        captured: Option<Piece>,
    ) -> Self {
        let captured_bits = match captured {
            Some(p) => p.to_bits() as u32,
            None => 0,
        };
        Move(
            from.index() as u32
                | (to.index() as u32) << 6
                | (flag as u32) << 12
                | (piece.to_bits() as u32) << 16
                | captured_bits << 20,
        )
    }

    /// Creates a move with no special flag.
    #[inline]
    pub const fn normal(from: Square, to: Square, piece: Piece, captured: Option<Piece>) -> Self {
        Self::new(from, to, MoveFlag::Normal, piece, captured)
    }

    /// Returns a copy of this move promoting to `kind`. Non-promotion kinds
    /// leave the move unchanged.
    #[inline]
    pub const fn promote(self, kind: PieceKind) -> Self {
        match MoveFlag::promotion(kind) {
            Some(flag) => Move((self.0 & !(0xF << 12)) | (flag as u32) << 12),
            None => self,
        }
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn from(self) -> Square {
        match Square::from_index((self.0 & 0x3F) as u8) {
            Some(sq) => sq,
            None => Square::A1,
        }
    }

    #[inline]
    pub const fn to(self) -> Square {
        match Square::from_index(((self.0 >> 6) & 0x3F) as u8) {
            Some(sq) => sq,
            None => Square::A1,
        }
    }

    #[inline]
    pub const fn flag(self) -> MoveFlag {
        MoveFlag::from_bits((self.0 >> 12) & 0xF)
    }

    /// The piece being moved. Returns `None` only for [`Move::NULL`].
    #[inline]
    pub const fn piece(self) -> Option<Piece> {
        Piece::from_bits(((self.0 >> 16) & 0xF) as u8)
    }

    /// The piece removed by this move, including the pawn taken en passant.
    #[inline]
    pub const fn captured(self) -> Option<Piece> {
        Piece::from_bits(((self.0 >> 20) & 0xF) as u8)
    }

    #[inline]
    pub const fn is_capture(self) -> bool {
        (self.0 >> 20) & 0xF != 0
    }

    #[inline]
    pub const fn is_promotion(self) -> bool {
        self.flag().is_promotion()
    }

    #[inline]
    pub const fn promotion(self) -> Option<PieceKind> {
        self.flag().promotion_kind()
    }

    /// Returns the long algebraic notation (e.g. "e2e4", "e7e8q").
    pub fn to_uci(self) -> String {
        if self.is_null() {
            return "0000".to_string();
        }
        let promo = match self.promotion() {
            Some(kind) => kind.letter().to_ascii_lowercase().to_string(),
            None => String::new(),
        };
        format!("{}{}{}", self.from(), self.to(), promo)
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::NULL
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Move({})", self.to_uci())
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use proptest::prelude::*;

    const WHITE_PAWN: Piece = Piece::new(PieceKind::Pawn, Color::White);
    const BLACK_ROOK: Piece = Piece::new(PieceKind::Rook, Color::Black);

    #[test]
    fn move_encoding() {
        let m = Move::new(Square::E2, Square::E4, MoveFlag::DoublePush, WHITE_PAWN, None);

        assert_eq!(m.from(), Square::E2);
        assert_eq!(m.to(), Square::E4);
        assert_eq!(m.flag(), MoveFlag::DoublePush);
        assert_eq!(m.piece(), Some(WHITE_PAWN));
        assert_eq!(m.captured(), None);
        assert!(!m.is_capture());
        assert!(!m.is_null());
    }

    #[test]
    fn promotion_capture() {
        let m = Move::normal(Square::G7, Square::H8, WHITE_PAWN, Some(BLACK_ROOK))
            .promote(PieceKind::Queen);
        assert_eq!(m.flag(), MoveFlag::PromoteQueen);
        assert_eq!(m.promotion(), Some(PieceKind::Queen));
        assert_eq!(m.captured(), Some(BLACK_ROOK));
        assert!(m.is_capture());
        assert_eq!(m.to_uci(), "g7h8q");
    }

    #[test]
    fn promote_rejects_pawn_and_king() {
        let m = Move::normal(Square::A7, Square::A8, WHITE_PAWN, None);
        assert_eq!(m.promote(PieceKind::King), m);
        assert_eq!(m.promote(PieceKind::Pawn), m);
        assert_eq!(m.promote(PieceKind::Knight).to_uci(), "a7a8n");
    }

    #[test]
    fn move_flag_queries() {
        assert!(MoveFlag::CastleKingside.is_castling());
        assert!(MoveFlag::CastleQueenside.is_castling());
        assert!(!MoveFlag::EnPassant.is_castling());
        assert!(MoveFlag::PromoteBishop.is_promotion());
        assert!(!MoveFlag::DoublePush.is_promotion());
        assert_eq!(MoveFlag::PromoteRook.promotion_kind(), Some(PieceKind::Rook));
        assert_eq!(MoveFlag::promotion(PieceKind::Pawn), None);
    }

    #[test]
    fn move_null() {
        assert!(Move::NULL.is_null());
        assert_eq!(Move::NULL.piece(), None);
        assert_eq!(Move::NULL.to_uci(), "0000");
        assert_eq!(Move::default(), Move::NULL);
    }

    #[test]
    fn move_debug_display() {
        let m = Move::normal(Square::E2, Square::E4, WHITE_PAWN, None);
        assert_eq!(format!("{:?}", m), "Move(e2e4)");
        assert_eq!(format!("{}", m), "e2e4");
    }

    fn any_piece() -> impl Strategy<Value = Piece> {
        (1u8..=12).prop_map(|bits| Piece::from_bits(bits).unwrap())
    }

    proptest! {
        #[test]
        fn fields_survive_packing(
            from in 0u8..64,
            to in 0u8..64,
            flag in 0u32..9,
            piece in any_piece(),
            captured in proptest::option::of(any_piece()),
        ) {
            let from = Square::from_index(from).unwrap();
            let to = Square::from_index(to).unwrap();
            let flag = MoveFlag::from_bits(flag);
            let m = Move::new(from, to, flag, piece, captured);
            prop_assert_eq!(m.from(), from);
            prop_assert_eq!(m.to(), to);
            prop_assert_eq!(m.flag(), flag);
            prop_assert_eq!(m.piece(), Some(piece));
            prop_assert_eq!(m.captured(), captured);
            prop_assert!(!m.is_null());
        }
    }
}
