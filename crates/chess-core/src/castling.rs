//! Castling rights.

use std::fmt;

use crate::{Color, Square};

/// Castling rights as a 4-bit mask.
///
/// Bit order follows the polyglot key layout: white kingside, white
/// queenside, black kingside, black queenside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CastlingRights(u8);

impl CastlingRights {
    pub const NONE: CastlingRights = CastlingRights(0);
    pub const WHITE_KINGSIDE: CastlingRights = CastlingRights(0b0001);
    pub const WHITE_QUEENSIDE: CastlingRights = CastlingRights(0b0010);
    pub const BLACK_KINGSIDE: CastlingRights = CastlingRights(0b0100);
    pub const BLACK_QUEENSIDE: CastlingRights = CastlingRights(0b1000);
    pub const WHITE: CastlingRights = CastlingRights(0b0011);
    pub const BLACK: CastlingRights = CastlingRights(0b1100);
    pub const ALL: CastlingRights = CastlingRights(0b1111);

    /// Creates rights from raw flags; bits above the low four are dropped.
    #[inline]
    pub const fn from_bits(bits: u8) -> Self {
        CastlingRights(bits & 0b1111)
    }

    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: CastlingRights) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub const fn union(self, other: CastlingRights) -> Self {
        CastlingRights(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: CastlingRights) -> Self {
        CastlingRights(self.0 & other.0)
    }

    #[inline]
    pub const fn kingside(color: Color) -> Self {
        match color {
            Color::White => Self::WHITE_KINGSIDE,
            Color::Black => Self::BLACK_KINGSIDE,
        }
    }

    #[inline]
    pub const fn queenside(color: Color) -> Self {
        match color {
            Color::White => Self::WHITE_QUEENSIDE,
            Color::Black => Self::BLACK_QUEENSIDE,
        }
    }

    #[inline]
    pub const fn color(color: Color) -> Self {
        match color {
            Color::White => Self::WHITE,
            Color::Black => Self::BLACK,
        }
    }

    /// Rights that survive a move touching `square`. Moving from or capturing
    /// on a king or rook home square revokes the matching rights.
    #[inline]
    pub const fn surviving(square: Square) -> Self {
        match square.index() {
            0 => CastlingRights(0b1101),
            4 => CastlingRights(0b1100),
            7 => CastlingRights(0b1110),
            56 => CastlingRights(0b0111),
            60 => CastlingRights(0b0011),
            63 => CastlingRights(0b1011),
            _ => Self::ALL,
        }
    }

    /// Iterates the individual rights that are set, in bit order.
    pub fn iter(self) -> impl Iterator<Item = CastlingRights> {
        (0..4)
            .map(|bit| CastlingRights(1 << bit))
            .filter(move |right| self.contains(*right))
    }

    /// Parses the FEN castling field (`KQkq` subset or `-`).
    pub fn from_fen(field: &str) -> Option<Self> {
        if field == "-" {
            return Some(Self::NONE);
        }
        if field.is_empty() {
            return None;
        }
        let mut rights = Self::NONE;
        for c in field.chars() {
            let right = match c {
                'K' => Self::WHITE_KINGSIDE,
                'Q' => Self::WHITE_QUEENSIDE,
                'k' => Self::BLACK_KINGSIDE,
                'q' => Self::BLACK_QUEENSIDE,
                _ => return None,
            };
            if rights.contains(right) {
                return None;
            }
            rights = rights.union(right);
        }
        Some(rights)
    }
}

impl std::ops::BitOr for CastlingRights {
    type Output = CastlingRights;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitAnd for CastlingRights {
    type Output = CastlingRights;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "-");
        }
        for (right, c) in [
            (Self::WHITE_KINGSIDE, 'K'),
            (Self::WHITE_QUEENSIDE, 'Q'),
            (Self::BLACK_KINGSIDE, 'k'),
            (Self::BLACK_QUEENSIDE, 'q'),
        ] {
            if self.contains(right) {
                write!(f, "{}", c)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_color_queries() {
        let rights = CastlingRights::WHITE_KINGSIDE | CastlingRights::BLACK_QUEENSIDE;
        assert!(rights.contains(CastlingRights::kingside(Color::White)));
        assert!(!rights.contains(CastlingRights::queenside(Color::White)));
        assert!(!rights.contains(CastlingRights::kingside(Color::Black)));
        assert!(rights.contains(CastlingRights::queenside(Color::Black)));
    }

    #[test]
    fn surviving_masks() {
        assert_eq!(
            CastlingRights::ALL & CastlingRights::surviving(Square::E1),
            CastlingRights::BLACK
        );
        assert_eq!(
            CastlingRights::ALL & CastlingRights::surviving(Square::H8),
            CastlingRights::WHITE | CastlingRights::BLACK_QUEENSIDE
        );
        assert_eq!(
            CastlingRights::surviving(Square::E4),
            CastlingRights::ALL
        );
    }

    #[test]
    fn fen_field() {
        assert_eq!(CastlingRights::from_fen("KQkq"), Some(CastlingRights::ALL));
        assert_eq!(CastlingRights::from_fen("-"), Some(CastlingRights::NONE));
        assert_eq!(
            CastlingRights::from_fen("Kq"),
            Some(CastlingRights::WHITE_KINGSIDE | CastlingRights::BLACK_QUEENSIDE)
        );
        assert_eq!(CastlingRights::from_fen("KK"), None);
        assert_eq!(CastlingRights::from_fen("X"), None);
        assert_eq!(CastlingRights::from_fen(""), None);
        assert_eq!(CastlingRights::ALL.to_string(), "KQkq");
        assert_eq!(CastlingRights::NONE.to_string(), "-");
    }

    #[test]
    fn iter_yields_single_bits() {
        let rights: Vec<_> = CastlingRights::BLACK.iter().collect();
        assert_eq!(
            rights,
            vec![CastlingRights::BLACK_KINGSIDE, CastlingRights::BLACK_QUEENSIDE]
        );
    }
}
