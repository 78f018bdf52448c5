//! Initial placements handed to the engine.
//!
//! A [`Placement`] is the plain description of a position before it gets
//! hashed and indexed: which piece stands where, who moves, and the optional
//! state FEN carries. Two collaborators build one: the FEN parser in
//! [`crate::fen`] and the piece-list setup below (`"Ke1,Qd1,e2"`).

use thiserror::Error;

use crate::{CastlingRights, Color, Piece, PieceKind, Square};

/// Errors from the piece-list setup notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("invalid piece token '{token}' for {color}")]
    InvalidToken { token: String, color: Color },

    #[error("square {0} is listed more than once")]
    SquareOccupied(Square),
}

/// A piece placement plus side to move and optional FEN state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub pieces: Vec<(Square, Piece)>,
    pub side_to_move: Color,
    /// `None` infers rights from kings and rooks on their home squares.
    pub castling: Option<CastlingRights>,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Default for Placement {
    fn default() -> Self {
        Placement {
            pieces: Vec::new(),
            side_to_move: Color::White,
            castling: None,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }
}

impl Placement {
    /// An empty board with White to move.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard initial array.
    pub fn standard() -> Self {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];

        let mut placement = Self::empty();
        for color in Color::BOTH {
            let home = color.home_rank() as i8;
            let pawns = home + (color.push_offset() / 8);
            for (file, kind) in BACK_RANK.iter().enumerate() {
                let file = file as i8;
                if let Some(sq) = Square::from_coords(file, home) {
                    placement.set(sq, Piece::new(*kind, color));
                }
                if let Some(sq) = Square::from_coords(file, pawns) {
                    placement.set(sq, Piece::new(PieceKind::Pawn, color));
                }
            }
        }
        placement
    }

    /// Puts `piece` on `square`, replacing whatever stood there.
    pub fn set(&mut self, square: Square, piece: Piece) -> &mut Self {
        self.pieces.retain(|(sq, _)| *sq != square);
        self.pieces.push((square, piece));
        self
    }

    /// Removes the piece on `square`, if any.
    pub fn clear(&mut self, square: Square) -> &mut Self {
        self.pieces.retain(|(sq, _)| *sq != square);
        self
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pieces
            .iter()
            .find(|(sq, _)| *sq == square)
            .map(|(_, piece)| *piece)
    }

    /// Sets the side to move.
    pub fn with_side_to_move(mut self, color: Color) -> Self {
        self.side_to_move = color;
        self
    }

    /// Builds a placement from two piece lists, one per color.
    ///
    /// Tokens look like `Ke1`, `Qd1`, `Nf3` or `e2` (no letter means pawn) and
    /// are separated by commas or whitespace. White moves first.
    pub fn from_lists(white: &str, black: &str) -> Result<Self, SetupError> {
        let mut placement = Self::empty();
        placement.add_list(white, Color::White)?;
        placement.add_list(black, Color::Black)?;
        Ok(placement)
    }

    fn add_list(&mut self, list: &str, color: Color) -> Result<(), SetupError> {
        let tokens = list
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty());
        for token in tokens {
            let (square, kind) = parse_token(token).ok_or_else(|| SetupError::InvalidToken {
                token: token.to_string(),
                color,
            })?;
            if self.piece_at(square).is_some() {
                return Err(SetupError::SquareOccupied(square));
            }
            self.set(square, Piece::new(kind, color));
        }
        Ok(())
    }

    /// Castling rights: the explicit ones when given, otherwise those implied
    /// by kings and rooks on their home squares. Explicit rights are masked by
    /// the same condition so they never point at a missing king or rook.
    pub fn effective_castling(&self) -> CastlingRights {
        let mut implied = CastlingRights::NONE;
        for color in Color::BOTH {
            let rank = color.home_rank() as i8;
            let at = |file: i8, kind: PieceKind| {
                Square::from_coords(file, rank)
                    .and_then(|sq| self.piece_at(sq))
                    .map_or(false, |p| p == Piece::new(kind, color))
            };
            if !at(4, PieceKind::King) {
                continue;
            }
            if at(7, PieceKind::Rook) {
                implied = implied | CastlingRights::kingside(color);
            }
            if at(0, PieceKind::Rook) {
                implied = implied | CastlingRights::queenside(color);
            }
        }
        match self.castling {
            Some(explicit) => explicit & implied,
            None => implied,
        }
    }
}

fn parse_token(token: &str) -> Option<(Square, PieceKind)> {
    let mut chars = token.chars();
    let first = chars.clone().next()?;
    let kind = if first.is_ascii_uppercase() {
        chars.next();
        match PieceKind::from_letter(first)? {
            PieceKind::Pawn => return None,
            kind => kind,
        }
    } else {
        PieceKind::Pawn
    };
    let square = Square::from_algebraic(chars.as_str())?;
    Some((square, kind))
}
