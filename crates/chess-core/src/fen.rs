//! FEN (Forsyth-Edwards Notation) parsing and serialization.

use thiserror::Error;

use crate::{CastlingRights, Color, Piece, Placement, Square};

/// The standard starting position.
pub const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Errors that can occur when parsing FEN strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 6 parts, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastlingRights(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassantSquare(String),

    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
}

impl Placement {
    /// Parses a FEN string. The castling field is kept as given; the engine
    /// masks it against the placement when it builds a position.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() != 6 {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let mut placement = Placement::empty();
        parse_board(parts[0], &mut placement)?;

        placement.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidActiveColor(other.to_string())),
        };

        placement.castling = Some(
            CastlingRights::from_fen(parts[2])
                .ok_or_else(|| FenError::InvalidCastlingRights(parts[2].to_string()))?,
        );

        placement.en_passant = parse_en_passant(parts[3])?;

        placement.halfmove_clock = parts[4]
            .parse::<u32>()
            .map_err(|_| FenError::InvalidHalfmoveClock(parts[4].to_string()))?;

        placement.fullmove_number = parts[5]
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| FenError::InvalidFullmoveNumber(parts[5].to_string()))?;

        Ok(placement)
    }

    /// Serializes the placement. Missing castling rights are written as
    /// inferred from the board.
    pub fn to_fen(&self) -> String {
        let mut board = String::new();
        for rank in (0..8i8).rev() {
            let mut empty = 0;
            for file in 0..8i8 {
                let piece = Square::from_coords(file, rank).and_then(|sq| self.piece_at(sq));
                match piece {
                    Some(piece) => {
                        if empty > 0 {
                            board.push_str(&empty.to_string());
                            empty = 0;
                        }
                        board.push(piece.to_fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                board.push_str(&empty.to_string());
            }
            if rank > 0 {
                board.push('/');
            }
        }

        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let castling = self.castling.unwrap_or_else(|| self.effective_castling());
        let en_passant = self
            .en_passant
            .map_or_else(|| "-".to_string(), |sq| sq.to_algebraic());

        format!(
            "{} {} {} {} {} {}",
            board, side, castling, en_passant, self.halfmove_clock, self.fullmove_number
        )
    }
}

fn parse_board(field: &str, placement: &mut Placement) -> Result<(), FenError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::InvalidPiecePlacement(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - i as i8;
        let mut file = 0i8;
        for c in rank_str.chars() {
            if let Some(skip) = c.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(FenError::InvalidPiecePlacement(format!(
                        "invalid empty-square count '{}' in rank {}",
                        c,
                        rank + 1
                    )));
                }
                file += skip as i8;
            } else if let Some(piece) = Piece::from_fen_char(c) {
                let sq = Square::from_coords(file, rank).ok_or_else(|| {
                    FenError::InvalidPiecePlacement(format!("rank {} overflows", rank + 1))
                })?;
                placement.set(sq, piece);
                file += 1;
            } else {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "invalid character '{}' in rank {}",
                    c,
                    rank + 1
                )));
            }
        }
        if file != 8 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "rank {} has {} squares, expected 8",
                rank + 1,
                file
            )));
        }
    }
    Ok(())
}

fn parse_en_passant(field: &str) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }
    match Square::from_algebraic(field) {
        Some(sq) if sq.rank().index() == 2 || sq.rank().index() == 5 => Ok(Some(sq)),
        _ => Err(FenError::InvalidEnPassantSquare(field.to_string())),
    }
}
