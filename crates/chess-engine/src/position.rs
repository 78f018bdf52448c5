//! Board state.
//!
//! A [`Position`] is never mutated once handed out. Applying a move builds a
//! new position whose hash keys and material signature are updated
//! incrementally from the parent, and which links back to the parent for
//! repetition detection until an irreversible move cuts the chain.

use std::fmt;
use std::sync::Arc;

use chess_core::{CastlingRights, Color, Move, MoveFlag, Piece, PieceKind, Placement, Square};
use tracing::warn;

use crate::attacks::{
    between, bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use crate::movegen::{GenMode, MoveGen, MoveList};
use crate::{material, polyglot, Bitboard, EngineError};

/// King and rook squares of one castling move.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Castle {
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
}

/// Indexed by `[color][0 = kingside, 1 = queenside]`.
pub(crate) const CASTLES: [[Castle; 2]; 2] = [
    [
        Castle {
            king_from: Square::E1,
            king_to: Square::G1,
            rook_from: Square::H1,
            rook_to: Square::F1,
        },
        Castle {
            king_from: Square::E1,
            king_to: Square::C1,
            rook_from: Square::A1,
            rook_to: Square::D1,
        },
    ],
    [
        Castle {
            king_from: Square::E8,
            king_to: Square::G8,
            rook_from: Square::H8,
            rook_to: Square::F8,
        },
        Castle {
            king_from: Square::E8,
            king_to: Square::C8,
            rook_from: Square::A8,
            rook_to: Square::D8,
        },
    ],
];

/// Complete chess position state.
#[derive(Clone)]
pub struct Position {
    board: [Option<Piece>; 64],
    pieces: [[Bitboard; 6]; 2],
    colors: [Bitboard; 2],
    side_to_move: Color,
    castling: CastlingRights,
    /// Set only when a pawn of the side to move can capture there.
    en_passant: Option<Square>,
    hash: u64,
    pawn_hash: u64,
    balance: u32,
    halfmove_clock: u32,
    fullmove_number: u32,
    null_move: bool,
    previous: Option<Arc<Position>>,
}

impl Position {
    fn empty(side_to_move: Color) -> Self {
        Position {
            board: [None; 64],
            pieces: [[Bitboard::EMPTY; 6]; 2],
            colors: [Bitboard::EMPTY; 2],
            side_to_move,
            castling: CastlingRights::NONE,
            en_passant: None,
            hash: 0,
            pawn_hash: 0,
            balance: 0,
            halfmove_clock: 0,
            fullmove_number: 1,
            null_move: false,
            previous: None,
        }
    }

    /// Builds a root position from a placement.
    ///
    /// Castling rights are limited to kings and rooks standing on their
    /// original squares. An en-passant square is dropped unless a pawn of the
    /// side to move can actually capture on it.
    pub fn new(placement: &Placement) -> Self {
        let mut position = Position::empty(placement.side_to_move);
        for &(sq, piece) in &placement.pieces {
            position.remove(sq);
            position.put(sq, piece);
        }

        position.castling = placement.effective_castling();
        position.hash ^= polyglot::castling_key(position.castling);

        position.en_passant = placement
            .en_passant
            .filter(|&sq| position.en_passant_capturable(sq));
        if let Some(sq) = position.en_passant {
            position.hash ^= polyglot::en_passant_key(sq);
        }
        if position.side_to_move == Color::White {
            position.hash ^= polyglot::turn_key();
        }

        position.halfmove_clock = placement.halfmove_clock;
        position.fullmove_number = placement.fullmove_number;
        position
    }

    /// The standard starting position.
    pub fn standard() -> Self {
        Self::new(&Placement::standard())
    }

    /// Parses a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, EngineError> {
        Ok(Self::new(&Placement::from_fen(fen)?))
    }

    /// Builds a position from piece lists such as `"Ke1,Qd1,e2"`.
    pub fn from_lists(white: &str, black: &str, side_to_move: Color) -> Result<Self, EngineError> {
        let placement = Placement::from_lists(white, black)?.with_side_to_move(side_to_move);
        Ok(Self::new(&placement))
    }

    /// The color whose turn it is.
    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Castling rights still available to either side.
    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// En-passant target square, only set when a capture on it is possible.
    #[inline]
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Incrementally maintained polyglot key.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Incrementally maintained key over pawns only.
    #[inline]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    /// Incrementally maintained material signature.
    #[inline]
    pub fn balance(&self) -> u32 {
        self.balance
    }

    /// Plies since the last pawn move or capture.
    #[inline]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// Move number, starting at 1 and incremented after Black moves.
    #[inline]
    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// The piece on `sq`, if any.
    #[inline]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.board[sq.index() as usize]
    }

    /// Squares holding `color`'s pieces of `kind`.
    #[inline]
    pub fn pieces(&self, color: Color, kind: PieceKind) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    /// All pieces of `color`.
    #[inline]
    pub fn occupied_by(&self, color: Color) -> Bitboard {
        self.colors[color.index()]
    }

    /// All occupied squares.
    #[inline]
    pub fn occupied(&self) -> Bitboard {
        self.colors[0] | self.colors[1]
    }

    /// Square of `color`'s king, or `None` when it has no king.
    #[inline]
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color, PieceKind::King).lsb()
    }

    /// Every occupied square with its piece, a1 first.
    pub fn piece_list(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|piece| (sq, piece)))
    }

    /// Converts back to a setup description.
    pub fn to_placement(&self) -> Placement {
        Placement {
            pieces: self.piece_list().collect(),
            side_to_move: self.side_to_move,
            castling: Some(self.castling),
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        }
    }

    /// Serializes to FEN.
    pub fn to_fen(&self) -> String {
        self.to_placement().to_fen()
    }

    /// Recomputes `(hash, pawn_hash)` from scratch.
    pub fn polyglot(&self) -> (u64, u64) {
        polyglot::keys(
            self.piece_list(),
            self.side_to_move,
            self.castling,
            self.en_passant,
        )
    }

    /// Checks the incrementally maintained state against a recomputation.
    pub fn verify(&self) -> Result<(), EngineError> {
        let (hash, pawn_hash) = self.polyglot();
        if hash != self.hash {
            return Err(EngineError::InvariantViolation(format!(
                "hash {:#018x} differs from recomputed {:#018x}",
                self.hash, hash
            )));
        }
        if pawn_hash != self.pawn_hash {
            return Err(EngineError::InvariantViolation(format!(
                "pawn hash {:#018x} differs from recomputed {:#018x}",
                self.pawn_hash, pawn_hash
            )));
        }
        let balance = material::signature(self.piece_list().map(|(_, piece)| piece));
        if balance != self.balance {
            return Err(EngineError::InvariantViolation(format!(
                "balance {} differs from recomputed {}",
                self.balance, balance
            )));
        }
        for sq in Square::all() {
            let indexed = Color::BOTH.into_iter().find_map(|color| {
                PieceKind::ALL
                    .into_iter()
                    .find(|&kind| self.pieces(color, kind).contains(sq))
                    .map(|kind| Piece::new(kind, color))
            });
            if indexed != self.piece_at(sq) {
                return Err(EngineError::InvariantViolation(format!(
                    "bitboards disagree with the board on {}",
                    sq
                )));
            }
        }
        if (self.colors[0] & self.colors[1]).any() {
            return Err(EngineError::InvariantViolation(
                "a square is occupied by both colors".to_string(),
            ));
        }
        Ok(())
    }

    fn put(&mut self, sq: Square, piece: Piece) {
        self.board[sq.index() as usize] = Some(piece);
        self.pieces[piece.color.index()][piece.kind.index()].set(sq);
        self.colors[piece.color.index()].set(sq);
        let key = polyglot::piece_key(piece, sq);
        self.hash ^= key;
        if piece.kind == PieceKind::Pawn {
            self.pawn_hash ^= key;
        }
        self.balance += material::weight(piece);
    }

    fn remove(&mut self, sq: Square) -> Option<Piece> {
        let piece = self.board[sq.index() as usize].take()?;
        self.pieces[piece.color.index()][piece.kind.index()].clear(sq);
        self.colors[piece.color.index()].clear(sq);
        let key = polyglot::piece_key(piece, sq);
        self.hash ^= key;
        if piece.kind == PieceKind::Pawn {
            self.pawn_hash ^= key;
        }
        self.balance -= material::weight(piece);
        Some(piece)
    }

    /// Whether a pawn of the side to move could capture en passant on `target`.
    fn en_passant_capturable(&self, target: Square) -> bool {
        let us = self.side_to_move;
        let pushed = match target.offset(us.opposite().push_offset()) {
            Some(sq) => sq,
            None => return false,
        };
        self.piece_at(target).is_none()
            && self.piece_at(pushed) == Some(Piece::new(PieceKind::Pawn, us.opposite()))
            && (pawn_attacks(target, us.opposite()) & self.pieces(us, PieceKind::Pawn)).any()
    }

    /// Builds the move from `from` to `to`, inferring the moved and captured
    /// pieces and the special flags from the board. Pawn moves to the last
    /// rank come back unpromoted; use [`Move::promote`]. Returns
    /// [`Move::NULL`] when `from` is empty.
    pub fn new_move(&self, from: Square, to: Square) -> Move {
        let piece = match self.piece_at(from) {
            Some(piece) => piece,
            None => return Move::NULL,
        };
        let mut captured = self.piece_at(to);
        let distance = from.index().abs_diff(to.index());
        let flag = match piece.kind {
            PieceKind::Pawn if from.file() != to.file() && captured.is_none() => {
                captured = Some(Piece::new(PieceKind::Pawn, piece.color.opposite()));
                MoveFlag::EnPassant
            }
            PieceKind::Pawn if distance == 16 => MoveFlag::DoublePush,
            PieceKind::King if distance == 2 && from.rank() == to.rank() => {
                if to.index() > from.index() {
                    MoveFlag::CastleKingside
                } else {
                    MoveFlag::CastleQueenside
                }
            }
            _ => MoveFlag::Normal,
        };
        Move::new(from, to, flag, piece, captured)
    }

    /// Applies a move after checking it against the legal moves.
    pub fn apply_move(&self, mv: Move) -> Result<Position, EngineError> {
        if !self.moves(GenMode::All).any(|legal| legal == mv) {
            warn!(%mv, fen = %self.to_fen(), "rejected illegal move");
            return Err(EngineError::IllegalMove(mv));
        }
        let next = self.make_move(mv);
        if cfg!(debug_assertions) {
            next.verify()?;
        }
        Ok(next)
    }

    /// Applies a generated move and links the result to this position
    /// unless the move is irreversible.
    pub(crate) fn make_move(&self, mv: Move) -> Position {
        let mut next = self.successor(mv);
        let reversible = next.halfmove_clock != 0 && next.castling == self.castling;
        if reversible {
            next.previous = Some(Arc::new(self.clone()));
        }
        next
    }

    /// Applies a generated move without recording any history.
    pub(crate) fn successor(&self, mv: Move) -> Position {
        let us = self.side_to_move;
        let them = us.opposite();
        let from = mv.from();
        let to = mv.to();

        let mut next = self.clone();
        next.previous = None;
        next.null_move = false;

        if let Some(sq) = next.en_passant.take() {
            next.hash ^= polyglot::en_passant_key(sq);
        }

        let captured = match mv.flag() {
            MoveFlag::EnPassant => Square::from_coords(to.file().index() as i8, from.rank().index() as i8)
                .and_then(|sq| next.remove(sq)),
            _ => next.remove(to),
        };

        let moved = next.remove(from);
        debug_assert!(moved.is_some(), "no piece on {} for {}", from, mv);
        if let Some(piece) = moved {
            let placed = match mv.promotion() {
                Some(kind) => Piece::new(kind, us),
                None => piece,
            };
            next.put(to, placed);
        }

        let castle = match mv.flag() {
            MoveFlag::CastleKingside => Some(CASTLES[us.index()][0]),
            MoveFlag::CastleQueenside => Some(CASTLES[us.index()][1]),
            _ => None,
        };
        if let Some(castle) = castle {
            if let Some(rook) = next.remove(castle.rook_from) {
                next.put(castle.rook_to, rook);
            }
        }

        let rights = next.castling
            & CastlingRights::surviving(from)
            & CastlingRights::surviving(to);
        if rights != next.castling {
            next.hash ^= polyglot::castling_key(next.castling) ^ polyglot::castling_key(rights);
            next.castling = rights;
        }

        next.side_to_move = them;
        next.hash ^= polyglot::turn_key();

        if mv.flag() == MoveFlag::DoublePush {
            if let Some(target) = from.offset(us.push_offset()) {
                if next.en_passant_capturable(target) {
                    next.en_passant = Some(target);
                    next.hash ^= polyglot::en_passant_key(target);
                }
            }
        }

        let pawn_move = moved.map_or(false, |piece| piece.kind == PieceKind::Pawn);
        next.halfmove_clock = if pawn_move || captured.is_some() {
            0
        } else {
            self.halfmove_clock + 1
        };
        if us == Color::Black {
            next.fullmove_number += 1;
        }
        next
    }

    /// Passes the turn without moving. The placement is unchanged and any
    /// en-passant square is dropped.
    pub fn make_null_move(&self) -> Position {
        let mut next = self.clone();
        if let Some(sq) = next.en_passant.take() {
            next.hash ^= polyglot::en_passant_key(sq);
        }
        next.side_to_move = self.side_to_move.opposite();
        next.hash ^= polyglot::turn_key();
        next.null_move = true;
        next.previous = Some(Arc::new(self.clone()));
        next
    }

    /// Returns the position the null move was made from.
    pub fn undo_null_move(&self) -> Result<Position, EngineError> {
        match &self.previous {
            Some(parent) if self.null_move => Ok(Position::clone(parent)),
            _ => Err(EngineError::NotNullMove),
        }
    }

    /// True when this position came from [`Position::make_null_move`].
    #[inline]
    pub fn is_null(&self) -> bool {
        self.null_move
    }

    /// Pieces of `by` attacking `sq` given `occupied` as blockers.
    pub fn attackers(&self, sq: Square, by: Color, occupied: Bitboard) -> Bitboard {
        let queens = self.pieces(by, PieceKind::Queen);
        (pawn_attacks(sq, by.opposite()) & self.pieces(by, PieceKind::Pawn))
            | (knight_attacks(sq) & self.pieces(by, PieceKind::Knight))
            | (king_attacks(sq) & self.pieces(by, PieceKind::King))
            | (bishop_attacks(sq, occupied) & (self.pieces(by, PieceKind::Bishop) | queens))
            | (rook_attacks(sq, occupied) & (self.pieces(by, PieceKind::Rook) | queens))
    }

    #[inline]
    pub fn is_attacked(&self, sq: Square, by: Color) -> bool {
        self.attackers(sq, by, self.occupied()).any()
    }

    /// True when `color`'s king is attacked. A side without a king is never
    /// in check.
    pub fn is_in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .map_or(false, |king| self.is_attacked(king, color.opposite()))
    }

    /// Enemy pieces giving check to the side to move.
    pub fn checkers(&self) -> Bitboard {
        let us = self.side_to_move;
        self.king_square(us).map_or(Bitboard::EMPTY, |king| {
            self.attackers(king, us.opposite(), self.occupied())
        })
    }

    /// Pieces that shield the king on `king_sq` from an enemy slider and so
    /// cannot leave the line between them. The king's color is taken from
    /// the piece on `king_sq`.
    pub fn pinned_mask(&self, king_sq: Square) -> Bitboard {
        let color = match self.piece_at(king_sq) {
            Some(piece) => piece.color,
            None => return Bitboard::EMPTY,
        };
        let them = color.opposite();
        let queens = self.pieces(them, PieceKind::Queen);
        let snipers = (rook_attacks(king_sq, Bitboard::EMPTY)
            & (self.pieces(them, PieceKind::Rook) | queens))
            | (bishop_attacks(king_sq, Bitboard::EMPTY)
                & (self.pieces(them, PieceKind::Bishop) | queens));

        let occupied = self.occupied();
        let friends = self.occupied_by(color);
        let mut pinned = Bitboard::EMPTY;
        for sniper in snipers {
            let blockers = between(king_sq, sniper) & occupied;
            if blockers.any() && !blockers.more_than_one() && (blockers & friends).any() {
                pinned |= blockers;
            }
        }
        pinned
    }

    /// Reports whether `color` may castle `(kingside, queenside)` right now.
    pub fn can_castle(&self, color: Color) -> (bool, bool) {
        let side = |index: usize, right: CastlingRights| {
            let castle = CASTLES[color.index()][index];
            self.castling.contains(right)
                && self.piece_at(castle.king_from) == Some(Piece::new(PieceKind::King, color))
                && self.piece_at(castle.rook_from) == Some(Piece::new(PieceKind::Rook, color))
                && (between(castle.king_from, castle.rook_from) & self.occupied()).is_empty()
                && (between(castle.king_from, castle.king_to)
                    .with(castle.king_from)
                    .with(castle.king_to))
                .into_iter()
                .all(|sq| !self.is_attacked(sq, color.opposite()))
        };
        (
            side(0, CastlingRights::kingside(color)),
            side(1, CastlingRights::queenside(color)),
        )
    }

    /// Whether a pseudo-legal move keeps the mover's king safe. `pinned` and
    /// `in_check` describe the side to move.
    pub(crate) fn is_legal(&self, mv: Move, pinned: Bitboard, in_check: bool) -> bool {
        let us = self.side_to_move;
        let them = us.opposite();
        let king = match self.king_square(us) {
            Some(king) => king,
            None => return true,
        };
        let from = mv.from();
        let to = mv.to();

        if from == king {
            if mv.flag().is_castling() {
                return true;
            }
            let occupied = self.occupied().without(from);
            return self.attackers(to, them, occupied).is_empty();
        }

        let en_passant = mv.flag() == MoveFlag::EnPassant;
        if !in_check && !en_passant && !pinned.contains(from) {
            return true;
        }

        let mut occupied = self.occupied().without(from).with(to);
        let mut removed = Bitboard::from_square(to);
        if en_passant {
            if let Some(victim) =
                Square::from_coords(to.file().index() as i8, from.rank().index() as i8)
            {
                occupied.clear(victim);
                removed.set(victim);
            }
        }
        (self.attackers(king, them, occupied) & !removed).is_empty()
    }

    /// True when the move leaves the opponent in check.
    pub fn gives_check(&self, mv: Move) -> bool {
        self.successor(mv).is_in_check(self.side_to_move.opposite())
    }

    /// Lazily generates legal moves in the given mode.
    pub fn moves(&self, mode: GenMode) -> MoveGen<'_> {
        MoveGen::new(self, mode)
    }

    /// All legal moves, best-ranked first.
    pub fn legal_moves(&self) -> MoveList {
        self.moves(GenMode::All).collect()
    }

    fn ancestors(&self) -> impl Iterator<Item = &Position> {
        std::iter::successors(self.previous.as_deref(), |p| p.previous.as_deref())
    }

    /// Earlier positions with the same side to move, back to the last
    /// irreversible move.
    fn same_side_ancestors(&self) -> impl Iterator<Item = &Position> {
        self.ancestors().skip(1).step_by(2)
    }

    /// True if this position already occurred since the last irreversible
    /// move.
    pub fn repetition(&self) -> bool {
        self.same_side_ancestors().any(|p| p.hash == self.hash)
    }

    /// True if this position is occurring for at least the third time since
    /// the last irreversible move.
    pub fn third_repetition(&self) -> bool {
        self.same_side_ancestors()
            .filter(|p| p.hash == self.hash)
            .nth(1)
            .is_some()
    }

    /// Neither side has enough material left to mate: bare kings, or a single
    /// minor piece against a bare king.
    pub fn insufficient_material(&self) -> bool {
        let heavy_or_pawns = Color::BOTH.into_iter().any(|color| {
            (self.pieces(color, PieceKind::Pawn)
                | self.pieces(color, PieceKind::Rook)
                | self.pieces(color, PieceKind::Queen))
            .any()
        });
        if heavy_or_pawns {
            return false;
        }
        let minors = Color::BOTH.into_iter().fold(Bitboard::EMPTY, |acc, color| {
            acc | self.pieces(color, PieceKind::Knight) | self.pieces(color, PieceKind::Bishop)
        });
        !minors.more_than_one()
    }
}

impl PartialEq for Position {
    /// Compares board state and keys; the repetition history is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.board == other.board
            && self.side_to_move == other.side_to_move
            && self.castling == other.castling
            && self.en_passant == other.en_passant
            && self.hash == other.hash
            && self.pawn_hash == other.pawn_hash
            && self.balance == other.balance
            && self.halfmove_clock == other.halfmove_clock
            && self.fullmove_number == other.fullmove_number
            && self.null_move == other.null_move
    }
}

impl Eq for Position {}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("fen", &self.to_fen())
            .field("hash", &format_args!("{:#018x}", self.hash))
            .field("null_move", &self.null_move)
            .field("history", &self.ancestors().count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::STARTPOS;

    const START_BALANCE: u32 = material::MATERIAL_SIGNATURES - 1;

    fn setup(white: &str, black: &str, side: Color) -> Position {
        Position::from_lists(white, black, side).unwrap()
    }

    fn play(position: &Position, from: Square, to: Square) -> Position {
        position.apply_move(position.new_move(from, to)).unwrap()
    }

    fn play_line(position: &Position, line: &[(Square, Square)]) -> Position {
        line.iter()
            .fold(position.clone(), |p, &(from, to)| play(&p, from, to))
    }

    fn weight(kind: PieceKind, color: Color) -> u32 {
        material::weight(Piece::new(kind, color))
    }

    #[test]
    fn standard_position() {
        let p = Position::standard();
        assert_eq!(p.hash(), 0x463B96181691FC9C);
        assert_eq!(p.balance(), START_BALANCE);
        assert_eq!(p.castling(), CastlingRights::ALL);
        assert_eq!(p.to_fen(), STARTPOS);
        assert_eq!(p.occupied().count(), 32);
        assert_eq!(p.king_square(Color::Black), Some(Square::E8));
        assert!(p.verify().is_ok());
    }

    #[test]
    fn en_passant_needs_an_adjacent_pawn() {
        let p = setup("Ke1,e2", "Kg8,d7,f7", Color::White);
        assert_eq!(p.en_passant(), None);

        let p = play(&p, Square::E2, Square::E4);
        assert_eq!(p.en_passant(), None);
        let p = play(&p, Square::D7, Square::D5);
        assert_eq!(p.en_passant(), None);
        let p = play(&p, Square::E4, Square::E5);
        assert_eq!(p.en_passant(), None);
        let p = play(&p, Square::F7, Square::F5);
        assert_eq!(p.en_passant(), Some(Square::F6));
    }

    #[test]
    fn en_passant_from_fen_is_filtered() {
        let p = Position::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1")
            .unwrap();
        assert_eq!(p.en_passant(), None);

        let p = Position::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        assert_eq!(p.en_passant(), Some(Square::E3));
        assert_eq!(p.to_fen(), "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1");
    }

    #[test]
    fn castling_allowed() {
        let p = setup("Ke1,Ra1,Rh1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (true, true));

        let p = setup("Ke1", "Ke8,Ra8,Rh8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (true, true));
    }

    #[test]
    fn castling_out_of_check() {
        let p = setup("Ke1,Ra1,Rh1", "Ke8,Bg3", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));

        let p = setup("Ke1,Bg6", "Ke8,Ra8,Rh8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (false, false));
    }

    #[test]
    fn castling_through_attacked_squares() {
        let p = setup("Ke1,Ra1,Rh1", "Ke8,Bb3,Bh3", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));

        let p = setup("Ke1,Bb6,Bh6", "Ke8,Ra8,Rh8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (false, false));

        // Only f1 is covered.
        let p = setup("Ke1,Ra1,Rh1", "Ke8,Bc4", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, true));

        // Only d1 is covered.
        let p = setup("Ke1,Ra1,Rh1", "Ke8,Nc3", Color::White);
        assert_eq!(p.can_castle(Color::White), (true, false));

        // b1 may be attacked; the king never crosses it.
        let p = setup("Ke1,Ra1,Rh1", "Ke8,Ba2", Color::White);
        assert_eq!(p.can_castle(Color::White), (true, true));
    }

    #[test]
    fn castling_from_wrong_squares() {
        let p = setup("Ke1,Ra8,Rh8", "Ke5", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));

        let p = setup("Ke2,Ra1,Rh1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));

        let p = setup("Ke4", "Ke8,Ra1,Rh1", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (false, false));

        let p = setup("Ke4", "Ke7,Ra8,Rh8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (false, false));
    }

    #[test]
    fn castling_needs_rooks() {
        let p = setup("Ke1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));
        assert_eq!(p.can_castle(Color::Black), (false, false));

        let p = setup("Ke1,Rb1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, false));

        let p = setup("Ke1,Rb1,Rh1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (true, false));

        let p = setup("Ke1,Ra1,Rf1", "Ke8", Color::White);
        assert_eq!(p.can_castle(Color::White), (false, true));
    }

    #[test]
    fn castling_rights_are_not_regained() {
        let p = setup("Ke1,Ra1,Rh1", "Ke8", Color::White);
        let p = play_line(
            &p,
            &[
                (Square::A1, Square::A2),
                (Square::E8, Square::E7),
                (Square::A2, Square::A1),
            ],
        );
        assert_eq!(p.can_castle(Color::White), (true, false));

        let p = setup("Ke1", "Ke8,Ra8,Rh8", Color::Black);
        let p = play_line(
            &p,
            &[
                (Square::E8, Square::E7),
                (Square::E1, Square::E2),
                (Square::E7, Square::E8),
            ],
        );
        assert_eq!(p.can_castle(Color::Black), (false, false));
    }

    #[test]
    fn castling_right_lost_when_rook_is_taken() {
        let p = setup("Ke1,Nb6", "Ke8,Ra8,Rh8", Color::White);
        let p = play(&p, Square::B6, Square::A8);
        assert_eq!(p.can_castle(Color::Black), (true, false));
    }

    #[test]
    fn castling_blocked_by_knights() {
        let p = setup("Ke1", "Ke8,Ra8,Rh8,Ng8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (false, true));

        let p = setup("Ke1", "Ke8,Ra8,Rh8,Nb8", Color::Black);
        assert_eq!(p.can_castle(Color::Black), (true, false));
    }

    #[test]
    fn castling_moves_the_rook() {
        let p = setup("Ke1,Ra1,Rh1", "Ke8", Color::White);
        let short = play(&p, Square::E1, Square::G1);
        assert_eq!(
            short.piece_at(Square::F1),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert_eq!(short.piece_at(Square::H1), None);
        assert_eq!(short.castling(), CastlingRights::NONE);

        let long = play(&p, Square::E1, Square::C1);
        assert_eq!(
            long.piece_at(Square::D1),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert_eq!(long.piece_at(Square::A1), None);
        assert!(long.verify().is_ok());
    }

    #[test]
    fn straight_repetition() {
        let knights_out = [(Square::G1, Square::F3), (Square::G8, Square::F6)];
        let knights_back = [(Square::F3, Square::G1), (Square::F6, Square::G8)];

        let p = play_line(&Position::standard(), &knights_out);
        assert!(!p.repetition());
        assert!(!p.third_repetition());

        let p = play_line(&p, &knights_back);
        assert!(p.repetition());
        assert!(!p.third_repetition());

        let p = play_line(&p, &knights_out);
        assert!(p.repetition());
        assert!(!p.third_repetition());

        let p = play_line(&p, &knights_back);
        assert!(p.repetition());
        assert!(p.third_repetition());

        let p = play_line(&p, &knights_out);
        assert!(p.repetition());
        assert!(p.third_repetition());
    }

    #[test]
    fn repetition_with_moves_in_between() {
        let p = play_line(
            &Position::standard(),
            &[
                (Square::E2, Square::E4),
                (Square::E7, Square::E5),
                (Square::G1, Square::F3),
                (Square::G8, Square::F6),
                (Square::B1, Square::C3),
                (Square::B8, Square::C6),
                (Square::F1, Square::C4),
                (Square::F8, Square::C5),
                (Square::C3, Square::B1),
                (Square::C6, Square::B8),
                (Square::C4, Square::F1),
                (Square::C5, Square::F8),
            ],
        );
        assert!(p.repetition());
        assert!(!p.third_repetition());

        let p = play_line(
            &p,
            &[
                (Square::F1, Square::C4),
                (Square::F8, Square::C5),
                (Square::B1, Square::C3),
                (Square::B8, Square::C6),
                (Square::C4, Square::F1),
                (Square::C5, Square::F8),
                (Square::C3, Square::B1),
                (Square::C6, Square::B8),
            ],
        );
        assert!(p.repetition());
        assert!(p.third_repetition());
    }

    #[test]
    fn lost_castling_right_resets_repetition() {
        let shuffle = [
            (Square::E1, Square::E2),
            (Square::E8, Square::E7),
            (Square::E2, Square::E1),
            (Square::E7, Square::E8),
        ];
        let p = setup("Ke1,Rh1,h2", "Ke8,Ra8,a7", Color::White);
        let p = play_line(&p, &[(Square::H2, Square::H4), (Square::A7, Square::A5)]);
        let p = play_line(&p, &shuffle);
        let p = play_line(&p, &shuffle);
        assert!(p.repetition());
        assert!(!p.third_repetition());

        let p = play_line(&p, &shuffle);
        assert!(p.repetition());
        assert!(p.third_repetition());
    }

    fn assert_keys(p: &Position, hash: u64, pawn_hash: u64) {
        assert_eq!(p.polyglot(), (hash, pawn_hash));
        assert_eq!(p.hash(), hash);
        assert_eq!(p.pawn_hash(), pawn_hash);
    }

    #[test]
    fn polyglot_keys_through_the_opening() {
        let p = play(&Position::standard(), Square::E2, Square::E4);
        assert_keys(&p, 0x823C9B50FD114196, 0x0B2D6B38C0B92E91);
        assert_eq!(p.en_passant(), None);
        assert_eq!(p.castling(), CastlingRights::ALL);

        let p = play(&p, Square::D7, Square::D5);
        assert_keys(&p, 0x0756B94461C50FB0, 0x76916F86F34AE5BE);

        let p = play(&p, Square::E4, Square::E5);
        assert_keys(&p, 0x662FAFB965DB29D4, 0xEF3E5FD1587346D3);
        assert_eq!(p.en_passant(), None);

        let p = play(&p, Square::F7, Square::F5);
        assert_keys(&p, 0x22A48B5A8E47FF78, 0x83871FE249DCEE04);
        assert_eq!(p.en_passant(), Some(Square::F6));

        let p = play(&p, Square::E1, Square::E2);
        assert_keys(&p, 0x652A607CA3F242C1, 0x83871FE249DCEE04);
        assert_eq!(p.en_passant(), None);
        assert_eq!(p.castling(), CastlingRights::BLACK);

        let p = play(&p, Square::E8, Square::F7);
        assert_keys(&p, 0x00FDD303C946BDD9, 0x83871FE249DCEE04);
        assert_eq!(p.castling(), CastlingRights::NONE);
        assert_eq!(p.balance(), START_BALANCE);
    }

    #[test]
    fn polyglot_keys_with_en_passant_capture() {
        let p = play_line(
            &Position::standard(),
            &[
                (Square::A2, Square::A4),
                (Square::B7, Square::B5),
                (Square::H2, Square::H4),
                (Square::B5, Square::B4),
                (Square::C2, Square::C4),
            ],
        );
        assert_keys(&p, 0x3C8123EA7B067637, 0xB5AA405AF42E7052);
        assert_eq!(p.en_passant(), Some(Square::C3));
        assert_eq!(p.castling(), CastlingRights::ALL);

        let p = play_line(&p, &[(Square::B4, Square::C3), (Square::A1, Square::A3)]);
        assert_keys(&p, 0x5C3F9B829B279560, 0xE214F040EAA135A0);
        assert_eq!(p.en_passant(), None);
        assert_eq!(
            p.castling(),
            CastlingRights::WHITE_KINGSIDE | CastlingRights::BLACK
        );
        assert_eq!(
            p.balance(),
            START_BALANCE - weight(PieceKind::Pawn, Color::White)
        );
    }

    #[test]
    fn balance_after_exchanges() {
        let p = play_line(
            &Position::standard(),
            &[
                (Square::E2, Square::E4),
                (Square::D7, Square::D5),
                (Square::E4, Square::D5),
            ],
        );
        assert_eq!(
            p.balance(),
            START_BALANCE - weight(PieceKind::Pawn, Color::Black)
        );

        let p = play_line(
            &p,
            &[
                (Square::G8, Square::F6),
                (Square::B1, Square::C3),
                (Square::F6, Square::D5),
                (Square::C3, Square::D5),
                (Square::D8, Square::D5),
            ],
        );
        assert_eq!(
            p.balance(),
            START_BALANCE
                - weight(PieceKind::Pawn, Color::White)
                - weight(PieceKind::Knight, Color::White)
                - weight(PieceKind::Pawn, Color::Black)
                - weight(PieceKind::Knight, Color::Black)
        );
    }

    #[test]
    fn balance_after_promotion() {
        let p = setup("Kh1", "Ka8,a2,b7", Color::Black);
        assert_eq!(p.balance(), 2 * weight(PieceKind::Pawn, Color::Black));

        let p = p
            .apply_move(p.new_move(Square::A2, Square::A1).promote(PieceKind::Rook))
            .unwrap();
        assert_eq!(
            p.balance(),
            weight(PieceKind::Pawn, Color::Black) + weight(PieceKind::Rook, Color::Black)
        );

        let p = setup("Kh1", "Ka8,a2", Color::Black);
        let p = p
            .apply_move(p.new_move(Square::A2, Square::A1).promote(PieceKind::Rook))
            .unwrap();
        assert_eq!(p.balance(), weight(PieceKind::Rook, Color::Black));
    }

    #[test]
    fn balance_after_capturing_promotion() {
        let p = setup("Kh1,Nb1,Ng1", "Ka8,a2,b7", Color::Black);
        assert_eq!(
            p.balance(),
            2 * weight(PieceKind::Knight, Color::White) + 2 * weight(PieceKind::Pawn, Color::Black)
        );
        let p = p
            .apply_move(p.new_move(Square::A2, Square::B1).promote(PieceKind::Queen))
            .unwrap();
        assert_eq!(
            p.balance(),
            weight(PieceKind::Knight, Color::White)
                + weight(PieceKind::Pawn, Color::Black)
                + weight(PieceKind::Queen, Color::Black)
        );

        let p = setup("Kh1,Nb1", "Ka8,a2", Color::Black);
        let p = p
            .apply_move(p.new_move(Square::A2, Square::B1).promote(PieceKind::Queen))
            .unwrap();
        assert_eq!(p.balance(), weight(PieceKind::Queen, Color::Black));
    }

    #[test]
    fn unpromoted_move_to_last_rank_is_illegal() {
        let p = setup("Kh1", "Ka8,a2", Color::Black);
        let mv = p.new_move(Square::A2, Square::A1);
        assert_eq!(p.apply_move(mv), Err(EngineError::IllegalMove(mv)));
    }

    #[test]
    fn balance_after_captures() {
        let p = setup("Kh1,Nc3,Nf3", "Ka8,d4,e4", Color::Black);
        let p = play(&p, Square::D4, Square::C3);
        assert_eq!(
            p.balance(),
            weight(PieceKind::Knight, Color::White) + 2 * weight(PieceKind::Pawn, Color::Black)
        );

        let p = setup("Kh1,Nc3", "Ka8,d4,e4", Color::Black);
        let p = play(&p, Square::D4, Square::C3);
        assert_eq!(p.balance(), 2 * weight(PieceKind::Pawn, Color::Black));
    }

    #[test]
    fn balance_after_en_passant() {
        let p = play_line(
            &Position::standard(),
            &[
                (Square::E2, Square::E4),
                (Square::E7, Square::E6),
                (Square::E4, Square::E5),
                (Square::D7, Square::D5),
                (Square::E5, Square::D6),
            ],
        );
        assert_eq!(
            p.balance(),
            START_BALANCE - weight(PieceKind::Pawn, Color::Black)
        );
        assert_eq!(p.piece_at(Square::D5), None);

        let p = setup("Kh1,c2", "Ka8,d4", Color::White);
        let p = play_line(&p, &[(Square::C2, Square::C4), (Square::D4, Square::C3)]);
        assert_eq!(p.balance(), weight(PieceKind::Pawn, Color::Black));
    }

    #[test]
    fn unobstructed_pins() {
        let p = setup("Ka1,Qe1,Ra8,Rh8,Bb5", "Ke8,Re7,Bc8,Bf8,Nc6", Color::White);
        let expected: Bitboard = [Square::C6, Square::C8, Square::E7, Square::F8]
            .into_iter()
            .collect();
        assert_eq!(p.pinned_mask(Square::E8), expected);

        let p = setup("Ke4,Qe5,Rd5,Nd4,Nf4", "Ka7,Qe8,Ra4,Rh4,Ba8", Color::Black);
        let expected: Bitboard = [Square::D5, Square::E5, Square::D4, Square::F4]
            .into_iter()
            .collect();
        assert_eq!(p.pinned_mask(Square::E4), expected);
    }

    #[test]
    fn second_friendly_blocker_releases_pin() {
        let p = setup(
            "Ka1,Qe1,Ra8,Rh8,Bb5,Nb8,Ng8,e4",
            "Ke8,Re7,Bc8,Bf8,Nc6",
            Color::White,
        );
        assert_eq!(p.pinned_mask(Square::E8), Bitboard::from_square(Square::C6));

        let p = setup(
            "Ke4,Qe7,Rc6,Nb4,Ng4",
            "Ka7,Qe8,Ra4,Rh4,Ba8,c4,e6,f4",
            Color::Black,
        );
        assert_eq!(p.pinned_mask(Square::E4), Bitboard::from_square(Square::C6));
    }

    #[test]
    fn enemy_blocker_releases_pin() {
        let p = setup(
            "Ka1,Qe1,Ra8,Rh8,Bb5",
            "Ke8,Re7,Rg8,Bc8,Bf8,Nc6,Nb8,e4",
            Color::White,
        );
        assert_eq!(p.pinned_mask(Square::E8), Bitboard::from_square(Square::C6));

        let p = setup(
            "Ke4,Qe7,Rc6,Nb4,Ng4,c4,e5,f4",
            "Ka7,Qe8,Ra4,Rh4,Ba8",
            Color::Black,
        );
        assert_eq!(p.pinned_mask(Square::E4), Bitboard::from_square(Square::C6));
    }

    #[test]
    fn null_move_round_trip() {
        let p = setup("Ke1,Qd1,d2,e2", "Kg8,Qf8,f7,g7", Color::White);
        let null = p.make_null_move();
        assert!(null.is_null());
        assert_eq!(null.side_to_move(), Color::Black);
        assert_eq!(null.polyglot(), (null.hash(), null.pawn_hash()));

        let back = null.undo_null_move().unwrap();
        assert_eq!(back, p);
        assert!(!back.is_null());

        let next = play(&back, Square::E2, Square::E4);
        assert!(!next.is_null());
        assert_eq!(next.undo_null_move(), Err(EngineError::NotNullMove));
    }

    #[test]
    fn null_move_drops_en_passant() {
        let p = Position::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        let null = p.make_null_move();
        assert_eq!(null.en_passant(), None);
        assert!(null.verify().is_ok());
        assert_eq!(null.undo_null_move().unwrap().en_passant(), Some(Square::E3));
    }

    #[test]
    fn parent_is_unchanged_by_moves() {
        let parent = Position::standard();
        let snapshot = parent.clone();
        let _child = play(&parent, Square::G1, Square::F3);
        assert_eq!(parent, snapshot);
        assert_eq!(parent.hash(), 0x463B96181691FC9C);
    }

    #[test]
    fn checks_are_detected() {
        let p = setup("Ke1,Qd1", "Ke8,Bb4", Color::White);
        assert!(p.is_in_check(Color::White));
        assert!(!p.is_in_check(Color::Black));
        assert_eq!(p.checkers(), Bitboard::from_square(Square::B4));

        let p = setup("Ke1", "Ke8", Color::White);
        assert!(!p.is_in_check(Color::White));
        assert!(p.checkers().is_empty());
    }

    #[test]
    fn new_move_infers_flags() {
        let p = Position::standard();
        assert_eq!(p.new_move(Square::E2, Square::E4).flag(), MoveFlag::DoublePush);
        assert_eq!(p.new_move(Square::E2, Square::E3).flag(), MoveFlag::Normal);
        assert_eq!(p.new_move(Square::E4, Square::E5), Move::NULL);

        let p = setup("Ke1,Ra1,Rh1", "Ke8,Nb1", Color::White);
        assert_eq!(p.new_move(Square::E1, Square::G1).flag(), MoveFlag::CastleKingside);
        assert_eq!(p.new_move(Square::E1, Square::C1).flag(), MoveFlag::CastleQueenside);
        let capture = p.new_move(Square::A1, Square::B1);
        assert_eq!(
            capture.captured(),
            Some(Piece::new(PieceKind::Knight, Color::Black))
        );
    }

    #[test]
    fn clocks_advance() {
        let p = play_line(
            &Position::standard(),
            &[(Square::G1, Square::F3), (Square::G8, Square::F6)],
        );
        assert_eq!(p.halfmove_clock(), 2);
        assert_eq!(p.fullmove_number(), 2);
        let p = play(&p, Square::E2, Square::E4);
        assert_eq!(p.halfmove_clock(), 0);
        assert_eq!(p.fullmove_number(), 2);
    }

    #[test]
    fn insufficient_material() {
        assert!(setup("Ke1", "Ke8", Color::White).insufficient_material());
        assert!(setup("Ke1,Nb1", "Ke8", Color::White).insufficient_material());
        assert!(!setup("Ke1,Nb1", "Ke8,Bc8", Color::White).insufficient_material());
        assert!(!setup("Ke1,a2", "Ke8", Color::White).insufficient_material());
        assert!(!Position::standard().insufficient_material());
    }

    #[test]
    fn position_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Position>();
    }
}
