//! Move generation.
//!
//! [`MoveGen`] is a lazy producer of legal moves. Pseudo-legal moves are
//! generated one stage at a time into a scored [`MoveList`], handed out
//! best-first by selection, and checked for king safety only as they are
//! pulled. A consumer that stops early never pays for the later stages.

pub mod perft;

use chess_core::{Move, MoveFlag, Piece, PieceKind, Square};

use crate::attacks::{between, king_attacks, pawn_attacks, piece_attacks};
use crate::eval::pst_gain;
use crate::{Bitboard, Position};

/// Which moves a [`MoveGen`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenMode {
    /// Every legal move: captures and promotions first, then quiet moves.
    All,
    /// Captures and queen promotions.
    Captures,
    /// Quiet moves that give check.
    Checks,
    /// Moves out of check. Behaves as [`GenMode::All`] when not in check.
    Evasions,
}

/// A list of moves with ordering scores and a fixed maximum capacity.
///
/// Chess positions have at most 218 legal moves, so a fixed-size array
/// avoids heap allocations during generation.
#[derive(Clone)]
pub struct MoveList {
    moves: [Move; Self::MAX_MOVES],
    scores: [i32; Self::MAX_MOVES],
    len: usize,
}

impl MoveList {
    pub const MAX_MOVES: usize = 256;

    #[inline]
    pub const fn new() -> Self {
        MoveList {
            moves: [Move::NULL; Self::MAX_MOVES],
            scores: [0; Self::MAX_MOVES],
            len: 0,
        }
    }

    #[inline]
    pub fn push(&mut self, mv: Move, score: i32) {
        debug_assert!(self.len < Self::MAX_MOVES);
        self.moves[self.len] = mv;
        self.scores[self.len] = score;
        self.len += 1;
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_slice(&self) -> &[Move] {
        &self.moves[..self.len]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Move> {
        self.as_slice().iter()
    }

    #[inline]
    pub fn contains(&self, mv: Move) -> bool {
        self.as_slice().contains(&mv)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Moves the best-scored entry at or after `start` into `start` and
    /// returns it.
    fn pick(&mut self, start: usize) -> Move {
        let mut best = start;
        for i in start + 1..self.len {
            if self.scores[i] > self.scores[best] {
                best = i;
            }
        }
        self.moves.swap(start, best);
        self.scores.swap(start, best);
        self.moves[start]
    }
}

impl Default for MoveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<usize> for MoveList {
    type Output = Move;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        debug_assert!(index < self.len);
        &self.moves[index]
    }
}

impl<'a> IntoIterator for &'a MoveList {
    type Item = &'a Move;
    type IntoIter = std::slice::Iter<'a, Move>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

/// Collected moves keep their arrival order.
impl FromIterator<Move> for MoveList {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut list = MoveList::new();
        list.extend(iter);
        list
    }
}

impl Extend<Move> for MoveList {
    fn extend<I: IntoIterator<Item = Move>>(&mut self, iter: I) {
        for mv in iter {
            let score = -(self.len as i32);
            self.push(mv, score);
        }
    }
}

impl std::fmt::Debug for MoveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

/// All legal moves of the position, best-ranked first.
pub fn legal_moves(position: &Position) -> MoveList {
    position.legal_moves()
}

const CAPTURE_BASE: i32 = 10_000;
const PROMOTION_BASE: i32 = 9_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Tactical,
    Quiet,
    Evasions,
    Done,
}

/// Which pseudo-legal moves a generation pass emits.
#[derive(Debug, Clone, Copy)]
struct Filter {
    captures: bool,
    quiets: bool,
    /// Pushes onto the last rank.
    promotions: bool,
    under_promotions: bool,
    castles: bool,
    /// Destinations allowed for pieces other than the king.
    targets: Bitboard,
}

impl Filter {
    const TACTICAL: Filter = Filter {
        captures: true,
        quiets: false,
        promotions: true,
        under_promotions: true,
        castles: false,
        targets: Bitboard::FULL,
    };

    const QUIET: Filter = Filter {
        captures: false,
        quiets: true,
        promotions: false,
        under_promotions: false,
        castles: true,
        targets: Bitboard::FULL,
    };
}

/// Lazy legal move iterator. Create one with [`Position::moves`].
pub struct MoveGen<'a> {
    position: &'a Position,
    mode: GenMode,
    stage: Stage,
    list: MoveList,
    next: usize,
    pinned: Bitboard,
    in_check: bool,
}

impl<'a> MoveGen<'a> {
    pub fn new(position: &'a Position, mode: GenMode) -> Self {
        let us = position.side_to_move();
        let in_check = position.is_in_check(us);
        let mode = match mode {
            GenMode::Evasions if !in_check => GenMode::All,
            mode => mode,
        };
        let pinned = position
            .king_square(us)
            .map_or(Bitboard::EMPTY, |king| position.pinned_mask(king));

        let mut gen = MoveGen {
            position,
            mode,
            stage: Stage::Done,
            list: MoveList::new(),
            next: 0,
            pinned,
            in_check,
        };
        let first = match mode {
            GenMode::All | GenMode::Captures => Stage::Tactical,
            GenMode::Checks => Stage::Quiet,
            GenMode::Evasions => Stage::Evasions,
        };
        gen.enter(first);
        gen
    }

    pub fn mode(&self) -> GenMode {
        self.mode
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.list.clear();
        self.next = 0;
        match stage {
            Stage::Tactical => {
                let filter = Filter {
                    under_promotions: self.mode == GenMode::All,
                    ..Filter::TACTICAL
                };
                generate(self.position, filter, &mut self.list);
            }
            Stage::Quiet => {
                let filter = Filter {
                    castles: self.mode == GenMode::All,
                    ..Filter::QUIET
                };
                generate(self.position, filter, &mut self.list);
            }
            Stage::Evasions => generate_evasions(self.position, &mut self.list),
            Stage::Done => {}
        }
    }

    fn advance(&mut self) {
        let next = match (self.stage, self.mode) {
            (Stage::Tactical, GenMode::All) => Stage::Quiet,
            _ => Stage::Done,
        };
        self.enter(next);
    }

    fn accept(&self, mv: Move) -> bool {
        self.position.is_legal(mv, self.pinned, self.in_check)
            && (self.mode != GenMode::Checks || self.position.gives_check(mv))
    }
}

impl Iterator for MoveGen<'_> {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        loop {
            if self.next < self.list.len() {
                let mv = self.list.pick(self.next);
                self.next += 1;
                if self.accept(mv) {
                    return Some(mv);
                }
                continue;
            }
            if self.stage == Stage::Done {
                return None;
            }
            self.advance();
        }
    }
}

/// Most valuable victim first, then least valuable attacker.
fn capture_score(piece: Piece, victim: Piece) -> i32 {
    CAPTURE_BASE + 16 * victim.kind.index() as i32 - piece.kind.index() as i32
}

fn push_promotions(
    list: &mut MoveList,
    base: Move,
    captured: Option<Piece>,
    under_promotions: bool,
) {
    let piece = base.piece();
    for kind in PieceKind::PROMOTIONS {
        if kind != PieceKind::Queen && !under_promotions {
            continue;
        }
        let mut score = PROMOTION_BASE + 16 * kind.index() as i32;
        if let (Some(piece), Some(victim)) = (piece, captured) {
            score += capture_score(piece, victim);
        }
        list.push(base.promote(kind), score);
    }
}

fn generate_pawn_moves(position: &Position, filter: Filter, list: &mut MoveList) {
    let us = position.side_to_move();
    let them = us.opposite();
    let pawn = Piece::new(PieceKind::Pawn, us);
    let empty = !position.occupied();
    let enemies = position.occupied_by(them);

    for from in position.pieces(us, PieceKind::Pawn) {
        if let Some(to) = from.offset(us.push_offset()) {
            if empty.contains(to) {
                let mv = Move::normal(from, to, pawn, None);
                if to.rank().index() == us.promotion_rank() {
                    if filter.promotions && filter.targets.contains(to) {
                        push_promotions(list, mv, None, filter.under_promotions);
                    }
                } else {
                    if filter.quiets && filter.targets.contains(to) {
                        list.push(mv, pst_gain(pawn, from, to));
                    }
                    if let Some(double) = to.offset(us.push_offset()) {
                        if filter.quiets
                            && double.rank().index() == us.double_push_rank()
                            && empty.contains(double)
                            && filter.targets.contains(double)
                        {
                            let mv = Move::new(from, double, MoveFlag::DoublePush, pawn, None);
                            list.push(mv, pst_gain(pawn, from, double));
                        }
                    }
                }
            }
        }

        let attacks = pawn_attacks(from, us);
        for to in attacks & enemies & filter.targets {
            let victim = position.piece_at(to);
            let mv = Move::normal(from, to, pawn, victim);
            if to.rank().index() == us.promotion_rank() {
                if filter.promotions {
                    push_promotions(list, mv, victim, filter.under_promotions);
                }
            } else if filter.captures {
                if let Some(victim) = victim {
                    list.push(mv, capture_score(pawn, victim));
                }
            }
        }

        if filter.captures {
            if let Some(ep) = position.en_passant() {
                let victim_sq = ep.offset(them.push_offset());
                let wanted = filter.targets.contains(ep)
                    || victim_sq.map_or(false, |sq| filter.targets.contains(sq));
                if attacks.contains(ep) && wanted {
                    let victim = Piece::new(PieceKind::Pawn, them);
                    let mv = Move::new(from, ep, MoveFlag::EnPassant, pawn, Some(victim));
                    list.push(mv, capture_score(pawn, victim));
                }
            }
        }
    }
}

fn generate_piece_moves(
    position: &Position,
    kind: PieceKind,
    filter: Filter,
    targets: Bitboard,
    list: &mut MoveList,
) {
    let us = position.side_to_move();
    let piece = Piece::new(kind, us);
    let occupied = position.occupied();
    let enemies = position.occupied_by(us.opposite());

    for from in position.pieces(us, kind) {
        let attacks = piece_attacks(kind, from, occupied) & targets;
        if filter.captures {
            for to in attacks & enemies {
                if let Some(victim) = position.piece_at(to) {
                    list.push(Move::normal(from, to, piece, Some(victim)), capture_score(piece, victim));
                }
            }
        }
        if filter.quiets {
            for to in attacks & !occupied {
                list.push(Move::normal(from, to, piece, None), pst_gain(piece, from, to));
            }
        }
    }
}

fn generate_castles(position: &Position, list: &mut MoveList) {
    let us = position.side_to_move();
    let king = Piece::new(PieceKind::King, us);
    let (kingside, queenside) = position.can_castle(us);
    let home = Square::from_coords(4, us.home_rank() as i8);
    let sides = [
        (kingside, 6, MoveFlag::CastleKingside),
        (queenside, 2, MoveFlag::CastleQueenside),
    ];
    for (allowed, file, flag) in sides {
        let to = Square::from_coords(file, us.home_rank() as i8);
        if let (true, Some(from), Some(to)) = (allowed, home, to) {
            list.push(Move::new(from, to, flag, king, None), pst_gain(king, from, to));
        }
    }
}

fn generate(position: &Position, filter: Filter, list: &mut MoveList) {
    generate_pawn_moves(position, filter, list);
    for kind in [
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
    ] {
        generate_piece_moves(position, kind, filter, filter.targets, list);
    }
    generate_piece_moves(position, PieceKind::King, filter, Bitboard::FULL, list);
    if filter.castles {
        generate_castles(position, list);
    }
}

/// King moves, plus captures of and interpositions against a single checker.
fn generate_evasions(position: &Position, list: &mut MoveList) {
    let us = position.side_to_move();
    let king = match position.king_square(us) {
        Some(king) => king,
        None => return,
    };
    let checkers = position.checkers();
    let targets = match checkers.lsb() {
        Some(checker) if !checkers.more_than_one() => {
            between(king, checker).with(checker)
        }
        _ => Bitboard::EMPTY,
    };

    let everything = Filter {
        captures: true,
        quiets: true,
        promotions: true,
        under_promotions: true,
        castles: false,
        targets,
    };
    if targets.any() {
        generate_pawn_moves(position, everything, list);
        for kind in [
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Rook,
            PieceKind::Queen,
        ] {
            generate_piece_moves(position, kind, everything, targets, list);
        }
    }

    // Squares next to the king stay reachable even on a double check.
    let escapes = king_attacks(king) & !position.occupied_by(us);
    generate_piece_moves(position, PieceKind::King, everything, escapes, list);
}
