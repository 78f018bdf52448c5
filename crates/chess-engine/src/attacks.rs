//! Attack masks for every piece kind.
//!
//! Knight, king and pawn masks are plain lookups built at compile time.
//! Slider attacks walk precomputed rays and stop at the first blocker in
//! each direction, so they need no magic multipliers.

use crate::Bitboard;
use chess_core::{Color, PieceKind, Square};

/// (file, rank) steps, indexed by direction.
const DIRECTIONS: [(i8, i8); 8] = [
    (0, 1),   // north
    (1, 1),   // north-east
    (1, 0),   // east
    (-1, 1),  // north-west
    (0, -1),  // south
    (-1, -1), // south-west
    (-1, 0),  // west
    (1, -1),  // south-east
];

/// Directions 0-3 walk toward higher square indices.
const POSITIVE: usize = 4;

const ROOK_DIRECTIONS: [usize; 4] = [0, 2, 4, 6];
const BISHOP_DIRECTIONS: [usize; 4] = [1, 3, 5, 7];

const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_STEPS: [(i8, i8); 8] = DIRECTIONS;

static KNIGHT_ATTACKS: [Bitboard; 64] = step_table(&KNIGHT_STEPS);
static KING_ATTACKS: [Bitboard; 64] = step_table(&KING_STEPS);
static PAWN_ATTACKS: [[Bitboard; 64]; 2] = [
    step_table(&[(-1, 1), (1, 1)]),
    step_table(&[(-1, -1), (1, -1)]),
];
static RAYS: [[Bitboard; 64]; 8] = ray_table();
static BETWEEN: [[Bitboard; 64]; 64] = between_table();

const fn target(sq: usize, step: (i8, i8)) -> Option<usize> {
    let file = (sq % 8) as i8 + step.0;
    let rank = (sq / 8) as i8 + step.1;
    if file >= 0 && file < 8 && rank >= 0 && rank < 8 {
        Some((rank * 8 + file) as usize)
    } else {
        None
    }
}

const fn step_table(steps: &[(i8, i8)]) -> [Bitboard; 64] {
    let mut table = [Bitboard::EMPTY; 64];
    let mut sq = 0;
    while sq < 64 {
        let mut bits = 0u64;
        let mut i = 0;
        while i < steps.len() {
            if let Some(to) = target(sq, steps[i]) {
                bits |= 1u64 << to;
            }
            i += 1;
        }
        table[sq] = Bitboard(bits);
        sq += 1;
    }
    table
}

const fn ray_table() -> [[Bitboard; 64]; 8] {
    let mut table = [[Bitboard::EMPTY; 64]; 8];
    let mut dir = 0;
    while dir < 8 {
        let mut sq = 0;
        while sq < 64 {
            let mut bits = 0u64;
            let mut cur = sq;
            while let Some(next) = target(cur, DIRECTIONS[dir]) {
                bits |= 1u64 << next;
                cur = next;
            }
            table[dir][sq] = Bitboard(bits);
            sq += 1;
        }
        dir += 1;
    }
    table
}

const fn between_table() -> [[Bitboard; 64]; 64] {
    let mut table = [[Bitboard::EMPTY; 64]; 64];
    let mut from = 0;
    while from < 64 {
        let mut dir = 0;
        while dir < 8 {
            let mut passed = 0u64;
            let mut cur = from;
            while let Some(next) = target(cur, DIRECTIONS[dir]) {
                table[from][next] = Bitboard(passed);
                passed |= 1u64 << next;
                cur = next;
            }
            dir += 1;
        }
        from += 1;
    }
    table
}

#[inline]
fn ray_attacks(sq: Square, dir: usize, occupied: Bitboard) -> Bitboard {
    let ray = RAYS[dir][sq.index() as usize];
    let blockers = ray.0 & occupied.0;
    if blockers == 0 {
        return ray;
    }
    let first = if dir < POSITIVE {
        blockers.trailing_zeros()
    } else {
        63 - blockers.leading_zeros()
    };
    Bitboard(ray.0 & !RAYS[dir][first as usize].0)
}

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq.index() as usize]
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq.index() as usize]
}

/// Squares a pawn of `color` on `sq` attacks.
#[inline]
pub fn pawn_attacks(sq: Square, color: Color) -> Bitboard {
    PAWN_ATTACKS[color.index()][sq.index() as usize]
}

pub fn rook_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    ROOK_DIRECTIONS
        .iter()
        .fold(Bitboard::EMPTY, |acc, &dir| acc | ray_attacks(sq, dir, occupied))
}

pub fn bishop_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    BISHOP_DIRECTIONS
        .iter()
        .fold(Bitboard::EMPTY, |acc, &dir| acc | ray_attacks(sq, dir, occupied))
}

#[inline]
pub fn queen_attacks(sq: Square, occupied: Bitboard) -> Bitboard {
    rook_attacks(sq, occupied) | bishop_attacks(sq, occupied)
}

/// Attacks of a non-pawn piece of `kind` standing on `sq`.
pub fn piece_attacks(kind: PieceKind, sq: Square, occupied: Bitboard) -> Bitboard {
    match kind {
        PieceKind::Knight => knight_attacks(sq),
        PieceKind::Bishop => bishop_attacks(sq, occupied),
        PieceKind::Rook => rook_attacks(sq, occupied),
        PieceKind::Queen => queen_attacks(sq, occupied),
        PieceKind::King => king_attacks(sq),
        PieceKind::Pawn => Bitboard::EMPTY,
    }
}

/// Squares strictly between `a` and `b` when they share a rank, file or
/// diagonal; empty otherwise.
#[inline]
pub fn between(a: Square, b: Square) -> Bitboard {
    BETWEEN[a.index() as usize][b.index() as usize]
}
