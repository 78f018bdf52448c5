//! Perft: leaf node counts used to validate the move generator against
//! published reference values.

use super::GenMode;
use crate::Position;

/// Counts the leaf nodes of the legal move tree at `depth`.
pub fn perft(position: &Position, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = position.moves(GenMode::All);
    if depth == 1 {
        return moves.count() as u64;
    }
    moves
        .map(|mv| perft(&position.successor(mv), depth - 1))
        .sum()
}

/// Node counts below each root move, sorted by UCI text.
pub fn perft_divide(position: &Position, depth: u32) -> Vec<(String, u64)> {
    let mut results: Vec<(String, u64)> = position
        .moves(GenMode::All)
        .map(|mv| {
            let nodes = perft(&position.successor(mv), depth.saturating_sub(1));
            (mv.to_uci(), nodes)
        })
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    const ENDGAME: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
    const PROMOTIONS: &str = "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1";
    const TRICKY: &str = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 0 1";

    fn check(fen: &str, expected: &[u64]) {
        let position = Position::from_fen(fen).unwrap();
        for (depth, &nodes) in expected.iter().enumerate() {
            assert_eq!(
                perft(&position, depth as u32 + 1),
                nodes,
                "{} at depth {}",
                fen,
                depth + 1
            );
        }
    }

    #[test]
    fn startpos() {
        check(chess_core::STARTPOS, &[20, 400, 8902]);
    }

    #[test]
    fn startpos_depth_4() {
        assert_eq!(perft(&Position::standard(), 4), 197_281);
    }

    #[test]
    #[ignore]
    fn startpos_depth_5() {
        assert_eq!(perft(&Position::standard(), 5), 4_865_609);
    }

    #[test]
    fn kiwipete() {
        check(KIWIPETE, &[48, 2039, 97_862]);
    }

    #[test]
    fn endgame_with_en_passant_pins() {
        check(ENDGAME, &[14, 191, 2812]);
    }

    #[test]
    fn promotions_and_castling_captures() {
        check(PROMOTIONS, &[6, 264, 9467]);
    }

    #[test]
    fn tricky_promotion() {
        check(TRICKY, &[44, 1486, 62_379]);
    }

    #[test]
    #[ignore]
    fn deeper_positions() {
        check(KIWIPETE, &[48, 2039, 97_862, 4_085_603]);
        check(ENDGAME, &[14, 191, 2812, 43_238, 674_624]);
    }

    #[test]
    fn divide_sums_to_perft() {
        let position = Position::from_fen(KIWIPETE).unwrap();
        let results = perft_divide(&position, 2);
        assert_eq!(results.len(), 48);
        let total: u64 = results.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 2039);
        assert!(results.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
