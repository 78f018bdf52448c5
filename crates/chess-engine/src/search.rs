//! Negamax search with alpha-beta pruning and quiescence.
//!
//! Scores are always from the point of view of the side to move. A side
//! that is checkmated at ply `p` scores `p - CHECKMATE`, so shorter mates
//! rank higher for the winner. Time is only checked between root moves.

use std::time::{Duration, Instant};

use chess_core::Move;
use tracing::{debug, info, trace};

use crate::eval::evaluate;
use crate::movegen::GenMode;
use crate::{EngineConfig, Position};

pub const CHECKMATE: i32 = 32_000;

/// Hard limit on search ply, quiescence included.
pub const MAX_PLY: usize = 64;

const INFINITY: i32 = CHECKMATE + 1;

/// True when `score` reports a forced mate for either side.
pub fn is_mate_score(score: i32) -> bool {
    score.abs() >= CHECKMATE - MAX_PLY as i32
}

/// What the caller allows a search to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Nominal depth in plies.
    pub depth: u32,
    /// Checked only between root moves.
    pub deadline: Option<Instant>,
}

impl SearchLimits {
    pub fn depth(depth: u32) -> Self {
        SearchLimits {
            depth,
            deadline: None,
        }
    }

    pub fn with_move_time(self, move_time: Duration) -> Self {
        SearchLimits {
            deadline: Some(Instant::now() + move_time),
            ..self
        }
    }

    fn expired(deadline: Option<Instant>) -> bool {
        deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Result of a search. `best_move` is `None` only when the root has no
/// legal moves; `score` then tells checkmate from stalemate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

#[derive(Debug, Clone)]
pub struct Searcher {
    nodes: u64,
    quiescence_checks: bool,
}

impl Default for Searcher {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Searcher {
    pub fn new(config: &EngineConfig) -> Self {
        Searcher {
            nodes: 0,
            quiescence_checks: config.quiescence_checks,
        }
    }

    /// Nodes visited by the last search.
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// Searches to a fixed depth.
    pub fn search(&mut self, position: &Position, depth: u32) -> SearchReport {
        self.nodes = 0;
        self.root(position, depth.max(1), None)
            .unwrap_or_else(|| self.no_result(position, depth))
    }

    /// Deepens one ply at a time up to `limits.depth`, keeping the result of
    /// the last iteration that finished before the deadline. The first
    /// iteration always finishes.
    pub fn iterate(&mut self, position: &Position, limits: &SearchLimits) -> SearchReport {
        self.nodes = 0;
        let mut report = match self.root(position, 1, None) {
            Some(report) => report,
            None => return self.no_result(position, 1),
        };
        info!(depth = 1, score = report.score, nodes = report.nodes, "iteration complete");

        for depth in 2..=limits.depth {
            if report.best_move.is_none() || report.score >= CHECKMATE - MAX_PLY as i32 {
                break;
            }
            if SearchLimits::expired(limits.deadline) {
                debug!(depth, "deadline reached before iteration");
                break;
            }
            match self.root(position, depth, limits.deadline) {
                Some(next) => {
                    report = next;
                    info!(
                        depth,
                        score = report.score,
                        nodes = report.nodes,
                        best = %report.best_move.map(|m| m.to_uci()).unwrap_or_default(),
                        "iteration complete"
                    );
                }
                None => {
                    debug!(depth, "iteration abandoned at deadline");
                    break;
                }
            }
        }
        report
    }

    fn no_result(&self, position: &Position, depth: u32) -> SearchReport {
        SearchReport {
            best_move: None,
            score: Self::terminal_score(position, 0),
            depth,
            nodes: self.nodes,
        }
    }

    fn terminal_score(position: &Position, ply: usize) -> i32 {
        if position.is_in_check(position.side_to_move()) {
            ply as i32 - CHECKMATE
        } else {
            0
        }
    }

    /// Returns `None` when the deadline passes before every root move has
    /// been searched.
    fn root(
        &mut self,
        position: &Position,
        depth: u32,
        deadline: Option<Instant>,
    ) -> Option<SearchReport> {
        self.nodes += 1;
        let mut alpha = -INFINITY;
        let mut best_move = None;
        let mut best_score = -INFINITY;

        for (index, mv) in position.moves(GenMode::All).enumerate() {
            if index > 0 && SearchLimits::expired(deadline) {
                return None;
            }
            let child = position.make_move(mv);
            let score = -self.negamax(&child, depth as i32 - 1, 1, -INFINITY, -alpha);
            debug!(%mv, score, depth, "root move searched");

            if score > best_score {
                best_score = score;
                best_move = Some(mv);
                debug!(%mv, score, "new best move");
            }
            if score > alpha {
                alpha = score;
            }
            if score == CHECKMATE - 1 {
                break;
            }
        }

        if best_move.is_none() {
            best_score = Self::terminal_score(position, 0);
        }
        Some(SearchReport {
            best_move,
            score: best_score,
            depth,
            nodes: self.nodes,
        })
    }

    fn negamax(
        &mut self,
        position: &Position,
        depth: i32,
        ply: usize,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        if position.repetition() {
            return 0;
        }
        if depth <= 0 || ply >= MAX_PLY {
            return self.tactical(position, ply, alpha, beta, self.quiescence_checks);
        }

        let mut best = -INFINITY;
        let mut any = false;
        for mv in position.moves(GenMode::All) {
            any = true;
            let child = position.make_move(mv);
            let score = -self.negamax(&child, depth - 1, ply + 1, -beta, -alpha);
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                return best;
            }
        }
        if !any {
            return Self::terminal_score(position, ply);
        }
        best
    }

    /// Continues a line past the nominal depth, choosing the in-check
    /// variant when the side to move cannot stand pat.
    fn tactical(&mut self, position: &Position, ply: usize, alpha: i32, beta: i32, checks: bool) -> i32 {
        if position.is_in_check(position.side_to_move()) {
            self.quiescence_in_check(position, ply, alpha, beta)
        } else {
            self.quiescence(position, ply, alpha, beta, checks)
        }
    }

    fn quiescence(
        &mut self,
        position: &Position,
        ply: usize,
        mut alpha: i32,
        beta: i32,
        checks: bool,
    ) -> i32 {
        self.nodes += 1;
        if position.repetition() {
            return 0;
        }
        let stand_pat = evaluate(position);
        trace!(ply, stand_pat, alpha, beta, "quiescence");
        if ply >= MAX_PLY || stand_pat >= beta {
            return stand_pat;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let modes: &[GenMode] = if checks {
            &[GenMode::Captures, GenMode::Checks]
        } else {
            &[GenMode::Captures]
        };
        let mut best = stand_pat;
        for &mode in modes {
            for mv in position.moves(mode) {
                let child = position.make_move(mv);
                let score = -self.tactical(&child, ply + 1, -beta, -alpha, false);
                if score > best {
                    best = score;
                }
                if score > alpha {
                    alpha = score;
                }
                if alpha >= beta {
                    return best;
                }
            }
        }
        best
    }

    fn quiescence_in_check(
        &mut self,
        position: &Position,
        ply: usize,
        mut alpha: i32,
        beta: i32,
    ) -> i32 {
        self.nodes += 1;
        if position.repetition() {
            return 0;
        }
        if ply >= MAX_PLY {
            return evaluate(position);
        }

        let mut best = ply as i32 - CHECKMATE;
        for mv in position.moves(GenMode::Evasions) {
            let child = position.make_move(mv);
            let score = -self.tactical(&child, ply + 1, -beta, -alpha, false);
            if score > best {
                best = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                return best;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{Color, Square};

    fn position(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    fn play(position: &Position, moves: &[(Square, Square)]) -> Position {
        moves.iter().fold(position.clone(), |p, &(from, to)| {
            p.apply_move(p.new_move(from, to)).unwrap()
        })
    }

    #[test]
    fn finds_back_rank_mate() {
        let p = position("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let report = Searcher::default().search(&p, 2);
        assert_eq!(report.best_move.map(|m| m.to_uci()), Some("a1a8".to_string()));
        assert_eq!(report.score, CHECKMATE - 1);
        assert!(is_mate_score(report.score));
    }

    #[test]
    fn deeper_search_keeps_the_shortest_mate() {
        let p = position("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let report = Searcher::default().search(&p, 4);
        assert_eq!(report.score, CHECKMATE - 1);
        assert_eq!(report.best_move.map(|m| m.to()), Some(Square::A8));
    }

    #[test]
    fn mate_in_two_scores_below_mate_in_one() {
        let p = Position::from_lists("Kh1,Ra6,Rb5", "Kh8", Color::White).unwrap();
        let report = Searcher::default().search(&p, 4);
        assert_eq!(report.score, CHECKMATE - 3);
        assert!(is_mate_score(report.score));

        let mate_in_one = Searcher::default().search(&position("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1"), 4);
        assert!(mate_in_one.score > report.score);
    }

    #[test]
    fn repeated_positions_score_zero() {
        let start = Position::standard();
        let p = play(
            &start,
            &[(Square::G1, Square::F3), (Square::G8, Square::F6), (Square::F3, Square::G1)],
        );
        let child = play(&p, &[(Square::F6, Square::G8)]);
        assert!(child.repetition());
        assert_eq!(child.hash(), start.hash());

        let mut searcher = Searcher::default();
        assert_eq!(searcher.negamax(&child, 3, 1, -INFINITY, INFINITY), 0);
        assert_eq!(searcher.quiescence(&child, 1, -INFINITY, INFINITY, true), 0);
    }

    #[test]
    fn repeated_check_scores_zero() {
        let p = Position::from_lists("Ka1,Rb1", "Kh7", Color::White).unwrap();
        let shuffle = [
            (Square::B1, Square::H1),
            (Square::H7, Square::G7),
            (Square::H1, Square::B1),
            (Square::G7, Square::H7),
            (Square::B1, Square::H1),
        ];
        let child = play(&p, &shuffle);
        assert!(child.is_in_check(Color::Black));
        assert!(child.repetition());

        let mut searcher = Searcher::default();
        assert_eq!(searcher.quiescence_in_check(&child, 5, -INFINITY, INFINITY), 0);
        assert_eq!(searcher.negamax(&child, 0, 5, -INFINITY, INFINITY), 0);
    }

    #[test]
    fn mated_root_has_no_move() {
        let p = position("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        let report = Searcher::default().search(&p, 3);
        assert_eq!(report.best_move, None);
        assert_eq!(report.score, -CHECKMATE);
    }

    #[test]
    fn stalemated_root_scores_zero() {
        let p = position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        let report = Searcher::default().search(&p, 2);
        assert_eq!(report.best_move, None);
        assert_eq!(report.score, 0);
    }

    #[test]
    fn takes_a_hanging_queen() {
        let p = position("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1");
        let report = Searcher::default().search(&p, 1);
        assert_eq!(report.best_move.map(|m| m.to_uci()), Some("d2d5".to_string()));
        assert!(report.score > 0);
    }

    #[test]
    fn quiescence_sees_the_recapture() {
        let p = position("4k3/8/4p3/3p4/8/8/8/3QK3 w - - 0 1");
        let report = Searcher::default().search(&p, 1);
        assert_ne!(report.best_move.map(|m| m.to_uci()), Some("d1d5".to_string()));
    }

    #[test]
    fn wins_the_undefended_queen() {
        let p = position("r1b1k1nr/pppp1ppp/2n5/2b1p3/2B1P2q/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 1");
        let report = Searcher::default().search(&p, 2);
        assert_eq!(report.best_move.map(|m| m.to()), Some(Square::H4));
        assert!(report.score > 500);
        assert!(!is_mate_score(report.score));
    }

    #[test]
    fn iterate_stops_on_mate() {
        let p = position("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
        let report = Searcher::default().iterate(&p, &SearchLimits::depth(6));
        assert_eq!(report.depth, 1);
        assert_eq!(report.score, CHECKMATE - 1);
    }

    #[test]
    fn iterate_finishes_the_first_depth_after_the_deadline() {
        let limits = SearchLimits {
            depth: 5,
            deadline: Some(Instant::now()),
        };
        let mut searcher = Searcher::default();
        let report = searcher.iterate(&Position::standard(), &limits);
        assert_eq!(report.depth, 1);
        assert!(report.best_move.is_some());
        assert!(searcher.nodes() > 20);
    }

    #[test]
    fn root_gives_up_between_moves_after_the_deadline() {
        let mut searcher = Searcher::default();
        let p = Position::standard();
        assert_eq!(searcher.root(&p, 2, Some(Instant::now())), None);
        assert!(searcher.root(&p, 1, None).is_some());
    }

    #[test]
    fn iterate_abandons_a_deep_iteration() {
        let limits = SearchLimits::depth(MAX_PLY as u32).with_move_time(Duration::from_millis(50));
        let report = Searcher::default().iterate(&Position::standard(), &limits);
        assert!(report.depth >= 1);
        assert!(report.depth < MAX_PLY as u32);
        assert!(report.best_move.is_some());
    }

    #[test]
    fn iterate_reaches_the_requested_depth() {
        let report = Searcher::default().iterate(&Position::standard(), &SearchLimits::depth(3));
        assert_eq!(report.depth, 3);
        assert!(report.best_move.is_some());
    }

    #[test]
    fn quiescence_checks_follow_the_config() {
        let config = EngineConfig {
            quiescence_checks: false,
            ..EngineConfig::default()
        };
        let mut searcher = Searcher::new(&config);
        assert!(!searcher.quiescence_checks);
        assert!(Searcher::default().quiescence_checks);

        let p = Position::from_lists("Kg1,Ra1", "Kg8,f7,g7,h7", Color::White).unwrap();
        let report = searcher.search(&p, 1);
        assert_eq!(report.score, CHECKMATE - 1);
    }

    #[test]
    fn mate_scores_are_recognised() {
        assert!(is_mate_score(CHECKMATE - 1));
        assert!(is_mate_score(3 - CHECKMATE));
        assert!(!is_mate_score(900));
        assert!(!is_mate_score(0));
    }
}
