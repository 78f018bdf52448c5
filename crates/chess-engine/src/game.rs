//! Game controller: two engine players, the current position and the result.
//!
//! [`Game`] asks the [`Searcher`] for moves on behalf of the side to move,
//! applies them and decides when the game is over.

use std::time::Duration;

use chess_core::{Color, Move, Placement};
use thiserror::Error;
use tracing::{debug, info};

use crate::search::{SearchLimits, SearchReport, Searcher};
use crate::{EngineConfig, EngineError, MoveList, Position};

/// Result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw(DrawReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    /// No legal moves and not in check.
    Stalemate,
    /// The same position for the third time since the last irreversible move.
    ThreefoldRepetition,
    /// 100 half-moves without a pawn move or capture.
    FiftyMoveRule,
    /// Neither side can force mate.
    InsufficientMaterial,
}

impl GameResult {
    /// The result when `color` has been checkmated.
    fn mated(color: Color) -> Self {
        match color {
            Color::White => GameResult::BlackWins,
            Color::Black => GameResult::WhiteWins,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("illegal move: {0}")]
    IllegalMove(String),
    #[error("game has already ended")]
    GameAlreadyOver,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Engine settings for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub color: Color,
    pub depth: u32,
    pub move_time: Option<Duration>,
}

impl Player {
    pub fn new(color: Color, config: &EngineConfig) -> Self {
        Player {
            color,
            depth: config.depth,
            move_time: config.move_time(),
        }
    }

    /// Limits for a search starting now.
    pub fn limits(&self) -> SearchLimits {
        let limits = SearchLimits::depth(self.depth);
        match self.move_time {
            Some(budget) => limits.with_move_time(budget),
            None => limits,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    players: [Player; 2],
    config: EngineConfig,
    position: Position,
    moves: Vec<Move>,
    result: Option<GameResult>,
}

impl Game {
    pub fn new(placement: &Placement, config: &EngineConfig) -> Self {
        let mut game = Game {
            players: [
                Player::new(Color::White, config),
                Player::new(Color::Black, config),
            ],
            config: config.clone(),
            position: Position::new(placement),
            moves: Vec::new(),
            result: None,
        };
        game.update_result();
        game
    }

    /// A game from the standard starting position.
    pub fn standard(config: &EngineConfig) -> Self {
        Self::new(&Placement::standard(), config)
    }

    pub fn from_fen(fen: &str, config: &EngineConfig) -> Result<Self, GameError> {
        let placement = Placement::from_fen(fen).map_err(EngineError::from)?;
        Ok(Self::new(&placement, config))
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn player(&self, color: Color) -> &Player {
        &self.players[color.index()]
    }

    /// Replaces the settings of `player.color`.
    pub fn set_player(&mut self, player: Player) {
        self.players[player.color.index()] = player;
    }

    pub fn legal_moves(&self) -> MoveList {
        self.position.legal_moves()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn is_over(&self) -> bool {
        self.result.is_some()
    }

    /// Moves played so far.
    pub fn history(&self) -> &[Move] {
        &self.moves
    }

    pub fn to_fen(&self) -> String {
        self.position.to_fen()
    }

    /// Searches for the side to move without playing the move.
    pub fn think(&self) -> Result<SearchReport, GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        let player = self.player(self.position.side_to_move());
        let mut searcher = Searcher::new(&self.config);
        let report = match player.move_time {
            Some(_) => searcher.iterate(&self.position, &player.limits()),
            None => searcher.search(&self.position, player.depth),
        };
        debug!(
            color = %player.color,
            best = %report.best_move.map(|m| m.to_uci()).unwrap_or_default(),
            score = report.score,
            nodes = report.nodes,
            "search finished"
        );
        Ok(report)
    }

    pub fn make_move(&mut self, mv: Move) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        let next = self.position.apply_move(mv).map_err(|err| match err {
            EngineError::IllegalMove(mv) => GameError::IllegalMove(mv.to_uci()),
            other => GameError::Engine(other),
        })?;
        self.position = next;
        self.moves.push(mv);
        self.update_result();
        Ok(())
    }

    /// Plays a move given in UCI notation such as `e2e4` or `e7e8q`.
    pub fn make_move_uci(&mut self, uci: &str) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyOver);
        }
        let mv = self
            .legal_moves()
            .iter()
            .copied()
            .find(|mv| mv.to_uci() == uci)
            .ok_or_else(|| GameError::IllegalMove(uci.to_string()))?;
        self.make_move(mv)
    }

    /// Lets the side to move search and play. Returns the move played, or
    /// `None` when there was nothing to play.
    pub fn step(&mut self) -> Result<Option<Move>, GameError> {
        let report = self.think()?;
        match report.best_move {
            Some(mv) => {
                self.make_move(mv)?;
                Ok(Some(mv))
            }
            None => {
                self.update_result();
                Ok(None)
            }
        }
    }

    /// Plays up to `max_plies` moves or until the game ends.
    pub fn play(&mut self, max_plies: usize) -> Result<Option<GameResult>, GameError> {
        for _ in 0..max_plies {
            if self.is_over() || self.step()?.is_none() {
                break;
            }
        }
        Ok(self.result)
    }

    fn update_result(&mut self) {
        let position = &self.position;
        let side = position.side_to_move();
        let result = if position.moves(crate::GenMode::All).next().is_none() {
            if position.is_in_check(side) {
                Some(GameResult::mated(side))
            } else {
                Some(GameResult::Draw(DrawReason::Stalemate))
            }
        } else if position.third_repetition() {
            Some(GameResult::Draw(DrawReason::ThreefoldRepetition))
        } else if position.halfmove_clock() >= 100 {
            Some(GameResult::Draw(DrawReason::FiftyMoveRule))
        } else if position.insufficient_material() {
            Some(GameResult::Draw(DrawReason::InsufficientMaterial))
        } else {
            None
        };
        if let Some(result) = result {
            info!(?result, plies = self.moves.len(), fen = %position.to_fen(), "game over");
        }
        self.result = result;
    }
}
