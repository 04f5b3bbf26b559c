//! The board state provider: a rules-checked game that hands out immutable
//! position snapshots and accepts moves as UCI strings.

use crate::board::Board;
use crate::fen::FenError;
use crate::game_state::GameState;
use crate::move_gen::generate_legal_moves;
use crate::outcome::{DrawReason, GameOutcome};
use crate::types::{Color, Move};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMoveError {
    #[error("'{0}' is not a UCI move")]
    Unparsable(String),
    #[error("{mv} is not legal in {fen}")]
    NotLegal { mv: String, fen: String },
    #[error("game is already over: {0}")]
    GameOver(GameOutcome),
}

/// The legal moves of one position. Replaced wholesale after every move.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalMoveSet {
    moves: Vec<Move>,
}

impl LegalMoveSet {
    fn of(state: &GameState) -> Self {
        let mut moves = generate_legal_moves(state);
        moves.sort();
        Self { moves }
    }

    /// Looks up a candidate, ignoring case and surrounding whitespace.
    pub fn find(&self, candidate: &str) -> Option<Move> {
        let candidate = candidate.trim().to_ascii_lowercase();
        self.moves
            .iter()
            .copied()
            .find(|mv| mv.to_string() == candidate)
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.find(candidate).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Move> {
        self.moves.iter()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn to_uci_strings(&self) -> Vec<String> {
        self.moves.iter().map(Move::to_string).collect()
    }
}

/// Snapshot of the game after a move, identified by its FEN.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub fen: String,
    pub side_to_move: Color,
    pub last_move: Option<String>,
    pub legal_moves: Vec<String>,
    pub is_check: bool,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
    pub outcome: GameOutcome,
    #[serde(skip)]
    pub board: Board,
}

impl Position {
    /// The piece-placement field of the FEN.
    pub fn placement(&self) -> &str {
        self.fen.split(' ').next().unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct Game {
    state: GameState,
    legal: LegalMoveSet,
    last_move: Option<Move>,
    /// Occurrences of each position since the last irreversible move.
    repetitions: HashMap<u64, u8>,
    outcome: GameOutcome,
}

impl Game {
    pub fn new() -> Self {
        Self::from_state(GameState::new())
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        GameState::from_fen(fen).map(Self::from_state)
    }

    fn from_state(state: GameState) -> Self {
        let mut game = Self {
            legal: LegalMoveSet::of(&state),
            repetitions: HashMap::from([(state.zobrist_hash(), 1)]),
            state,
            last_move: None,
            outcome: GameOutcome::Ongoing,
        };
        game.outcome = game.evaluate_outcome();
        game
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn side_to_move(&self) -> Color {
        self.state.turn
    }

    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    pub fn legal_moves(&self) -> &LegalMoveSet {
        &self.legal
    }

    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    pub fn current_position(&self) -> Position {
        Position {
            fen: self.state.to_fen(),
            side_to_move: self.state.turn,
            last_move: self.last_move.map(|mv| mv.to_string()),
            legal_moves: self.legal.to_uci_strings(),
            is_check: self.state.is_in_check(),
            halfmove_clock: self.state.halfmove_clock,
            fullmove_number: self.state.fullmove_number,
            outcome: self.outcome,
            board: self.state.board.clone(),
        }
    }

    /// Applies a UCI move after checking it against the legal set.
    pub fn apply_move(&mut self, uci: &str) -> Result<Move, IllegalMoveError> {
        if self.outcome.is_terminal() {
            return Err(IllegalMoveError::GameOver(self.outcome));
        }
        let candidate = uci.trim().to_ascii_lowercase();
        Move::from_uci(&candidate).map_err(|_| IllegalMoveError::Unparsable(uci.to_string()))?;
        let mv = self
            .legal
            .find(&candidate)
            .ok_or_else(|| IllegalMoveError::NotLegal {
                mv: candidate.clone(),
                fen: self.state.to_fen(),
            })?;

        self.state = self.state.apply_move(mv);
        if self.state.halfmove_clock == 0 {
            self.repetitions.clear();
        }
        *self
            .repetitions
            .entry(self.state.zobrist_hash())
            .or_default() += 1;
        self.legal = LegalMoveSet::of(&self.state);
        self.last_move = Some(mv);
        self.outcome = self.evaluate_outcome();
        Ok(mv)
    }

    fn evaluate_outcome(&self) -> GameOutcome {
        if self.legal.is_empty() {
            return if self.state.is_in_check() {
                GameOutcome::Checkmate {
                    winner: self.state.turn.opponent(),
                }
            } else {
                GameOutcome::Stalemate
            };
        }

        let reason = if self.state.is_insufficient_material() {
            DrawReason::InsufficientMaterial
        } else if self
            .repetitions
            .get(&self.state.zobrist_hash())
            .is_some_and(|&n| n >= 3)
        {
            DrawReason::ThreefoldRepetition
        } else if self.state.is_fifty_move_draw() {
            DrawReason::FiftyMove
        } else {
            return GameOutcome::Ongoing;
        };
        GameOutcome::Draw { reason }
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::positions;

    #[test]
    fn test_new_game_snapshot() {
        let game = Game::new();
        let position = game.current_position();
        assert_eq!(position.fen, positions::STARTING);
        assert_eq!(position.side_to_move, Color::White);
        assert_eq!(position.legal_moves.len(), 20);
        assert_eq!(position.last_move, None);
        assert_eq!(position.placement(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
        assert!(!position.is_check);
        assert_eq!(game.outcome(), GameOutcome::Ongoing);
    }

    #[test]
    fn test_legal_set_lookup_is_lenient() {
        let game = Game::new();
        let legal = game.legal_moves();
        assert!(legal.contains("e2e4"));
        assert!(legal.contains("  E2E4\n"));
        assert!(!legal.contains("e2e5"));
        assert!(!legal.contains("Nf3"));
    }

    #[test]
    fn test_apply_move_replaces_legal_set() {
        let mut game = Game::new();
        let mv = game.apply_move("e2e4").unwrap();
        assert_eq!(mv.to_string(), "e2e4");
        assert_eq!(game.side_to_move(), Color::Black);
        assert!(game.legal_moves().contains("e7e5"));
        assert!(!game.legal_moves().contains("e2e4"));
        assert_eq!(game.current_position().last_move.as_deref(), Some("e2e4"));
    }

    #[test]
    fn test_illegal_move_rejected_without_change() {
        let mut game = Game::new();
        let before = game.current_position();
        assert!(matches!(
            game.apply_move("e2e5"),
            Err(IllegalMoveError::NotLegal { .. })
        ));
        assert!(matches!(
            game.apply_move("hello"),
            Err(IllegalMoveError::Unparsable(_))
        ));
        assert_eq!(game.current_position(), before);
    }

    #[test]
    fn test_checkmate_detected() {
        let mut game = Game::new();
        for mv in ["f2f3", "e7e5", "g2g4", "d8h4"] {
            game.apply_move(mv).unwrap();
        }
        assert_eq!(
            game.outcome(),
            GameOutcome::Checkmate {
                winner: Color::Black
            }
        );
        assert!(game.legal_moves().is_empty());
        assert!(game.current_position().is_check);
        assert!(matches!(
            game.apply_move("a2a3"),
            Err(IllegalMoveError::GameOver(_))
        ));
    }

    #[test]
    fn test_stalemate_from_fen() {
        let game = Game::from_fen(positions::STALEMATE).unwrap();
        assert_eq!(game.outcome(), GameOutcome::Stalemate);
    }

    #[test]
    fn test_threefold_repetition() {
        let mut game = Game::new();
        let shuffle = ["g1f3", "g8f6", "f3g1", "f6g8"];
        for mv in shuffle {
            game.apply_move(mv).unwrap();
        }
        assert_eq!(game.outcome(), GameOutcome::Ongoing);
        for mv in shuffle {
            game.apply_move(mv).unwrap();
        }
        assert_eq!(
            game.outcome(),
            GameOutcome::Draw {
                reason: DrawReason::ThreefoldRepetition
            }
        );
    }

    #[test]
    fn test_fifty_move_rule() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/R7/4K3 w - - 99 80").unwrap();
        assert_eq!(game.outcome(), GameOutcome::Ongoing);
        game.apply_move("a2a3").unwrap();
        assert_eq!(
            game.outcome(),
            GameOutcome::Draw {
                reason: DrawReason::FiftyMove
            }
        );
    }

    #[test]
    fn test_fullmove_number_saturates() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/8/R3K3 b - - 0 65535").unwrap();
        game.apply_move("e8d7").unwrap();
        let position = game.current_position();
        assert_eq!(position.fullmove_number, u16::MAX);
        assert_eq!(position.side_to_move, Color::White);
    }

    #[test]
    fn test_insufficient_material() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/3r4/4K3 w - - 0 1").unwrap();
        game.apply_move("e1d2").unwrap();
        assert_eq!(
            game.outcome(),
            GameOutcome::Draw {
                reason: DrawReason::InsufficientMaterial
            }
        );
    }
}
