//! Chess rules for the arena: board representation, FEN, legal move
//! generation and the [`Game`] board state provider the agents play against.

pub mod board;
pub mod fen;
pub mod game;
pub mod game_state;
pub mod move_gen;
pub mod outcome;
pub mod perft;
pub mod types;
mod zobrist;

pub use board::Board;
pub use fen::{positions, FenError};
pub use game::{Game, IllegalMoveError, LegalMoveSet, Position};
pub use game_state::GameState;
pub use move_gen::{generate_legal_moves, is_checkmate, is_stalemate};
pub use outcome::{DrawReason, GameOutcome};
pub use perft::perft;
pub use types::*;
