//! Zobrist position keys, used to detect repeated positions.

use crate::game_state::GameState;
use crate::types::{Color, Piece, Square};
use std::sync::LazyLock;

struct ZobristKeys {
    pieces: [[[u64; 64]; 6]; 2],
    black_to_move: u64,
    castling: [u64; 16],
    en_passant_file: [u64; 8],
}

impl ZobristKeys {
    /// Fills every table from a fixed-seed xorshift stream so hashes are
    /// stable between runs.
    fn generate() -> Self {
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        let mut pieces = [[[0u64; 64]; 6]; 2];
        for key in pieces.iter_mut().flatten().flatten() {
            *key = next();
        }
        let black_to_move = next();
        let castling = std::array::from_fn(|_| next());
        let en_passant_file = std::array::from_fn(|_| next());

        Self {
            pieces,
            black_to_move,
            castling,
            en_passant_file,
        }
    }

    fn piece(&self, piece: Piece, square: Square) -> u64 {
        self.pieces[piece.color.index()][piece.piece_type.index()][square.index() as usize]
    }
}

static KEYS: LazyLock<ZobristKeys> = LazyLock::new(ZobristKeys::generate);

impl GameState {
    /// Hash of everything that makes two positions "the same" for the
    /// repetition rule: placement, side to move, castling rights and the
    /// en passant file. The move clocks are excluded.
    pub fn zobrist_hash(&self) -> u64 {
        let keys = &*KEYS;
        let mut hash = Color::ALL
            .into_iter()
            .flat_map(|color| self.board.pieces_of(color))
            .fold(0, |acc, (sq, piece)| acc ^ keys.piece(piece, sq));

        if self.turn == Color::Black {
            hash ^= keys.black_to_move;
        }
        hash ^= keys.castling[self.castling.bits()];
        if let Some(ep) = self.en_passant {
            hash ^= keys.en_passant_file[ep.file().index() as usize];
        }
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen::positions;
    use crate::types::Move;

    fn play(state: &GameState, moves: &[&str]) -> GameState {
        moves.iter().fold(state.clone(), |s, uci| {
            s.apply_move(Move::from_uci(uci).unwrap())
        })
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(GameState::new().zobrist_hash(), GameState::new().zobrist_hash());
        let kiwipete = GameState::from_fen(positions::KIWIPETE).unwrap();
        assert_ne!(kiwipete.zobrist_hash(), GameState::new().zobrist_hash());
    }

    #[test]
    fn test_knight_shuffle_returns_to_same_hash() {
        let start = GameState::new();
        let back = play(&start, &["g1f3", "g8f6", "f3g1", "f6g8"]);
        assert_eq!(back.zobrist_hash(), start.zobrist_hash());
        // Clocks differ but the key ignores them.
        assert_ne!(back.to_fen(), start.to_fen());
    }

    #[test]
    fn test_side_to_move_changes_hash() {
        let white = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let black = GameState::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(white.zobrist_hash(), black.zobrist_hash());
    }

    #[test]
    fn test_castling_rights_change_hash() {
        let all = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let none = GameState::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w - - 0 1").unwrap();
        assert_ne!(all.zobrist_hash(), none.zobrist_hash());
    }
}
