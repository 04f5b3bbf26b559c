//! Leaf counting over the legal move tree, used to check move generation
//! against published node counts.

use crate::game_state::GameState;
use crate::move_gen::generate_legal_moves;

/// Counts the leaf nodes `depth` plies below `state`.
pub fn perft(state: &GameState, depth: u8) -> u64 {
    let moves = generate_legal_moves(state);
    match depth {
        0 => 1,
        1 => moves.len() as u64,
        _ => moves
            .into_iter()
            .map(|mv| perft(&state.apply_move(mv), depth - 1))
            .sum(),
    }
}
