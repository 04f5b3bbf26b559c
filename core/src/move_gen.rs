use crate::game_state::{GameState, DIAGONALS, STRAIGHTS};
use crate::types::{Color, File, Move, PieceType, Square};

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// Generates all legal moves for the side to move.
pub fn generate_legal_moves(state: &GameState) -> Vec<Move> {
    let mut moves = generate_pseudo_legal_moves(state);
    moves.retain(|&mv| !state.apply_move(mv).is_side_in_check(state.turn));
    moves
}

/// Generates moves that obey piece movement but may leave the king in check.
fn generate_pseudo_legal_moves(state: &GameState) -> Vec<Move> {
    let mut moves = Vec::with_capacity(64);
    let color = state.turn;

    for (from, piece) in state.board.pieces_of(color) {
        match piece.piece_type {
            PieceType::Pawn => generate_pawn_moves(state, from, color, &mut moves),
            PieceType::Knight => generate_steps(state, from, color, &KNIGHT_JUMPS, &mut moves),
            PieceType::Bishop => generate_slides(state, from, color, &DIAGONALS, &mut moves),
            PieceType::Rook => generate_slides(state, from, color, &STRAIGHTS, &mut moves),
            PieceType::Queen => {
                generate_slides(state, from, color, &DIAGONALS, &mut moves);
                generate_slides(state, from, color, &STRAIGHTS, &mut moves);
            }
            PieceType::King => {
                generate_steps(state, from, color, &DIAGONALS, &mut moves);
                generate_steps(state, from, color, &STRAIGHTS, &mut moves);
            }
        }
    }
    generate_castling_moves(state, color, &mut moves);

    moves
}

/// Pushes a pawn move, expanding it into the four promotions on the last rank.
fn push_pawn_move(from: Square, to: Square, color: Color, moves: &mut Vec<Move>) {
    if to.rank() == color.promotion_rank() {
        moves.extend(
            PieceType::PROMOTIONS
                .iter()
                .map(|&p| Move::new_promotion(from, to, p)),
        );
    } else {
        moves.push(Move::new(from, to));
    }
}

fn generate_pawn_moves(state: &GameState, from: Square, color: Color, moves: &mut Vec<Move>) {
    let board = &state.board;
    let dir = color.pawn_direction();

    if let Some(one) = from.offset(0, dir).filter(|&sq| board.is_empty(sq)) {
        push_pawn_move(from, one, color, moves);

        if from.rank() == color.pawn_rank() {
            if let Some(two) = one.offset(0, dir).filter(|&sq| board.is_empty(sq)) {
                moves.push(Move::new(from, two));
            }
        }
    }

    for df in [-1, 1] {
        let Some(target) = from.offset(df, dir) else {
            continue;
        };
        if board.is_enemy(target, color) {
            push_pawn_move(from, target, color, moves);
        } else if Some(target) == state.en_passant {
            moves.push(Move::new(from, target));
        }
    }
}

/// Single-step movers: knights and the king.
fn generate_steps(
    state: &GameState,
    from: Square,
    color: Color,
    deltas: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in deltas {
        if let Some(to) = from.offset(df, dr) {
            if !state.board.is_color(to, color) {
                moves.push(Move::new(from, to));
            }
        }
    }
}

/// Sliders: walk each ray until the edge or the first piece.
fn generate_slides(
    state: &GameState,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    moves: &mut Vec<Move>,
) {
    for &(df, dr) in directions {
        let mut current = from.offset(df, dr);
        while let Some(to) = current {
            if state.board.is_empty(to) {
                moves.push(Move::new(from, to));
                current = to.offset(df, dr);
            } else {
                if state.board.is_enemy(to, color) {
                    moves.push(Move::new(from, to));
                }
                break;
            }
        }
    }
}

fn generate_castling_moves(state: &GameState, color: Color, moves: &mut Vec<Move>) {
    let rights = state.castling.get(color);
    if !rights.any() {
        return;
    }

    let rank = color.back_rank();
    let at = |file: File| Square::new(file, rank);
    let king_from = at(File::E);
    let (b, c, d, f, g) = (at(File::B), at(File::C), at(File::D), at(File::F), at(File::G));

    let board = &state.board;
    let own = |sq: Square, piece_type: PieceType| {
        board
            .piece_at(sq)
            .is_some_and(|p| p.color == color && p.piece_type == piece_type)
    };
    let enemy = color.opponent();

    if !own(king_from, PieceType::King) || state.is_attacked_by(king_from, enemy) {
        return;
    }

    if rights.kingside
        && own(at(File::H), PieceType::Rook)
        && board.is_empty(f)
        && board.is_empty(g)
        && !state.is_attacked_by(f, enemy)
        && !state.is_attacked_by(g, enemy)
    {
        moves.push(Move::new(king_from, g));
    }

    if rights.queenside
        && own(at(File::A), PieceType::Rook)
        && board.is_empty(b)
        && board.is_empty(c)
        && board.is_empty(d)
        && !state.is_attacked_by(c, enemy)
        && !state.is_attacked_by(d, enemy)
    {
        moves.push(Move::new(king_from, c));
    }
}

/// Checks if the current position is checkmate.
pub fn is_checkmate(state: &GameState) -> bool {
    state.is_in_check() && generate_legal_moves(state).is_empty()
}

/// Checks if the current position is stalemate.
pub fn is_stalemate(state: &GameState) -> bool {
    !state.is_in_check() && generate_legal_moves(state).is_empty()
}
