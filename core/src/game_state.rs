//! Complete game state: board, side to move, castling, en passant and clocks.

use crate::board::Board;
use crate::types::*;

const KNIGHT_DELTAS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

const KING_DELTAS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

pub(crate) const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
pub(crate) const STRAIGHTS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// State of a chess game, matching the six FEN fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameState {
    pub board: Board,
    pub turn: Color,
    pub castling: CastlingRights,
    /// Square a pawn skipped over on the previous move
    pub en_passant: Option<Square>,
    /// Half-moves since the last capture or pawn move
    pub halfmove_clock: u16,
    /// Incremented after Black's move
    pub fullmove_number: u16,
}

impl GameState {
    /// Creates a new game in the starting position.
    pub fn new() -> Self {
        Self {
            board: Board::starting_position(),
            turn: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Creates an empty game state for testing.
    pub fn empty() -> Self {
        Self {
            board: Board::empty(),
            turn: Color::White,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    pub fn side_to_move(&self) -> Color {
        self.turn
    }

    /// Returns true once a hundred half-moves passed without a capture or pawn move.
    pub fn is_fifty_move_draw(&self) -> bool {
        self.halfmove_clock >= 100
    }

    /// Returns true if neither side can possibly deliver mate.
    pub fn is_insufficient_material(&self) -> bool {
        let white = MaterialCount::of(&self.board, Color::White);
        let black = MaterialCount::of(&self.board, Color::Black);

        if white.has_mating_material() || black.has_mating_material() {
            return false;
        }

        match (white.minors(), black.minors()) {
            (0, 0) | (1, 0) | (0, 1) => true,
            // K+N+N vs K cannot force mate
            (2, 0) => white.knights == 2,
            (0, 2) => black.knights == 2,
            // Lone bishops on the same square color
            (1, 1) if white.bishops == 1 && black.bishops == 1 => {
                let mut shades = self
                    .board
                    .pieces_of(Color::White)
                    .chain(self.board.pieces_of(Color::Black))
                    .filter(|(_, p)| p.piece_type == PieceType::Bishop)
                    .map(|(sq, _)| sq.is_light());
                shades.next() == shades.next()
            }
            _ => false,
        }
    }

    /// Applies a move, returning the successor state.
    /// The move is assumed pseudo-legal; legality is checked by the caller.
    pub fn apply_move(&self, mv: Move) -> Self {
        let mut next = self.clone();
        let Some(piece) = self.board.piece_at(mv.from) else {
            debug_assert!(false, "no piece on {}", mv.from);
            return next;
        };

        next.en_passant = None;

        if mv.is_castle(piece) {
            let rank = mv.from.rank();
            let (rook_from, rook_to) = if mv.to.file() > mv.from.file() {
                (File::H, File::F)
            } else {
                (File::A, File::D)
            };
            next.board.move_piece(mv.from, mv.to);
            next.board
                .move_piece(Square::new(rook_from, rank), Square::new(rook_to, rank));
            next.halfmove_clock = next.halfmove_clock.saturating_add(1);
        } else {
            let mut captured = next.board.move_piece(mv.from, mv.to);

            if piece.piece_type == PieceType::Pawn {
                if Some(mv.to) == self.en_passant && captured.is_none() {
                    let victim = Square::new(mv.to.file(), mv.from.rank());
                    captured = next.board.piece_at(victim);
                    next.board.set_piece(victim, None);
                }

                if let Some(promotion) = mv.promotion {
                    next.board
                        .set_piece(mv.to, Some(Piece::new(promotion, piece.color)));
                }

                if mv.from.rank().index().abs_diff(mv.to.rank().index()) == 2 {
                    next.en_passant = mv.from.offset(0, piece.color.pawn_direction());
                }
            }

            if piece.piece_type == PieceType::Pawn || captured.is_some() {
                next.halfmove_clock = 0;
            } else {
                next.halfmove_clock = next.halfmove_clock.saturating_add(1);
            }
        }

        next.castling = self.castling.update_after_move(mv.from, mv.to);
        if self.turn == Color::Black {
            next.fullmove_number = next.fullmove_number.saturating_add(1);
        }
        next.turn = self.turn.opponent();
        next
    }

    /// Returns true if `square` is attacked by any piece of `attacker`.
    pub fn is_attacked_by(&self, square: Square, attacker: Color) -> bool {
        let has = |sq: Option<Square>, types: &[PieceType]| {
            sq.and_then(|s| self.board.piece_at(s))
                .is_some_and(|p| p.color == attacker && types.contains(&p.piece_type))
        };

        // Pawns attack toward the defender, so look back along their direction.
        let back = -attacker.pawn_direction();
        if has(square.offset(-1, back), &[PieceType::Pawn])
            || has(square.offset(1, back), &[PieceType::Pawn])
        {
            return true;
        }

        if KNIGHT_DELTAS
            .iter()
            .any(|&(df, dr)| has(square.offset(df, dr), &[PieceType::Knight]))
        {
            return true;
        }

        if KING_DELTAS
            .iter()
            .any(|&(df, dr)| has(square.offset(df, dr), &[PieceType::King]))
        {
            return true;
        }

        let diagonal = [PieceType::Bishop, PieceType::Queen];
        let straight = [PieceType::Rook, PieceType::Queen];
        DIAGONALS
            .iter()
            .any(|&dir| has(self.first_piece_along(square, dir), &diagonal))
            || STRAIGHTS
                .iter()
                .any(|&dir| has(self.first_piece_along(square, dir), &straight))
    }

    /// Walks from `square` in direction `(df, dr)` and returns the first occupied square.
    fn first_piece_along(&self, square: Square, (df, dr): (i8, i8)) -> Option<Square> {
        let mut current = square.offset(df, dr);
        while let Some(sq) = current {
            if !self.board.is_empty(sq) {
                return Some(sq);
            }
            current = sq.offset(df, dr);
        }
        None
    }

    /// Returns true if the side to move is in check.
    pub fn is_in_check(&self) -> bool {
        self.is_side_in_check(self.turn)
    }

    /// Returns true if the given side's king is attacked.
    pub fn is_side_in_check(&self, color: Color) -> bool {
        self.board
            .king_square(color)
            .is_some_and(|king| self.is_attacked_by(king, color.opponent()))
    }
}

#[derive(Default, Debug)]
struct MaterialCount {
    pawns: u8,
    knights: u8,
    bishops: u8,
    rooks: u8,
    queens: u8,
}

impl MaterialCount {
    fn of(board: &Board, color: Color) -> Self {
        let mut count = MaterialCount::default();
        for (_, piece) in board.pieces_of(color) {
            match piece.piece_type {
                PieceType::Pawn => count.pawns += 1,
                PieceType::Knight => count.knights += 1,
                PieceType::Bishop => count.bishops += 1,
                PieceType::Rook => count.rooks += 1,
                PieceType::Queen => count.queens += 1,
                PieceType::King => {}
            }
        }
        count
    }

    fn has_mating_material(&self) -> bool {
        self.pawns > 0 || self.rooks > 0 || self.queens > 0
    }

    fn minors(&self) -> u8 {
        self.knights + self.bishops
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn place(state: &mut GameState, name: &str, piece_type: PieceType, color: Color) {
        state
            .board
            .set_piece(sq(name), Some(Piece::new(piece_type, color)));
    }

    #[test]
    fn test_starting_position() {
        let state = GameState::new();
        assert_eq!(state.turn, Color::White);
        assert_eq!(state.castling, CastlingRights::all());
        assert!(state.en_passant.is_none());
        assert_eq!(state.halfmove_clock, 0);
        assert_eq!(state.fullmove_number, 1);
        assert!(!state.is_in_check());
    }

    #[test]
    fn test_apply_pawn_move() {
        let state = GameState::new();
        let next = state.apply_move(Move::from_uci("e2e4").unwrap());
        assert_eq!(next.turn, Color::Black);
        assert_eq!(next.en_passant, Some(sq("e3")));
        assert_eq!(next.halfmove_clock, 0);
        assert_eq!(next.fullmove_number, 1);

        let next = next.apply_move(Move::from_uci("g8f6").unwrap());
        assert_eq!(next.en_passant, None);
        assert_eq!(next.halfmove_clock, 1);
        assert_eq!(next.fullmove_number, 2);
    }

    #[test]
    fn test_counters_saturate() {
        let state = GameState::from_fen("4k3/8/8/8/8/8/8/R3K3 b - - 65535 65535").unwrap();
        let next = state.apply_move(Move::from_uci("e8d7").unwrap());
        assert_eq!(next.halfmove_clock, u16::MAX);
        assert_eq!(next.fullmove_number, u16::MAX);
    }

    #[test]
    fn test_en_passant_capture_removes_pawn() {
        let mut state = GameState::empty();
        place(&mut state, "e1", PieceType::King, Color::White);
        place(&mut state, "e8", PieceType::King, Color::Black);
        place(&mut state, "e5", PieceType::Pawn, Color::White);
        place(&mut state, "d7", PieceType::Pawn, Color::Black);
        state.turn = Color::Black;

        let state = state.apply_move(Move::from_uci("d7d5").unwrap());
        assert_eq!(state.en_passant, Some(sq("d6")));

        let state = state.apply_move(Move::from_uci("e5d6").unwrap());
        assert!(state.board.is_empty(sq("d5")));
        assert!(state.board.is_color(sq("d6"), Color::White));
    }

    #[test]
    fn test_castling_moves_rook_and_clears_en_passant() {
        let mut state = GameState::empty();
        place(&mut state, "e1", PieceType::King, Color::White);
        place(&mut state, "h1", PieceType::Rook, Color::White);
        place(&mut state, "e8", PieceType::King, Color::Black);
        state.castling.white = SideCastlingRights::both();
        state.en_passant = Some(sq("d6"));

        let next = state.apply_move(Move::from_uci("e1g1").unwrap());
        assert_eq!(
            next.board.piece_at(sq("f1")),
            Some(Piece::new(PieceType::Rook, Color::White))
        );
        assert!(next.board.is_empty(sq("h1")));
        assert!(!next.castling.white.any());
        assert_eq!(next.en_passant, None);
    }

    #[test]
    fn test_is_attacked() {
        let mut state = GameState::empty();
        place(&mut state, "e4", PieceType::Rook, Color::White);

        assert!(state.is_attacked_by(sq("e1"), Color::White));
        assert!(state.is_attacked_by(sq("e8"), Color::White));
        assert!(state.is_attacked_by(sq("a4"), Color::White));
        assert!(state.is_attacked_by(sq("h4"), Color::White));
        assert!(!state.is_attacked_by(sq("d5"), Color::White));

        // Blocked ray
        place(&mut state, "e6", PieceType::Pawn, Color::Black);
        assert!(!state.is_attacked_by(sq("e8"), Color::White));
    }

    #[test]
    fn test_pawn_attack_direction() {
        let mut state = GameState::empty();
        place(&mut state, "d4", PieceType::Pawn, Color::White);
        place(&mut state, "d5", PieceType::Pawn, Color::Black);
        assert!(state.is_attacked_by(sq("e5"), Color::White));
        assert!(!state.is_attacked_by(sq("e3"), Color::White));
        assert!(state.is_attacked_by(sq("c4"), Color::Black));
        assert!(!state.is_attacked_by(sq("c6"), Color::Black));
    }

    #[test]
    fn test_insufficient_material() {
        let mut state = GameState::empty();
        place(&mut state, "e1", PieceType::King, Color::White);
        place(&mut state, "e8", PieceType::King, Color::Black);
        assert!(state.is_insufficient_material());

        place(&mut state, "c1", PieceType::Bishop, Color::White);
        assert!(state.is_insufficient_material());

        // Opposite-colored bishops can still mate in theory
        place(&mut state, "c8", PieceType::Bishop, Color::Black);
        assert!(!state.is_insufficient_material());

        place(&mut state, "a2", PieceType::Pawn, Color::White);
        assert!(!state.is_insufficient_material());
    }
}
