//! Mailbox board: one slot per square, indexed by `Square::index()`.

use crate::types::*;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Board {
    squares: [Option<Piece>; 64],
}

impl Board {
    /// Creates an empty board.
    pub const fn empty() -> Self {
        Self {
            squares: [None; 64],
        }
    }

    /// Creates the standard starting position.
    pub fn starting_position() -> Self {
        const BACK_RANK: [PieceType; 8] = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];

        let mut board = Self::empty();
        for color in Color::ALL {
            let pawn_rank = color.pawn_rank();
            let back_rank = color.back_rank();
            for (index, piece_type) in BACK_RANK.into_iter().enumerate() {
                if let Some(file) = File::new(index as u8) {
                    board.set_piece(
                        Square::new(file, back_rank),
                        Some(Piece::new(piece_type, color)),
                    );
                    board.set_piece(
                        Square::new(file, pawn_rank),
                        Some(Piece::new(PieceType::Pawn, color)),
                    );
                }
            }
        }
        board
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index() as usize]
    }

    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index() as usize] = piece;
    }

    /// Moves whatever stands on `from` to `to`, returning the captured piece.
    pub fn move_piece(&mut self, from: Square, to: Square) -> Option<Piece> {
        let piece = self.squares[from.index() as usize].take();
        std::mem::replace(&mut self.squares[to.index() as usize], piece)
    }

    pub fn is_empty(&self, square: Square) -> bool {
        self.piece_at(square).is_none()
    }

    pub fn is_color(&self, square: Square, color: Color) -> bool {
        self.piece_at(square).is_some_and(|p| p.color == color)
    }

    pub fn is_enemy(&self, square: Square, color: Color) -> bool {
        self.is_color(square, color.opponent())
    }

    /// Finds the king of the given color. `None` only for hand-built boards.
    pub fn king_square(&self, color: Color) -> Option<Square> {
        let king = Piece::new(PieceType::King, color);
        Square::all().find(|&sq| self.piece_at(sq) == Some(king))
    }

    /// Iterates the occupied squares holding pieces of `color`.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| match self.piece_at(sq) {
            Some(piece) if piece.color == color => Some((sq, piece)),
            _ => None,
        })
    }

    /// Counts pieces of one type and color.
    pub fn count(&self, piece_type: PieceType, color: Color) -> usize {
        self.pieces_of(color)
            .filter(|(_, p)| p.piece_type == piece_type)
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::starting_position()
    }
}

/// Plain-text diagram, rank 8 at the top, `.` for empty squares.
impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank_idx in (0..8).rev() {
            let Some(rank) = Rank::new(rank_idx) else {
                continue;
            };
            write!(f, "{} ", rank.to_char())?;
            for file_idx in 0..8 {
                let Some(file) = File::new(file_idx) else {
                    continue;
                };
                let c = self
                    .piece_at(Square::new(file, rank))
                    .map_or('.', Piece::to_fen_char);
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}
