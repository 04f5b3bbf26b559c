//! FEN (Forsyth-Edwards Notation) parsing and serialization.

use crate::board::Board;
use crate::game_state::GameState;
use crate::types::{CastlingRights, Color, File, Piece, PieceType, Rank, Square};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("invalid FEN format: {0}")]
    InvalidFormat(String),
    #[error("invalid piece character: '{0}'")]
    InvalidPiece(char),
    #[error("invalid side to move: {0}")]
    InvalidColor(String),
    #[error("invalid castling rights: {0}")]
    InvalidCastling(String),
    #[error("invalid en passant square: {0}")]
    InvalidEnPassant(String),
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("{0} must have exactly one king")]
    KingCount(Color),
    #[error("pawn on back rank square {0}")]
    PawnOnBackRank(Square),
    #[error("{0} is in check but it is not {0}'s move")]
    OpponentInCheck(Color),
}

impl GameState {
    /// Parses a FEN string into a game state.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let &[placement, turn, castling, en_passant, halfmove, fullmove] = fields.as_slice() else {
            return Err(FenError::InvalidFormat(format!(
                "expected 6 fields, got {}",
                fields.len()
            )));
        };

        let board = parse_board(placement)?;
        for color in Color::ALL {
            if board.count(PieceType::King, color) != 1 {
                return Err(FenError::KingCount(color));
            }
        }
        if let Some(square) = Square::all().find(|&sq| {
            (sq.rank() == Rank::FIRST || sq.rank() == Rank::EIGHTH)
                && board
                    .piece_at(sq)
                    .is_some_and(|p| p.piece_type == PieceType::Pawn)
        }) {
            return Err(FenError::PawnOnBackRank(square));
        }

        let turn = match turn {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidColor(other.to_string())),
        };

        let state = GameState {
            board,
            turn,
            castling: parse_castling(castling)?,
            en_passant: parse_en_passant(en_passant)?,
            halfmove_clock: halfmove
                .parse()
                .map_err(|_| FenError::InvalidNumber(halfmove.to_string()))?,
            fullmove_number: fullmove
                .parse()
                .map_err(|_| FenError::InvalidNumber(fullmove.to_string()))?,
        };

        // The side that just moved may not have left its king attacked.
        if state.is_side_in_check(turn.opponent()) {
            return Err(FenError::OpponentInCheck(turn.opponent()));
        }
        Ok(state)
    }

    /// Serializes the state as a FEN string.
    pub fn to_fen(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            board_to_fen(&self.board),
            if self.turn == Color::White { "w" } else { "b" },
            castling_to_fen(self.castling),
            self.en_passant
                .map_or_else(|| "-".to_string(), |sq| sq.to_string()),
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

/// Parses the piece-placement field, rank 8 first.
fn parse_board(placement: &str) -> Result<Board, FenError> {
    let mut board = Board::empty();
    let ranks: Vec<&str> = placement.split('/').collect();

    if ranks.len() != 8 {
        return Err(FenError::InvalidFormat(format!(
            "expected 8 ranks, got {}",
            ranks.len()
        )));
    }

    for (row, rank_str) in ranks.iter().enumerate() {
        let rank = Rank::new(7 - row as u8)
            .ok_or_else(|| FenError::InvalidFormat(placement.to_string()))?;
        let mut file_idx = 0u8;

        for ch in rank_str.chars() {
            if let Some(skip) = ch.to_digit(10) {
                if !(1..=8).contains(&skip) {
                    return Err(FenError::InvalidPiece(ch));
                }
                file_idx += skip as u8;
            } else {
                let file = File::new(file_idx).ok_or_else(|| {
                    FenError::InvalidFormat(format!("too many squares in rank {}", 8 - row))
                })?;
                let piece = Piece::from_fen_char(ch).ok_or(FenError::InvalidPiece(ch))?;
                board.set_piece(Square::new(file, rank), Some(piece));
                file_idx += 1;
            }
        }

        if file_idx != 8 {
            return Err(FenError::InvalidFormat(format!(
                "rank {} has {} squares, expected 8",
                8 - row,
                file_idx
            )));
        }
    }

    Ok(board)
}

fn board_to_fen(board: &Board) -> String {
    let mut fen = String::new();

    for rank_idx in (0..8u8).rev() {
        let mut empty = 0;
        for file_idx in 0..8u8 {
            let piece = File::new(file_idx)
                .zip(Rank::new(rank_idx))
                .and_then(|(file, rank)| board.piece_at(Square::new(file, rank)));
            match piece {
                Some(piece) => {
                    if empty > 0 {
                        fen.push_str(&empty.to_string());
                        empty = 0;
                    }
                    fen.push(piece.to_fen_char());
                }
                None => empty += 1,
            }
        }
        if empty > 0 {
            fen.push_str(&empty.to_string());
        }
        if rank_idx > 0 {
            fen.push('/');
        }
    }

    fen
}

fn parse_castling(field: &str) -> Result<CastlingRights, FenError> {
    let mut rights = CastlingRights::none();
    if field == "-" {
        return Ok(rights);
    }

    for ch in field.chars() {
        match ch {
            'K' => rights.white.kingside = true,
            'Q' => rights.white.queenside = true,
            'k' => rights.black.kingside = true,
            'q' => rights.black.queenside = true,
            _ => return Err(FenError::InvalidCastling(field.to_string())),
        }
    }

    Ok(rights)
}

fn castling_to_fen(castling: CastlingRights) -> String {
    let s: String = [
        (castling.white.kingside, 'K'),
        (castling.white.queenside, 'Q'),
        (castling.black.kingside, 'k'),
        (castling.black.queenside, 'q'),
    ]
    .into_iter()
    .filter_map(|(on, c)| on.then_some(c))
    .collect();

    if s.is_empty() {
        "-".to_string()
    } else {
        s
    }
}

fn parse_en_passant(field: &str) -> Result<Option<Square>, FenError> {
    if field == "-" {
        return Ok(None);
    }
    let square: Square = field
        .parse()
        .map_err(|_| FenError::InvalidEnPassant(field.to_string()))?;
    if square.rank() != Rank::THIRD && square.rank() != Rank::SIXTH {
        return Err(FenError::InvalidEnPassant(field.to_string()));
    }
    Ok(Some(square))
}

/// Well-known positions.
pub mod positions {
    pub const STARTING: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Kiwipete: castling, pins and en passant all in one position.
    pub const KIWIPETE: &str =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    pub const AFTER_E4_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

    /// Fool's mate: White is checkmated.
    pub const FOOLS_MATE: &str = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";

    /// Black to move and stalemated.
    pub const STALEMATE: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_starting_position() {
        let state = GameState::from_fen(positions::STARTING).unwrap();
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_round_trip() {
        for fen in [
            positions::STARTING,
            positions::KIWIPETE,
            positions::AFTER_E4_E5,
            positions::STALEMATE,
        ] {
            assert_eq!(GameState::from_fen(fen).unwrap().to_fen(), fen);
        }
    }

    #[test]
    fn test_parse_kiwipete() {
        let state = GameState::from_fen(positions::KIWIPETE).unwrap();
        let piece = state.board.piece_at("e1".parse().unwrap()).unwrap();
        assert_eq!(piece, Piece::new(PieceType::King, Color::White));
        assert_eq!(state.castling, CastlingRights::all());
    }

    #[test]
    fn test_parse_en_passant() {
        let state = GameState::from_fen(positions::AFTER_E4_E5).unwrap();
        assert_eq!(state.en_passant.map(|sq| sq.to_string()), Some("e6".into()));
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            GameState::from_fen("invalid"),
            Err(FenError::InvalidFormat(_))
        ));
        assert!(GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").is_err());
        assert!(matches!(
            GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"),
            Err(FenError::InvalidColor(_))
        ));
        assert!(matches!(
            GameState::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNX w KQkq - 0 1"),
            Err(FenError::InvalidPiece('X'))
        ));
        assert_eq!(
            GameState::from_fen("8/8/8/8/8/8/8/4K3 w - - 0 1"),
            Err(FenError::KingCount(Color::Black))
        );
        assert!(matches!(
            GameState::from_fen("4k3/8/8/8/8/8/8/4K3 w - e4 0 1"),
            Err(FenError::InvalidEnPassant(_))
        ));
    }

    #[test]
    fn test_reject_unreachable_positions() {
        // White to move with the black king already attacked by e1.
        assert_eq!(
            GameState::from_fen("4k3/8/8/8/8/8/8/4RK2 w - - 0 1"),
            Err(FenError::OpponentInCheck(Color::Black))
        );
        assert_eq!(
            GameState::from_fen("4k3/8/8/8/8/8/8/P3K3 w - - 0 1"),
            Err(FenError::PawnOnBackRank("a1".parse().unwrap()))
        );
        assert_eq!(
            GameState::from_fen("3pk3/8/8/8/8/8/8/4K3 b - - 0 1"),
            Err(FenError::PawnOnBackRank("d8".parse().unwrap()))
        );

        // Being in check on your own move is fine.
        let state = GameState::from_fen("4k3/8/8/8/8/8/8/4RK2 b - - 0 1").unwrap();
        assert!(state.is_in_check());
    }
}
