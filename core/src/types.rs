use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Represents one of the two players in chess.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    /// Both colors, White first.
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    /// Returns the opposite color.
    pub const fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Index into per-color tables.
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// Returns the starting rank for pawns of this color.
    pub const fn pawn_rank(self) -> Rank {
        match self {
            Color::White => Rank::SECOND,
            Color::Black => Rank::SEVENTH,
        }
    }

    /// Returns the promotion rank for pawns of this color.
    pub const fn promotion_rank(self) -> Rank {
        match self {
            Color::White => Rank::EIGHTH,
            Color::Black => Rank::FIRST,
        }
    }

    /// Rank the king and rooks start on.
    pub const fn back_rank(self) -> Rank {
        match self {
            Color::White => Rank::FIRST,
            Color::Black => Rank::EIGHTH,
        }
    }

    /// Returns the direction pawns of this color move.
    pub const fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The six types of chess pieces.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceType {
    /// Pieces a pawn may promote to, strongest first.
    pub const PROMOTIONS: [PieceType; 4] = [
        PieceType::Queen,
        PieceType::Rook,
        PieceType::Bishop,
        PieceType::Knight,
    ];

    /// Index into per-piece tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase letter used by FEN and UCI.
    pub const fn to_char(self) -> char {
        match self {
            PieceType::Pawn => 'p',
            PieceType::Knight => 'n',
            PieceType::Bishop => 'b',
            PieceType::Rook => 'r',
            PieceType::Queen => 'q',
            PieceType::King => 'k',
        }
    }

    /// Parses a piece letter, ignoring case.
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(PieceType::Pawn),
            'n' => Some(PieceType::Knight),
            'b' => Some(PieceType::Bishop),
            'r' => Some(PieceType::Rook),
            'q' => Some(PieceType::Queen),
            'k' => Some(PieceType::King),
            _ => None,
        }
    }
}

/// A chess piece with both type and color.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
}

impl Piece {
    /// Creates a new piece with the given type and color.
    pub const fn new(piece_type: PieceType, color: Color) -> Self {
        Self { piece_type, color }
    }

    /// FEN letter: uppercase for White, lowercase for Black.
    pub const fn to_fen_char(self) -> char {
        let c = self.piece_type.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub const fn from_fen_char(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        match PieceType::from_char(c) {
            Some(piece_type) => Some(Piece::new(piece_type, color)),
            None => None,
        }
    }
}

/// A file on the chess board (a-h).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct File(u8);

impl File {
    pub const A: File = File(0);
    pub const B: File = File(1);
    pub const C: File = File(2);
    pub const D: File = File(3);
    pub const E: File = File(4);
    pub const F: File = File(5);
    pub const G: File = File(6);
    pub const H: File = File(7);

    /// Creates a new file from index (0-7).
    pub const fn new(index: u8) -> Option<Self> {
        if index < 8 {
            Some(File(index))
        } else {
            None
        }
    }

    /// Creates a file from a character ('a'-'h').
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'a'..='h' => Some(File(c as u8 - b'a')),
            _ => None,
        }
    }

    pub const fn to_char(self) -> char {
        (b'a' + self.0) as char
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the file `delta` steps away, if it is on the board.
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let f = self.0 as i8 + delta;
        if f >= 0 && f < 8 {
            Some(File(f as u8))
        } else {
            None
        }
    }
}

/// A rank on the chess board (1-8).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Rank(u8);

impl Rank {
    pub const FIRST: Rank = Rank(0);
    pub const SECOND: Rank = Rank(1);
    pub const THIRD: Rank = Rank(2);
    pub const SIXTH: Rank = Rank(5);
    pub const SEVENTH: Rank = Rank(6);
    pub const EIGHTH: Rank = Rank(7);

    /// Creates a new rank from index (0-7).
    pub const fn new(index: u8) -> Option<Self> {
        if index < 8 {
            Some(Rank(index))
        } else {
            None
        }
    }

    /// Creates a rank from a digit ('1'-'8').
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '1'..='8' => Some(Rank(c as u8 - b'1')),
            _ => None,
        }
    }

    pub const fn to_char(self) -> char {
        (b'1' + self.0) as char
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Returns the rank `delta` steps away, if it is on the board.
    pub const fn offset(self, delta: i8) -> Option<Self> {
        let r = self.0 as i8 + delta;
        if r >= 0 && r < 8 {
            Some(Rank(r as u8))
        } else {
            None
        }
    }
}

/// A square on the chess board, a1 = 0 through h8 = 63.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Square(u8);

impl Square {
    pub const fn new(file: File, rank: Rank) -> Self {
        Square(rank.0 * 8 + file.0)
    }

    /// Creates a square from index (0-63).
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 64 {
            Some(Square(index))
        } else {
            None
        }
    }

    pub const fn file(self) -> File {
        File(self.0 % 8)
    }

    pub const fn rank(self) -> Rank {
        Rank(self.0 / 8)
    }

    pub const fn index(self) -> u8 {
        self.0
    }

    /// Steps `df` files and `dr` ranks away, `None` when that leaves the board.
    pub const fn offset(self, df: i8, dr: i8) -> Option<Self> {
        match (self.file().offset(df), self.rank().offset(dr)) {
            (Some(file), Some(rank)) => Some(Square::new(file, rank)),
            _ => None,
        }
    }

    /// True for light squares (h1 is light).
    pub const fn is_light(self) -> bool {
        (self.file().0 + self.rank().0) % 2 == 1
    }

    /// King-move (Chebyshev) distance to another square.
    pub const fn distance(self, other: Square) -> u8 {
        let df = self.file().0.abs_diff(other.file().0);
        let dr = self.rank().0.abs_diff(other.rank().0);
        if df > dr {
            df
        } else {
            dr
        }
    }

    /// Iterates all 64 squares from a1 to h8.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file().to_char(), self.rank().to_char())
    }
}

impl FromStr for Square {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(f), Some(r), None) => match (File::from_char(f), Rank::from_char(r)) {
                (Some(file), Some(rank)) => Ok(Square::new(file, rank)),
                _ => Err(MoveParseError::InvalidSquare(s.to_string())),
            },
            _ => Err(MoveParseError::InvalidSquare(s.to_string())),
        }
    }
}

/// Castling rights for a single side.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SideCastlingRights {
    pub kingside: bool,
    pub queenside: bool,
}

impl SideCastlingRights {
    pub const fn both() -> Self {
        Self {
            kingside: true,
            queenside: true,
        }
    }

    pub const fn none() -> Self {
        Self {
            kingside: false,
            queenside: false,
        }
    }

    pub const fn any(self) -> bool {
        self.kingside || self.queenside
    }
}

/// Complete castling rights for both colors.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct CastlingRights {
    pub white: SideCastlingRights,
    pub black: SideCastlingRights,
}

impl CastlingRights {
    pub const fn all() -> Self {
        Self {
            white: SideCastlingRights::both(),
            black: SideCastlingRights::both(),
        }
    }

    pub const fn none() -> Self {
        Self {
            white: SideCastlingRights::none(),
            black: SideCastlingRights::none(),
        }
    }

    pub const fn get(self, color: Color) -> SideCastlingRights {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Packs the four rights into a 4-bit index (KQkq order).
    pub const fn bits(self) -> usize {
        (self.white.kingside as usize)
            | (self.white.queenside as usize) << 1
            | (self.black.kingside as usize) << 2
            | (self.black.queenside as usize) << 3
    }

    /// Drops the rights a move from `from` to `to` invalidates.
    /// Touching a king or rook home square (by moving or capturing) clears the matching right.
    pub fn update_after_move(self, from: Square, to: Square) -> Self {
        let mut rights = self;
        for square in [from, to] {
            match square.index() {
                0 => rights.white.queenside = false,
                4 => rights.white = SideCastlingRights::none(),
                7 => rights.white.kingside = false,
                56 => rights.black.queenside = false,
                60 => rights.black = SideCastlingRights::none(),
                63 => rights.black.kingside = false,
                _ => {}
            }
        }
        rights
    }
}

/// Errors from parsing squares and UCI moves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid square: {0:?}")]
    InvalidSquare(String),
    #[error("invalid UCI move: {0:?}")]
    InvalidMove(String),
    #[error("invalid promotion piece in {0:?}")]
    InvalidPromotion(String),
}

/// A chess move in from/to form. Castling is the king's two-square move.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub const fn new_promotion(from: Square, to: Square, promotion: PieceType) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }

    /// Parses UCI long algebraic notation (`e2e4`, `e7e8q`).
    pub fn from_uci(uci: &str) -> Result<Self, MoveParseError> {
        if !uci.is_ascii() || !(4..=5).contains(&uci.len()) {
            return Err(MoveParseError::InvalidMove(uci.to_string()));
        }
        let from: Square = uci[0..2]
            .parse()
            .map_err(|_| MoveParseError::InvalidMove(uci.to_string()))?;
        let to: Square = uci[2..4]
            .parse()
            .map_err(|_| MoveParseError::InvalidMove(uci.to_string()))?;

        match uci[4..].chars().next() {
            None => Ok(Move::new(from, to)),
            Some(c) => match PieceType::from_char(c) {
                Some(p) if PieceType::PROMOTIONS.contains(&p) => {
                    Ok(Move::new_promotion(from, to, p))
                }
                _ => Err(MoveParseError::InvalidPromotion(uci.to_string())),
            },
        }
    }

    /// Returns true if this is a castling move based on king movement.
    pub fn is_castle(self, piece: Piece) -> bool {
        piece.piece_type == PieceType::King
            && self.from.rank() == self.to.rank()
            && self.from.file().index().abs_diff(self.to.file().index()) == 2
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion {
            write!(f, "{}", p.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::from_uci(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_opponent() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    #[test]
    fn test_square_creation() {
        let e4 = Square::new(File::from_char('e').unwrap(), Rank::from_char('4').unwrap());
        assert_eq!(e4.index(), 28);
        assert_eq!(e4.to_string(), "e4");
        assert_eq!("e4".parse::<Square>().unwrap(), e4);
        assert!("i9".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
    }

    #[test]
    fn test_square_offset_and_color() {
        let a1: Square = "a1".parse().unwrap();
        assert_eq!(a1.offset(1, 2).unwrap().to_string(), "b3");
        assert!(a1.offset(-1, 0).is_none());
        assert!(!a1.is_light());
        assert!("h1".parse::<Square>().unwrap().is_light());
    }

    #[test]
    fn test_uci_parsing() {
        let mv = Move::from_uci("e2e4").unwrap();
        assert_eq!(mv.from.to_string(), "e2");
        assert_eq!(mv.to.to_string(), "e4");
        assert_eq!(mv.promotion, None);

        let promo = Move::from_uci("e7e8q").unwrap();
        assert_eq!(promo.promotion, Some(PieceType::Queen));
        assert_eq!(promo.to_string(), "e7e8q");

        assert!(Move::from_uci("e7e8k").is_err());
        assert!(Move::from_uci("Nf3").is_err());
        assert!(Move::from_uci("e2e4e5").is_err());
        assert!(Move::from_uci("é2e4").is_err());
    }

    #[test]
    fn test_castling_rights_update() {
        let e1: Square = "e1".parse().unwrap();
        let h8: Square = "h8".parse().unwrap();
        let rights = CastlingRights::all().update_after_move(e1, "e2".parse().unwrap());
        assert!(!rights.white.any());
        assert!(rights.black.kingside);

        // A capture on h8 removes Black's kingside right.
        let rights = CastlingRights::all().update_after_move("b2".parse().unwrap(), h8);
        assert!(!rights.black.kingside);
        assert!(rights.black.queenside);
        assert_eq!(CastlingRights::all().bits(), 0b1111);
    }
}
