use crate::types::Color;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    InsufficientMaterial,
    FiftyMove,
    ThreefoldRepetition,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DrawReason::InsufficientMaterial => "insufficient material",
            DrawReason::FiftyMove => "fifty-move rule",
            DrawReason::ThreefoldRepetition => "threefold repetition",
        })
    }
}

/// Board-level result of a game, derived from the current position.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameOutcome {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    Draw { reason: DrawReason },
}

impl GameOutcome {
    pub fn is_terminal(self) -> bool {
        self != GameOutcome::Ongoing
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameOutcome::Checkmate { winner } => Some(winner),
            _ => None,
        }
    }

    /// PGN-style result: `1-0`, `0-1`, `1/2-1/2 (reason)` or `*` while ongoing.
    pub fn result_string(self) -> String {
        match self {
            GameOutcome::Ongoing => "*".to_string(),
            GameOutcome::Checkmate {
                winner: Color::White,
            } => "1-0".to_string(),
            GameOutcome::Checkmate {
                winner: Color::Black,
            } => "0-1".to_string(),
            GameOutcome::Stalemate => "1/2-1/2 (stalemate)".to_string(),
            GameOutcome::Draw { reason } => format!("1/2-1/2 ({reason})"),
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameOutcome::Ongoing => write!(f, "game in progress"),
            GameOutcome::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            GameOutcome::Stalemate => write!(f, "stalemate"),
            GameOutcome::Draw { reason } => write!(f, "draw by {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_strings() {
        assert_eq!(GameOutcome::Ongoing.result_string(), "*");
        assert_eq!(
            GameOutcome::Checkmate {
                winner: Color::Black
            }
            .result_string(),
            "0-1"
        );
        assert_eq!(
            GameOutcome::Draw {
                reason: DrawReason::FiftyMove
            }
            .result_string(),
            "1/2-1/2 (fifty-move rule)"
        );
    }

    #[test]
    fn test_terminal_and_winner() {
        assert!(!GameOutcome::Ongoing.is_terminal());
        assert!(GameOutcome::Stalemate.is_terminal());
        assert_eq!(GameOutcome::Stalemate.winner(), None);
        assert_eq!(
            GameOutcome::Checkmate {
                winner: Color::White
            }
            .winner(),
            Some(Color::White)
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(GameOutcome::Checkmate {
            winner: Color::White,
        })
        .unwrap();
        assert_eq!(json["kind"], "checkmate");
        assert_eq!(json["winner"], "white");
    }
}
