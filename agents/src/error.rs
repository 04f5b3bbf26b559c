use chess_core::{Color, GameOutcome, IllegalMoveError};
use std::time::Duration;
use thiserror::Error;

/// Why an agent could not produce a decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("authentication failed")]
    Authentication,
    #[error("rate limited by the backend")]
    RateLimited,
    #[error("unreadable reply: {0}")]
    Malformed(String),
    #[error("agent found no move: {reason}")]
    NoMove { reason: String },
    #[error("request limit of {limit} reached")]
    UsageLimit { limit: u32 },
}

impl AgentFailure {
    /// Whether asking again has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            AgentFailure::Transport(_)
            | AgentFailure::Timeout(_)
            | AgentFailure::RateLimited
            | AgentFailure::Malformed(_) => true,
            AgentFailure::Api { status, .. } => *status >= 500,
            AgentFailure::Authentication
            | AgentFailure::NoMove { .. }
            | AgentFailure::UsageLimit { .. } => false,
        }
    }
}

/// An agent answered with a move outside the legal set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{agent} chose '{mv}', which is not one of the {} legal moves", legal.len())]
pub struct InvalidMoveError {
    pub agent: String,
    pub mv: String,
    pub legal: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TurnError {
    #[error(transparent)]
    InvalidMove(#[from] InvalidMoveError),
    #[error("{agent} ({color}): {source}")]
    Agent {
        agent: String,
        color: Color,
        #[source]
        source: AgentFailure,
    },
    #[error("rules engine rejected a validated move: {0}")]
    Illegal(#[from] IllegalMoveError),
    #[error("game is already over: {0}")]
    GameOver(GameOutcome),
}

impl TurnError {
    /// Errors that end the match without a forfeit.
    pub fn is_fatal(&self) -> bool {
        match self {
            TurnError::InvalidMove(_) | TurnError::GameOver(_) => false,
            TurnError::Agent { source, .. } => !matches!(source, AgentFailure::NoMove { .. }),
            TurnError::Illegal(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_failures() {
        assert!(AgentFailure::Transport("reset".into()).is_retryable());
        assert!(AgentFailure::Timeout(Duration::from_secs(5)).is_retryable());
        assert!(AgentFailure::RateLimited.is_retryable());
        assert!(AgentFailure::Malformed("{".into()).is_retryable());
        assert!(AgentFailure::Api {
            status: 503,
            message: String::new()
        }
        .is_retryable());

        assert!(!AgentFailure::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
        assert!(!AgentFailure::Authentication.is_retryable());
        assert!(!AgentFailure::NoMove {
            reason: "resign".into()
        }
        .is_retryable());
        assert!(!AgentFailure::UsageLimit { limit: 100 }.is_retryable());
    }

    #[test]
    fn test_invalid_move_message() {
        let err = InvalidMoveError {
            agent: "White".into(),
            mv: "e2e5".into(),
            legal: vec!["e2e4".into(), "d2d4".into()],
        };
        assert_eq!(
            err.to_string(),
            "White chose 'e2e5', which is not one of the 2 legal moves"
        );
        assert!(!TurnError::from(err).is_fatal());
    }

    #[test]
    fn test_no_move_is_not_fatal() {
        let err = TurnError::Agent {
            agent: "Black".into(),
            color: Color::Black,
            source: AgentFailure::NoMove {
                reason: "lost".into(),
            },
        };
        assert!(!err.is_fatal());
        let err = TurnError::Agent {
            agent: "Black".into(),
            color: Color::Black,
            source: AgentFailure::Authentication,
        };
        assert!(err.is_fatal());
    }
}
