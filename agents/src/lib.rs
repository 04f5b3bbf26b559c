//! Agents that choose chess moves and the orchestrator that runs a match
//! between two of them.

pub mod error;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod presenter;
pub mod random;

use chess_core::{Color, LegalMoveSet, Position};
use serde::{Deserialize, Serialize};

pub use error::{AgentFailure, InvalidMoveError, TurnError};
pub use history::{GameHistory, HistoryEntry};
pub use llm::{LlmAgent, LlmConfig, Provider, Usage};
pub use orchestrator::{
    Fallback, FailurePolicy, InvalidMovePolicy, MatchResult, OrchestratorConfig,
    TurnOrchestrator,
};
pub use presenter::Presenter;
pub use random::RandomAgent;

/// A move choice plus the agent's explanation of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDecision {
    #[serde(rename = "move")]
    pub mv: String,
    pub reasoning: String,
}

impl AgentDecision {
    pub fn new(mv: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            mv: mv.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Turn metadata handed to an agent alongside the position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnContext {
    pub color: Color,
    pub move_number: u16,
    pub opponent_last_move: Option<String>,
    /// Set when re-asking after a rejected or unreadable answer.
    pub feedback: Option<String>,
    /// Zero for the first ask of a turn.
    pub attempt: u32,
}

/// Everything an agent sees when asked for a move.
#[derive(Clone, Copy, Debug)]
pub struct DecisionRequest<'a> {
    pub position: &'a Position,
    pub legal_moves: &'a LegalMoveSet,
    pub context: &'a TurnContext,
}

/// Core trait for chess agents
pub trait Agent: Send {
    /// Choose a move for the position in `request`.
    fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<AgentDecision, AgentFailure>;

    /// Get the agent's name
    fn name(&self) -> &str;

    /// Backend usage so far, for agents that call a metered service.
    fn usage(&self) -> Option<Usage> {
        None
    }
}
