use crate::{Agent, AgentDecision, AgentFailure, DecisionRequest};
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;

/// Plays a uniformly random legal move. Stands in for an LLM offline and
/// substitutes for one whose backend keeps failing.
pub struct RandomAgent {
    name: String,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new() -> Self {
        Self::with_rng("Random", StdRng::from_entropy())
    }

    /// Reproducible move choices for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng("Random", StdRng::seed_from_u64(seed))
    }

    fn with_rng(name: &str, rng: StdRng) -> Self {
        RandomAgent {
            name: name.to_string(),
            rng,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<AgentDecision, AgentFailure> {
        let count = request.legal_moves.len();
        let mv = request
            .legal_moves
            .iter()
            .choose(&mut self.rng)
            .ok_or_else(|| AgentFailure::NoMove {
                reason: "no legal moves".to_string(),
            })?;

        Ok(AgentDecision::new(
            mv.to_string(),
            format!("Picked at random from {count} legal moves."),
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
