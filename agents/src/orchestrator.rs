//! Runs a match: asks the side to move for a decision, checks it against the
//! legal moves, applies it and hands the new position to the presenter.

use crate::history::GameHistory;
use crate::presenter::Presenter;
use crate::random::RandomAgent;
use crate::{
    Agent, AgentDecision, AgentFailure, DecisionRequest, InvalidMoveError, TurnContext,
    TurnError, Usage,
};
use chess_core::{Color, Game, GameOutcome, Position};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// What happens when an agent names a move that is not legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidMovePolicy {
    /// Ask the same agent again, at most `max_retries` times, then forfeit.
    Reprompt { max_retries: u32 },
    Forfeit,
}

impl Default for InvalidMovePolicy {
    fn default() -> Self {
        InvalidMovePolicy::Reprompt { max_retries: 2 }
    }
}

/// Agent used for a turn when the regular agent keeps failing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fallback {
    #[default]
    None,
    Random {
        seed: Option<u64>,
    },
}

/// How backend failures are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Extra attempts for retryable failures within one turn.
    pub max_retries: u32,
    pub fallback: Fallback,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            fallback: Fallback::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub invalid_move: InvalidMovePolicy,
    pub failure: FailurePolicy,
    /// Plies after which the match is cut off. `None` plays to the end.
    pub max_moves: Option<u32>,
    /// Pause after each applied move.
    pub move_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            invalid_move: InvalidMovePolicy::default(),
            failure: FailurePolicy::default(),
            max_moves: Some(50),
            move_delay: Duration::ZERO,
        }
    }
}

/// How a match ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchResult {
    Finished { outcome: GameOutcome },
    Forfeit { loser: Color, reason: String },
    MoveLimit { plies: u32 },
    Stopped,
    Aborted { reason: String },
}

impl MatchResult {
    /// PGN-style result; unfinished matches are `*`.
    pub fn result_string(&self) -> String {
        match self {
            MatchResult::Finished { outcome } => outcome.result_string(),
            MatchResult::Forfeit {
                loser: Color::White,
                ..
            } => "0-1 (White forfeits)".to_string(),
            MatchResult::Forfeit {
                loser: Color::Black,
                ..
            } => "1-0 (Black forfeits)".to_string(),
            MatchResult::MoveLimit { .. } | MatchResult::Stopped | MatchResult::Aborted { .. } => {
                "*".to_string()
            }
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Finished { outcome } => write!(f, "{outcome}"),
            MatchResult::Forfeit { loser, reason } => {
                write!(f, "{loser} forfeits ({reason}), {} wins", loser.opponent())
            }
            MatchResult::MoveLimit { plies } => write!(f, "stopped after the {plies}-ply limit"),
            MatchResult::Stopped => write!(f, "stopped on request"),
            MatchResult::Aborted { reason } => write!(f, "aborted: {reason}"),
        }
    }
}

pub struct TurnOrchestrator {
    game: Game,
    agents: [Box<dyn Agent>; 2],
    fallback: Option<Box<dyn Agent>>,
    history: GameHistory,
    config: OrchestratorConfig,
}

impl TurnOrchestrator {
    pub fn new(white: Box<dyn Agent>, black: Box<dyn Agent>, config: OrchestratorConfig) -> Self {
        Self::with_game(Game::new(), white, black, config)
    }

    /// Starts from an existing game, e.g. one loaded from FEN.
    pub fn with_game(
        game: Game,
        white: Box<dyn Agent>,
        black: Box<dyn Agent>,
        config: OrchestratorConfig,
    ) -> Self {
        let fallback: Option<Box<dyn Agent>> = match config.failure.fallback {
            Fallback::None => None,
            Fallback::Random { seed } => {
                let agent = seed.map_or_else(RandomAgent::new, RandomAgent::seeded);
                Some(Box::new(agent.named("Random (fallback)")))
            }
        };

        Self {
            game,
            agents: [white, black],
            fallback,
            history: GameHistory::new(),
            config,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn history(&self) -> &GameHistory {
        &self.history
    }

    pub fn active_color(&self) -> Color {
        self.game.side_to_move()
    }

    pub fn agent_name(&self, color: Color) -> &str {
        self.agents[color.index()].name()
    }

    /// Usage of every metered agent, White first.
    pub fn usage(&self) -> Vec<(String, Usage)> {
        self.agents
            .iter()
            .filter_map(|agent| agent.usage().map(|usage| (agent.name().to_string(), usage)))
            .collect()
    }

    /// Plays one turn for the side to move.
    pub fn play_turn(&mut self) -> Result<AgentDecision, TurnError> {
        self.take_turn(&mut |_: &TurnError| {})
    }

    /// Plays turns until the game ends, a side forfeits, a fatal error
    /// occurs, the ply limit is reached or `stop` is raised. The stop flag is
    /// only checked between turns.
    pub fn run(&mut self, presenter: &mut dyn Presenter, stop: &AtomicBool) -> MatchResult {
        presenter.render(
            &self.game.current_position(),
            self.history.entries(),
            self.game.outcome(),
        );

        let result = loop {
            let outcome = self.game.outcome();
            if outcome.is_terminal() {
                break MatchResult::Finished { outcome };
            }
            if stop.load(Ordering::Relaxed) {
                break MatchResult::Stopped;
            }
            if let Some(limit) = self.config.max_moves {
                if self.history.len() as u32 >= limit {
                    break MatchResult::MoveLimit { plies: limit };
                }
            }

            let color = self.active_color();
            match self.take_turn(&mut |err: &TurnError| presenter.report(err)) {
                Ok(_) => {
                    presenter.render(
                        &self.game.current_position(),
                        self.history.entries(),
                        self.game.outcome(),
                    );
                    if !self.game.outcome().is_terminal() {
                        self.pause(stop);
                    }
                }
                Err(err) => {
                    presenter.report(&err);
                    break match err {
                        TurnError::InvalidMove(e) => MatchResult::Forfeit {
                            loser: color,
                            reason: e.to_string(),
                        },
                        TurnError::Agent {
                            source: AgentFailure::NoMove { reason },
                            ..
                        } => MatchResult::Forfeit {
                            loser: color,
                            reason,
                        },
                        TurnError::GameOver(outcome) => MatchResult::Finished { outcome },
                        fatal => MatchResult::Aborted {
                            reason: fatal.to_string(),
                        },
                    };
                }
            }
        };

        info!(result = %result, plies = self.history.len(), "match over");
        presenter.finish(&result);
        result
    }

    fn pause(&self, stop: &AtomicBool) {
        const SLICE: Duration = Duration::from_millis(50);
        let deadline = Instant::now() + self.config.move_delay;
        while !stop.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep(SLICE.min(deadline - now));
        }
    }

    fn take_turn(&mut self, report: &mut dyn FnMut(&TurnError)) -> Result<AgentDecision, TurnError> {
        let outcome = self.game.outcome();
        if outcome.is_terminal() {
            return Err(TurnError::GameOver(outcome));
        }

        let color = self.game.side_to_move();
        let position = self.game.current_position();
        let max_reprompts = match self.config.invalid_move {
            InvalidMovePolicy::Reprompt { max_retries } => max_retries,
            InvalidMovePolicy::Forfeit => 0,
        };
        let mut context = TurnContext {
            color,
            move_number: position.fullmove_number,
            opponent_last_move: position.last_move.clone(),
            feedback: None,
            attempt: 0,
        };
        let mut reprompts = 0;

        loop {
            let (agent, decision) = self.request_decision(&position, &mut context, report)?;

            let Some(mv) = self.game.legal_moves().find(&decision.mv) else {
                let invalid = InvalidMoveError {
                    agent,
                    mv: decision.mv,
                    legal: position.legal_moves.clone(),
                };
                if reprompts >= max_reprompts {
                    warn!(color = %color, error = %invalid, "invalid move, forfeiting");
                    return Err(invalid.into());
                }
                reprompts += 1;
                warn!(color = %color, error = %invalid, reprompt = reprompts, "invalid move, asking again");
                context.feedback = Some(format!(
                    "Your previous answer '{}' is not a legal move. Choose exactly one move from this list: {}",
                    invalid.mv,
                    invalid.legal.join(", ")
                ));
                context.attempt += 1;
                report(&TurnError::from(invalid));
                continue;
            };

            let uci = mv.to_string();
            self.game.apply_move(&uci)?;
            let decision = AgentDecision::new(uci, decision.reasoning);
            let entry = self.history.push(
                &agent,
                position,
                decision.clone(),
                self.game.state().to_fen(),
            );
            info!(
                ply = entry.ply,
                color = %color,
                agent = %agent,
                mv = %decision.mv,
                reasoning = %decision.reasoning,
                "move applied"
            );
            return Ok(decision);
        }
    }

    /// Gets a decision from the active agent, retrying retryable failures and
    /// substituting the fallback agent once retries are spent.
    fn request_decision(
        &mut self,
        position: &Position,
        context: &mut TurnContext,
        report: &mut dyn FnMut(&TurnError),
    ) -> Result<(String, AgentDecision), TurnError> {
        let color = context.color;
        let mut failures = 0;

        loop {
            let agent = &mut self.agents[color.index()];
            let request = DecisionRequest {
                position,
                legal_moves: self.game.legal_moves(),
                context,
            };
            let failure = match agent.decide(&request) {
                Ok(decision) => return Ok((agent.name().to_string(), decision)),
                Err(failure) => failure,
            };
            let name = agent.name().to_string();

            if failure.is_retryable() && failures < self.config.failure.max_retries {
                failures += 1;
                warn!(agent = %name, error = %failure, attempt = failures, "agent failed, retrying");
                if matches!(failure, AgentFailure::Malformed(_)) {
                    context.feedback = Some(
                        "Your previous reply could not be read. Answer with a single JSON object: \
                         {\"move\": \"<uci move>\", \"reasoning\": \"<why>\"}."
                            .to_string(),
                    );
                }
                context.attempt += 1;
                report(&TurnError::Agent {
                    agent: name,
                    color,
                    source: failure,
                });
                continue;
            }

            let err = TurnError::Agent {
                agent: name,
                color,
                source: failure,
            };
            let Some(fallback) = self.fallback.as_mut() else {
                error!(error = %err, "agent failed");
                return Err(err);
            };

            warn!(error = %err, substitute = %fallback.name(), "agent failed, substituting for this turn");
            report(&err);
            return match fallback.decide(&request) {
                Ok(decision) => Ok((fallback.name().to_string(), decision)),
                Err(source) => Err(TurnError::Agent {
                    agent: fallback.name().to_string(),
                    color,
                    source,
                }),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryEntry;
    use chess_core::{positions, DrawReason};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Script = Vec<Result<AgentDecision, AgentFailure>>;

    /// Replays canned answers and records what it was asked.
    struct Scripted {
        name: String,
        replies: VecDeque<Result<AgentDecision, AgentFailure>>,
        seen: Arc<Mutex<Vec<TurnContext>>>,
    }

    fn scripted(name: &str, script: Script) -> (Box<dyn Agent>, Arc<Mutex<Vec<TurnContext>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let agent = Scripted {
            name: name.to_string(),
            replies: script.into(),
            seen: Arc::clone(&seen),
        };
        (Box::new(agent), seen)
    }

    impl Agent for Scripted {
        fn decide(&mut self, request: &DecisionRequest<'_>) -> Result<AgentDecision, AgentFailure> {
            self.seen.lock().unwrap().push(request.context.clone());
            self.replies.pop_front().unwrap_or_else(|| {
                Err(AgentFailure::NoMove {
                    reason: "script exhausted".into(),
                })
            })
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn says(mv: &str) -> Result<AgentDecision, AgentFailure> {
        Ok(AgentDecision::new(mv, format!("I like {mv}")))
    }

    #[derive(Default)]
    struct Recorder {
        renders: Vec<(String, usize, GameOutcome)>,
        reports: Vec<TurnError>,
        finished: Option<MatchResult>,
    }

    impl Presenter for Recorder {
        fn render(&mut self, position: &Position, history: &[HistoryEntry], outcome: GameOutcome) {
            self.renders
                .push((position.fen.clone(), history.len(), outcome));
        }

        fn report(&mut self, error: &TurnError) {
            self.reports.push(error.clone());
        }

        fn finish(&mut self, result: &MatchResult) {
            self.finished = Some(result.clone());
        }
    }

    fn config(invalid_move: InvalidMovePolicy) -> OrchestratorConfig {
        OrchestratorConfig {
            invalid_move,
            ..OrchestratorConfig::default()
        }
    }

    #[test]
    fn test_legal_move_applied_and_turn_passes() {
        let (white, _) = scripted("White", vec![says("e2e4")]);
        let (black, black_seen) = scripted("Black", vec![says("e7e5")]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());

        let decision = orchestrator.play_turn().unwrap();
        assert_eq!(decision.mv, "e2e4");
        assert_eq!(orchestrator.history().len(), 1);
        assert_eq!(orchestrator.active_color(), Color::Black);
        assert_eq!(orchestrator.history().entries()[0].agent, "White");

        orchestrator.play_turn().unwrap();
        let seen = black_seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].color, Color::Black);
        assert_eq!(seen[0].opponent_last_move.as_deref(), Some("e2e4"));
        assert_eq!(orchestrator.active_color(), Color::White);
    }

    #[test]
    fn test_decision_is_normalized() {
        let (white, _) = scripted("White", vec![says(" E2E4 ")]);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());

        assert_eq!(orchestrator.play_turn().unwrap().mv, "e2e4");
        assert_eq!(orchestrator.history().entries()[0].decision.mv, "e2e4");
    }

    #[test]
    fn test_invalid_move_reprompts_with_feedback() {
        let (white, white_seen) = scripted("White", vec![says("e2e5"), says("e2e4")]);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator =
            TurnOrchestrator::new(white, black, config(InvalidMovePolicy::default()));

        let decision = orchestrator.play_turn().unwrap();
        assert_eq!(decision.mv, "e2e4");
        assert_eq!(orchestrator.history().len(), 1);

        let seen = white_seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].feedback, None);
        let feedback = seen[1].feedback.as_deref().unwrap();
        assert!(feedback.contains("'e2e5' is not a legal move"));
        assert!(feedback.contains("g1f3"));
        assert_eq!(seen[1].attempt, 1);
    }

    #[test]
    fn test_invalid_move_forfeit_policy() {
        let (white, white_seen) = scripted("White", vec![says("e2e5"), says("e2e4")]);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(white, black, config(InvalidMovePolicy::Forfeit));

        let err = orchestrator.play_turn().unwrap_err();
        match err {
            TurnError::InvalidMove(invalid) => {
                assert_eq!(invalid.mv, "e2e5");
                assert_eq!(invalid.agent, "White");
                assert_eq!(invalid.legal.len(), 20);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(orchestrator.history().is_empty());
        assert_eq!(
            orchestrator.game().current_position().fen,
            positions::STARTING
        );
        assert_eq!(white_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_reprompts_are_bounded() {
        let script = vec![says("e2e5"), says("e2e6"), says("e2e7"), says("e2e4")];
        let (white, white_seen) = scripted("White", script);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(
            white,
            black,
            config(InvalidMovePolicy::Reprompt { max_retries: 2 }),
        );
        let mut presenter = Recorder::default();

        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        assert_eq!(white_seen.lock().unwrap().len(), 3);
        assert!(orchestrator.history().is_empty());
        assert!(matches!(
            result,
            MatchResult::Forfeit {
                loser: Color::White,
                ..
            }
        ));
        assert_eq!(result.result_string(), "0-1 (White forfeits)");
        assert_eq!(presenter.reports.len(), 3);
        assert!(presenter
            .reports
            .iter()
            .all(|e| matches!(e, TurnError::InvalidMove(_))));
    }

    #[test]
    fn test_run_to_checkmate_stops_asking() {
        let (white, white_seen) = scripted("White", vec![says("f2f3"), says("g2g4"), says("a2a3")]);
        let (black, black_seen) = scripted("Black", vec![says("e7e5"), says("d8h4")]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());
        let mut presenter = Recorder::default();

        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        assert_eq!(
            result,
            MatchResult::Finished {
                outcome: GameOutcome::Checkmate {
                    winner: Color::Black
                }
            }
        );
        assert_eq!(white_seen.lock().unwrap().len(), 2);
        assert_eq!(black_seen.lock().unwrap().len(), 2);
        assert_eq!(orchestrator.history().len(), 4);
        assert_eq!(presenter.renders.len(), 5);
        assert_eq!(presenter.renders[4].1, 4);
        assert_eq!(presenter.finished, Some(result.clone()));
        assert_eq!(result.result_string(), "0-1");
        assert!(matches!(
            orchestrator.play_turn(),
            Err(TurnError::GameOver(_))
        ));
    }

    #[test]
    fn test_terminal_start_never_calls_agents() {
        let (white, white_seen) = scripted("White", vec![says("a2a3")]);
        let (black, black_seen) = scripted("Black", vec![]);
        let game = Game::from_fen(positions::FOOLS_MATE).unwrap();
        let mut orchestrator =
            TurnOrchestrator::with_game(game, white, black, OrchestratorConfig::default());
        let mut presenter = Recorder::default();

        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        assert!(matches!(result, MatchResult::Finished { .. }));
        assert!(white_seen.lock().unwrap().is_empty());
        assert!(black_seen.lock().unwrap().is_empty());
        assert_eq!(presenter.renders.len(), 1);
    }

    #[test]
    fn test_retryable_failure_is_retried() {
        let (white, white_seen) = scripted(
            "White",
            vec![Err(AgentFailure::Malformed("???".into())), says("d2d4")],
        );
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());

        assert_eq!(orchestrator.play_turn().unwrap().mv, "d2d4");
        let seen = white_seen.lock().unwrap();
        assert!(seen[1].feedback.as_deref().unwrap().contains("could not be read"));
    }

    #[test]
    fn test_fatal_failure_aborts() {
        let (white, _) = scripted("White", vec![Err(AgentFailure::Authentication)]);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());
        let mut presenter = Recorder::default();

        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        assert!(matches!(result, MatchResult::Aborted { .. }));
        assert_eq!(result.result_string(), "*");
        assert_eq!(presenter.reports.len(), 1);
        assert!(presenter.reports[0].is_fatal());
    }

    #[test]
    fn test_fallback_substitutes_for_one_turn() {
        let (white, _) = scripted(
            "White",
            vec![
                Err(AgentFailure::Timeout(Duration::from_secs(1))),
                Err(AgentFailure::Timeout(Duration::from_secs(1))),
                says("e2e4"),
            ],
        );
        let (black, _) = scripted("Black", vec![says("e7e5")]);
        let config = OrchestratorConfig {
            failure: FailurePolicy {
                max_retries: 1,
                fallback: Fallback::Random { seed: Some(3) },
            },
            ..OrchestratorConfig::default()
        };
        let mut orchestrator = TurnOrchestrator::new(white, black, config);

        orchestrator.play_turn().unwrap();
        orchestrator.play_turn().unwrap();
        let entries = orchestrator.history().entries();
        assert_eq!(entries[0].agent, "Random (fallback)");
        assert_eq!(entries[1].agent, "Black");
    }

    #[test]
    fn test_no_move_forfeits() {
        let (white, _) = scripted("White", vec![says("e2e4")]);
        let (black, _) = scripted(
            "Black",
            vec![Err(AgentFailure::NoMove {
                reason: "I resign".into(),
            })],
        );
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());
        let mut presenter = Recorder::default();

        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        assert_eq!(
            result,
            MatchResult::Forfeit {
                loser: Color::Black,
                reason: "I resign".into()
            }
        );
        assert_eq!(result.result_string(), "1-0 (Black forfeits)");
    }

    #[test]
    fn test_stop_flag_and_move_limit() {
        let (white, white_seen) = scripted("White", vec![says("e2e4")]);
        let (black, _) = scripted("Black", vec![]);
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());
        let result = orchestrator.run(&mut Recorder::default(), &AtomicBool::new(true));
        assert_eq!(result, MatchResult::Stopped);
        assert!(white_seen.lock().unwrap().is_empty());

        let config = OrchestratorConfig {
            max_moves: Some(6),
            ..OrchestratorConfig::default()
        };
        let mut orchestrator = TurnOrchestrator::new(
            Box::new(RandomAgent::seeded(1)),
            Box::new(RandomAgent::seeded(2)),
            config,
        );
        let result = orchestrator.run(&mut Recorder::default(), &AtomicBool::new(false));
        assert_eq!(result, MatchResult::MoveLimit { plies: 6 });
        assert_eq!(orchestrator.history().len(), 6);
    }

    #[test]
    fn test_repetition_draw_ends_match() {
        let shuffle = ["g1f3", "f3g1", "g1f3", "f3g1"];
        let (white, _) = scripted("White", shuffle.iter().map(|m| says(m)).collect());
        let black_shuffle = ["g8f6", "f6g8", "g8f6", "f6g8"];
        let (black, _) = scripted("Black", black_shuffle.iter().map(|m| says(m)).collect());
        let mut orchestrator = TurnOrchestrator::new(white, black, OrchestratorConfig::default());

        let result = orchestrator.run(&mut Recorder::default(), &AtomicBool::new(false));
        assert_eq!(
            result,
            MatchResult::Finished {
                outcome: GameOutcome::Draw {
                    reason: DrawReason::ThreefoldRepetition
                }
            }
        );
        assert_eq!(orchestrator.history().len(), 8);
    }
}
