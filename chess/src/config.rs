//! Command-line options and the match setup derived from them.

use anyhow::{bail, Context, Result};
use chess_agents::{
    Agent, Fallback, FailurePolicy, InvalidMovePolicy, LlmAgent, LlmConfig, MatchResult,
    OrchestratorConfig, Provider, RandomAgent, TurnOrchestrator,
};
use chess_core::{Color, Game};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Gui,
    Cli,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    /// Local Ollama server (OpenAI-compatible API)
    Ollama,
    /// Hosted OpenAI API, needs OPENAI_API_KEY
    Openai,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Ollama => Provider::Ollama,
            ProviderArg::Openai => Provider::OpenAi,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PlayerKind {
    Llm,
    Random,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnInvalid {
    /// Ask again with the legal list, then forfeit
    Reprompt,
    /// Forfeit on the first illegal answer
    Forfeit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FallbackArg {
    None,
    Random,
}

/// Two language models play chess against each other.
#[derive(Parser, Debug, Clone)]
#[command(name = "llm-chess", version, about, long_about = None)]
pub struct Args {
    /// Show the game in a window or print it to the terminal
    #[arg(long, value_enum, env = "CHESS_MODE", default_value_t = Mode::Gui)]
    pub mode: Mode,

    /// Shorthand for --mode cli
    #[arg(long)]
    pub cli: bool,

    /// Chat backend preset
    #[arg(long, value_enum, env = "CHESS_PROVIDER", default_value_t = ProviderArg::Ollama)]
    pub provider: ProviderArg,

    /// Base URL of the OpenAI-compatible API (defaults to the provider's)
    #[arg(long, env = "CHESS_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "CHESS_WHITE_MODEL")]
    pub white_model: Option<String>,

    #[arg(long, env = "CHESS_BLACK_MODEL")]
    pub black_model: Option<String>,

    #[arg(long, value_enum, default_value_t = PlayerKind::Llm)]
    pub white_player: PlayerKind,

    #[arg(long, value_enum, default_value_t = PlayerKind::Llm)]
    pub black_player: PlayerKind,

    /// Re-prompts allowed after an illegal move
    #[arg(long, env = "CHESS_RETRIES", default_value_t = 2)]
    pub retries: u32,

    #[arg(long, value_enum, default_value_t = OnInvalid::Reprompt)]
    pub on_invalid: OnInvalid,

    /// Retries for transport errors, timeouts and unreadable replies
    #[arg(long, default_value_t = 1)]
    pub agent_retries: u32,

    /// Agent that plays a turn when the model keeps failing
    #[arg(long, value_enum, default_value_t = FallbackArg::None)]
    pub fallback: FallbackArg,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Requests each model may make during the match
    #[arg(long, default_value_t = 100)]
    pub request_limit: u32,

    #[arg(long)]
    pub temperature: Option<f32>,

    /// Do not ask the backend for JSON-mode replies
    #[arg(long)]
    pub no_json_mode: bool,

    /// Stop after this many plies (0 plays to the end)
    #[arg(long, default_value_t = 50)]
    pub max_moves: u32,

    /// Pause between moves; defaults to 1000 in the GUI and 0 in the terminal
    #[arg(long)]
    pub move_delay_ms: Option<u64>,

    /// Start from this FEN instead of the initial position
    #[arg(long)]
    pub fen: Option<String>,

    /// Write a JSON game record here when the match ends
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Write the move list here when the match ends
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Seed for random players
    #[arg(long)]
    pub seed: Option<u64>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.cli {
            Mode::Cli
        } else {
            self.mode
        }
    }

    fn player(&self, color: Color) -> PlayerKind {
        match color {
            Color::White => self.white_player,
            Color::Black => self.black_player,
        }
    }

    /// Rejects option combinations that cannot work before any window opens.
    pub fn validate(&self) -> Result<()> {
        let provider = Provider::from(self.provider);
        let needs_llm = Color::ALL
            .into_iter()
            .any(|color| self.player(color) == PlayerKind::Llm);
        let has_key = self.api_key.as_deref().is_some_and(|key| !key.is_empty());
        if needs_llm && provider.requires_api_key() && !has_key {
            bail!("the openai provider needs an API key (--api-key or OPENAI_API_KEY)");
        }
        if let Some(fen) = &self.fen {
            Game::from_fen(fen).with_context(|| format!("invalid --fen '{fen}'"))?;
        }
        Ok(())
    }

    pub fn llm_config(&self, color: Color) -> LlmConfig {
        let mut config = LlmConfig::for_provider(self.provider.into());
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        let model = match color {
            Color::White => &self.white_model,
            Color::Black => &self.black_model,
        };
        if let Some(model) = model {
            config.model = model.clone();
        }
        config.api_key = self.api_key.clone();
        config.timeout = Duration::from_secs(self.timeout);
        config.temperature = self.temperature;
        config.request_limit = self.request_limit;
        config.json_mode = !self.no_json_mode;
        config
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let default_delay = match self.mode() {
            Mode::Gui => 1000,
            Mode::Cli => 0,
        };
        OrchestratorConfig {
            invalid_move: match self.on_invalid {
                OnInvalid::Reprompt => InvalidMovePolicy::Reprompt {
                    max_retries: self.retries,
                },
                OnInvalid::Forfeit => InvalidMovePolicy::Forfeit,
            },
            failure: FailurePolicy {
                max_retries: self.agent_retries,
                fallback: match self.fallback {
                    FallbackArg::None => Fallback::None,
                    FallbackArg::Random => Fallback::Random { seed: self.seed },
                },
            },
            max_moves: (self.max_moves > 0).then_some(self.max_moves),
            move_delay: Duration::from_millis(self.move_delay_ms.unwrap_or(default_delay)),
        }
    }

    fn build_agent(&self, color: Color) -> Result<Box<dyn Agent>> {
        Ok(match self.player(color) {
            PlayerKind::Llm => {
                let config = self.llm_config(color);
                info!(color = %color, model = %config.model, endpoint = %config.endpoint, "LLM player");
                Box::new(LlmAgent::new(color, config)?)
            }
            PlayerKind::Random => {
                let agent = match self.seed {
                    // Different streams for the two sides.
                    Some(seed) => RandomAgent::seeded(seed.wrapping_add(color.index() as u64)),
                    None => RandomAgent::new(),
                };
                Box::new(agent.named(format!("{color} (random)")))
            }
        })
    }

    /// A fresh match with both players, ready to run.
    pub fn build_match(&self) -> Result<TurnOrchestrator> {
        let game = match &self.fen {
            Some(fen) => Game::from_fen(fen).with_context(|| format!("invalid --fen '{fen}'"))?,
            None => Game::new(),
        };
        Ok(TurnOrchestrator::with_game(
            game,
            self.build_agent(Color::White)?,
            self.build_agent(Color::Black)?,
            self.orchestrator_config(),
        ))
    }

    /// Writes the move list and JSON record if they were asked for.
    pub fn save_outputs(&self, orchestrator: &TurnOrchestrator, result: &MatchResult) -> Result<()> {
        let history = orchestrator.history();
        let result = result.result_string();
        if let Some(path) = &self.history {
            history
                .write_move_list(path, &result)
                .with_context(|| format!("writing move list to {}", path.display()))?;
            info!(path = %path.display(), "move list saved");
        }
        if let Some(path) = &self.record {
            history
                .write_json_record(path, &result)
                .with_context(|| format!("writing game record to {}", path.display()))?;
            info!(path = %path.display(), "game record saved");
        }
        Ok(())
    }
}
