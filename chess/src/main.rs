mod cli;
mod config;

use anyhow::Result;
use clap::Parser;
use config::{Args, Mode};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // A missing .env file is the normal case.
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose);
    args.validate()?;

    info!(mode = ?args.mode(), white = ?args.white_player, black = ?args.black_player, "starting");
    let outcome = match args.mode() {
        Mode::Cli => cli::run(&args),
        Mode::Gui => run_gui(args),
    };
    if let Err(err) = &outcome {
        error!("{err:#}");
    }
    outcome
}

#[cfg(feature = "gui")]
fn run_gui(args: Args) -> Result<()> {
    chess_gui::run(gui::ArgsHost(args))?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn run_gui(_args: Args) -> Result<()> {
    anyhow::bail!("built without the gui feature; use --cli")
}

#[cfg(feature = "gui")]
mod gui {
    use crate::config::Args;
    use chess_agents::{MatchResult, TurnOrchestrator};
    use chess_gui::MatchHost;
    use std::error::Error;
    use tracing::{error, info};

    /// Builds every match in the window from the command line options.
    pub struct ArgsHost(pub Args);

    impl MatchHost for ArgsHost {
        fn new_match(&self) -> Result<TurnOrchestrator, Box<dyn Error + Send + Sync>> {
            Ok(self.0.build_match()?)
        }

        fn match_finished(&self, orchestrator: &TurnOrchestrator, result: &MatchResult) {
            info!(result = %result.result_string(), "match over: {result}");
            for (agent, usage) in orchestrator.usage() {
                info!("{agent}: {usage}");
            }
            if let Err(err) = self.0.save_outputs(orchestrator, result) {
                error!("{err:#}");
            }
        }
    }
}
