use crate::history::HistoryEntry;
use crate::orchestrator::MatchResult;
use crate::TurnError;
use chess_core::{GameOutcome, Position};

/// Receives the match as it unfolds. Implemented by the terminal printer and
/// by the GUI bridge; both only ever see snapshots.
pub trait Presenter {
    /// Called once before the first turn and after every applied move.
    fn render(&mut self, position: &Position, history: &[HistoryEntry], outcome: GameOutcome);

    /// A rejected move, a retried failure or the error that ended the match.
    fn report(&mut self, error: &TurnError);

    fn finish(&mut self, result: &MatchResult);
}
