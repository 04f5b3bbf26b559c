//! Terminal presentation: a coloured board and the agents' commentary.

use crate::config::Args;
use anyhow::Result;
use chess_agents::{HistoryEntry, MatchResult, Presenter, TurnError, TurnOrchestrator};
use chess_core::{Board, Color, File, GameOutcome, PieceType, Position, Rank, Square};
use crossterm::{
    queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
use std::io::{self, Write};
use std::sync::atomic::AtomicBool;

fn piece_symbol(piece_type: PieceType, color: Color) -> char {
    match (piece_type, color) {
        (PieceType::King, Color::White) => '♔',
        (PieceType::Queen, Color::White) => '♕',
        (PieceType::Rook, Color::White) => '♖',
        (PieceType::Bishop, Color::White) => '♗',
        (PieceType::Knight, Color::White) => '♘',
        (PieceType::Pawn, Color::White) => '♙',
        (PieceType::King, Color::Black) => '♚',
        (PieceType::Queen, Color::Black) => '♛',
        (PieceType::Rook, Color::Black) => '♜',
        (PieceType::Bishop, Color::Black) => '♝',
        (PieceType::Knight, Color::Black) => '♞',
        (PieceType::Pawn, Color::Black) => '♟',
    }
}

/// Prints every move as it is played. Styling can be switched off for
/// plain-text sinks.
pub struct CliPresenter<W: Write> {
    out: W,
    styled: bool,
}

impl<W: Write> CliPresenter<W> {
    pub fn new(out: W, styled: bool) -> Self {
        Self { out, styled }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn draw_board(&mut self, board: &Board, last_move: Option<(Square, Square)>) -> io::Result<()> {
        writeln!(self.out, "   a b c d e f g h")?;
        for rank_idx in (0..8u8).rev() {
            let Some(rank) = Rank::new(rank_idx) else {
                continue;
            };
            write!(self.out, "{} ", rank.to_char())?;

            for file_idx in 0..8u8 {
                let Some(file) = File::new(file_idx) else {
                    continue;
                };
                let square = Square::new(file, rank);
                let piece = board.piece_at(square);

                if !self.styled {
                    let glyph = piece.map_or('.', |p| p.to_fen_char());
                    write!(self.out, " {glyph}")?;
                    continue;
                }

                let highlighted =
                    last_move.is_some_and(|(from, to)| square == from || square == to);
                let background = if highlighted {
                    TermColor::DarkYellow
                } else if square.is_light() {
                    TermColor::DarkGrey
                } else {
                    TermColor::Black
                };
                let foreground = match piece.map(|p| p.color) {
                    Some(Color::Black) => TermColor::Magenta,
                    _ => TermColor::White,
                };
                let glyph = piece.map_or(' ', |p| piece_symbol(p.piece_type, p.color));
                queue!(
                    self.out,
                    SetBackgroundColor(background),
                    SetForegroundColor(foreground),
                    Print(format!(" {glyph}")),
                    ResetColor
                )?;
            }
            writeln!(self.out, " {}", rank.to_char())?;
        }
        writeln!(self.out, "   a b c d e f g h")
    }

    fn write_render(
        &mut self,
        position: &Position,
        history: &[HistoryEntry],
        outcome: GameOutcome,
    ) -> io::Result<()> {
        match history.last() {
            Some(entry) => {
                writeln!(
                    self.out,
                    "\nMove {} ({}): {} plays {}",
                    entry.ply, entry.color, entry.agent, entry.decision.mv
                )?;
                if !entry.decision.reasoning.is_empty() {
                    writeln!(self.out, "Reasoning: {}", entry.decision.reasoning)?;
                }
            }
            None => writeln!(self.out, "Starting position: {}", position.fen)?,
        }

        let last_move = history
            .last()
            .and_then(|entry| entry.decision.mv.parse::<chess_core::Move>().ok())
            .map(|mv| (mv.from, mv.to));
        self.draw_board(&position.board, last_move)?;

        if outcome.is_terminal() {
            writeln!(self.out, "Game over: {outcome}")?;
        } else {
            let check = if position.is_check { " (check)" } else { "" };
            writeln!(
                self.out,
                "{} to move, move {}{check}",
                position.side_to_move, position.fullmove_number
            )?;
        }
        self.out.flush()
    }

    fn write_report(&mut self, error: &TurnError) -> io::Result<()> {
        if self.styled {
            queue!(
                self.out,
                SetForegroundColor(TermColor::Red),
                Print(format!("! {error}\n")),
                ResetColor
            )?;
        } else {
            writeln!(self.out, "! {error}")?;
        }
        self.out.flush()
    }
}

impl<W: Write> Presenter for CliPresenter<W> {
    fn render(&mut self, position: &Position, history: &[HistoryEntry], outcome: GameOutcome) {
        if let Err(err) = self.write_render(position, history, outcome) {
            tracing::warn!(error = %err, "could not print position");
        }
    }

    fn report(&mut self, error: &TurnError) {
        if let Err(err) = self.write_report(error) {
            tracing::warn!(error = %err, "could not print error");
        }
    }

    fn finish(&mut self, result: &MatchResult) {
        let written = writeln!(
            self.out,
            "\nResult: {} ({result})",
            result.result_string()
        )
        .and_then(|_| self.out.flush());
        if let Err(err) = written {
            tracing::warn!(error = %err, "could not print result");
        }
    }
}

/// Plays one match in the terminal.
pub fn run(args: &Args) -> Result<()> {
    let mut orchestrator = args.build_match()?;
    let stop = AtomicBool::new(false);
    let mut presenter = CliPresenter::new(io::stdout(), true);

    let result = orchestrator.run(&mut presenter, &stop);
    print_summary(&orchestrator);
    args.save_outputs(&orchestrator, &result)
}

fn print_summary(orchestrator: &TurnOrchestrator) {
    println!(
        "\n{}",
        orchestrator
            .history()
            .to_move_list("")
            .trim_end()
    );
    for (agent, usage) in orchestrator.usage() {
        println!("{agent}: {usage}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_agents::{InvalidMoveError, OrchestratorConfig, RandomAgent};
    use chess_core::Game;

    fn output(presenter: CliPresenter<Vec<u8>>) -> String {
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_render_of_start() {
        let game = Game::new();
        let mut presenter = CliPresenter::new(Vec::new(), false);
        presenter.render(&game.current_position(), &[], game.outcome());

        let text = output(presenter);
        assert!(text.starts_with("Starting position: rnbqkbnr/"));
        assert!(text.contains("8  r n b q k b n r 8"));
        assert!(text.contains("1  R N B Q K B N R 1"));
        assert!(text.contains("White to move, move 1"));
    }

    #[test]
    fn test_styled_render_uses_symbols() {
        let game = Game::new();
        let mut presenter = CliPresenter::new(Vec::new(), true);
        presenter.render(&game.current_position(), &[], game.outcome());

        let text = output(presenter);
        assert!(text.contains('♔'));
        assert!(text.contains('♟'));
        assert!(text.contains("\u{1b}["));
    }

    #[test]
    fn test_match_output() {
        let config = OrchestratorConfig {
            max_moves: Some(2),
            ..OrchestratorConfig::default()
        };
        let mut orchestrator = TurnOrchestrator::new(
            Box::new(RandomAgent::seeded(5).named("Lefty")),
            Box::new(RandomAgent::seeded(6).named("Righty")),
            config,
        );
        let mut presenter = CliPresenter::new(Vec::new(), false);
        let result = orchestrator.run(&mut presenter, &AtomicBool::new(false));
        let text = output(presenter);

        assert!(text.contains("Move 1 (White): Lefty plays"));
        assert!(text.contains("Move 2 (Black): Righty plays"));
        assert!(text.contains("Reasoning: Picked at random from 20 legal moves."));
        assert!(text.ends_with(&format!("Result: * ({result})\n")));
    }

    #[test]
    fn test_report_line() {
        let mut presenter = CliPresenter::new(Vec::new(), false);
        presenter.report(&TurnError::from(InvalidMoveError {
            agent: "White".into(),
            mv: "e2e5".into(),
            legal: vec!["e2e4".into()],
        }));
        assert_eq!(
            output(presenter),
            "! White chose 'e2e5', which is not one of the 1 legal moves\n"
        );
    }
}
