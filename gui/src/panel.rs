//! Match state mirrored on the UI thread, and the presenter that feeds it.

use crate::board::Highlights;
use chess_agents::{HistoryEntry, MatchResult, Presenter, TurnError};
use chess_core::{Color, GameOutcome, Position};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;
use winit::event_loop::EventLoopProxy;

const COMMENTARY_LINES: usize = 6;
const MOVE_ROWS: usize = 12;
const REASONING_CHARS: usize = 280;

/// Sent from the match thread to the event loop.
#[derive(Debug)]
pub enum GuiEvent {
    Update(Box<Snapshot>),
    Notice(String),
    Finished(String),
    /// The host has saved the finished match; a new one may start.
    Ready,
}

/// Everything the window needs to redraw after one move.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub position: Position,
    pub moves: Vec<String>,
    pub commentary: Option<String>,
    pub outcome: GameOutcome,
}

impl Snapshot {
    pub fn new(
        position: &Position,
        history: &[HistoryEntry],
        outcome: GameOutcome,
        elapsed: Duration,
    ) -> Self {
        let commentary = history.last().map(|entry| {
            let reasoning: String = entry.decision.reasoning.chars().take(REASONING_CHARS).collect();
            format!(
                "[{}] {} {}: {}",
                timestamp(elapsed),
                entry.color,
                entry.decision.mv,
                reasoning.trim()
            )
        });
        Self {
            position: position.clone(),
            moves: history.iter().map(|e| e.decision.mv.clone()).collect(),
            commentary,
            outcome,
        }
    }
}

fn timestamp(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Forwards orchestrator callbacks to the event loop as owned snapshots.
pub struct GuiPresenter {
    proxy: EventLoopProxy<GuiEvent>,
    started: Instant,
}

impl GuiPresenter {
    pub fn new(proxy: EventLoopProxy<GuiEvent>) -> Self {
        Self {
            proxy,
            started: Instant::now(),
        }
    }

    fn send(&self, event: GuiEvent) {
        if self.proxy.send_event(event).is_err() {
            debug!("window closed, dropping match update");
        }
    }

    /// Sent after the host has saved the match.
    pub fn ready(&self) {
        self.send(GuiEvent::Ready);
    }
}

impl Presenter for GuiPresenter {
    fn render(&mut self, position: &Position, history: &[HistoryEntry], outcome: GameOutcome) {
        let snapshot = Snapshot::new(position, history, outcome, self.started.elapsed());
        self.send(GuiEvent::Update(Box::new(snapshot)));
    }

    fn report(&mut self, error: &TurnError) {
        self.send(GuiEvent::Notice(format!(
            "[{}] {error}",
            timestamp(self.started.elapsed())
        )));
    }

    fn finish(&mut self, result: &MatchResult) {
        self.send(GuiEvent::Finished(format!(
            "{} {result}",
            result.result_string()
        )));
    }
}

#[derive(Debug)]
pub struct PanelState {
    white: String,
    black: String,
    position: Option<Position>,
    first_move: (u16, Color),
    moves: Vec<String>,
    commentary: VecDeque<String>,
    status: String,
    running: bool,
}

impl PanelState {
    pub fn new() -> Self {
        Self {
            white: String::new(),
            black: String::new(),
            position: None,
            first_move: (1, Color::White),
            moves: Vec::new(),
            commentary: VecDeque::with_capacity(COMMENTARY_LINES),
            status: "Press Enter to start a match".to_string(),
            running: false,
        }
    }

    pub fn start(&mut self, white: &str, black: &str, position: Position) {
        self.white = white.to_string();
        self.black = black.to_string();
        self.first_move = (position.fullmove_number, position.side_to_move);
        self.status = status_line(&position);
        self.position = Some(position);
        self.moves.clear();
        self.commentary.clear();
        self.running = true;
    }

    pub fn apply(&mut self, event: GuiEvent) {
        match event {
            GuiEvent::Update(snapshot) => {
                let Snapshot {
                    position,
                    moves,
                    commentary,
                    ..
                } = *snapshot;
                self.status = status_line(&position);
                self.position = Some(position);
                self.moves = moves;
                if let Some(line) = commentary {
                    self.push_commentary(line);
                }
            }
            GuiEvent::Notice(line) => self.push_commentary(line),
            GuiEvent::Finished(summary) => self.status = summary,
            GuiEvent::Ready => {
                if self.running {
                    self.status.push_str(". Press Enter for a new match");
                }
                self.running = false;
            }
        }
    }

    /// Shown while the current turn completes after Escape.
    pub fn stopping(&mut self) {
        if self.running {
            self.status = "Stopping after the current turn...".to_string();
        }
    }

    pub fn notice(&mut self, line: String) {
        self.push_commentary(line);
    }

    fn push_commentary(&mut self, line: String) {
        if self.commentary.len() == COMMENTARY_LINES {
            self.commentary.pop_front();
        }
        self.commentary.push_back(line);
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn highlights(&self) -> Highlights {
        self.position.as_ref().map_or_else(Highlights::default, |p| {
            Highlights::new(
                p.last_move.as_deref(),
                &p.board,
                p.is_check.then_some(p.side_to_move),
            )
        })
    }

    /// Numbered move rows, the most recent last.
    pub fn move_rows(&self) -> Vec<String> {
        let (mut number, side) = self.first_move;
        let mut rows = Vec::new();
        let mut moves = self.moves.iter();

        if side == Color::Black {
            if let Some(first) = moves.next() {
                rows.push(format!("{number}... {first}"));
                number = number.saturating_add(1);
            }
        }
        let rest: Vec<&String> = moves.collect();
        for pair in rest.chunks(2) {
            match pair {
                [white, black] => rows.push(format!("{number}. {white} {black}")),
                [white] => rows.push(format!("{number}. {white}")),
                _ => {}
            }
            number = number.saturating_add(1);
        }
        rows
    }

    pub fn text(&self) -> String {
        let mut text = String::new();
        if !self.white.is_empty() {
            text.push_str(&format!("White: {}\nBlack: {}\n\n", self.white, self.black));
        }
        text.push_str(&self.status);
        text.push_str("\n\nMoves\n");

        let rows = self.move_rows();
        for row in rows.iter().skip(rows.len().saturating_sub(MOVE_ROWS)) {
            text.push_str(row);
            text.push('\n');
        }

        text.push_str("\nCommentary\n");
        for line in &self.commentary {
            text.push_str(line);
            text.push('\n');
        }

        text.push_str("\nEnter: new match    Esc: stop match");
        text
    }
}

impl Default for PanelState {
    fn default() -> Self {
        Self::new()
    }
}

fn status_line(position: &Position) -> String {
    if position.outcome.is_terminal() {
        return position.outcome.to_string();
    }
    let check = if position.is_check { ", check" } else { "" };
    format!(
        "Move {}: {} to move{check}",
        position.fullmove_number, position.side_to_move
    )
}
