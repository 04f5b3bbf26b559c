//! Append-only record of the moves played in a match, with text and JSON
//! export.

use crate::AgentDecision;
use chess_core::{Color, Position};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Write as _;
use std::io;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// One-based half-move index.
    pub ply: u32,
    pub color: Color,
    pub agent: String,
    pub position_before: Position,
    pub decision: AgentDecision,
    pub fen_after: String,
}

#[derive(Clone, Debug, Default)]
pub struct GameHistory {
    entries: Vec<HistoryEntry>,
}

impl GameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(
        &mut self,
        agent: &str,
        position_before: Position,
        decision: AgentDecision,
        fen_after: String,
    ) -> &HistoryEntry {
        let entry = HistoryEntry {
            ply: self.entries.len() as u32 + 1,
            color: position_before.side_to_move,
            agent: agent.to_string(),
            position_before,
            decision,
            fen_after,
        };
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Numbered move pairs (`1. e2e4 e7e5`), one line per move number,
    /// followed by the result line.
    pub fn to_move_list(&self, result: &str) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let number = entry.position_before.fullmove_number;
            let mv = &entry.decision.mv;
            match entry.color {
                Color::White => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    let _ = write!(out, "{number}. {mv}");
                }
                Color::Black if out.is_empty() => {
                    let _ = write!(out, "{number}... {mv}");
                }
                Color::Black => {
                    let _ = write!(out, " {mv}");
                }
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(result);
        out.push('\n');
        out
    }

    /// One object per ply followed by a `game_over` marker.
    pub fn to_json_record(&self, result: &str) -> Value {
        let mut record: Vec<Value> = self
            .entries
            .iter()
            .map(|entry| {
                json!({
                    "ply": entry.ply,
                    "color": entry.color,
                    "agent": entry.agent,
                    "move": entry.decision.mv,
                    "reasoning": entry.decision.reasoning,
                    "fen_before": entry.position_before.fen,
                    "fen_after": entry.fen_after,
                })
            })
            .collect();
        record.push(json!({ "event": "game_over", "result": result }));
        Value::Array(record)
    }

    pub fn write_move_list(&self, path: &Path, result: &str) -> io::Result<()> {
        std::fs::write(path, self.to_move_list(result))
    }

    pub fn write_json_record(&self, path: &Path, result: &str) -> io::Result<()> {
        let text = serde_json::to_string_pretty(&self.to_json_record(result))?;
        std::fs::write(path, text)
    }
}
