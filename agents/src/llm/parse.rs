//! Reading a move out of a model's reply.

use crate::{AgentDecision, AgentFailure};
use chess_core::Move;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "move", alias = "move_uci", alias = "uci")]
    mv: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    no_move: Option<Value>,
    #[serde(default)]
    reason: Option<String>,
}

/// Turns model output into a decision. Tolerates markdown fences and prose
/// around the JSON object, and a bare UCI move as the whole reply.
pub fn parse_reply(content: &str) -> Result<AgentDecision, AgentFailure> {
    let trimmed = content.trim();

    if Move::from_uci(&trimmed.to_ascii_lowercase()).is_ok() {
        return Ok(AgentDecision::new(trimmed.to_ascii_lowercase(), ""));
    }

    let json = extract_object(trimmed).ok_or_else(|| malformed(trimmed))?;
    let raw: RawReply = serde_json::from_str(json).map_err(|_| malformed(trimmed))?;

    match raw {
        RawReply { mv: Some(mv), reasoning, .. } if !mv.trim().is_empty() => Ok(
            AgentDecision::new(mv.trim().to_string(), reasoning.unwrap_or_default()),
        ),
        RawReply {
            no_move: Some(flag),
            reason,
            ..
        } => {
            let reason = match flag {
                Value::String(text) => text,
                _ => reason.unwrap_or_else(|| "no reason given".to_string()),
            };
            Err(AgentFailure::NoMove { reason })
        }
        _ => Err(malformed(trimmed)),
    }
}

/// The outermost `{...}` span, after dropping any code fence.
fn extract_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn malformed(text: &str) -> AgentFailure {
    const PREVIEW: usize = 120;
    let preview: String = text.chars().take(PREVIEW).collect();
    AgentFailure::Malformed(preview)
}
