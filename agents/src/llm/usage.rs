use serde::Serialize;
use std::fmt;

/// Requests and tokens spent by one agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub requests: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Counted before the request is sent, so failed calls still count.
    pub(crate) fn record_request(&mut self) {
        self.requests += 1;
    }

    pub(crate) fn record_tokens(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} tokens ({} prompt, {} completion)",
            self.requests,
            self.total_tokens(),
            self.prompt_tokens,
            self.completion_tokens
        )
    }
}
