//! Refresh contract for the chat page.
//!
//! The page has no push channel, so it re-fetches the conversation on a
//! fixed interval while a reply is outstanding. Polling stops exactly when
//! the newest message was written by the assistant and no prediction is
//! still pending for the conversation. An empty conversation counts as
//! answered.
//!
//! The server evaluates [`PollPolicy::next_delay`] on every conversation
//! response and the page obeys the result.

use std::time::Duration;

use crate::message::{Message, ROLE_ASSISTANT, last_role};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { interval: DEFAULT_POLL_INTERVAL }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// `true` while the conversation is waiting on the assistant.
    pub fn awaiting_reply(messages: &[Message]) -> bool {
        last_role(messages).unwrap_or(ROLE_ASSISTANT) != ROLE_ASSISTANT
    }

    /// Delay before the next refresh, or `None` once polling should stop.
    ///
    /// `reply_pending` covers messages sent while an earlier prediction was
    /// outstanding: their reply is still to come even if the newest row is
    /// the assistant's.
    pub fn next_delay(&self, messages: &[Message], reply_pending: bool) -> Option<Duration> {
        (reply_pending || Self::awaiting_reply(messages)).then_some(self.interval)
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }
}
