//! Structured audit records.
//!
//! Three append-only trails accompany the game state: the human-readable
//! log (plain strings), the replay event list (structured, timestamped
//! records), and the highlights list (log lines marked as narratively
//! significant). Consumers treat all three as append-only.

use crate::game::Phase;
use crate::player::SeatId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// What kind of moment a replay event records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayCategory {
    /// Phase announcement or transition
    Phase,
    /// A seat's (or the engine's) decision, possibly with reasoning
    Decision,
    /// A discussion speech
    Speech,
    /// A resolved game effect (death, elimination, shot)
    Action,
    /// Housekeeping notices (degraded providers, pending shots)
    System,
    /// Game-over summary
    Summary,
}

/// One structured, timestamped audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEvent {
    /// Engine-assigned sequence number, starting at 1 per game
    pub id: u64,
    /// Phase the event belongs to
    pub phase: Phase,
    pub category: ReplayCategory,
    /// Day counter at the time of the event
    pub day: u32,
    /// Acting seat, when one seat owns the moment
    pub actor_id: Option<SeatId>,
    pub content: String,
    /// Provider-supplied reasoning trace, if any
    pub reasoning: Option<String>,
    /// Free-form structured payload
    pub extra: Option<serde_json::Value>,
    /// Unix milliseconds at append time
    pub timestamp_ms: i64,
}

/// The caller-supplied part of a replay event.
///
/// The engine fills in id, phase, day, and timestamp when the draft is
/// appended to the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDraft {
    pub category: ReplayCategory,
    pub actor_id: Option<SeatId>,
    pub content: String,
    pub reasoning: Option<String>,
    pub extra: Option<serde_json::Value>,
}

impl ReplayDraft {
    /// Draft with just a category and content
    pub fn new(category: ReplayCategory, content: impl Into<String>) -> Self {
        Self {
            category,
            actor_id: None,
            content: content.into(),
            reasoning: None,
            extra: None,
        }
    }

    /// Attach the acting seat
    pub fn with_actor(mut self, seat: SeatId) -> Self {
        self.actor_id = Some(seat);
        self
    }

    /// Attach a reasoning trace
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Attach a structured payload
    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// One batch item for the append actions: any combination of a log line,
/// a replay draft, and a highlight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub line: Option<String>,
    pub replay: Option<ReplayDraft>,
    pub highlight: Option<String>,
}

impl LogEntry {
    /// Entry carrying only a log line
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            line: Some(text.into()),
            ..Self::default()
        }
    }

    /// Entry carrying only a replay draft
    pub fn replay(draft: ReplayDraft) -> Self {
        Self {
            replay: Some(draft),
            ..Self::default()
        }
    }

    /// Attach a replay draft to this entry
    pub fn with_replay(mut self, draft: ReplayDraft) -> Self {
        self.replay = Some(draft);
        self
    }

    /// Attach a highlight to this entry
    pub fn with_highlight(mut self, text: impl Into<String>) -> Self {
        self.highlight = Some(text.into());
        self
    }
}

/// Wall-clock unix milliseconds, stamped onto replay events at append time
pub(crate) fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
