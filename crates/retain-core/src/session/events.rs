//! Session events
//!
//! Every controller transition emits one of these on a tokio broadcast
//! channel. Front ends and reflection capture subscribe; nobody is required to.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionSummary;
use crate::scheduler::Rating;

/// Default capacity of the session event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Observable session transition
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    SessionStarted {
        deck: String,
        queue_len: usize,
        timestamp: DateTime<Utc>,
    },
    AnswerRevealed {
        item_id: String,
        timestamp: DateTime<Utc>,
    },
    ReviewCommitted {
        item_id: String,
        rating: Rating,
        interval: f64,
        estimate: String,
        next_review: DateTime<Utc>,
        is_learning: bool,
        timestamp: DateTime<Utc>,
    },
    CommitFailed {
        item_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    SessionCompleted {
        summary: SessionSummary,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Event name as it appears in the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "SessionStarted",
            SessionEvent::AnswerRevealed { .. } => "AnswerRevealed",
            SessionEvent::ReviewCommitted { .. } => "ReviewCommitted",
            SessionEvent::CommitFailed { .. } => "CommitFailed",
            SessionEvent::SessionCompleted { .. } => "SessionCompleted",
        }
    }
}
