//! Review Session Module
//!
//! One learner working through one due queue:
//! - [`SessionController`] drives reveal, preview and commit for each item
//! - [`SessionEvent`]s are broadcast for every transition
//! - [`SessionSummary`] is handed to completion hooks and reflection capture
//!
//! ```text
//! AwaitingReveal --reveal--> AwaitingRating --commit--> Committing
//!       ^                                                  |
//!       +-------------- next item -------------------------+--> SessionComplete
//!                        (put failed: back to AwaitingRating)
//! ```

mod controller;
mod events;

pub use controller::{CommitOutcome, SessionController};
pub use events::{SessionEvent, DEFAULT_EVENT_CAPACITY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scheduler::Rating;
use crate::storage::StorageError;

// ============================================================================
// STATE
// ============================================================================

/// Where a session is in its reveal/rate cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Front of the current item is shown
    AwaitingReveal,
    /// Back is shown, waiting for a rating
    AwaitingRating,
    /// A rating is being persisted
    Committing,
    /// Queue exhausted
    SessionComplete,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::AwaitingReveal => "awaiting_reveal",
            SessionState::AwaitingRating => "awaiting_rating",
            SessionState::Committing => "committing",
            SessionState::SessionComplete => "session_complete",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Session error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A commit is in flight
    #[error("A review is still being saved")]
    Busy,
    /// Operation not valid in the current state
    #[error("Operation requires state {expected}, session is {actual}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },
    /// The record store failed; the session state is unchanged
    #[error("Record store error: {0}")]
    Persistence(#[from] StorageError),
    /// Keyboard input not bound to a rating
    #[error("Key '{0}' is not bound to a rating")]
    UnknownKey(char),
    /// `finish` called before `reflect`
    #[error("Session reflection has not been recorded")]
    ReflectionPending,
    /// Internal lock poisoned by a panic
    #[error("Session state lock poisoned")]
    Poisoned,
}

impl SessionError {
    /// Whether retrying the same call later can succeed.
    ///
    /// A conflict or a missing item fails the same way every time; the session
    /// has to be restarted to see the stored state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Busy
                | SessionError::Persistence(
                    StorageError::Unavailable(_) | StorageError::Database(_) | StorageError::Io(_)
                )
        )
    }

    /// Whether the stored item moved on under this session
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            SessionError::Persistence(StorageError::Conflict(_) | StorageError::NotFound(_))
        )
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// How many times each rating was committed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingCounts {
    pub again: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
}

impl RatingCounts {
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Again => self.again += 1,
            Rating::Hard => self.hard += 1,
            Rating::Good => self.good += 1,
            Rating::Easy => self.easy += 1,
        }
    }

    pub fn get(&self, rating: Rating) -> usize {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    pub fn total(&self) -> usize {
        self.again + self.hard + self.good + self.easy
    }
}

/// What happened in a session, for completion hooks and reflection notes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Deck the session covered
    pub deck: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Items in the queue when the session started
    pub total: usize,
    /// Items successfully committed
    pub reviewed: usize,
    pub ratings: RatingCounts,
    /// Items that left the learning phase
    pub graduated: usize,
    /// Mature items that were forgotten
    pub lapsed: usize,
    /// Learner's end-of-session note
    pub reflection: Option<String>,
}

impl SessionSummary {
    pub(crate) fn new(deck: String, total: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            deck,
            started_at,
            completed_at: None,
            total,
            reviewed: 0,
            ratings: RatingCounts::default(),
            graduated: 0,
            lapsed: 0,
            reflection: None,
        }
    }

    /// Share of reviews rated Good or Easy, `None` before any review
    pub fn retention_rate(&self) -> Option<f64> {
        let total = self.ratings.total();
        if total == 0 {
            return None;
        }
        Some((self.ratings.good + self.ratings.easy) as f64 / total as f64)
    }
}
