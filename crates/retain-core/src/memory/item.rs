//! Review Item - The fundamental unit of study
//!
//! Each item is a question/answer pair with:
//! - Deck membership and content
//! - Learning-step scheduling state
//! - An append-only log of every rating it received

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Lowest easiness factor any item can reach
pub const MIN_EASINESS: f64 = 1.3;

/// Easiness factor assigned to new items, also the ceiling for easy-rating boosts
pub const DEFAULT_EASINESS: f64 = 2.5;

// ============================================================================
// QUALITY HISTORY
// ============================================================================

/// One entry in an item's review log. Written once, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityRecord {
    /// When the review happened
    pub timestamp: DateTime<Utc>,
    /// Internal quality number of the rating (1, 2, 4 or 5)
    pub quality: u8,
    /// Interval in days chosen by the review
    pub resulting_interval: f64,
    /// Easiness factor after the review
    pub resulting_easiness: f64,
    /// Whether the item was still in the learning phase afterwards
    pub was_learning_after: bool,
}

// ============================================================================
// MEMORY STATE
// ============================================================================

/// Scheduling state of a single item.
///
/// Only the scheduler produces new values of this type; everything else reads it.
///
/// | Field                   | Learning phase          | Graduated phase        |
/// |-------------------------|-------------------------|------------------------|
/// | `interval`              | fraction of a day       | whole days             |
/// | `current_learning_step` | index into the ladder   | always 0               |
/// | `repetitions`           | 0                       | >= 1                   |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMemoryState {
    /// Growth multiplier for graduated intervals, never below [`MIN_EASINESS`]
    pub easiness: f64,
    /// Successful reviews since the item last left the learning phase
    pub repetitions: u32,
    /// Days until the item is due again
    pub interval: f64,
    /// True while the item is new or relearning after a lapse
    pub is_learning: bool,
    /// Position on the learning ladder
    pub current_learning_step: usize,
    /// When the item was last rated
    pub last_reviewed: Option<DateTime<Utc>>,
    /// When the item becomes due
    pub next_review: DateTime<Utc>,
    /// Every rating the item received, oldest first
    #[serde(default)]
    pub quality_history: Vec<QualityRecord>,
    /// Free-text elaboration attached at the last review that supplied one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ItemMemoryState {
    /// State of a freshly created item, due immediately
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            easiness: DEFAULT_EASINESS,
            repetitions: 0,
            interval: 0.0,
            is_learning: true,
            current_learning_step: 0,
            last_reviewed: None,
            next_review: now,
            quality_history: Vec::new(),
            note: None,
        }
    }

    /// Check if the item is due at the given time
    pub fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review
    }

    /// Items that are new or still climbing the learning ladder.
    ///
    /// These are reviewed ahead of graduated items in a session.
    pub fn is_learning_phase(&self) -> bool {
        self.is_learning || self.repetitions == 0
    }

    /// Number of times the item has been rated
    pub fn review_count(&self) -> usize {
        self.quality_history.len()
    }

    /// Most recent history entry, if the item was ever rated
    pub fn last_record(&self) -> Option<&QualityRecord> {
        self.quality_history.last()
    }
}

// ============================================================================
// REVIEW ITEM
// ============================================================================

/// A question/answer pair together with its scheduling state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Deck the item belongs to
    pub deck_id: String,
    /// Prompt side
    pub front: String,
    /// Answer side
    pub back: String,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// Scheduling state
    pub state: ItemMemoryState,
}

impl ReviewItem {
    /// Create a new item that is due right away
    pub fn new(
        deck_id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            deck_id: deck_id.into(),
            front: front.into(),
            back: back.into(),
            created_at: now,
            state: ItemMemoryState::new(now),
        }
    }
}

// ============================================================================
// DECK FILTER
// ============================================================================

/// Which decks a queue or store query covers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scope", content = "deck")]
pub enum DeckFilter {
    /// Every deck
    #[default]
    All,
    /// A single deck by id
    Deck(String),
}

impl DeckFilter {
    /// Build a filter from an optional deck id
    pub fn from_option(deck: Option<String>) -> Self {
        match deck {
            Some(d) => DeckFilter::Deck(d),
            None => DeckFilter::All,
        }
    }

    /// Check whether an item's deck passes this filter
    pub fn matches(&self, deck_id: &str) -> bool {
        match self {
            DeckFilter::All => true,
            DeckFilter::Deck(d) => d == deck_id,
        }
    }
}

impl std::fmt::Display for DeckFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeckFilter::All => write!(f, "all decks"),
            DeckFilter::Deck(d) => write!(f, "{}", d),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
