//! Memory module - Core item types
//!
//! Implements the study item model with:
//! - Question/answer items grouped into decks
//! - Learning-step scheduling state
//! - Append-only quality history

mod item;

pub use item::{
    DeckFilter, ItemMemoryState, QualityRecord, ReviewItem, DEFAULT_EASINESS, MIN_EASINESS,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// STATISTICS
// ============================================================================

/// Collection statistics for a deck (or all decks)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionStats {
    /// Total items
    pub total_items: usize,
    /// Items never rated
    pub new_items: usize,
    /// Items in the learning phase (including new ones)
    pub learning_items: usize,
    /// Graduated items
    pub mature_items: usize,
    /// Items due at the reference time
    pub due_items: usize,
    /// Mean easiness across graduated items
    pub average_easiness: f64,
    /// Earliest upcoming due date among items not yet due
    pub next_due: Option<DateTime<Utc>>,
}

impl CollectionStats {
    /// Compute statistics over a set of items at a reference time
    pub fn compute(items: &[ReviewItem], now: DateTime<Utc>) -> Self {
        let mut stats = CollectionStats {
            total_items: items.len(),
            ..Default::default()
        };
        let mut easiness_sum = 0.0;

        for item in items {
            let state = &item.state;
            if state.quality_history.is_empty() {
                stats.new_items += 1;
            }
            if state.is_learning_phase() {
                stats.learning_items += 1;
            } else {
                stats.mature_items += 1;
                easiness_sum += state.easiness;
            }
            if state.is_due_at(now) {
                stats.due_items += 1;
            } else {
                stats.next_due = Some(match stats.next_due {
                    Some(d) if d <= state.next_review => d,
                    _ => state.next_review,
                });
            }
        }

        if stats.mature_items > 0 {
            stats.average_easiness = easiness_sum / stats.mature_items as f64;
        }
        stats
    }
}
