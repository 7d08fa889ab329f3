//! Review Queue
//!
//! Ordered, due-only working set for one session:
//! - Selection: deck matches and `next_review <= now`
//! - Order: learning-phase items first, then by ascending due date (stable)
//! - A cursor steps through it; the order never changes after construction

use chrono::{DateTime, Utc};

use crate::memory::{DeckFilter, ReviewItem};

/// Fixed ordering of item ids with a cursor
#[derive(Debug, Clone, Default)]
pub struct ReviewQueue {
    ids: Vec<String>,
    cursor: usize,
}

impl ReviewQueue {
    /// Select and order the items due at `now`.
    ///
    /// Items sharing both sort keys keep their input order.
    pub fn build(items: &[ReviewItem], deck: &DeckFilter, now: DateTime<Utc>) -> Self {
        let mut due: Vec<&ReviewItem> = items
            .iter()
            .filter(|item| deck.matches(&item.deck_id) && item.state.is_due_at(now))
            .collect();

        // `sort_by` is stable; `false` sorts before `true`
        due.sort_by(|a, b| {
            (!a.state.is_learning_phase())
                .cmp(&!b.state.is_learning_phase())
                .then(a.state.next_review.cmp(&b.state.next_review))
        });

        Self {
            ids: due.into_iter().map(|item| item.id.clone()).collect(),
            cursor: 0,
        }
    }

    /// Id under the cursor, `None` once the queue is exhausted
    pub fn current(&self) -> Option<&str> {
        self.ids.get(self.cursor).map(String::as_str)
    }

    /// Move past the current item. Returns the id that is now current.
    pub fn advance(&mut self) -> Option<&str> {
        if self.cursor < self.ids.len() {
            self.cursor += 1;
        }
        self.current()
    }

    /// Whether every item has been stepped past
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.ids.len()
    }

    /// Total items in the queue
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the queue was built empty
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Items already stepped past
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Items left, including the current one
    pub fn remaining(&self) -> usize {
        self.ids.len() - self.cursor
    }

    /// All ids in review order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}
