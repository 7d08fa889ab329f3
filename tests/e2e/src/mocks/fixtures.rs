//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Items in each scheduling phase (new, learning, mature, lapsed)
//! - Batch generation for stress testing
//! - Pre-built scenarios for common test cases

use chrono::{DateTime, Duration, Utc};
use retain_core::{ItemMemoryState, Rating, ReviewItem, Scheduler};
use std::collections::HashMap;

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let now = Utc::now();
/// let item = TestDataFactory::mature_item("bio", 2.0, 3, 10.0, now - Duration::days(2));
/// let scenario = TestDataFactory::create_due_selection_scenario(now);
/// ```
pub struct TestDataFactory;

/// Configuration for batch item generation
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Number of items to create
    pub count: usize,
    /// Deck for every item
    pub deck: String,
    /// Prefix for the front text
    pub front_prefix: String,
    /// Fraction of items (0.0-1.0) that are graduated
    pub mature_ratio: f64,
    /// Spread of due dates around the reference time, in hours
    pub due_spread_hours: i64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 10,
            deck: "default".to_string(),
            front_prefix: "Question".to_string(),
            mature_ratio: 0.5,
            due_spread_hours: 48,
        }
    }
}

/// A named set of items for a test
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Items in the scenario
    pub items: Vec<ReviewItem>,
    /// Description of the scenario
    pub description: String,
    /// Role name to item id, for test assertions
    pub metadata: HashMap<String, String>,
}

impl TestScenario {
    /// Id of the item playing `role`
    pub fn id(&self, role: &str) -> &str {
        self.metadata
            .get(role)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl TestDataFactory {
    // ========================================================================
    // SINGLE ITEM CREATION
    // ========================================================================

    /// New, never-reviewed item created at `now`
    pub fn new_item(deck: &str, front: &str, now: DateTime<Utc>) -> ReviewItem {
        ReviewItem::new(deck, front, format!("Answer to {}", front), now)
    }

    /// Graduated item with the given scheduling fields
    pub fn mature_item(
        deck: &str,
        easiness: f64,
        repetitions: u32,
        interval: f64,
        next_review: DateTime<Utc>,
    ) -> ReviewItem {
        let created = next_review - Duration::days(60);
        let mut item = ReviewItem::new(deck, "Mature question", "Mature answer", created);
        item.state.easiness = easiness;
        item.state.repetitions = repetitions;
        item.state.interval = interval;
        item.state.is_learning = false;
        item.state.current_learning_step = 0;
        item.state.last_reviewed = Some(next_review - Duration::days(interval.round() as i64));
        item.state.next_review = next_review;
        item
    }

    /// Item that has been put through `ratings` by the default scheduler,
    /// each review landing exactly when the item fell due
    pub fn reviewed_item(deck: &str, ratings: &[Rating], start: DateTime<Utc>) -> ReviewItem {
        let mut item = ReviewItem::new(deck, "Reviewed question", "Reviewed answer", start);
        item.state = Self::replay(&Scheduler::default(), &item.state, ratings, start);
        item
    }

    /// Apply `ratings` in sequence, each at the previous due date
    pub fn replay(
        scheduler: &Scheduler,
        state: &ItemMemoryState,
        ratings: &[Rating],
        start: DateTime<Utc>,
    ) -> ItemMemoryState {
        let mut state = state.clone();
        let mut now = start;
        for rating in ratings {
            state = scheduler.apply_review(&state, *rating, None, now);
            now = state.next_review;
        }
        state
    }

    // ========================================================================
    // BATCH CREATION
    // ========================================================================

    /// Create a batch of default items
    pub fn create_batch(count: usize, now: DateTime<Utc>) -> Vec<ReviewItem> {
        Self::create_batch_with_config(
            BatchConfig {
                count,
                ..Default::default()
            },
            now,
        )
    }

    /// Create a batch with custom configuration
    pub fn create_batch_with_config(config: BatchConfig, now: DateTime<Utc>) -> Vec<ReviewItem> {
        let mature_every = if config.mature_ratio <= 0.0 {
            usize::MAX
        } else {
            ((1.0 / config.mature_ratio).round() as usize).max(1)
        };
        let spread = config.due_spread_hours.max(1);

        (0..config.count)
            .map(|i| {
                // Deterministic spread around `now`, half due and half not
                let offset = Duration::hours((i as i64 * 7) % (2 * spread) - spread);
                let due = now + offset;
                let mut item = if i % mature_every == 0 {
                    Self::mature_item(&config.deck, 2.3, 2, 6.0, due)
                } else {
                    let mut item = Self::new_item(&config.deck, "", due);
                    item.state.next_review = due;
                    item
                };
                item.front = format!("{} {}", config.front_prefix, i);
                item.back = format!("Answer {}", i);
                item
            })
            .collect()
    }

    // ========================================================================
    // SCENARIOS
    // ========================================================================

    /// One item due a day ago (new), one mature item due two days ago, one
    /// item not due for another day
    pub fn create_due_selection_scenario(now: DateTime<Utc>) -> TestScenario {
        let learning = Self::new_item("bio", "Learning item", now - Duration::days(1));
        let mature = Self::mature_item("bio", 2.5, 2, 6.0, now - Duration::days(2));
        let mut future = Self::new_item("bio", "Future item", now);
        future.state.next_review = now + Duration::days(1);

        let metadata = HashMap::from([
            ("learning".to_string(), learning.id.clone()),
            ("mature".to_string(), mature.id.clone()),
            ("future".to_string(), future.id.clone()),
        ]);

        TestScenario {
            items: vec![future, mature, learning],
            description: "Due selection with learning-first ordering".to_string(),
            metadata,
        }
    }

    /// Items in every scheduling phase, all due
    pub fn create_scheduling_scenario(now: DateTime<Utc>) -> TestScenario {
        let start = now - Duration::days(90);
        let mut new = Self::new_item("mixed", "Brand new item", now - Duration::hours(1));
        new.state.next_review = now - Duration::hours(1);

        let mut learning = Self::reviewed_item("mixed", &[Rating::Good], start);
        learning.state.next_review = now - Duration::hours(2);

        let mut mature =
            Self::reviewed_item("mixed", &[Rating::Good, Rating::Good, Rating::Good], start);
        mature.state.next_review = now - Duration::hours(3);

        let mut relearning =
            Self::reviewed_item("mixed", &[Rating::Easy, Rating::Good, Rating::Again], start);
        relearning.state.next_review = now - Duration::hours(4);

        let metadata = HashMap::from([
            ("new".to_string(), new.id.clone()),
            ("learning".to_string(), learning.id.clone()),
            ("mature".to_string(), mature.id.clone()),
            ("relearning".to_string(), relearning.id.clone()),
        ]);

        TestScenario {
            items: vec![mature, new, relearning, learning],
            description: "Items in different learning states".to_string(),
            metadata,
        }
    }

    // ========================================================================
    // UTILITIES
    // ========================================================================

    /// Deterministic rating sequence for property-style checks
    pub fn rating_sequence(len: usize, seed: usize) -> Vec<Rating> {
        (0..len)
            .map(|i| Rating::ALL[(i * 7 + seed * 3 + i / 3) % Rating::ALL.len()])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mature_item_is_graduated() {
        let now = Utc::now();
        let item = TestDataFactory::mature_item("d", 2.0, 3, 10.0, now);
        assert!(!item.state.is_learning_phase());
        assert!(item.state.is_due_at(now));
    }

    #[test]
    fn test_reviewed_item_history() {
        let item = TestDataFactory::reviewed_item("d", &[Rating::Good, Rating::Good], Utc::now());
        assert_eq!(item.state.quality_history.len(), 2);
        assert!(!item.state.is_learning);
        assert_eq!(item.state.repetitions, 1);
    }

    #[test]
    fn test_scheduling_scenario_phases() {
        let now = Utc::now();
        let scenario = TestDataFactory::create_scheduling_scenario(now);
        let by_id: HashMap<&str, &ReviewItem> =
            scenario.items.iter().map(|i| (i.id.as_str(), i)).collect();

        assert!(by_id[scenario.id("learning")].state.is_learning);
        assert!(!by_id[scenario.id("mature")].state.is_learning);
        assert!(by_id[scenario.id("relearning")].state.is_learning);
        assert!(by_id[scenario.id("relearning")].state.easiness < 2.5);
        assert!(scenario.items.iter().all(|i| i.state.is_due_at(now)));
    }

    #[test]
    fn test_batch_mix() {
        let now = Utc::now();
        let batch = TestDataFactory::create_batch(10, now);
        assert_eq!(batch.len(), 10);
        let mature = batch.iter().filter(|i| !i.state.is_learning_phase()).count();
        assert_eq!(mature, 5);
    }

    #[test]
    fn test_rating_sequence_uses_all_ratings() {
        let seq = TestDataFactory::rating_sequence(40, 1);
        for rating in Rating::ALL {
            assert!(seq.contains(&rating));
        }
    }
}
