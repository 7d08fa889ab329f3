//! Learning-step scheduler
//!
//! Pure state transition: `(state, rating, note, now) -> state'`. Never touches
//! its input, never does I/O, and holds no mutable state, so one scheduler can
//! be shared by any number of sessions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::ladder::LearningLadder;
use super::rating::{Rating, MAX_QUALITY, PASSING_QUALITY};
use super::SchedulerError;
use crate::estimate::format_estimate;
use crate::memory::{ItemMemoryState, QualityRecord, DEFAULT_EASINESS, MIN_EASINESS};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Easiness lost when a graduated item lapses
pub const LAPSE_PENALTY: f64 = 0.2;

/// Easiness gained by an easy review of a graduated item
pub const EASY_BONUS: f64 = 0.15;

/// Extra interval multiplier for an easy review of a graduated item
pub const EASY_MULTIPLIER: f64 = 1.3;

/// Easiness lost on a quality-3 review of a graduated item
pub const BORDERLINE_PENALTY: f64 = 0.15;

/// Interval multiplier on a quality-3 review of a graduated item
pub const BORDERLINE_MULTIPLIER: f64 = 1.2;

/// Graduated intervals never drop below one day
const MIN_GRADUATED_INTERVAL: f64 = 1.0;

/// 9999-12-31T23:59:59Z, the last instant RFC3339 can write without a year sign
pub const LATEST_DUE_TIMESTAMP: i64 = 253_402_300_799;

// ============================================================================
// PREVIEW
// ============================================================================

/// What one rating would do to an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPreview {
    /// Rating being previewed
    pub rating: Rating,
    /// Resulting interval in days
    pub interval: f64,
    /// Human-readable interval ("10 minutes", "3 days", ...)
    pub estimate: String,
    /// Resulting due date
    pub next_review: DateTime<Utc>,
    /// Whether the item would still be learning
    pub is_learning: bool,
}

/// Outcome of every rating for the same item at the same instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResults {
    pub again: ReviewPreview,
    pub hard: ReviewPreview,
    pub good: ReviewPreview,
    pub easy: ReviewPreview,
}

impl PreviewResults {
    /// Preview for a specific rating
    pub fn get(&self, rating: Rating) -> &ReviewPreview {
        match rating {
            Rating::Again => &self.again,
            Rating::Hard => &self.hard,
            Rating::Good => &self.good,
            Rating::Easy => &self.easy,
        }
    }

    /// Previews in display order
    pub fn iter(&self) -> impl Iterator<Item = &ReviewPreview> {
        [&self.again, &self.hard, &self.good, &self.easy].into_iter()
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// The scheduling engine.
///
/// ```rust
/// use chrono::Utc;
/// use retain_core::{ItemMemoryState, Rating, Scheduler};
///
/// let scheduler = Scheduler::default();
/// let now = Utc::now();
/// let state = ItemMemoryState::new(now);
///
/// let next = scheduler.apply_review(&state, Rating::Easy, None, now);
/// assert!(!next.is_learning);
/// assert_eq!(next.interval, 4.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    ladder: LearningLadder,
}

impl Scheduler {
    /// Create a scheduler with a custom learning ladder
    pub fn new(ladder: LearningLadder) -> Result<Self, SchedulerError> {
        ladder.validate()?;
        Ok(Self { ladder })
    }

    /// The ladder this scheduler climbs
    pub fn ladder(&self) -> &LearningLadder {
        &self.ladder
    }

    /// Compute an item's state after a review.
    ///
    /// `note` replaces the stored note only when it is non-blank.
    pub fn apply_review(
        &self,
        state: &ItemMemoryState,
        rating: Rating,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> ItemMemoryState {
        self.transition(state, rating.quality(), note, now)
    }

    /// Same as [`Scheduler::apply_review`] but from a raw quality number (0-5).
    pub fn apply_quality(
        &self,
        state: &ItemMemoryState,
        quality: u8,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ItemMemoryState, SchedulerError> {
        if quality > MAX_QUALITY {
            return Err(SchedulerError::InvalidRating(quality));
        }
        Ok(self.transition(state, quality, note, now))
    }

    /// Outcome of each rating, computed on copies of `state`
    pub fn preview(&self, state: &ItemMemoryState, now: DateTime<Utc>) -> PreviewResults {
        let preview = |rating: Rating| {
            let next = self.apply_review(state, rating, None, now);
            ReviewPreview {
                rating,
                interval: next.interval,
                estimate: format_estimate(next.interval),
                next_review: next.next_review,
                is_learning: next.is_learning,
            }
        };

        PreviewResults {
            again: preview(Rating::Again),
            hard: preview(Rating::Hard),
            good: preview(Rating::Good),
            easy: preview(Rating::Easy),
        }
    }

    fn transition(
        &self,
        state: &ItemMemoryState,
        quality: u8,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> ItemMemoryState {
        let was_in_learning = state.repetitions == 0 || state.is_learning;
        let mut next = state.clone();

        if quality < PASSING_QUALITY {
            // Hard and Again both restart the ladder
            next.repetitions = 0;
            next.current_learning_step = 0;
            next.is_learning = true;
            next.interval = self.ladder.step_days(0);
            if !was_in_learning {
                next.easiness = (state.easiness - LAPSE_PENALTY).max(MIN_EASINESS);
            }
        } else if was_in_learning {
            if quality == MAX_QUALITY {
                self.graduate(&mut next, self.ladder.easy_interval_days);
            } else if state.current_learning_step < self.ladder.last_step() {
                let step = state.current_learning_step + 1;
                next.current_learning_step = step;
                next.interval = self.ladder.step_days(step);
                next.repetitions = 0;
                next.is_learning = true;
            } else {
                self.graduate(&mut next, self.ladder.graduating_interval_days);
            }
        } else {
            next.repetitions = state.repetitions + 1;
            next.is_learning = false;
            next.current_learning_step = 0;

            let interval = match quality {
                MAX_QUALITY => {
                    next.easiness = (state.easiness + EASY_BONUS).min(DEFAULT_EASINESS);
                    state.interval * next.easiness * EASY_MULTIPLIER
                }
                PASSING_QUALITY => {
                    // No Rating maps to quality 3; reachable only via apply_quality
                    next.easiness = (state.easiness - BORDERLINE_PENALTY).max(MIN_EASINESS);
                    state.interval * BORDERLINE_MULTIPLIER
                }
                _ => state.interval * state.easiness,
            };
            next.interval = interval.round().max(MIN_GRADUATED_INTERVAL);
        }

        next.easiness = next.easiness.max(MIN_EASINESS);
        next.next_review = due_after(now, next.interval);
        next.last_reviewed = Some(now);
        next.quality_history.push(QualityRecord {
            timestamp: now,
            quality,
            resulting_interval: next.interval,
            resulting_easiness: next.easiness,
            was_learning_after: next.is_learning,
        });
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            next.note = Some(note.to_string());
        }

        next
    }

    fn graduate(&self, next: &mut ItemMemoryState, interval: f64) {
        next.repetitions = 1;
        next.interval = interval;
        next.is_learning = false;
        next.current_learning_step = 0;
    }
}

/// `now` plus a fractional number of days, saturating instead of overflowing
/// Latest due date the scheduler will hand out
pub fn latest_due() -> DateTime<Utc> {
    DateTime::from_timestamp(LATEST_DUE_TIMESTAMP, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn due_after(now: DateTime<Utc>, days: f64) -> DateTime<Utc> {
    let ceiling = latest_due();
    let ms = (days * 86_400_000.0).round();
    let ms = if ms.is_nan() { 0 } else { (ms as i64).max(0) };
    Duration::try_milliseconds(ms)
        .and_then(|offset| now.checked_add_signed(offset))
        .map_or(ceiling, |due| due.min(ceiling))
}

// ============================================================================
// TESTS
// ============================================================================
