//! Scheduler Module
//!
//! Learning-step scheduler in the SM-2 family:
//! - New and lapsed items climb a short ladder of sub-day steps
//! - Graduated items grow their interval by a per-item easiness factor
//! - Every review appends to the item's quality history
//!
//! ## Transitions
//!
//! | Phase    | Again / Hard                    | Good                          | Easy                                |
//! |----------|---------------------------------|-------------------------------|-------------------------------------|
//! | Learning | restart ladder                  | next step, or graduate at end | graduate with easy interval         |
//! | Mature   | restart ladder, easiness - 0.2  | interval * easiness           | easiness + 0.15 (max 2.5), * 1.3    |
//!
//! Hard behaves exactly like Again.

mod engine;
mod ladder;
mod rating;

pub use engine::{
    latest_due, PreviewResults, ReviewPreview, Scheduler, BORDERLINE_MULTIPLIER,
    BORDERLINE_PENALTY, EASY_BONUS, EASY_MULTIPLIER, LAPSE_PENALTY, LATEST_DUE_TIMESTAMP,
};
pub use ladder::{
    LearningLadder, DEFAULT_EASY_INTERVAL, DEFAULT_GRADUATING_INTERVAL, DEFAULT_LEARNING_STEPS,
    MINUTES_PER_DAY,
};
pub use rating::{Rating, MAX_QUALITY, PASSING_QUALITY};

/// Scheduler error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Quality number outside 0-5
    #[error("Invalid rating quality: {0} (expected 0-5)")]
    InvalidRating(u8),
    /// Learning ladder cannot be used
    #[error("Invalid learning ladder: {0}")]
    InvalidLadder(String),
}
