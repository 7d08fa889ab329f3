//! Learning ladder configuration

use serde::{Deserialize, Serialize};

use super::SchedulerError;

/// Minutes in a day, used to turn learning steps into fractional intervals
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Default learning steps in minutes
pub const DEFAULT_LEARNING_STEPS: [f64; 2] = [1.0, 10.0];

/// Default interval after graduating through the last learning step
pub const DEFAULT_GRADUATING_INTERVAL: f64 = 1.0;

/// Default interval after graduating early with an easy rating
pub const DEFAULT_EASY_INTERVAL: f64 = 4.0;

/// Short intervals an item climbs before it is trusted with day-scale ones.
///
/// Deserializes from the `[scheduler]` table of the config file:
///
/// ```toml
/// [scheduler]
/// steps_minutes = [1.0, 10.0]
/// graduating_interval_days = 1.0
/// easy_interval_days = 4.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningLadder {
    /// Step durations in minutes, in the order they are climbed
    pub steps_minutes: Vec<f64>,
    /// Interval in days after completing the last step
    pub graduating_interval_days: f64,
    /// Interval in days after an easy rating during learning
    pub easy_interval_days: f64,
}

impl Default for LearningLadder {
    fn default() -> Self {
        Self {
            steps_minutes: DEFAULT_LEARNING_STEPS.to_vec(),
            graduating_interval_days: DEFAULT_GRADUATING_INTERVAL,
            easy_interval_days: DEFAULT_EASY_INTERVAL,
        }
    }
}

impl LearningLadder {
    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps_minutes.len()
    }

    /// Whether the ladder has no steps (never true once validated)
    pub fn is_empty(&self) -> bool {
        self.steps_minutes.is_empty()
    }

    /// Index of the final step
    pub fn last_step(&self) -> usize {
        self.len().saturating_sub(1)
    }

    /// Duration of a step in days.
    ///
    /// Indices past the end resolve to the last step.
    pub fn step_days(&self, step: usize) -> f64 {
        let minutes = self
            .steps_minutes
            .get(step)
            .or_else(|| self.steps_minutes.last())
            .copied()
            .unwrap_or(DEFAULT_LEARNING_STEPS[0]);
        minutes / MINUTES_PER_DAY
    }

    /// Reject ladders the scheduler cannot run with
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.steps_minutes.is_empty() {
            return Err(SchedulerError::InvalidLadder(
                "at least one learning step is required".to_string(),
            ));
        }
        if let Some(bad) = self
            .steps_minutes
            .iter()
            .find(|m| !m.is_finite() || **m <= 0.0)
        {
            return Err(SchedulerError::InvalidLadder(format!(
                "learning step must be a positive number of minutes, got {}",
                bad
            )));
        }
        for (name, value) in [
            ("graduating_interval_days", self.graduating_interval_days),
            ("easy_interval_days", self.easy_interval_days),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SchedulerError::InvalidLadder(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
