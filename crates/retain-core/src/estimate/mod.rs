//! Time Estimate Formatter
//!
//! Turns a fractional number of days into the coarse human bucket shown next to
//! each rating ("1 minute", "10 minutes", "3 days", "2 months").
//!
//! Depends only on its numeric input, so a preview and the commit that follows
//! it render identical text for identical intervals.

use serde::{Deserialize, Serialize};

/// Below this many days an estimate is shown in minutes
const MINUTE_THRESHOLD: f64 = 0.01;

/// Unit an estimate is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl EstimateUnit {
    fn singular(&self) -> &'static str {
        match self {
            EstimateUnit::Minute => "minute",
            EstimateUnit::Hour => "hour",
            EstimateUnit::Day => "day",
            EstimateUnit::Week => "week",
            EstimateUnit::Month => "month",
            EstimateUnit::Year => "year",
        }
    }
}

/// A rounded duration in a single unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEstimate {
    pub amount: u64,
    pub unit: EstimateUnit,
}

impl TimeEstimate {
    /// Bucket a duration given in days. First match wins:
    ///
    /// | Days          | Unit                                  |
    /// |---------------|---------------------------------------|
    /// | `< 0.01`      | minutes (at least 1)                  |
    /// | `< 1`         | hours (at least 1)                    |
    /// | `== 1`        | "1 day"                               |
    /// | `< 7`         | days                                  |
    /// | `< 30`        | weeks                                 |
    /// | `< 365`       | months (30 days each)                 |
    /// | otherwise     | years (365 days each)                 |
    ///
    /// Non-finite or negative input is treated as zero minutes.
    pub fn from_days(days: f64) -> Self {
        if !days.is_finite() || days <= 0.0 {
            return Self::new(0, EstimateUnit::Minute);
        }

        if days < MINUTE_THRESHOLD {
            Self::new(round(days * 1440.0).max(1), EstimateUnit::Minute)
        } else if days < 1.0 {
            Self::new(round(days * 24.0).max(1), EstimateUnit::Hour)
        } else if days == 1.0 {
            Self::new(1, EstimateUnit::Day)
        } else if days < 7.0 {
            Self::new(round(days), EstimateUnit::Day)
        } else if days < 30.0 {
            Self::new(round(days / 7.0), EstimateUnit::Week)
        } else if days < 365.0 {
            Self::new(round(days / 30.0), EstimateUnit::Month)
        } else {
            Self::new(round(days / 365.0), EstimateUnit::Year)
        }
    }

    fn new(amount: u64, unit: EstimateUnit) -> Self {
        Self { amount, unit }
    }
}

impl std::fmt::Display for TimeEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.amount == 1 {
            write!(f, "1 {}", self.unit.singular())
        } else {
            write!(f, "{} {}s", self.amount, self.unit.singular())
        }
    }
}

/// Render a duration in days as text, e.g. `format_estimate(1.0) == "1 day"`
pub fn format_estimate(days: f64) -> String {
    TimeEstimate::from_days(days).to_string()
}

fn round(value: f64) -> u64 {
    // Inputs are positive and finite here; `as` saturates on huge values
    value.round() as u64
}
