//! Review ratings
//!
//! The four self-assessed outcomes a learner can give, and the fixed
//! quality numbers the scheduler works with.

use serde::{Deserialize, Serialize};

/// Ratings below this quality are failures
pub const PASSING_QUALITY: u8 = 3;

/// Highest quality number the scheduler accepts
pub const MAX_QUALITY: u8 = 5;

/// Learner's self-rated recall for one review.
///
/// | Rating | Quality | Key |
/// |--------|---------|-----|
/// | Again  | 1       | `1` |
/// | Hard   | 2       | `2` |
/// | Good   | 4       | `3` |
/// | Easy   | 5       | `4` |
///
/// No rating maps to quality 0 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Forgot the answer
    Again,
    /// Recalled with serious difficulty
    Hard,
    /// Recalled correctly
    Good,
    /// Recalled instantly
    Easy,
}

impl Rating {
    /// All ratings in display order
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    /// Internal quality number
    pub fn quality(self) -> u8 {
        match self {
            Rating::Again => 1,
            Rating::Hard => 2,
            Rating::Good => 4,
            Rating::Easy => 5,
        }
    }

    /// Inverse of [`Rating::quality`]
    pub fn from_quality(quality: u8) -> Option<Self> {
        match quality {
            1 => Some(Rating::Again),
            2 => Some(Rating::Hard),
            4 => Some(Rating::Good),
            5 => Some(Rating::Easy),
            _ => None,
        }
    }

    /// Keyboard shortcut for this rating
    pub fn key(self) -> char {
        match self {
            Rating::Again => '1',
            Rating::Hard => '2',
            Rating::Good => '3',
            Rating::Easy => '4',
        }
    }

    /// Map a keyboard shortcut to a rating
    pub fn from_key(key: char) -> Option<Self> {
        Rating::ALL.into_iter().find(|r| r.key() == key)
    }

    /// Whether the scheduler treats this rating as a failed recall
    pub fn is_failure(self) -> bool {
        self.quality() < PASSING_QUALITY
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }

    /// Capitalized label for display
    pub fn label(&self) -> &'static str {
        match self {
            Rating::Again => "Again",
            Rating::Hard => "Hard",
            Rating::Good => "Good",
            Rating::Easy => "Easy",
        }
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "again" => Ok(Rating::Again),
            "hard" => Ok(Rating::Hard),
            "good" => Ok(Rating::Good),
            "easy" => Ok(Rating::Easy),
            _ => Err(format!("Unknown rating: {}", s)),
        }
    }
}
