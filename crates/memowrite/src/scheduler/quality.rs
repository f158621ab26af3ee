//! Discrete review quality signal
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but the answer was recognized
//! - 2: Incorrect, but the answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect response
//!
//! Anything reaching the scheduler has already been validated here, so the
//! transition function never sees a malformed signal.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::SchedulerError;

/// A validated quality signal on the 0-5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    /// Lowest value on the scale
    pub const MIN: u8 = 0;
    /// Highest value on the scale
    pub const MAX: u8 = 5;

    /// Validate a raw signal
    pub fn new(value: u8) -> Result<Self, SchedulerError> {
        if value > Self::MAX {
            return Err(SchedulerError::InvalidInput(format!(
                "quality {value} is outside the {}-{} scale",
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    /// Map a 0-100 grading score onto the discrete scale.
    ///
    /// Thresholds: 90 -> 5, 80 -> 4, 70 -> 3, 60 -> 2, 50 -> 1, below -> 0.
    /// Finite scores outside 0-100 are clamped first.
    pub fn from_score(score: f64) -> Result<Self, SchedulerError> {
        if !score.is_finite() {
            return Err(SchedulerError::InvalidInput(format!(
                "grading score {score} is not a finite number"
            )));
        }
        let score = score.clamp(0.0, 100.0);
        let value = if score >= 90.0 {
            5
        } else if score >= 80.0 {
            4
        } else if score >= 70.0 {
            3
        } else if score >= 60.0 {
            2
        } else if score >= 50.0 {
            1
        } else {
            0
        };
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// All values on the scale, lowest first
    pub fn all() -> impl Iterator<Item = Quality> {
        (Self::MIN..=Self::MAX).map(Quality)
    }
}

impl TryFrom<u8> for Quality {
    type Error = SchedulerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl FromStr for Quality {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s.trim().parse().map_err(|_| {
            SchedulerError::InvalidInput(format!("quality must be an integer 0-5, got '{s}'"))
        })?;
        Self::new(value)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
