//! Scheduler types
//!
//! Per-item memory state, the reporting mastery label, and scheduler errors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;

/// Complete spaced repetition bookkeeping for one question item.
///
/// Owned by the store and only ever replaced by the value the scheduler
/// returns from a review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    /// Consecutive successful reviews; reset to 0 on a lapse
    pub repetitions: u32,
    /// Multiplier controlling interval growth, never below the configured floor
    pub ease_factor: f64,
    /// Days between the last review and the next one
    pub interval_days: u32,
    /// Next scheduled review; `None` means the item has never been reviewed
    /// and is due immediately
    pub due_at: Option<DateTime<Utc>>,
    /// Time of the most recent review
    pub last_reviewed_at: Option<DateTime<Utc>>,
    /// Every review ever recorded
    pub total_attempts: u32,
    /// Reviews that met the pass threshold
    pub total_correct: u32,
}

impl MemoryState {
    /// Initial state for a newly created item
    pub fn seed(config: &SchedulerConfig) -> Self {
        Self {
            repetitions: 0,
            ease_factor: config.initial_ease,
            interval_days: config.seed_interval_days,
            due_at: None,
            last_reviewed_at: None,
            total_attempts: 0,
            total_correct: 0,
        }
    }

    /// True until the first review has been recorded
    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    /// Whether the item should be surfaced at `now`.
    ///
    /// Never-reviewed items are always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.due_at {
            Some(due_at) => due_at <= now,
            None => true,
        }
    }

    /// Percentage of attempts that passed (0 with no attempts)
    pub fn success_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            f64::from(self.total_correct) / f64::from(self.total_attempts) * 100.0
        }
    }
}

/// Reporting label derived from repetitions and ease; not a scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mastery {
    /// Never reviewed
    New,
    /// Recently introduced or lapsed
    Learning,
    /// Past the fixed intervals, growing by ease
    Reviewing,
    /// Long streak with a healthy ease factor
    Mastered,
}

impl fmt::Display for Mastery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Mastery::New => "new",
            Mastery::Learning => "learning",
            Mastery::Reviewing => "reviewing",
            Mastery::Mastered => "mastered",
        };
        f.write_str(label)
    }
}

/// Scheduler-specific errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulerError {
    /// Quality signal outside the scale, or unusable configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Memory state that could only come from upstream corruption
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
