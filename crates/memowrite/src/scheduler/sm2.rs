//! SM-2 review transition
//!
//! Each review moves an item between implicit repetition buckets:
//! - 0 (new or lapsed): a lapse from any bucket lands here with the lapse interval
//! - 1: first consecutive success, fixed first interval
//! - 2: second consecutive success, fixed second interval
//! - 3+: previous interval multiplied by the ease factor
//!
//! The ease factor follows the SuperMemo 2 update
//! `EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))` on every review,
//! lapses included, and is floored at the configured minimum.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::quality::Quality;
use super::types::{Mastery, MemoryState, SchedulerError};
use crate::config::SchedulerConfig;

/// Deterministic spaced repetition scheduler.
///
/// Holds only read-only configuration, so one instance can be shared freely
/// across threads; every call works on the caller's own copy of a state.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler, rejecting unusable configuration
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Initial memory state for a newly created item (due immediately)
    pub fn seed_state(&self) -> MemoryState {
        MemoryState::seed(&self.config)
    }

    /// Whether `state` should be surfaced at `now`
    pub fn is_due(&self, state: &MemoryState, now: DateTime<Utc>) -> bool {
        state.is_due(now)
    }

    /// Validate a raw quality signal, then record the review.
    ///
    /// An out-of-scale signal fails with `InvalidInput` before any state
    /// is computed.
    pub fn review(
        &self,
        state: &MemoryState,
        raw_quality: u8,
        now: DateTime<Utc>,
    ) -> Result<MemoryState, SchedulerError> {
        let quality = Quality::new(raw_quality)?;
        self.record_review(state, quality, now)
    }

    /// Compute the memory state that follows a review of quality `quality`
    /// performed at `now`.
    ///
    /// The input state is left untouched; the returned value replaces it.
    pub fn record_review(
        &self,
        state: &MemoryState,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<MemoryState, SchedulerError> {
        self.check_state(state)?;

        let passed = self.is_pass(quality);
        let (repetitions, interval_days) = if passed {
            let repetitions = state.repetitions.saturating_add(1);
            let interval = match repetitions {
                1 => self.config.first_interval_days,
                2 => self.config.second_interval_days,
                _ => self.grow_interval(state.interval_days, state.ease_factor),
            };
            (repetitions, interval)
        } else {
            (0, self.config.lapse_interval_days)
        };

        let ease_factor = self.next_ease(state.ease_factor, quality);

        let due_at = now
            .checked_add_signed(Duration::days(i64::from(interval_days)))
            .ok_or_else(|| {
                SchedulerError::InvalidState(format!(
                    "due date {interval_days} days after {now} is not representable"
                ))
            })?;

        let next = MemoryState {
            repetitions,
            ease_factor,
            interval_days,
            due_at: Some(due_at),
            last_reviewed_at: Some(now),
            total_attempts: state.total_attempts.saturating_add(1),
            total_correct: state.total_correct.saturating_add(u32::from(passed)),
        };

        if passed {
            debug!(
                quality = quality.value(),
                repetitions = next.repetitions,
                interval_days = next.interval_days,
                ease_factor = next.ease_factor,
                "Review passed"
            );
        } else {
            debug!(
                quality = quality.value(),
                previous_repetitions = state.repetitions,
                ease_factor = next.ease_factor,
                "Review lapsed, resetting repetitions"
            );
        }

        Ok(next)
    }

    /// Whether a quality signal meets the pass threshold
    pub fn is_pass(&self, quality: Quality) -> bool {
        quality.value() >= self.config.pass_threshold
    }

    /// Reject states that no sequence of reviews could have produced.
    ///
    /// These indicate corruption in whatever persisted the state; the data is
    /// reported rather than repaired.
    pub fn check_state(&self, state: &MemoryState) -> Result<(), SchedulerError> {
        if !state.ease_factor.is_finite() || state.ease_factor < self.config.min_ease {
            return Err(SchedulerError::InvalidState(format!(
                "ease factor {} is below the floor {}",
                state.ease_factor, self.config.min_ease
            )));
        }
        if state.repetitions > 0 && state.interval_days == 0 {
            return Err(SchedulerError::InvalidState(format!(
                "{} repetitions with a zero-day interval",
                state.repetitions
            )));
        }
        if state.total_correct > state.total_attempts {
            return Err(SchedulerError::InvalidState(format!(
                "{} correct reviews out of {} attempts",
                state.total_correct, state.total_attempts
            )));
        }
        if state.repetitions > state.total_correct {
            return Err(SchedulerError::InvalidState(format!(
                "{} consecutive successes but only {} correct reviews",
                state.repetitions, state.total_correct
            )));
        }
        if state.due_at.is_some() != state.last_reviewed_at.is_some() {
            return Err(SchedulerError::InvalidState(
                "due date and last review time must be set together".into(),
            ));
        }
        Ok(())
    }

    /// Reporting label for a state
    pub fn mastery(&self, state: &MemoryState) -> Mastery {
        if state.is_new() {
            Mastery::New
        } else if state.repetitions >= self.config.mastery_repetitions
            && state.ease_factor >= self.config.mastery_min_ease
        {
            Mastery::Mastered
        } else if state.repetitions >= 2 {
            Mastery::Reviewing
        } else {
            Mastery::Learning
        }
    }

    /// Interval each quality (0-5) would produce if the review happened at `now`
    pub fn preview(
        &self,
        state: &MemoryState,
        now: DateTime<Utc>,
    ) -> Result<[u32; 6], SchedulerError> {
        let mut intervals = [0; 6];
        for quality in Quality::all() {
            intervals[usize::from(quality.value())] =
                self.record_review(state, quality, now)?.interval_days;
        }
        Ok(intervals)
    }

    /// Grow an interval by the ease factor.
    ///
    /// The result is at least one day longer than `previous` and never
    /// exceeds `max_interval_days`.
    fn grow_interval(&self, previous: u32, ease_factor: f64) -> u32 {
        let raw = f64::from(previous) * ease_factor;
        // float-to-int casts saturate
        let rounded = self.config.rounding.apply(raw) as u32;
        rounded
            .max(previous.saturating_add(1))
            .min(self.config.max_interval_days)
    }

    fn next_ease(&self, ease_factor: f64, quality: Quality) -> f64 {
        let miss = f64::from(Quality::MAX - quality.value());
        let mut next =
            (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(self.config.min_ease);

        if quality.value() == Quality::MAX {
            next += self.config.easy_bonus - 1.0;
        }
        if let Some(max_ease) = self.config.max_ease {
            next = next.min(max_ease);
        }
        next
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }
}
