//! Spaced repetition scheduling core
//!
//! A pure, synchronous SM-2 family state machine. It consumes a validated
//! quality signal and an item's prior memory state and produces the next
//! memory state, including the next due timestamp. It performs no I/O and
//! never reads the wall clock: callers pass the review time in.

pub mod quality;
pub mod sm2;
pub mod types;

pub use quality::Quality;
pub use sm2::Scheduler;
pub use types::{Mastery, MemoryState, SchedulerError};
