//! MemoWrite - spaced repetition for free-text answers
//!
//! This crate schedules review of question/answer items with an SM-2 family
//! algorithm and grades free-text answers through an external semantic
//! evaluation service. The scheduler core is pure and deterministic; grading,
//! storage and ingestion are thin collaborators around it.

pub mod config;
pub mod error;
pub mod grader;
pub mod ingest;
pub mod review;
pub mod scheduler;
pub mod store;
pub mod testing;

pub use error::MemoWriteError;
pub use scheduler::{Mastery, MemoryState, Quality, Scheduler, SchedulerError};
