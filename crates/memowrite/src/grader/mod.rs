//! Grader module for semantic answer evaluation
//!
//! The grader compares a learner's free-text answer with the reference
//! answer using an external LLM service and returns a 0-100 score plus
//! feedback. The score is discretized into a [`Quality`](crate::Quality)
//! before it reaches the scheduler.

pub mod context;
pub mod prompts;
pub mod provider;
pub mod remote;
pub mod types;

pub use context::CourseContext;
pub use provider::GraderProvider;
pub use remote::RemoteGrader;
pub use types::{Grade, GradeRequest, GraderError};
