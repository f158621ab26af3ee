//! Grader provider trait
//!
//! Abstracts the grading backend so the review flow can run against a
//! remote API in production and a scripted mock in tests.

use async_trait::async_trait;

use crate::grader::types::{Grade, GradeRequest, GraderError};

/// Trait for answer grading backends
#[async_trait]
pub trait GraderProvider: Send + Sync {
    /// Grade a learner's answer against the reference answer
    async fn grade(&self, request: &GradeRequest) -> Result<Grade, GraderError>;

    /// Check if the provider can currently accept requests
    async fn is_available(&self) -> bool;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
