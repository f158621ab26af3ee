//! Test utilities for memowrite - mock grader and fixed clocks
//!
//! The mock grader answers instantly and deterministically so review flows
//! can be exercised without a network service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::grader::{Grade, GradeRequest, GraderError, GraderProvider};

/// Fixed reference instant for deterministic tests
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Grader returning a preset score (or failure) for every answer
#[derive(Debug, Default)]
pub struct MockGrader {
    score: f64,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockGrader {
    /// Grade every answer with `score`
    pub fn new(score: f64) -> Self {
        Self {
            score,
            ..Self::default()
        }
    }

    /// Fail every call with an API error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Sleep before answering, to widen race windows in concurrency tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of grade calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraderProvider for MockGrader {
    async fn grade(&self, request: &GradeRequest) -> Result<Grade, GraderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(GraderError::ApiError("Mock failure".into()));
        }

        Ok(Grade::new(
            self.score,
            format!("Mock feedback for: {}", request.question),
            Vec::new(),
        ))
    }

    async fn is_available(&self) -> bool {
        !self.fail
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GradeRequest {
        GradeRequest::new("Q".into(), "A".into(), "answer".into())
    }

    #[tokio::test]
    async fn test_mock_grader_returns_score() {
        let grader = MockGrader::new(85.0);
        let grade = grader.grade(&request()).await.unwrap();
        assert_eq!(grade.score, 85.0);
        assert_eq!(grade.quality().unwrap().value(), 4);
        assert_eq!(grader.calls(), 1);
        assert!(grader.is_available().await);
    }

    #[tokio::test]
    async fn test_failing_mock_grader() {
        let grader = MockGrader::failing();
        assert!(grader.grade(&request()).await.is_err());
        assert!(!grader.is_available().await);
        assert_eq!(grader.calls(), 1);
    }

    #[test]
    fn test_fixed_now() {
        assert_eq!(fixed_now().to_rfc3339(), "2025-01-01T09:00:00+00:00");
    }
}
