//! Grader types
//!
//! Requests, grading results and grader-specific errors.

use serde::{Deserialize, Deserializer, Serialize};

use crate::scheduler::{Quality, SchedulerError};

/// Everything the grader needs to evaluate one answer
#[derive(Debug, Clone)]
pub struct GradeRequest {
    pub question: String,
    pub reference_answer: String,
    pub user_answer: String,
    /// Course material relevant to the question (may be empty)
    pub context: String,
}

impl GradeRequest {
    pub fn new(question: String, reference_answer: String, user_answer: String) -> Self {
        Self {
            question,
            reference_answer,
            user_answer,
            context: String::new(),
        }
    }

    /// Attach course context
    pub fn with_context(mut self, context: String) -> Self {
        self.context = context;
        self
    }
}

/// Result of grading one answer.
///
/// Feedback and missing concepts are passed through to the learner and
/// never consumed by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    /// Score 0.0-100.0
    pub score: f64,
    pub feedback: String,
    #[serde(default, deserialize_with = "deserialize_concepts")]
    pub missing_concepts: Vec<String>,
}

impl Grade {
    /// Create a grade, clamping the score into 0-100
    pub fn new(score: f64, feedback: String, missing_concepts: Vec<String>) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            feedback,
            missing_concepts,
        }
    }

    /// Discretize the score for the scheduler
    pub fn quality(&self) -> Result<Quality, SchedulerError> {
        Quality::from_score(self.score)
    }
}

/// Missing concepts arrive either as a JSON array or a comma-separated string
fn deserialize_concepts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Concepts {
        List(Vec<String>),
        Text(String),
        None(Option<()>),
    }

    let concepts = match Concepts::deserialize(deserializer)? {
        Concepts::List(list) => list,
        Concepts::Text(text) => text.split(',').map(str::to_string).collect(),
        Concepts::None(_) => Vec::new(),
    };

    Ok(concepts
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("none"))
        .collect())
}

/// Grader-specific errors
#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
