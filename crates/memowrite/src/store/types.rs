//! Store record types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::{Mastery, MemoryState, Quality};

/// A question/answer pair under review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub question: String,
    pub reference_answer: String,
    /// Document the pair was extracted from, if any
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(question: String, reference_answer: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            reference_answer,
            source: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A single review attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub quality: Quality,
    /// Grader score 0-100; absent for self-rated reviews
    pub score: Option<f64>,
    pub user_answer: Option<String>,
    pub feedback: Option<String>,
    #[serde(default)]
    pub missing_concepts: Vec<String>,
    /// Interval scheduled by this review
    pub interval_days: u32,
    /// Ease factor after this review
    pub ease_factor: f64,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewRecord {
    /// Record for a self-rated review that produced `state`
    pub fn rated(quality: Quality, state: &MemoryState, reviewed_at: DateTime<Utc>) -> Self {
        Self {
            quality,
            score: None,
            user_answer: None,
            feedback: None,
            missing_concepts: Vec::new(),
            interval_days: state.interval_days,
            ease_factor: state.ease_factor,
            reviewed_at,
        }
    }
}

/// Everything stored for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Insertion order, used as a stable tie-breaker
    pub seq: u64,
    pub item: Item,
    pub state: MemoryState,
    #[serde(default)]
    pub history: Vec<ReviewRecord>,
}

/// Aggregate progress across all items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStats {
    pub total_items: usize,
    pub due_now: usize,
    pub total_attempts: u64,
    pub total_correct: u64,
    /// Percentage of attempts that passed
    pub success_rate: f64,
    /// Mean ease factor (0 with no items)
    pub average_ease: f64,
    pub by_mastery: BTreeMap<Mastery, usize>,
}
