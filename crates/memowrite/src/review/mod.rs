//! Review flow: grade a learner answer, schedule the item, record history
//!
//! Grading is the slow step and runs outside any store transaction. The
//! resulting quality is applied to whatever state the item has when the
//! review transaction starts, so two submissions for the same item both land.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{MemoWriteError, Result};
use crate::grader::{Grade, GradeRequest, GraderError, GraderProvider};
use crate::scheduler::{Mastery, MemoryState, Quality, Scheduler};
use crate::store::{ItemRecord, ItemStore, ReviewRecord};

/// Result of one review
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub item_id: Uuid,
    /// Grader verdict; absent for self-rated reviews
    pub grade: Option<Grade>,
    pub quality: Quality,
    /// State after the review
    pub state: MemoryState,
    pub mastery: Mastery,
}

pub struct ReviewService {
    scheduler: Scheduler,
    store: Arc<ItemStore>,
    grader: Option<Arc<dyn GraderProvider>>,
    max_answer_length: usize,
}

impl ReviewService {
    pub fn new(
        scheduler: Scheduler,
        store: Arc<ItemStore>,
        grader: Arc<dyn GraderProvider>,
        max_answer_length: usize,
    ) -> Self {
        Self {
            scheduler,
            store,
            grader: Some(grader),
            max_answer_length,
        }
    }

    /// Service that only accepts self-rated reviews
    pub fn self_rated(scheduler: Scheduler, store: Arc<ItemStore>) -> Self {
        Self {
            scheduler,
            store,
            grader: None,
            max_answer_length: 0,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    /// Item the learner should study next
    pub fn next_item(&self) -> Result<Option<ItemRecord>> {
        self.store.next_item()
    }

    /// Grade a free-text answer and reschedule the item.
    ///
    /// A rejected answer or a grader failure leaves the item untouched.
    pub async fn submit_answer(
        &self,
        item_id: Uuid,
        answer: &str,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        let grader = self.grader.as_ref().ok_or_else(|| {
            GraderError::ConfigError("no grader configured for this review session".to_string())
        })?;
        let answer = self.check_answer(answer)?;
        let item = self.store.get_item(item_id)?;

        let request = GradeRequest::new(item.question, item.reference_answer, answer.to_string());
        let grade = grader.grade(&request).await.map_err(|e| {
            warn!("Grading failed for item {} via {}: {}", item_id, grader.name(), e);
            e
        })?;
        let quality = grade.quality()?;

        let state = self.store.apply_review(item_id, |_, current| {
            let next = self.scheduler.record_review(current, quality, now)?;
            let mut entry = ReviewRecord::rated(quality, &next, now);
            entry.score = Some(grade.score);
            entry.user_answer = Some(answer.to_string());
            entry.feedback = Some(grade.feedback.clone());
            entry.missing_concepts = grade.missing_concepts.clone();
            Ok((next, entry))
        })?;

        info!(
            "Reviewed item {}: score {:.1}, quality {}, next in {} days",
            item_id, grade.score, quality, state.interval_days
        );
        Ok(self.outcome(item_id, Some(grade), quality, state))
    }

    /// Reschedule an item from a self-assessed quality (0-5)
    pub fn submit_quality(
        &self,
        item_id: Uuid,
        raw_quality: u8,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        let quality = Quality::new(raw_quality)?;
        let state = self.store.apply_review(item_id, |_, current| {
            let next = self.scheduler.record_review(current, quality, now)?;
            let entry = ReviewRecord::rated(quality, &next, now);
            Ok((next, entry))
        })?;

        info!(
            "Rated item {}: quality {}, next in {} days",
            item_id, quality, state.interval_days
        );
        Ok(self.outcome(item_id, None, quality, state))
    }

    fn check_answer<'a>(&self, answer: &'a str) -> Result<&'a str> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(MemoWriteError::InvalidAnswer(
                "Answer cannot be empty".to_string(),
            ));
        }
        let length = answer.chars().count();
        if length > self.max_answer_length {
            return Err(MemoWriteError::InvalidAnswer(format!(
                "Answer is {} characters; the limit is {}",
                length, self.max_answer_length
            )));
        }
        Ok(answer)
    }

    fn outcome(
        &self,
        item_id: Uuid,
        grade: Option<Grade>,
        quality: Quality,
        state: MemoryState,
    ) -> ReviewOutcome {
        ReviewOutcome {
            item_id,
            grade,
            quality,
            mastery: self.scheduler.mastery(&state),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Item, Store};
    use crate::testing::{MockGrader, fixed_now};

    fn service(grader: MockGrader) -> (ReviewService, Uuid) {
        let store = Arc::new(ItemStore::in_memory().unwrap());
        let scheduler = Scheduler::default();
        let id = store
            .add_item(
                Item::new("What is ATP?".into(), "Energy currency".into()),
                scheduler.seed_state(),
            )
            .unwrap();
        let service = ReviewService::new(scheduler, store, Arc::new(grader), 20);
        (service, id)
    }

    #[tokio::test]
    async fn test_submit_answer_schedules_item() {
        let (service, id) = service(MockGrader::new(95.0));
        let outcome = service.submit_answer(id, "It stores energy", fixed_now()).await.unwrap();

        assert_eq!(outcome.quality.value(), 5);
        assert_eq!(outcome.state.repetitions, 1);
        assert_eq!(outcome.state.interval_days, 1);
        assert_eq!(outcome.mastery, Mastery::Learning);
        assert_eq!(service.store().load(id).unwrap(), outcome.state);

        let history = service.store().history(id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, Some(95.0));
        assert_eq!(history[0].user_answer.as_deref(), Some("It stores energy"));
        assert!(history[0].feedback.is_some());
    }

    #[tokio::test]
    async fn test_low_score_is_a_lapse() {
        let (service, id) = service(MockGrader::new(40.0));
        let outcome = service.submit_answer(id, "no idea", fixed_now()).await.unwrap();

        assert_eq!(outcome.quality.value(), 0);
        assert_eq!(outcome.state.repetitions, 0);
        assert_eq!(outcome.state.total_attempts, 1);
        assert_eq!(outcome.state.total_correct, 0);
    }

    #[tokio::test]
    async fn test_invalid_answers_are_rejected_before_grading() {
        let (service, id) = service(MockGrader::new(90.0));
        let before = service.store().get(id).unwrap();

        let empty = service.submit_answer(id, "   ", fixed_now()).await;
        assert!(matches!(empty, Err(MemoWriteError::InvalidAnswer(_))));

        let long = service
            .submit_answer(id, &"x".repeat(21), fixed_now())
            .await;
        assert!(matches!(long, Err(MemoWriteError::InvalidAnswer(_))));

        assert_eq!(service.store().get(id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_grader_failure_leaves_state_untouched() {
        let (service, id) = service(MockGrader::failing());
        let before = service.store().get(id).unwrap();

        let result = service.submit_answer(id, "answer", fixed_now()).await;
        assert!(matches!(result, Err(MemoWriteError::Grader(_))));
        assert_eq!(service.store().get(id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let (service, _) = service(MockGrader::new(90.0));
        let missing = Uuid::new_v4();
        assert!(matches!(
            service.submit_answer(missing, "answer", fixed_now()).await,
            Err(MemoWriteError::NotFound(_))
        ));
        assert!(matches!(
            service.submit_quality(missing, 4, fixed_now()),
            Err(MemoWriteError::NotFound(_))
        ));
    }

    #[test]
    fn test_submit_quality() {
        let (service, id) = service(MockGrader::new(0.0));
        let outcome = service.submit_quality(id, 4, fixed_now()).unwrap();

        assert!(outcome.grade.is_none());
        assert_eq!(outcome.state.repetitions, 1);
        assert_eq!(service.store().history(id).unwrap()[0].score, None);
    }

    #[tokio::test]
    async fn test_self_rated_service_cannot_grade() {
        let store = Arc::new(ItemStore::in_memory().unwrap());
        let scheduler = Scheduler::default();
        let id = store
            .add_item(Item::new("Q".into(), "A".into()), scheduler.seed_state())
            .unwrap();
        let service = ReviewService::self_rated(scheduler, store);

        assert!(matches!(
            service.submit_answer(id, "answer", fixed_now()).await,
            Err(MemoWriteError::Grader(GraderError::ConfigError(_)))
        ));
        assert_eq!(service.submit_quality(id, 5, fixed_now()).unwrap().state.repetitions, 1);
    }

    #[test]
    fn test_submit_quality_rejects_out_of_scale() {
        let (service, id) = service(MockGrader::new(0.0));
        let before = service.store().get(id).unwrap();

        assert!(matches!(
            service.submit_quality(id, 6, fixed_now()),
            Err(MemoWriteError::Scheduler(_))
        ));
        assert_eq!(service.store().get(id).unwrap(), before);
    }
}
