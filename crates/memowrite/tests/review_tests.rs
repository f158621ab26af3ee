//! Integration tests for the review flow
//!
//! Tests verify that:
//! - Ingested items can be graded end to end through the remote grader
//! - Grader failures and malformed replies leave items untouched
//! - Concurrent answer submissions for one item all land

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use memowrite::MemoWriteError;
use memowrite::config::{GraderConfig, IngestConfig};
use memowrite::grader::{
    CourseContext, Grade, GradeRequest, GraderError, GraderProvider, RemoteGrader,
};
use memowrite::ingest::{Ingestor, parse_extraction};
use memowrite::review::ReviewService;
use memowrite::scheduler::{Mastery, Scheduler};
use memowrite::store::{ItemStore, Store};
use memowrite::testing::{MockGrader, fixed_now};

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "message": { "content": content }
        }]
    })
}

fn grader_config(api_url: String) -> GraderConfig {
    GraderConfig {
        api_url,
        ..GraderConfig::default()
    }
}

/// Store seeded with the pairs of a small extraction reply
fn seeded_store() -> (Arc<ItemStore>, Vec<uuid::Uuid>) {
    let reply = r#"```json
{"qa_pairs": [
  {"question": "What does the learning rate control?", "answer": "The step size of each gradient update"},
  {"question": "What is overfitting?", "answer": "Fitting noise in the training data"}
]}
```"#;
    let store = Arc::new(ItemStore::in_memory().unwrap());
    let ingestor = Ingestor::new(IngestConfig::default(), Scheduler::default()).unwrap();
    let report = ingestor
        .ingest(&store, parse_extraction(reply).unwrap(), Some("ml-notes.pdf"))
        .unwrap();
    (store, report.created)
}

#[tokio::test]
async fn test_ingest_grade_and_schedule() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"```json
{"score": 84, "feedback": "Good, but mention gradients", "missing_concepts": "gradient, step size"}
```"#,
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (store, ids) = seeded_store();
    let grader = RemoteGrader::with_api_key(&grader_config(mock_server.uri()), "key".into())
        .unwrap()
        .with_course_context(CourseContext::new(
            "The learning rate scales every gradient step.".into(),
        ));
    let service = ReviewService::new(Scheduler::default(), store.clone(), Arc::new(grader), 5000);

    let next = service.next_item().unwrap().unwrap();
    assert_eq!(next.item.id, ids[0]);

    let outcome = service
        .submit_answer(ids[0], "How big each update step is", fixed_now())
        .await
        .unwrap();

    let grade = outcome.grade.unwrap();
    assert_eq!(grade.score, 84.0);
    assert_eq!(grade.missing_concepts, vec!["gradient", "step size"]);
    assert_eq!(outcome.quality.value(), 4);
    assert_eq!(outcome.mastery, Mastery::Learning);

    // The reviewed item is no longer due; the other one still is
    let due = store.list_due(fixed_now()).unwrap();
    assert_eq!(due, vec![ids[1]]);
    assert_eq!(
        store.history(ids[0]).unwrap()[0].missing_concepts,
        vec!["gradient", "step size"]
    );
}

#[tokio::test]
async fn test_malformed_grader_reply_leaves_item_untouched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("I think it deserves a B.")),
        )
        .mount(&mock_server)
        .await;

    let (store, ids) = seeded_store();
    let grader =
        RemoteGrader::with_api_key(&grader_config(mock_server.uri()), "key".into()).unwrap();
    let service = ReviewService::new(Scheduler::default(), store.clone(), Arc::new(grader), 5000);
    let before = store.get(ids[0]).unwrap();

    let err = service
        .submit_answer(ids[0], "some answer", fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MemoWriteError::Grader(GraderError::ParseError(_))
    ));
    assert_eq!(store.get(ids[0]).unwrap(), before);
}

#[tokio::test]
async fn test_grader_outage_leaves_item_untouched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down"))
        .mount(&mock_server)
        .await;

    let (store, ids) = seeded_store();
    let grader =
        RemoteGrader::with_api_key(&grader_config(mock_server.uri()), "key".into()).unwrap();
    let service = ReviewService::new(Scheduler::default(), store.clone(), Arc::new(grader), 5000);

    let result = service.submit_answer(ids[1], "answer", fixed_now()).await;
    assert!(matches!(result, Err(MemoWriteError::Grader(_))));
    assert!(store.load(ids[1]).unwrap().is_new());
    assert!(store.history(ids[1]).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_all_land() {
    let (store, ids) = seeded_store();
    let grader = MockGrader::new(92.0).with_delay(Duration::from_millis(10));
    let service = Arc::new(ReviewService::new(
        Scheduler::default(),
        store.clone(),
        Arc::new(grader),
        5000,
    ));

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let service = Arc::clone(&service);
            let id = ids[0];
            tokio::spawn(async move {
                service
                    .submit_answer(id, &format!("attempt {i}"), fixed_now())
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let state = store.load(ids[0]).unwrap();
    assert_eq!(state.total_attempts, 10);
    assert_eq!(state.repetitions, 10);
    assert_eq!(store.history(ids[0]).unwrap().len(), 10);
}

/// Full marks for an exact match; echoes the question as feedback
struct EchoGrader;

#[async_trait]
impl GraderProvider for EchoGrader {
    async fn grade(&self, request: &GradeRequest) -> Result<Grade, GraderError> {
        let score = if request.user_answer == request.reference_answer {
            100.0
        } else {
            0.0
        };
        Ok(Grade::new(score, request.question.clone(), Vec::new()))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

#[tokio::test]
async fn test_grader_sees_item_and_trimmed_answer() {
    let (store, ids) = seeded_store();
    let service =
        ReviewService::new(Scheduler::default(), store.clone(), Arc::new(EchoGrader), 5000);

    let outcome = service
        .submit_answer(ids[1], "  Fitting noise in the training data \n", fixed_now())
        .await
        .unwrap();
    let grade = outcome.grade.unwrap();
    assert_eq!(grade.score, 100.0);
    assert_eq!(grade.feedback, "What is overfitting?");

    let outcome = service.submit_answer(ids[1], "no idea", fixed_now()).await.unwrap();
    assert_eq!(outcome.quality.value(), 0);
    assert_eq!(outcome.state.repetitions, 0);
}
