//! Remote grader using OpenAI-compatible APIs
//!
//! Implements the GraderProvider trait for remote LLM APIs via HTTP.
//! Supports any OpenAI-compatible endpoint with configurable URL, model,
//! and API key via environment variable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GraderConfig;
use crate::grader::context::{CourseContext, truncate_chars};
use crate::grader::prompts::render_grading_prompt;
use crate::grader::types::{Grade, GradeRequest, GraderError};
use crate::grader::GraderProvider;

/// Sections of course notes considered per question
const CONTEXT_CHUNKS: usize = 3;

const MAX_RETRIES: u32 = 3;

/// Remote grader using OpenAI-compatible HTTP APIs
#[derive(Debug)]
pub struct RemoteGrader {
    client: Client,
    config: GraderConfig,
    api_key: String,
    course_context: CourseContext,
    retry_delay: Duration,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

/// Message in the chat completion request
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

/// Choice in the chat completion response
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// Message in the response choice
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl RemoteGrader {
    /// Create a new remote grader with the given configuration
    ///
    /// Reads the API key from the environment variable specified in config.api_key_env.
    /// Returns an error if the environment variable is not set.
    pub fn new(config: &GraderConfig) -> Result<Self, GraderError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            GraderError::ConfigError(format!("API key env var '{}' not set", config.api_key_env))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a grader with an explicit API key
    pub fn with_api_key(config: &GraderConfig, api_key: String) -> Result<Self, GraderError> {
        if config.api_url.is_empty() {
            return Err(GraderError::ConfigError(
                "grader api_url is not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GraderError::ApiError(e.to_string()))?;

        info!(
            "RemoteGrader initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
            course_context: CourseContext::default(),
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Use course notes as grading context
    pub fn with_course_context(mut self, context: CourseContext) -> Self {
        self.course_context = context;
        self
    }

    /// Override the first backoff delay (doubled after each retry)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Call the remote API with exponential backoff
    ///
    /// Makes up to 3 attempts, backing off 1s, 2s, 4s on 429 responses and
    /// transport errors.
    async fn call_api(&self, prompt: &str) -> Result<String, GraderError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: "You are a precise exam grader. Reply with JSON only.".to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.1,
            max_tokens: 1024,
        };

        let url = format!("{}/chat/completions", self.config.api_url.trim_end_matches('/'));
        debug!("Calling grading API at: {}", url);

        let mut last_error = None;
        let mut delay = self.retry_delay;

        for attempt in 0..MAX_RETRIES {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{}, waiting {:?}",
                            attempt + 1,
                            MAX_RETRIES,
                            delay
                        );
                        last_error = Some(format!("rate limited ({status})"));
                        if attempt < MAX_RETRIES - 1 {
                            tokio::time::sleep(delay).await;
                            delay *= 2;
                        }
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(GraderError::ApiError(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| GraderError::ParseError(e.to_string()))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| GraderError::ApiError("Empty response".to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_RETRIES - 1 {
                        warn!(
                            "Request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(GraderError::ApiError(format!(
            "Failed after {} attempts: {}",
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn context_for(&self, request: &GradeRequest) -> String {
        let context = if request.context.is_empty() {
            self.course_context
                .relevant_sections(&request.question, CONTEXT_CHUNKS)
        } else {
            request.context.clone()
        };
        truncate_chars(&context, self.config.max_context_chars)
    }
}

/// Parse the model's reply into a grade.
///
/// Tolerates markdown code fences and prose around the JSON object.
pub fn parse_grade_response(response: &str) -> Result<Grade, GraderError> {
    let body = strip_code_fences(response);
    let json = match (body.find('{'), body.rfind('}')) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => body,
    };

    let grade: Grade = serde_json::from_str(json).map_err(|e| {
        GraderError::ParseError(format!("Failed to parse grading JSON: {e}"))
    })?;

    Ok(Grade::new(grade.score, grade.feedback, grade.missing_concepts))
}

/// Content of the first fenced code block, or the trimmed input when there is none
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(open) = text.find("```") else {
        return text;
    };

    let after_open = &text[open + 3..];
    // skip an optional language tag on the fence line
    let body_start = after_open.find('\n').map_or(0, |i| i + 1);
    let tag = after_open[..body_start].trim();
    let body = if tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        &after_open[body_start..]
    } else {
        after_open
    };

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

#[async_trait]
impl GraderProvider for RemoteGrader {
    async fn grade(&self, request: &GradeRequest) -> Result<Grade, GraderError> {
        let context = self.context_for(request);
        let prompt = render_grading_prompt(
            &context,
            &request.question,
            &request.reference_answer,
            &request.user_answer,
            self.config.strictness,
        );

        let response = self.call_api(&prompt).await?;
        debug!("Grading response: {}", response);

        let grade = parse_grade_response(&response)?;
        info!(
            "Graded answer: score {:.1}, {} missing concepts",
            grade.score,
            grade.missing_concepts.len()
        );
        Ok(grade)
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty() && !self.config.api_url.is_empty()
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config(api_url: String) -> GraderConfig {
        GraderConfig {
            api_url,
            api_key_env: "MEMOWRITE_TEST_API_KEY".to_string(),
            ..GraderConfig::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": { "content": content }
            }]
        })
    }

    fn request() -> GradeRequest {
        GradeRequest::new(
            "What does the learning rate control?".to_string(),
            "The step size of each gradient update".to_string(),
            "How big the steps are".to_string(),
        )
    }

    #[test]
    fn test_remote_grader_new_missing_api_key() {
        unsafe { env::remove_var("MEMOWRITE_MISSING_KEY") };

        let config = GraderConfig {
            api_url: "https://api.example.com/v1".to_string(),
            api_key_env: "MEMOWRITE_MISSING_KEY".to_string(),
            ..GraderConfig::default()
        };
        let err = RemoteGrader::new(&config).unwrap_err().to_string();
        assert!(err.contains("MEMOWRITE_MISSING_KEY"));
    }

    #[test]
    fn test_remote_grader_requires_api_url() {
        let config = create_test_config(String::new());
        let result = RemoteGrader::with_api_key(&config, "key".to_string());
        assert!(matches!(result, Err(GraderError::ConfigError(_))));
    }

    #[test]
    fn test_parse_plain_json() {
        let grade = parse_grade_response(
            r#"{"score": 82, "feedback": "Mostly right", "missing_concepts": "momentum"}"#,
        )
        .unwrap();
        assert_eq!(grade.score, 82.0);
        assert_eq!(grade.feedback, "Mostly right");
        assert_eq!(grade.missing_concepts, vec!["momentum"]);
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n{\"score\": 91, \"feedback\": \"Great\", \"missing_concepts\": []}\n```";
        let grade = parse_grade_response(reply).unwrap();
        assert_eq!(grade.score, 91.0);
        assert!(grade.missing_concepts.is_empty());
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let reply = "Here is the evaluation:\n{\"score\": 40, \"feedback\": \"Incomplete\"}\nThanks!";
        let grade = parse_grade_response(reply).unwrap();
        assert_eq!(grade.score, 40.0);
    }

    #[test]
    fn test_parse_clamps_score() {
        let grade = parse_grade_response(r#"{"score": 140, "feedback": "?"}"#).unwrap();
        assert_eq!(grade.score, 100.0);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let result = parse_grade_response("I cannot grade this.");
        assert!(matches!(result, Err(GraderError::ParseError(_))));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_remote_grader_grades_answer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"score": 75, "feedback": "Right idea, vague wording", "missing_concepts": ["gradient"]}"#,
            )))
            .mount(&mock_server)
            .await;

        let config = create_test_config(mock_server.uri());
        let grader = RemoteGrader::with_api_key(&config, "test-key".to_string()).unwrap();

        let grade = grader.grade(&request()).await.unwrap();
        assert_eq!(grade.score, 75.0);
        assert_eq!(grade.quality().unwrap().value(), 3);
        assert_eq!(grade.missing_concepts, vec!["gradient"]);
    }

    #[tokio::test]
    async fn test_remote_grader_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let config = create_test_config(mock_server.uri());
        let grader = RemoteGrader::with_api_key(&config, "test-key".to_string()).unwrap();

        let err = grader.grade(&request()).await.unwrap_err();
        assert!(matches!(err, GraderError::ApiError(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_remote_grader_retries_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"score": 95, "feedback": "Perfect"}"#,
            )))
            .mount(&mock_server)
            .await;

        let config = create_test_config(mock_server.uri());
        let grader = RemoteGrader::with_api_key(&config, "test-key".to_string())
            .unwrap()
            .with_retry_delay(Duration::from_millis(5));

        let grade = grader.grade(&request()).await.unwrap();
        assert_eq!(grade.score, 95.0);
    }

    #[tokio::test]
    async fn test_remote_grader_gives_up_after_retries() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&mock_server)
            .await;

        let config = create_test_config(mock_server.uri());
        let grader = RemoteGrader::with_api_key(&config, "test-key".to_string())
            .unwrap()
            .with_retry_delay(Duration::from_millis(5));

        let err = grader.grade(&request()).await.unwrap_err();
        assert!(err.to_string().contains("Failed after 3 attempts"));
    }

    #[tokio::test]
    async fn test_remote_grader_is_available() {
        let config = create_test_config("https://api.example.com/v1".to_string());
        let grader = RemoteGrader::with_api_key(&config, "key".to_string()).unwrap();
        assert!(grader.is_available().await);
        assert_eq!(grader.name(), "remote");
    }

    #[test]
    fn test_context_prefers_request_context_and_truncates() {
        let config = GraderConfig {
            api_url: "https://api.example.com/v1".to_string(),
            max_context_chars: 5,
            ..GraderConfig::default()
        };
        let grader = RemoteGrader::with_api_key(&config, "key".to_string())
            .unwrap()
            .with_course_context(CourseContext::new("learning rate notes".to_string()));

        assert_eq!(grader.context_for(&request()), "learn");

        let with_context = request().with_context("explicit context".to_string());
        assert_eq!(grader.context_for(&with_context), "expli");
    }
}
