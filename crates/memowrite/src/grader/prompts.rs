//! Prompt used by the remote grader
//!
//! Placeholders: {context}, {question}, {reference_answer}, {user_answer},
//! {strictness}

pub const GRADING_PROMPT: &str = r#"You are an expert course instructor grading an exam answer.

COURSE CONTEXT (for reference):
{context}

QUESTION:
{question}

REFERENCE ANSWER (what a complete answer should include):
{reference_answer}

STUDENT'S ANSWER:
{user_answer}

TASK:
Evaluate the student's answer and provide:
1. A numerical score from 0-100 based on:
   - Accuracy and correctness of concepts
   - Completeness compared to the reference answer
   - Understanding demonstrated
   - Grading strictness level: {strictness} (0.0 = lenient, 1.0 = strict)

2. Detailed feedback explaining:
   - What the student got right
   - What is missing or incorrect
   - Suggestions for improvement

3. A list of missing concepts that should have been mentioned

Respond with JSON in this exact format:
{
    "score": <number 0-100>,
    "feedback": "<detailed feedback text>",
    "missing_concepts": ["<concept>", "<concept>"]
}

Return ONLY valid JSON, no other text."#;

/// Fill the grading prompt.
///
/// Placeholders are substituted in a single pass over the template, so
/// braces inside learner text are never expanded.
pub fn render_grading_prompt(
    context: &str,
    question: &str,
    reference_answer: &str,
    user_answer: &str,
    strictness: f32,
) -> String {
    let strictness = format!("{strictness:.1}");
    let values = [
        ("{context}", context),
        ("{question}", question),
        ("{reference_answer}", reference_answer),
        ("{user_answer}", user_answer),
        ("{strictness}", strictness.as_str()),
    ];

    let mut out = String::with_capacity(GRADING_PROMPT.len() + user_answer.len() + context.len());
    let mut rest = GRADING_PROMPT;
    'scan: while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for (placeholder, value) in values {
            if let Some(after) = tail.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_every_placeholder() {
        let prompt = render_grading_prompt(
            "Backprop notes",
            "What is backpropagation?",
            "Gradient computation via the chain rule",
            "It updates weights",
            0.7,
        );

        assert!(prompt.contains("Backprop notes"));
        assert!(prompt.contains("What is backpropagation?"));
        assert!(prompt.contains("Gradient computation via the chain rule"));
        assert!(prompt.contains("It updates weights"));
        assert!(prompt.contains("strictness level: 0.7"));
        for placeholder in [
            "{context}",
            "{question}",
            "{reference_answer}",
            "{user_answer}",
            "{strictness}",
        ] {
            assert!(!prompt.contains(placeholder), "{placeholder} left unfilled");
        }
        // JSON braces in the template survive
        assert!(prompt.contains("\"score\": <number 0-100>"));
    }

    #[test]
    fn test_learner_text_is_not_expanded() {
        let prompt = render_grading_prompt("", "Q", "R", "my answer mentions {strictness}", 0.7);
        assert!(prompt.contains("my answer mentions {strictness}"));
    }
}
