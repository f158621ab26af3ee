//! Question/answer extraction from extractor replies and plain text

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::QaPair;
use crate::error::{MemoWriteError, Result};

/// Keys an extractor may use for the pair list, in lookup order
const PAIR_KEYS: [&str; 3] = ["qa_pairs", "questions", "pairs"];

/// Extract question/answer pairs from an extractor reply.
///
/// The reply may wrap its JSON in a fenced code block, surround it with
/// prose, or be cut off mid-object. The first JSON value is taken with
/// string-aware bracket matching and any unclosed strings or brackets are
/// closed. When that yields nothing, quoted `"question": ..., "answer": ...`
/// fields are pulled out of the raw text instead.
pub fn parse_extraction(text: &str) -> Result<Vec<QaPair>> {
    let body = strip_fence(text)?;

    let mut pairs = match extract_json(body) {
        Some(json) => match serde_json::from_str::<Value>(&json) {
            Ok(value) => pairs_from_value(&value),
            Err(e) => {
                debug!("Extraction reply is not valid JSON: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    if pairs.is_empty() {
        pairs = scan_quoted_pairs(text)?;
        if !pairs.is_empty() {
            warn!("Recovered {} pairs from malformed extraction reply", pairs.len());
        }
    }

    if pairs.is_empty() {
        return Err(MemoWriteError::Ingest(
            "No question/answer pairs found in extraction reply".to_string(),
        ));
    }
    Ok(pairs)
}

/// Parse `Q:` / `A:` blocks.
///
/// Lines after a prefix continue the current question or answer until the
/// next prefix. Prefixes are case-insensitive.
pub fn parse_plain_text(text: &str) -> Result<Vec<QaPair>> {
    enum Field {
        None,
        Question,
        Answer,
    }

    let mut pairs = Vec::new();
    let mut question: Vec<&str> = Vec::new();
    let mut answer: Vec<&str> = Vec::new();
    let mut field = Field::None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_prefix_ci(line, "q:") {
            push_pair(&mut pairs, &question, &answer);
            question = vec![rest.trim()];
            answer.clear();
            field = Field::Question;
        } else if let Some(rest) = strip_prefix_ci(line, "a:") {
            answer = vec![rest.trim()];
            field = Field::Answer;
        } else if !line.is_empty() {
            match field {
                Field::Question => question.push(line),
                Field::Answer => answer.push(line),
                Field::None => {}
            }
        }
    }
    push_pair(&mut pairs, &question, &answer);

    if pairs.is_empty() {
        return Err(MemoWriteError::Ingest(
            "No Q:/A: pairs found in text".to_string(),
        ));
    }
    Ok(pairs)
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

fn push_pair(pairs: &mut Vec<QaPair>, question: &[&str], answer: &[&str]) {
    let question = question.join("\n");
    let answer = answer.join("\n");
    if let Some(pair) = QaPair::new(&question, &answer) {
        pairs.push(pair);
    }
}

/// Contents of the first fenced code block, or the whole text
fn strip_fence(text: &str) -> Result<&str> {
    if !text.contains("```") {
        return Ok(text);
    }
    let fence = Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)(?:```|$)")
        .map_err(|e| MemoWriteError::Ingest(format!("Invalid fence pattern: {}", e)))?;
    Ok(fence
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str()))
}

/// The first JSON object or array in `text`, repaired so it can be parsed.
///
/// Raw newlines inside strings are escaped, and a truncated value gets its
/// open string and brackets closed.
fn extract_json(text: &str) -> Option<String> {
    let start = text.find(['{', '['])?;

    let mut out = String::new();
    let mut closers = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text[start..].chars() {
        if in_string {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                '"' => {
                    in_string = false;
                    out.push(c);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
            continue;
        }

        out.push(c);
        match c {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                closers.pop();
                if closers.is_empty() {
                    return Some(out);
                }
            }
            _ => {}
        }
    }

    // Truncated reply
    if escaped {
        out.pop();
    }
    if in_string {
        out.push('"');
    }
    let trimmed_len = out.trim_end().trim_end_matches(',').len();
    out.truncate(trimmed_len);
    while let Some(closer) = closers.pop() {
        out.push(closer);
    }
    Some(out)
}

fn pairs_from_value(value: &Value) -> Vec<QaPair> {
    let list = match value {
        Value::Array(items) => items,
        Value::Object(map) => match PAIR_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
        {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    list.iter()
        .filter_map(|entry| {
            let question = scalar_text(entry.get("question")?)?;
            let answer = scalar_text(entry.get("answer")?)?;
            QaPair::new(&question, &answer)
        })
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Last resort for replies that will not parse as JSON at all
fn scan_quoted_pairs(text: &str) -> Result<Vec<QaPair>> {
    let pattern = Regex::new(
        r#"(?s)"question"\s*:\s*"((?:[^"\\]|\\.)*)"\s*,\s*"answer"\s*:\s*"((?:[^"\\]|\\.)*)""#,
    )
    .map_err(|e| MemoWriteError::Ingest(format!("Invalid pair pattern: {}", e)))?;

    Ok(pattern
        .captures_iter(text)
        .filter_map(|c| {
            let question = unescape(c.get(1)?.as_str());
            let answer = unescape(c.get(2)?.as_str());
            QaPair::new(&question, &answer)
        })
        .collect())
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
