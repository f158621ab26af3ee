//! Spacing repair for text pulled out of documents

use regex::Regex;

use crate::error::{MemoWriteError, Result};

/// Compiled rewrite rules for extracted text
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    camel_case: Regex,
    sentence_punct: Regex,
    clause_punct: Regex,
    open_paren: Regex,
    blank_lines: Regex,
    spaces: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            camel_case: compile(r"([a-z])([A-Z])")?,
            sentence_punct: compile(r"([.!?])([A-Za-z])")?,
            clause_punct: compile(r"([,;:])([A-Za-z])")?,
            open_paren: compile(r"([A-Za-z0-9])(\()")?,
            blank_lines: compile(r"\n\s*\n\s*\n+")?,
            spaces: compile(r"[ \t]+")?,
        })
    }

    /// Repair spacing in `text`.
    ///
    /// Splits words glued at a lower/upper case boundary, adds the missing
    /// space after punctuation and before `(`, collapses runs of spaces and
    /// blank lines, and trims every line. Decimals such as `3.14` are left
    /// alone.
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let text = self.camel_case.replace_all(text, "$1 $2");
        let text = self.sentence_punct.replace_all(&text, "$1 $2");
        let text = self.clause_punct.replace_all(&text, "$1 $2");
        let text = self.open_paren.replace_all(&text, "$1 $2");
        let text = self.spaces.replace_all(&text, " ");
        let text = self.blank_lines.replace_all(&text, "\n\n");

        text.split('\n')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| MemoWriteError::Ingest(format!("Invalid pattern {}: {}", pattern, e)))
}

/// One-off spacing repair; build a [`TextNormalizer`] when cleaning many
/// strings.
pub fn fix_text_spacing(text: &str) -> Result<String> {
    Ok(TextNormalizer::new()?.normalize(text))
}
