//! Course notes used as grading context
//!
//! Selects the sections of plain-text course notes that share keywords with
//! a question, so the grader sees relevant material without the full notes.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Fallback length when no section matches, in characters
const FALLBACK_CHARS: usize = 2000;

/// Plain-text course notes
#[derive(Debug, Clone, Default)]
pub struct CourseContext {
    content: String,
}

impl CourseContext {
    pub fn new(content: String) -> Self {
        Self { content }
    }

    /// Load notes from a text file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(
            "Loaded {} characters of course notes from {}",
            content.len(),
            path.display()
        );
        Ok(Self::new(content))
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Up to `max_chunks` runs of consecutive lines mentioning a question
    /// keyword (a word longer than 3 characters), joined by separators.
    ///
    /// Falls back to the start of the notes when nothing matches.
    pub fn relevant_sections(&self, question: &str, max_chunks: usize) -> String {
        if self.is_empty() || max_chunks == 0 {
            return String::new();
        }

        let keywords: HashSet<String> = question
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.chars().count() > 3)
            .collect();

        let mut sections: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in self.content.lines() {
            let lower = line.to_lowercase();
            if keywords.iter().any(|k| lower.contains(k.as_str())) {
                current.push(line);
            } else if !current.is_empty() {
                sections.push(current.join("\n"));
                current.clear();
                if sections.len() >= max_chunks {
                    break;
                }
            }
        }

        if !current.is_empty() && sections.len() < max_chunks {
            sections.push(current.join("\n"));
        }

        if sections.is_empty() {
            return self.summary(FALLBACK_CHARS);
        }

        sections.join(SECTION_SEPARATOR)
    }

    /// The first `max_chars` characters of the notes
    pub fn summary(&self, max_chars: usize) -> String {
        truncate_chars(&self.content, max_chars)
    }
}

/// Truncate on a character boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
