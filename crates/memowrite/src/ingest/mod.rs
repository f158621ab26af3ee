//! Ingestion of question/answer pairs into the item store
//!
//! Document text extraction happens upstream; this module parses what the
//! extractor produced, cleans it up and seeds new items.

mod normalize;
mod parse;

pub use normalize::{TextNormalizer, fix_text_spacing};
pub use parse::{parse_extraction, parse_plain_text};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::IngestConfig;
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::store::{Item, ItemStore};

/// A question with its reference answer, both trimmed and non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    /// Returns `None` when either side is blank after trimming
    pub fn new(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

/// Outcome of one ingest call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    /// Ids of the new items, in input order
    pub created: Vec<Uuid>,
    /// Pairs whose question was already stored
    pub duplicates: usize,
    /// Pairs that became blank after normalization
    pub empty: usize,
}

/// Turns extracted pairs into stored items with fresh memory state
#[derive(Debug, Clone)]
pub struct Ingestor {
    config: IngestConfig,
    scheduler: Scheduler,
    normalizer: TextNormalizer,
}

impl Ingestor {
    pub fn new(config: IngestConfig, scheduler: Scheduler) -> Result<Self> {
        Ok(Self {
            config,
            scheduler,
            normalizer: TextNormalizer::new()?,
        })
    }

    /// Add `pairs` to `store`, tagging each item with `source`.
    ///
    /// Questions already present (including earlier pairs of the same call)
    /// are skipped when `skip_duplicates` is set.
    pub fn ingest(
        &self,
        store: &ItemStore,
        pairs: Vec<QaPair>,
        source: Option<&str>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for pair in pairs {
            let Some(pair) = self.clean(pair) else {
                report.empty += 1;
                continue;
            };

            if self.config.skip_duplicates && store.contains_question(&pair.question)? {
                debug!("Skipping duplicate question: {}", pair.question);
                report.duplicates += 1;
                continue;
            }

            let mut item = Item::new(pair.question, pair.answer);
            if let Some(source) = source {
                item = item.with_source(source.to_string());
            }
            report
                .created
                .push(store.add_item(item, self.scheduler.seed_state())?);
        }

        info!(
            "Ingested {} items ({} duplicates, {} empty)",
            report.created.len(),
            report.duplicates,
            report.empty
        );
        Ok(report)
    }

    fn clean(&self, pair: QaPair) -> Option<QaPair> {
        if !self.config.fix_spacing {
            return Some(pair);
        }
        QaPair::new(
            &self.normalizer.normalize(&pair.question),
            &self.normalizer.normalize(&pair.answer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn ingestor(config: IngestConfig) -> Ingestor {
        Ingestor::new(config, Scheduler::default()).unwrap()
    }

    fn pair(q: &str, a: &str) -> QaPair {
        QaPair::new(q, a).unwrap()
    }

    #[test]
    fn test_qa_pair_trims_and_rejects_blank() {
        assert_eq!(pair("  Q ", " A\n").question, "Q");
        assert!(QaPair::new("", "A").is_none());
        assert!(QaPair::new("Q", "   ").is_none());
    }

    #[test]
    fn test_ingest_seeds_new_items() {
        let store = ItemStore::in_memory().unwrap();
        let report = ingestor(IngestConfig::default()).ingest(
            &store,
            vec![pair("What is DNA?", "Genetic material"), pair("What is RNA?", "A copy")],
            Some("biology.pdf"),
        )
        .unwrap();

        assert_eq!(report.created.len(), 2);
        for id in &report.created {
            let record = store.get(*id).unwrap();
            assert_eq!(record.item.source.as_deref(), Some("biology.pdf"));
            assert_eq!(store.load(*id).unwrap(), Scheduler::default().seed_state());
        }
        assert_eq!(store.list_due(chrono::Utc::now()).unwrap(), report.created);
    }

    #[test]
    fn test_ingest_skips_duplicates() {
        let store = ItemStore::in_memory().unwrap();
        let ingestor = ingestor(IngestConfig::default());
        ingestor.ingest(&store, vec![pair("Q1", "A1")], None).unwrap();

        let report = ingestor
            .ingest(
                &store,
                vec![pair("Q1", "other"), pair("Q2", "A2"), pair("Q2", "again")],
                None,
            )
            .unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn test_ingest_keeps_duplicates_when_disabled() {
        let store = ItemStore::in_memory().unwrap();
        let config = IngestConfig {
            skip_duplicates: false,
            ..IngestConfig::default()
        };
        let report = ingestor(config)
            .ingest(&store, vec![pair("Q", "A"), pair("Q", "A")], None)
            .unwrap();
        assert_eq!(report.created.len(), 2);
    }

    #[test]
    fn test_ingest_fixes_spacing() {
        let store = ItemStore::in_memory().unwrap();
        let report = ingestor(IngestConfig::default()).ingest(
            &store,
            vec![pair("WhatIs the cell?", "The basic unit.Of life")],
            None,
        )
        .unwrap();
        let item = store.get_item(report.created[0]).unwrap();
        assert_eq!(item.question, "What Is the cell?");
        assert_eq!(item.reference_answer, "The basic unit. Of life");
    }

    #[test]
    fn test_ingest_raw_text_when_spacing_disabled() {
        let store = ItemStore::in_memory().unwrap();
        let config = IngestConfig {
            fix_spacing: false,
            ..IngestConfig::default()
        };
        let report = ingestor(config)
            .ingest(&store, vec![pair("HelloWorld", "a.b")], None)
            .unwrap();
        let item = store.get_item(report.created[0]).unwrap();
        assert_eq!(item.question, "HelloWorld");
        assert_eq!(item.reference_answer, "a.b");
    }
}
