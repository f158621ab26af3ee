use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use memowrite::Scheduler;
use memowrite::config::IngestConfig;
use memowrite::ingest::{Ingestor, QaPair, parse_extraction, parse_plain_text};
use memowrite::store::ItemStore;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ImportFormat {
    /// Extractor reply containing JSON pairs
    Json,
    /// `Q:` / `A:` blocks
    Text,
}

#[derive(Parser)]
pub struct ImportCommand {
    #[clap(help = "File with extracted question/answer pairs")]
    pub file: PathBuf,

    #[clap(
        long,
        short,
        value_enum,
        help = "Input format (guessed from the file extension when omitted)"
    )]
    pub format: Option<ImportFormat>,

    #[clap(long, help = "Source name recorded on each item (defaults to the file name)")]
    pub source: Option<String>,
}

impl ImportCommand {
    pub fn execute(
        &self,
        store: &ItemStore,
        scheduler: &Scheduler,
        config: &IngestConfig,
        format: OutputFormat,
    ) -> CliResult<()> {
        let content = std::fs::read_to_string(&self.file)
            .map_err(|e| format!("Failed to read {}: {e}", self.file.display()))?;
        let pairs = self.parse(&content)?;
        let parsed = pairs.len();

        let source = self.source.clone().or_else(|| {
            self.file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        });

        let ingestor = Ingestor::new(config.clone(), scheduler.clone())?;
        let report = ingestor.ingest(store, pairs, source.as_deref())?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "file": self.file.display().to_string(),
                    "parsed": parsed,
                    "created": report.created.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    "duplicates": report.duplicates,
                    "empty": report.empty,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!(
                    "Imported {} of {} pairs from {}",
                    report.created.len(),
                    parsed,
                    self.file.display()
                );
                if report.duplicates > 0 {
                    println!("Skipped {} duplicate questions", report.duplicates);
                }
                if report.empty > 0 {
                    println!("Skipped {} empty pairs", report.empty);
                }
            }
        }

        Ok(())
    }

    fn parse(&self, content: &str) -> CliResult<Vec<QaPair>> {
        let format = self.format.unwrap_or_else(|| {
            match self.file.extension().and_then(|ext| ext.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("json") => ImportFormat::Json,
                _ => ImportFormat::Text,
            }
        });

        let pairs = match format {
            ImportFormat::Json => parse_extraction(content)?,
            ImportFormat::Text => parse_plain_text(content)?,
        };
        Ok(pairs)
    }
}
