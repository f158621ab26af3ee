use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memowrite::Scheduler;
use memowrite::config::GraderConfig;
use memowrite::grader::{CourseContext, RemoteGrader};
use memowrite::review::{ReviewOutcome, ReviewService};
use memowrite::store::ItemStore;
use tracing::info;

use super::parse_id;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_due};

#[derive(Parser)]
pub struct ReviewCommand {
    #[clap(subcommand)]
    pub command: ReviewSubcommand,
}

#[derive(Subcommand)]
pub enum ReviewSubcommand {
    #[clap(about = "Show the next item to study")]
    Next,

    #[clap(about = "Answer an item and have it graded")]
    Answer(AnswerArgs),

    #[clap(about = "Rate your own recall of an item (0-5)")]
    Rate(RateArgs),
}

#[derive(Parser)]
pub struct AnswerArgs {
    #[clap(help = "Item ID (UUID format)")]
    pub id: String,

    #[clap(help = "Your answer")]
    pub answer: String,
}

#[derive(Parser)]
pub struct RateArgs {
    #[clap(help = "Item ID (UUID format)")]
    pub id: String,

    #[clap(help = "Recall quality: 0 (blackout) to 5 (perfect)")]
    pub quality: u8,
}

impl ReviewCommand {
    pub async fn execute(
        &self,
        store: Arc<ItemStore>,
        scheduler: Scheduler,
        grader_config: &GraderConfig,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ReviewSubcommand::Next => Self::next(&store, format),
            ReviewSubcommand::Answer(args) => {
                let service = ReviewService::new(
                    scheduler,
                    store.clone(),
                    Arc::new(build_grader(grader_config)?),
                    grader_config.max_answer_length,
                );
                let id = parse_id(&args.id)?;
                let outcome = service.submit_answer(id, &args.answer, Utc::now()).await?;
                Self::print_outcome(&store, &outcome, format)
            }
            ReviewSubcommand::Rate(args) => {
                let id = parse_id(&args.id)?;
                let outcome = ReviewService::self_rated(scheduler, store.clone())
                    .submit_quality(id, args.quality, Utc::now())?;
                Self::print_outcome(&store, &outcome, format)
            }
        }
    }

    fn next(store: &ItemStore, format: OutputFormat) -> CliResult<()> {
        let now = Utc::now();
        let record = store.next_item()?;

        match format {
            OutputFormat::Json => {
                let output = match &record {
                    Some(r) => serde_json::json!({
                        "id": r.item.id.to_string(),
                        "question": &r.item.question,
                        "due": r.state.is_due(now),
                        "due_at": r.state.due_at.map(|d| d.to_rfc3339()),
                    }),
                    None => serde_json::Value::Null,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => match &record {
                None => println!(
                    "No items yet. Add some with `memowrite item add` or `memowrite import`."
                ),
                Some(r) => {
                    if !r.state.is_due(now) {
                        println!(
                            "Nothing is due. Next review: {}",
                            format_due(r.state.due_at.as_ref())
                        );
                        println!();
                    }
                    println!("ID: {}", r.item.id);
                    println!("Q:  {}", r.item.question);
                }
            },
        }

        Ok(())
    }

    fn print_outcome(
        store: &ItemStore,
        outcome: &ReviewOutcome,
        format: OutputFormat,
    ) -> CliResult<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(outcome)?);
            }
            OutputFormat::Table => {
                let item = store.get_item(outcome.item_id)?;

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                if let Some(grade) = &outcome.grade {
                    table.add_row(["Score", &format!("{:.0}/100", grade.score)]);
                    table.add_row(["Feedback", &grade.feedback]);
                    if !grade.missing_concepts.is_empty() {
                        table.add_row(["Missing", &grade.missing_concepts.join(", ")]);
                    }
                }
                table.add_row(["Quality", &format!("{}/5", outcome.quality)]);
                table.add_row(["Reference Answer", &item.reference_answer]);
                table.add_row(["Mastery", &outcome.mastery.to_string()]);
                table.add_row(["Next Review", &format_due(outcome.state.due_at.as_ref())]);
                table.add_row(["Interval", &format!("{} days", outcome.state.interval_days)]);

                println!("{table}");
            }
        }

        Ok(())
    }
}

/// Remote grader from config, with course notes when configured
fn build_grader(config: &GraderConfig) -> CliResult<RemoteGrader> {
    let mut grader = RemoteGrader::new(config)?;
    if let Some(path) = &config.course_notes {
        grader = grader.with_course_context(CourseContext::from_file(path)?);
        info!("Using course notes from {}", path.display());
    }
    Ok(grader)
}
