use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memowrite::Scheduler;
use memowrite::store::{Item, ItemRecord, ItemStore, Store};

use super::parse_id;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_due, format_timestamp, truncate_string};

#[derive(Parser)]
pub struct ItemCommand {
    #[clap(subcommand)]
    pub command: ItemSubcommand,
}

#[derive(Subcommand)]
pub enum ItemSubcommand {
    #[clap(about = "Add a question/answer item")]
    Add(AddArgs),

    #[clap(about = "List items")]
    List(ListArgs),

    #[clap(about = "Show item details and review history")]
    Show(ShowArgs),

    #[clap(about = "Change the question or reference answer of an item")]
    Edit(EditArgs),

    #[clap(about = "Delete an item")]
    Delete(DeleteArgs),

    #[clap(about = "Delete every item")]
    Clear(ClearArgs),
}

#[derive(Parser)]
pub struct AddArgs {
    #[clap(help = "Question text")]
    pub question: String,

    #[clap(help = "Reference answer")]
    pub answer: String,

    #[clap(long, help = "Document the item came from")]
    pub source: Option<String>,
}

#[derive(Parser)]
pub struct ListArgs {
    #[clap(
        long,
        short,
        default_value = "50",
        help = "Maximum number of items to display"
    )]
    pub limit: usize,

    #[clap(long, help = "Show only items due now, in review order")]
    pub due: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(help = "Item ID (UUID format)")]
    pub id: String,
}

#[derive(Parser)]
pub struct EditArgs {
    #[clap(help = "Item ID (UUID format)")]
    pub id: String,

    #[clap(long, short, help = "New question text")]
    pub question: Option<String>,

    #[clap(long, short, help = "New reference answer")]
    pub answer: Option<String>,
}

#[derive(Parser)]
pub struct DeleteArgs {
    #[clap(help = "Item ID to delete (UUID format)")]
    pub id: String,
}

#[derive(Parser)]
pub struct ClearArgs {
    #[clap(long, help = "Confirm deletion of all items")]
    pub yes: bool,
}

impl ItemCommand {
    pub fn execute(
        &self,
        store: &ItemStore,
        scheduler: &Scheduler,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ItemSubcommand::Add(args) => Self::add(store, scheduler, args, format),
            ItemSubcommand::List(args) => Self::list(store, scheduler, args, format),
            ItemSubcommand::Show(args) => Self::show(store, scheduler, args, format),
            ItemSubcommand::Edit(args) => Self::edit(store, args, format),
            ItemSubcommand::Delete(args) => Self::delete(store, args, format),
            ItemSubcommand::Clear(args) => Self::clear(store, args, format),
        }
    }

    fn add(
        store: &ItemStore,
        scheduler: &Scheduler,
        args: &AddArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let question = args.question.trim();
        let answer = args.answer.trim();
        if question.is_empty() || answer.is_empty() {
            return Err("Question and answer must not be empty".into());
        }

        let mut item = Item::new(question.to_string(), answer.to_string());
        if let Some(source) = &args.source {
            item = item.with_source(source.clone());
        }
        let id = store.add_item(item, scheduler.seed_state())?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": id.to_string(),
                    "created": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Item created successfully.");
                println!("ID: {id}");
            }
        }

        Ok(())
    }

    fn list(
        store: &ItemStore,
        scheduler: &Scheduler,
        args: &ListArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let mut records: Vec<ItemRecord> = if args.due {
            store
                .list_due(Utc::now())?
                .into_iter()
                .filter_map(|id| store.get(id).ok())
                .collect()
        } else {
            store.list_items()?
        };
        let total = records.len();
        records.truncate(args.limit);

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = records
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "id": r.item.id.to_string(),
                            "question": &r.item.question,
                            "mastery": scheduler.mastery(&r.state),
                            "repetitions": r.state.repetitions,
                            "ease_factor": r.state.ease_factor,
                            "interval_days": r.state.interval_days,
                            "due_at": r.state.due_at.map(|d| d.to_rfc3339()),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if records.is_empty() {
                    if args.due {
                        println!("Nothing is due.");
                    } else {
                        println!("No items found.");
                    }
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["ID", "Question", "Mastery", "Reps", "Ease", "Interval", "Due"]);

                for record in &records {
                    table.add_row([
                        truncate_string(&record.item.id.to_string(), 8),
                        truncate_string(&record.item.question, 50),
                        scheduler.mastery(&record.state).to_string(),
                        record.state.repetitions.to_string(),
                        format!("{:.2}", record.state.ease_factor),
                        format!("{}d", record.state.interval_days),
                        format_due(record.state.due_at.as_ref()),
                    ]);
                }

                println!("{table}");
                println!("\nShowing {} of {} items", records.len(), total);
            }
        }

        Ok(())
    }

    fn show(
        store: &ItemStore,
        scheduler: &Scheduler,
        args: &ShowArgs,
        format: OutputFormat,
    ) -> CliResult<()> {
        let id = parse_id(&args.id)?;
        let record = store.get(id)?;
        let state = &record.state;
        let preview = scheduler.preview(state, Utc::now())?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "item": &record.item,
                    "state": state,
                    "mastery": scheduler.mastery(state),
                    "success_rate": state.success_rate(),
                    "next_intervals": preview,
                    "history": &record.history,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                table.add_row(["ID", &record.item.id.to_string()]);
                table.add_row(["Question", &record.item.question]);
                table.add_row(["Answer", &record.item.reference_answer]);
                table.add_row(["Source", record.item.source.as_deref().unwrap_or("-")]);
                table.add_row(["Created", &format_timestamp(&record.item.created_at)]);
                table.add_row(["Mastery", &scheduler.mastery(state).to_string()]);
                table.add_row(["Repetitions", &state.repetitions.to_string()]);
                table.add_row(["Ease Factor", &format!("{:.2}", state.ease_factor)]);
                table.add_row(["Interval", &format!("{} days", state.interval_days)]);
                table.add_row(["Due", &format_due(state.due_at.as_ref())]);
                table.add_row([
                    "Last Reviewed",
                    &state
                        .last_reviewed_at
                        .as_ref()
                        .map_or_else(|| "never".to_string(), format_timestamp),
                ]);
                table.add_row([
                    "Attempts",
                    &format!(
                        "{} ({} correct, {:.0}%)",
                        state.total_attempts,
                        state.total_correct,
                        state.success_rate()
                    ),
                ]);
                table.add_row([
                    "Next Interval by Quality",
                    &preview
                        .iter()
                        .enumerate()
                        .map(|(q, days)| format!("{q}: {days}d"))
                        .collect::<Vec<_>>()
                        .join("  "),
                ]);

                println!("{table}");

                if !record.history.is_empty() {
                    let mut history = Table::new();
                    history
                        .load_preset(UTF8_FULL_CONDENSED)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(["Reviewed", "Quality", "Score", "Interval", "Feedback"]);

                    for entry in &record.history {
                        history.add_row([
                            format_timestamp(&entry.reviewed_at),
                            entry.quality.to_string(),
                            entry
                                .score
                                .map_or_else(|| "-".to_string(), |s| format!("{s:.0}")),
                            format!("{}d", entry.interval_days),
                            truncate_string(entry.feedback.as_deref().unwrap_or("-"), 60),
                        ]);
                    }

                    println!("\nReview history:");
                    println!("{history}");
                }
            }
        }

        Ok(())
    }

    fn edit(store: &ItemStore, args: &EditArgs, format: OutputFormat) -> CliResult<()> {
        let id = parse_id(&args.id)?;
        if args.question.is_none() && args.answer.is_none() {
            return Err("Nothing to change: pass --question and/or --answer".into());
        }

        let item = store.get_item(id)?;
        let question = args
            .question
            .as_deref()
            .map_or(item.question, |q| q.trim().to_string());
        let answer = args
            .answer
            .as_deref()
            .map_or(item.reference_answer, |a| a.trim().to_string());
        if question.is_empty() || answer.is_empty() {
            return Err("Question and answer must not be empty".into());
        }

        store.update_item(id, question, answer)?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": args.id,
                    "updated": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Item {} updated.", args.id);
            }
        }

        Ok(())
    }

    fn delete(store: &ItemStore, args: &DeleteArgs, format: OutputFormat) -> CliResult<()> {
        let id = parse_id(&args.id)?;
        store.delete_item(id)?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": args.id,
                    "deleted": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Item {} deleted successfully.", args.id);
            }
        }

        Ok(())
    }

    fn clear(store: &ItemStore, args: &ClearArgs, format: OutputFormat) -> CliResult<()> {
        if !args.yes {
            return Err("Refusing to delete all items without --yes".into());
        }

        let removed = store.clear()?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({ "deleted": removed });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Deleted {removed} items.");
            }
        }

        Ok(())
    }
}
