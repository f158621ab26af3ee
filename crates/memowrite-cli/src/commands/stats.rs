use chrono::Utc;
use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memowrite::store::ItemStore;
use memowrite::{Mastery, Scheduler};

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct StatsCommand {}

impl StatsCommand {
    pub fn execute(
        &self,
        store: &ItemStore,
        scheduler: &Scheduler,
        format: OutputFormat,
    ) -> CliResult<()> {
        let stats = store.stats(Utc::now(), scheduler)?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Metric", "Value"]);

                table.add_row(["Total Items", &stats.total_items.to_string()]);
                table.add_row(["Due Now", &stats.due_now.to_string()]);
                table.add_row(["Reviews", &stats.total_attempts.to_string()]);
                table.add_row(["Correct", &stats.total_correct.to_string()]);
                table.add_row(["Success Rate", &format!("{:.1}%", stats.success_rate)]);
                table.add_row(["Average Ease", &format!("{:.2}", stats.average_ease)]);

                println!("{table}");

                let mut mastery = Table::new();
                mastery
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Mastery", "Items"]);

                for level in [
                    Mastery::New,
                    Mastery::Learning,
                    Mastery::Reviewing,
                    Mastery::Mastered,
                ] {
                    let count = stats.by_mastery.get(&level).copied().unwrap_or(0);
                    mastery.add_row([level.to_string(), count.to_string()]);
                }

                println!("\n{mastery}");
            }
        }

        Ok(())
    }
}
