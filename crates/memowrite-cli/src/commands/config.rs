use std::path::Path;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use memowrite::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Parser)]
pub enum ConfigSubcommand {
    #[clap(about = "Show current configuration")]
    Show,
}

impl ConfigCommand {
    pub fn execute(
        &self,
        config: &Config,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(config, config_path, format),
        }
    }

    fn show(config: &Config, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
        let scheduler = &config.scheduler;
        let grader = &config.grader;
        let storage = &config.storage;
        let ingest = &config.ingest;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "scheduler": {
                        "initial_ease": scheduler.initial_ease,
                        "min_ease": scheduler.min_ease,
                        "max_ease": scheduler.max_ease,
                        "pass_threshold": scheduler.pass_threshold,
                        "first_interval_days": scheduler.first_interval_days,
                        "second_interval_days": scheduler.second_interval_days,
                        "lapse_interval_days": scheduler.lapse_interval_days,
                        "seed_interval_days": scheduler.seed_interval_days,
                        "rounding": scheduler.rounding.to_string(),
                        "easy_bonus": scheduler.easy_bonus,
                        "max_interval_days": scheduler.max_interval_days,
                        "mastery_repetitions": scheduler.mastery_repetitions,
                        "mastery_min_ease": scheduler.mastery_min_ease,
                    },
                    "grader": {
                        "api_url": grader.api_url,
                        "api_key_env": grader.api_key_env,
                        "model": grader.model,
                        "timeout_secs": grader.timeout_secs,
                        "strictness": grader.strictness,
                        "course_notes": grader
                            .course_notes
                            .as_ref()
                            .map(|p| p.display().to_string()),
                        "max_context_chars": grader.max_context_chars,
                        "max_answer_length": grader.max_answer_length,
                    },
                    "storage": {
                        "data_dir": storage.data_dir.display().to_string(),
                        "store_file": storage.store_file,
                    },
                    "ingest": {
                        "fix_spacing": ingest.fix_spacing,
                        "skip_duplicates": ingest.skip_duplicates,
                    }
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                match config_path {
                    Some(path) => println!("Configuration from: {}", path.display()),
                    None => println!("Configuration: (defaults or first config file found)"),
                }
                println!("==============================\n");

                println!("[Scheduler]");
                let max_ease = scheduler
                    .max_ease
                    .map_or_else(|| "none".to_string(), |e| e.to_string());
                print_section(&[
                    ("initial_ease", scheduler.initial_ease.to_string()),
                    ("min_ease", scheduler.min_ease.to_string()),
                    ("max_ease", max_ease),
                    ("pass_threshold", scheduler.pass_threshold.to_string()),
                    ("first_interval_days", scheduler.first_interval_days.to_string()),
                    ("second_interval_days", scheduler.second_interval_days.to_string()),
                    ("lapse_interval_days", scheduler.lapse_interval_days.to_string()),
                    ("seed_interval_days", scheduler.seed_interval_days.to_string()),
                    ("rounding", scheduler.rounding.to_string()),
                    ("easy_bonus", scheduler.easy_bonus.to_string()),
                    ("max_interval_days", scheduler.max_interval_days.to_string()),
                    ("mastery_repetitions", scheduler.mastery_repetitions.to_string()),
                    ("mastery_min_ease", scheduler.mastery_min_ease.to_string()),
                ]);

                println!("\n[Grader]");
                let course_notes = grader
                    .course_notes
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| p.display().to_string());
                let api_url = if grader.api_url.is_empty() {
                    "(not set)".to_string()
                } else {
                    grader.api_url.clone()
                };
                print_section(&[
                    ("api_url", api_url),
                    ("api_key_env", grader.api_key_env.clone()),
                    ("model", grader.model.clone()),
                    ("timeout_secs", grader.timeout_secs.to_string()),
                    ("strictness", grader.strictness.to_string()),
                    ("course_notes", course_notes),
                    ("max_context_chars", grader.max_context_chars.to_string()),
                    ("max_answer_length", grader.max_answer_length.to_string()),
                ]);

                println!("\n[Storage]");
                print_section(&[
                    ("data_dir", storage.data_dir.display().to_string()),
                    ("store_file", storage.store_file.clone()),
                ]);

                println!("\n[Ingest]");
                print_section(&[
                    ("fix_spacing", ingest.fix_spacing.to_string()),
                    ("skip_duplicates", ingest.skip_duplicates.to_string()),
                ]);
            }
        }

        Ok(())
    }
}

fn print_section(rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Setting", "Value"]);

    for (key, value) in rows {
        table.add_row([*key, value.as_str()]);
    }

    println!("{table}");
}
