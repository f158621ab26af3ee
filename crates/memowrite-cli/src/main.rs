use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use memowrite::Scheduler;
use memowrite::config::Config;
use memowrite::store::ItemStore;
use memowrite_cli::commands::{
    ConfigCommand, ImportCommand, ItemCommand, ReviewCommand, StatsCommand,
};
use memowrite_cli::error::CliResult;
use memowrite_cli::output::OutputFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "memowrite")]
#[command(about = "MemoWrite - spaced repetition with graded free-text answers")]
#[command(version)]
pub struct Cli {
    #[clap(long, short, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[clap(long, short = 'd', global = true, help = "Path to data directory")]
    pub data_dir: Option<PathBuf>,

    #[clap(long, short = 'c', global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Item management commands")]
    Item(ItemCommand),

    #[clap(about = "Import extracted question/answer pairs")]
    Import(ImportCommand),

    #[clap(about = "Study due items")]
    Review(ReviewCommand),

    #[clap(about = "Show progress statistics")]
    Stats(StatsCommand),

    #[clap(about = "Configuration commands")]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,memowrite=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Table
    };

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    match &cli.command {
        Command::Config(cmd) => cmd.execute(&config, cli.config.as_deref(), format),
        Command::Item(cmd) => cmd.execute(&open_store(&config)?, &scheduler(&config)?, format),
        Command::Import(cmd) => cmd.execute(
            &open_store(&config)?,
            &scheduler(&config)?,
            &config.ingest,
            format,
        ),
        Command::Review(cmd) => {
            let store = Arc::new(open_store(&config)?);
            cmd.execute(store, scheduler(&config)?, &config.grader, format)
                .await
        }
        Command::Stats(cmd) => cmd.execute(&open_store(&config)?, &scheduler(&config)?, format),
    }
}

fn open_store(config: &Config) -> CliResult<ItemStore> {
    Ok(ItemStore::open(&config.storage.store_path())?)
}

fn scheduler(config: &Config) -> CliResult<Scheduler> {
    Ok(Scheduler::new(config.scheduler.clone())?)
}
