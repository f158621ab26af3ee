pub mod commands;
pub mod error;
pub mod output;

pub use commands::{ConfigCommand, ImportCommand, ItemCommand, ReviewCommand, StatsCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, format_due, format_timestamp, truncate_string};
