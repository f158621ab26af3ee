pub mod config;
pub mod import;
pub mod item;
pub mod review;
pub mod stats;

pub use config::ConfigCommand;
pub use import::ImportCommand;
pub use item::ItemCommand;
pub use review::ReviewCommand;
pub use stats::StatsCommand;

use uuid::Uuid;

use crate::error::{CliError, CliResult};

pub(crate) fn parse_id(id: &str) -> CliResult<Uuid> {
    Uuid::parse_str(id).map_err(|e| CliError(format!("Invalid UUID format: {e}")))
}
