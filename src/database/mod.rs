pub(crate) mod credentials; // Siteaccess credential lookup strategies
pub(crate) mod dump; // Dump validation and temp file handling
pub(crate) mod import; // Local mysql import
mod logic;

use anyhow::Result;
use crate::config::AppConfig;
use crate::utils::process::CommandRunner;
use crate::utils::progress::ProgressSink;

/// Public entry point for the database step.
/// Fetches the remote dump and imports it into the local database.
pub async fn run_database_flow<R: CommandRunner>(
    app_config: &AppConfig,
    runner: &R,
    progress: &dyn ProgressSink,
) -> Result<()> {
    logic::perform_database_fetch(app_config, runner, progress).await
}
