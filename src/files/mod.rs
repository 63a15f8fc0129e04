mod logic;

use anyhow::Result;
use crate::config::AppConfig;
use crate::utils::process::CommandRunner;
use crate::utils::progress::ProgressSink;

/// Public entry point for the file step.
/// Mirrors the configured remote folders into the local tree with rsync.
pub async fn run_files_flow<R: CommandRunner>(
    app_config: &AppConfig,
    runner: &R,
    progress: &dyn ProgressSink,
) -> Result<()> {
    logic::perform_files_fetch(&app_config.transfer, runner, progress).await
}
