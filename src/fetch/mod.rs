mod logic;

use crate::config::AppConfig;
use crate::utils::process::CommandRunner;
use crate::utils::progress::ProgressSink;

pub use logic::{FetchReport, FetchScope, StepResult};

/// Public entry point for the `data-transfer:fetch` command.
pub async fn run_fetch_flow<R: CommandRunner>(
    app_config: &AppConfig,
    scope: FetchScope,
    runner: &R,
    progress: &dyn ProgressSink,
) -> FetchReport {
    logic::perform_fetch_orchestration(app_config, scope, runner, progress).await
}
