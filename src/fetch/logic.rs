// datatransfer/src/fetch/logic.rs
use anyhow::Result;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::database::run_database_flow;
use crate::files::run_files_flow;
use crate::utils::process::CommandRunner;
use crate::utils::progress::ProgressSink;

/// Which steps the operator asked to skip (`--db-only` / `--files-only`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchScope {
    pub db_only: bool,
    pub files_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Ok,
    Failed(String),
}

/// Outcome of each step that ran; `None` means the step was skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub database: Option<StepResult>,
    pub files: Option<StepResult>,
}

impl FetchReport {
    pub fn has_failures(&self) -> bool {
        [&self.database, &self.files]
            .into_iter()
            .any(|step| matches!(step, Some(StepResult::Failed(_))))
    }
}

/// Runs the database step, then the file step.
///
/// A failing step is reported and recorded, and never prevents the next one from running.
pub async fn perform_fetch_orchestration<R: CommandRunner>(
    app_config: &AppConfig,
    scope: FetchScope,
    runner: &R,
    progress: &dyn ProgressSink,
) -> FetchReport {
    let mut report = FetchReport::default();

    if !scope.files_only {
        let result = run_database_flow(app_config, runner, progress).await;
        report.database = Some(step_result("database", result, progress));
        progress.done();
    }

    if !scope.db_only {
        let result = run_files_flow(app_config, runner, progress).await;
        report.files = Some(step_result("files", result, progress));
        progress.done();
    }

    report
}

fn step_result(step: &str, result: Result<()>, progress: &dyn ProgressSink) -> StepResult {
    match result {
        Ok(()) => {
            info!(step, "step completed");
            StepResult::Ok
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(step, error = %message, "step failed");
            progress.error(&message);
            StepResult::Failed(message)
        }
    }
}
