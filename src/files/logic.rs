// datatransfer/src/files/logic.rs
use anyhow::Result;
use tracing::debug;

use crate::config::TransferConfig;
use crate::errors::FetchError;
use crate::remote::rsync_command;
use crate::utils::process::CommandRunner;
use crate::utils::progress::ProgressSink;

/// Pulls every configured folder with rsync, in configured order.
///
/// The first folder that fails aborts the step; the remaining folders are not
/// attempted in this run.
pub async fn perform_files_fetch<R: CommandRunner>(
    config: &TransferConfig,
    runner: &R,
    progress: &dyn ProgressSink,
) -> Result<()> {
    progress.section("Fetching files");

    if config.folders.is_empty() {
        debug!("no folders configured, nothing to fetch");
        return Ok(());
    }

    for folder in &config.folders {
        let spec = rsync_command(config, folder)?;
        debug!(
            source = %folder.source,
            destination = %folder.destination,
            command = %spec.display(),
            "syncing folder"
        );

        let output = runner
            .run(&spec, &mut |_: &[u8]| progress.tick())
            .await?;

        if !output.success() {
            return Err(FetchError::SyncFailure {
                folder: folder.source.clone(),
                stdout: output.stdout_lossy(),
                stderr: output.stderr_lossy(),
            }
            .into());
        }
        progress.ok();
    }

    Ok(())
}
