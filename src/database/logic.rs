// datatransfer/src/database/logic.rs
use anyhow::Result;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{AppConfig, TransferConfig};
use crate::database::credentials::{CredentialContext, default_strategies, resolve_credentials};
use crate::database::dump::{dump_completed_at, persist_dump, remove_dump, validate_dump};
use crate::database::import::import_dump;
use crate::errors::FetchError;
use crate::remote::export_command;
use crate::utils::process::CommandRunner;
use crate::utils::progress::{ByteTicker, ProgressSink};

/// Phases of the database step, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DatabaseStage {
    Dispatched,
    Captured,
    Validated,
    Persisted,
    Imported,
    CleanedUp,
}

fn enter(stage: DatabaseStage) {
    debug!(?stage, "database step");
}

/// Orchestrates the database fetch.
///
/// 1. Runs the remote export over ssh and captures the dump.
/// 2. Validates the captured output.
/// 3. Persists the dump in the cache directory.
/// 4. Resolves local credentials and imports the dump with mysql.
/// 5. Removes the dump file, whatever the import outcome.
pub async fn perform_database_fetch<R: CommandRunner>(
    app_config: &AppConfig,
    runner: &R,
    progress: &dyn ProgressSink,
) -> Result<()> {
    let config = &app_config.transfer;
    progress.section("Fetching database");

    let dump = fetch_remote_dump(config, runner, progress).await?;

    validate_dump(&dump)?;
    enter(DatabaseStage::Validated);
    match dump_completed_at(&dump) {
        Some(completed_at) => info!(%completed_at, "remote dump completed"),
        None => debug!("dump footer timestamp is not a valid date"),
    }
    progress.ok();

    let dump_path = persist_dump(&config.cache_dir, &dump)?;
    drop(dump);
    enter(DatabaseStage::Persisted);
    progress.done();

    progress.section("Importing database");
    let result = import_persisted_dump(app_config, runner, progress, &dump_path).await;

    remove_dump(&dump_path);
    enter(DatabaseStage::CleanedUp);
    progress.tick();
    result
}

async fn fetch_remote_dump<R: CommandRunner>(
    config: &TransferConfig,
    runner: &R,
    progress: &dyn ProgressSink,
) -> Result<Vec<u8>> {
    let spec = export_command(config)?;
    debug!(command = %spec.display(), "dispatching remote export");
    enter(DatabaseStage::Dispatched);
    progress.tick();

    let mut ticker = ByteTicker::default();
    let output = runner
        .run(&spec, &mut |chunk: &[u8]| {
            if ticker.record(chunk.len()) {
                progress.tick();
            }
        })
        .await?;
    debug!(bytes = ticker.total(), "remote export finished");

    if !output.success() {
        return Err(FetchError::ConnectionFailure {
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        }
        .into());
    }
    enter(DatabaseStage::Captured);
    progress.ok();
    Ok(output.stdout)
}

async fn import_persisted_dump<R: CommandRunner>(
    app_config: &AppConfig,
    runner: &R,
    progress: &dyn ProgressSink,
    dump_path: &Path,
) -> Result<()> {
    let ctx = CredentialContext::from_config(app_config);
    let credentials = resolve_credentials(&ctx, &default_strategies())?;

    import_dump(runner, progress, &credentials, dump_path).await?;
    enter(DatabaseStage::Imported);
    Ok(())
}
