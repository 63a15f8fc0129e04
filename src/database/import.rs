// datatransfer/src/database/import.rs
use anyhow::Result;
use std::path::Path;

use crate::database::credentials::DbCredentials;
use crate::errors::FetchError;
use crate::utils::process::{CommandRunner, CommandSpec};
use crate::utils::progress::ProgressSink;

/// `mysql` invocation reading the dump from stdin.
///
/// Credentials travel as separate arguments, so no shell ever sees them.
pub fn import_command(credentials: &DbCredentials, dump_path: &Path) -> CommandSpec {
    let mut spec = CommandSpec::new("mysql")
        .arg(format!("--user={}", credentials.user))
        .arg(format!("--password={}", credentials.password))
        .arg(format!("--host={}", credentials.host));
    if let Some(port) = credentials.port {
        spec = spec.arg(format!("--port={}", port));
    }
    spec.arg(&credentials.database).stdin_file(dump_path)
}

/// Imports the dump file into the local database.
pub async fn import_dump<R: CommandRunner>(
    runner: &R,
    progress: &dyn ProgressSink,
    credentials: &DbCredentials,
    dump_path: &Path,
) -> Result<()> {
    let spec = import_command(credentials, dump_path);
    progress.tick();

    let output = runner.run(&spec, &mut |_: &[u8]| {}).await?;
    progress.tick();

    if !output.success() {
        return Err(FetchError::ImportFailure {
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        }
        .into());
    }
    progress.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::{FakeRunner, RecordingProgress, failed_output, ok_output};
    use std::path::PathBuf;

    fn credentials() -> DbCredentials {
        DbCredentials {
            database: "ezp".into(),
            user: "root".into(),
            password: "p'a ss;rm -rf".into(),
            host: "127.0.0.1".into(),
            port: None,
        }
    }

    #[test]
    fn test_import_command_passes_credentials_verbatim() {
        let spec = import_command(&credentials(), Path::new("/tmp/cache/data-transfer.sql"));

        assert_eq!(spec.program, "mysql");
        assert_eq!(
            spec.args,
            vec!["--user=root", "--password=p'a ss;rm -rf", "--host=127.0.0.1", "ezp"]
        );
        assert_eq!(spec.stdin, Some(PathBuf::from("/tmp/cache/data-transfer.sql")));
    }

    #[test]
    fn test_import_command_adds_port_when_known() {
        let mut creds = credentials();
        creds.port = Some(3307);
        let spec = import_command(&creds, Path::new("dump.sql"));
        assert!(spec.args.contains(&"--port=3307".to_string()));
        assert_eq!(spec.args.last().map(String::as_str), Some("ezp"));
    }

    #[tokio::test]
    async fn test_import_failure_embeds_output() {
        let runner = FakeRunner::new();
        runner.push(failed_output(1, "", "ERROR 1045 (28000): Access denied"));
        let progress = RecordingProgress::default();

        let err = import_dump(&runner, &progress, &credentials(), Path::new("dump.sql"))
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<FetchError>(),
            Some(FetchError::ImportFailure { .. })
        ));
        assert!(err.to_string().contains("Access denied"));
    }

    #[tokio::test]
    async fn test_import_success() -> anyhow::Result<()> {
        let runner = FakeRunner::new();
        runner.push(ok_output(""));
        let progress = RecordingProgress::default();

        import_dump(&runner, &progress, &credentials(), Path::new("dump.sql")).await?;
        assert_eq!(runner.programs(), vec!["mysql"]);
        Ok(())
    }
}
