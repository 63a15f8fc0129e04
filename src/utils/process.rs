// datatransfer/src/utils/process.rs
use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

use crate::utils::{find_executable, sh_quote_if_needed};

const READ_CHUNK_SIZE: usize = 8 * 1024;
const PASSWORD_FLAG: &str = "--password=";

/// An external program invocation as an explicit argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// File fed to the process on stdin, if any.
    pub stdin: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    /// Shell-like rendering for logs. Password values are masked.
    pub fn display(&self) -> String {
        let mut parts = vec![sh_quote_if_needed(&self.program)];
        parts.extend(self.args.iter().map(|arg| {
            if arg.starts_with(PASSWORD_FLAG) {
                format!("{}****", PASSWORD_FLAG)
            } else {
                sh_quote_if_needed(arg)
            }
        }));
        if let Some(stdin) = &self.stdin {
            parts.push(format!("< {}", sh_quote_if_needed(&stdin.to_string_lossy())));
        }
        parts.join(" ")
    }
}

/// Raw process output. The bytes are kept as produced; a database dump is
/// not necessarily valid UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }

    /// Stdout as text, for messages only.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Stderr as text, for messages only.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external programs to completion.
///
/// `on_output` is called for every chunk read from stdout or stderr while the
/// process runs. There is no timeout: the call returns only once the process exits.
pub trait CommandRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        on_output: &mut dyn FnMut(&[u8]),
    ) -> Result<CommandOutput>;
}

/// `CommandRunner` backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        on_output: &mut dyn FnMut(&[u8]),
    ) -> Result<CommandOutput> {
        let program = find_executable(&spec.program)?;
        debug!(command = %spec.display(), "spawning process");

        let stdin = match &spec.stdin {
            Some(path) => Stdio::from(File::open(path).with_context(|| {
                format!(
                    "Failed to open {} as input for {}",
                    path.display(),
                    spec.program
                )
            })?),
            None => Stdio::null(),
        };

        let mut child = Command::new(&program)
            .args(&spec.args)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to execute {}", program.display()))?;

        let mut child_stdout = child.stdout.take().context("Child stdout was not captured")?;
        let mut child_stderr = child.stderr.take().context("Child stderr was not captured")?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let mut stdout_chunk = [0u8; READ_CHUNK_SIZE];
        let mut stderr_chunk = [0u8; READ_CHUNK_SIZE];
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                read = child_stdout.read(&mut stdout_chunk), if stdout_open => {
                    let n = read.with_context(|| {
                        format!("Failed to read stdout of {}", spec.program)
                    })?;
                    if n == 0 {
                        stdout_open = false;
                    } else {
                        stdout_buf.extend_from_slice(&stdout_chunk[..n]);
                        on_output(&stdout_chunk[..n]);
                    }
                }
                read = child_stderr.read(&mut stderr_chunk), if stderr_open => {
                    let n = read.with_context(|| {
                        format!("Failed to read stderr of {}", spec.program)
                    })?;
                    if n == 0 {
                        stderr_open = false;
                    } else {
                        stderr_buf.extend_from_slice(&stderr_chunk[..n]);
                        on_output(&stderr_chunk[..n]);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for {}", spec.program))?;
        debug!(program = %spec.program, status = %status, "process exited");

        Ok(CommandOutput {
            status_code: status.code(),
            stdout: stdout_buf,
            stderr: stderr_buf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_masks_password_and_quotes() {
        let spec = CommandSpec::new("mysql")
            .arg("site db")
            .arg("--user=root")
            .arg("--password=s3cr'et")
            .stdin_file("/tmp/data-transfer.sql");

        assert_eq!(
            spec.display(),
            "mysql 'site db' --user=root --password=**** < /tmp/data-transfer.sql"
        );
    }

    #[test]
    fn test_success_requires_zero_exit() {
        let ok = CommandOutput {
            status_code: Some(0),
            ..Default::default()
        };
        let failed = CommandOutput {
            status_code: Some(255),
            ..Default::default()
        };
        let killed = CommandOutput {
            status_code: None,
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!killed.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_both_streams() -> anyhow::Result<()> {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("printf hello; printf oops >&2; exit 3");
        let mut observed = 0usize;

        let output = ProcessRunner
            .run(&spec, &mut |chunk: &[u8]| observed += chunk.len())
            .await?;

        assert_eq!(output.status_code, Some(3));
        assert_eq!(output.stdout_lossy(), "hello");
        assert_eq!(output.stderr_lossy(), "oops");
        assert_eq!(observed, 9);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_feeds_stdin_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("input.sql");
        std::fs::write(&input, "SELECT 1;\n")?;

        let spec = CommandSpec::new("cat").stdin_file(&input);
        let output = ProcessRunner.run(&spec, &mut |_: &[u8]| {}).await?;

        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "SELECT 1;\n");
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_keeps_non_utf8_bytes() -> anyhow::Result<()> {
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("printf 'caf\\351\\n'");

        let output = ProcessRunner.run(&spec, &mut |_: &[u8]| {}).await?;

        assert!(output.success());
        assert_eq!(output.stdout, b"caf\xe9\n".to_vec());
        Ok(())
    }

    #[tokio::test]
    async fn test_process_runner_reports_missing_executable() {
        let spec = CommandSpec::new("definitely-not-an-installed-tool-4711");
        let err = ProcessRunner.run(&spec, &mut |_: &[u8]| {}).await.unwrap_err();
        assert!(err.to_string().contains("not found in PATH"));
    }
}
