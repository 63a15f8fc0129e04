pub mod process;
pub mod progress;
#[cfg(test)]
pub mod testing;

use anyhow::{Context, Result};
use std::path::PathBuf;
use which::which;

/// Finds an executable (ssh, rsync, mysql, ...) in the system PATH.
pub fn find_executable(program: &str) -> Result<PathBuf> {
    which(program).with_context(|| {
        format!(
            "{} executable not found in PATH. Please ensure it is installed and in your PATH.",
            program
        )
    })
}

/// Quotes a value for a POSIX shell, always wrapping it in single quotes.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Like `sh_quote`, but leaves plain words untouched. Used for log output.
pub fn sh_quote_if_needed(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if plain { s.to_string() } else { sh_quote(s) }
}
