// datatransfer/src/database/dump.rs
use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use regex::bytes::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str;
use std::sync::LazyLock;
use tempfile::Builder as TempFileBuilder;
use tracing::{debug, warn};

use crate::errors::FetchError;

/// File name of the dump inside the cache directory.
pub const DUMP_FILE_NAME: &str = "data-transfer.sql";

// A real mysqldump starts with this header...
static DUMP_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-- MySQL dump").expect("dump header pattern is valid"));

// ...and ends with the completion footer, optionally followed by whitespace.
static DUMP_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-- Dump completed on\s+(\d*-\d*-\d*\s+\d+:\d+:\d+)[\r\n\s\t]*$")
        .expect("dump footer pattern is valid")
});

/// Checks that captured remote output is a complete mysqldump.
///
/// The dump is matched as raw bytes: table data may use any charset. Anything
/// else is most likely an error printed by the remote console, so the whole
/// output is handed back to the operator.
pub fn validate_dump(output: &[u8]) -> std::result::Result<(), FetchError> {
    if DUMP_HEADER.is_match(output) && DUMP_FOOTER.is_match(output) {
        Ok(())
    } else {
        Err(FetchError::InvalidDump {
            output: String::from_utf8_lossy(output).into_owned(),
        })
    }
}

/// Timestamp from the dump footer, when it parses as a calendar date and time.
pub fn dump_completed_at(output: &[u8]) -> Option<NaiveDateTime> {
    let captures = DUMP_FOOTER.captures(output)?;
    let stamp = str::from_utf8(captures.get(1)?.as_bytes())
        .ok()?
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    NaiveDateTime::parse_from_str(&stamp, "%Y-%m-%d %H:%M:%S").ok()
}

/// Writes the dump to `<cache_dir>/data-transfer.sql`, byte for byte.
///
/// The content goes to a temporary file in the same directory first and is
/// then renamed into place, so a partially written dump is never imported.
pub fn persist_dump(cache_dir: &Path, dump: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;

    let mut staging = TempFileBuilder::new()
        .prefix("data-transfer")
        .suffix(".sql.part")
        .tempfile_in(cache_dir)
        .with_context(|| {
            format!(
                "Failed to create temporary dump file in {}",
                cache_dir.display()
            )
        })?;
    staging
        .write_all(dump)
        .context("Failed to write database dump")?;

    let dump_path = cache_dir.join(DUMP_FILE_NAME);
    staging
        .persist(&dump_path)
        .with_context(|| format!("Failed to move database dump to {}", dump_path.display()))?;
    debug!(path = %dump_path.display(), bytes = dump.len(), "database dump persisted");
    Ok(dump_path)
}

/// Removes the dump file if it exists. Failures are only reported.
pub fn remove_dump(dump_path: &Path) {
    if !dump_path.exists() {
        return;
    }
    if let Err(e) = fs::remove_file(dump_path) {
        warn!(path = %dump_path.display(), error = %e, "failed to remove temporary dump file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DUMP: &[u8] =
        b"-- MySQL dump\n...rows...\n-- Dump completed on 2024-01-15 03:22:10\n";

    #[test]
    fn test_valid_dump_passes() {
        assert!(validate_dump(VALID_DUMP).is_ok());
        let padded: &[u8] = b"-- MySQL dump 10.13\nINSERT ...;\n\
            -- Dump completed on 2024-01-15  3:22:10\r\n\t \n";
        assert!(validate_dump(padded).is_ok());
    }

    #[test]
    fn test_latin1_body_passes() {
        let dump: &[u8] = b"-- MySQL dump\nINSERT INTO t VALUES ('caf\xe9');\n\
            -- Dump completed on 2024-01-15 03:22:10\n";
        assert!(validate_dump(dump).is_ok());
        assert!(dump_completed_at(dump).is_some());
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let output = "PHP Fatal error: something\n-- Dump completed on 2024-01-15 03:22:10\n";
        match validate_dump(output.as_bytes()) {
            Err(FetchError::InvalidDump { output: captured }) => assert_eq!(captured, output),
            other => panic!("expected InvalidDump, got {:?}", other),
        }
        let indented = [b" ".as_slice(), VALID_DUMP].concat();
        assert!(validate_dump(&indented).is_err());
    }

    #[test]
    fn test_missing_or_truncated_footer_is_rejected() {
        assert!(validate_dump(b"-- MySQL dump\nINSERT INTO t VALUES (1);\n").is_err());
        assert!(validate_dump(b"-- MySQL dump\n-- Dump completed on 2024-01-15\n").is_err());
        assert!(
            validate_dump(b"-- MySQL dump\n-- Dump completed on 2024-01-15 03:22:10\nERROR 2013\n")
                .is_err()
        );
    }

    #[test]
    fn test_dump_completed_at() {
        let expected =
            NaiveDateTime::parse_from_str("2024-01-15 03:22:10", "%Y-%m-%d %H:%M:%S").ok();
        assert_eq!(dump_completed_at(VALID_DUMP), expected);
        assert_eq!(
            dump_completed_at(b"-- MySQL dump\n-- Dump completed on 2024-13-45 03:22:10\n"),
            None
        );
        assert_eq!(dump_completed_at(b"-- MySQL dump\n"), None);
    }

    #[test]
    fn test_persist_and_remove_dump() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache_dir = dir.path().join("cache");

        let path = persist_dump(&cache_dir, VALID_DUMP)?;
        assert_eq!(path, cache_dir.join(DUMP_FILE_NAME));
        assert_eq!(fs::read(&path)?, VALID_DUMP);
        assert_eq!(fs::read_dir(&cache_dir)?.count(), 1);

        remove_dump(&path);
        assert!(!path.exists());
        // Removing again is a no-op.
        remove_dump(&path);
        Ok(())
    }
}
