use thiserror::Error;

/// Failures raised by the fetch steps.
///
/// Each variant carries what the operator needs to diagnose the problem,
/// usually the captured output of the offending process.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Cannot connect to remote host: {stdout} {stderr}")]
    ConnectionFailure {
        stdout: String,
        stderr: String,
    },

    #[error("Error on remote host: {output}")]
    InvalidDump { output: String },

    /// `keys` lists every parameter that was tried, in lookup order.
    #[error(
        "Unable to find database settings from siteaccess. You need to define either {}",
        .keys.join(" or ")
    )]
    CredentialResolution { keys: Vec<String> },

    #[error("Error importing database: {stdout} {stderr}")]
    ImportFailure {
        stdout: String,
        stderr: String,
    },

    #[error("Error fetching files from {folder}: {stdout} {stderr}")]
    SyncFailure {
        folder: String,
        stdout: String,
        stderr: String,
    },
}
