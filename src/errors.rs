use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the meta-test suite.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON deserialization error (opt-in file, tool output).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error (harness configuration).
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Harness configuration is invalid.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Module manifest could not be located or parsed.
    #[error("manifest error: {message}")]
    Manifest { message: String },

    /// External tool could not be started because it is not installed.
    #[error("tool not available: {program}")]
    ToolUnavailable { program: String },

    /// External tool exited unsuccessfully for reasons unrelated to findings.
    #[error("tool '{program}' failed (exit status {status:?}): {stderr}")]
    ToolFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    /// External tool did not finish within the configured wait.
    #[error("tool '{program}' timed out after {seconds}s")]
    ToolTimeout { program: String, seconds: u64 },

    /// A path expected to hold a module does not exist.
    #[error("module root not found: {}", path.display())]
    RootNotFound { path: PathBuf },
}

/// Convenience alias for `Result<T, MetaError>`.
pub type Result<T> = std::result::Result<T, MetaError>;
