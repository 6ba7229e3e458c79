//! Error types for MirrorQ
//!
//! Precondition errors (mismatched batch lengths, unusable tool) are raised
//! synchronously before anything is scheduled. Execution failures inside a
//! worker are logged there and surfaced only through blocking submissions.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MirrorQ operations
#[derive(Error, Debug)]
pub enum MirrorError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path the operation touched
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Target parent directory could not be created
    #[error("cannot create target directory '{path}': {source}")]
    TargetDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Batched submission with unequal source/target counts
    #[error("source/target count mismatch: {sources} sources, {targets} targets")]
    LengthMismatch {
        /// Number of sources supplied
        sources: usize,
        /// Number of targets supplied
        targets: usize,
    },

    /// A worker finished with a failure; carries the worker's report
    #[error("job failed: {0}")]
    JobFailed(String),

    /// External mirroring tool is not installed or unusable
    #[error("mirroring tool '{0}' is not available")]
    ToolUnavailable(String),

    /// Runner was handed an empty argument vector
    #[error("empty command line")]
    EmptyCommand,

    /// Worker thread went away without reporting an outcome
    #[error("worker terminated without reporting an outcome")]
    WorkerLost,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl MirrorError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::TargetDir { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for MirrorQ operations
pub type Result<T> = std::result::Result<T, MirrorError>;

impl From<serde_json::Error> for MirrorError {
    fn from(err: serde_json::Error) -> Self {
        MirrorError::config(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| MirrorError::io(path, e))
    }
}
