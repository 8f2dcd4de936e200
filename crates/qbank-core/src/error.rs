//! Error types for qbank-core

use std::path::PathBuf;

use crate::remote::RemoteError;

/// Result type for qbank-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in qbank-core operations
///
/// Flow drivers turn non-fatal errors into skipped items on the
/// [`SyncReport`](crate::SyncReport); fatal errors abort the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No manifest at the expected location
    #[error("Manifest not found at {path}")]
    ManifestNotFound { path: PathBuf },

    /// Manifest exists but cannot be decoded
    #[error("Failed to parse manifest at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// Manifest was written for a different remote scope
    #[error("Manifest at {path} tracks {found}, not {expected}")]
    ContextMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Staging log cannot be written or read
    #[error("Staging log {path} is unusable: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote refused to create a category during import
    #[error("Failed to create category '{category}': {source}")]
    CategoryCreation {
        category: String,
        #[source]
        source: RemoteError,
    },

    /// Questions were edited remotely since they were last exported
    #[error(
        "{} question(s) changed remotely since the last export: {}",
        entries.len(),
        entries.join(", ")
    )]
    VersionConflict { entries: Vec<String> },

    /// Ignore pattern is not a valid regular expression
    #[error("Invalid ignore pattern '{pattern}': {source}")]
    InvalidIgnorePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Directory has no category marker
    #[error("No category marker in {path}")]
    MarkerNotFound { path: PathBuf },

    /// Category marker exists but declares no category
    #[error("Category marker {path} is invalid: {message}")]
    MarkerParse { path: PathBuf, message: String },

    /// A remote call returned an exception or an undecodable payload
    #[error("Remote {operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: RemoteError,
    },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from qbank-fs
    #[error(transparent)]
    Fs(#[from] qbank_fs::Error),

    /// Git error from qbank-git
    #[error(transparent)]
    Git(#[from] qbank_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn remote(operation: &'static str, source: RemoteError) -> Self {
        Self::Remote { operation, source }
    }

    /// Whether this error leaves later items in an inconsistent state.
    ///
    /// Fatal errors abort the whole run. Everything else only affects the
    /// item being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ManifestNotFound { .. }
                | Self::ManifestParse { .. }
                | Self::ContextMismatch { .. }
                | Self::Staging { .. }
                | Self::CategoryCreation { .. }
                | Self::VersionConflict { .. }
                | Self::InvalidIgnorePattern { .. }
        )
    }
}
