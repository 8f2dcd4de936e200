//! Error types for qbank-git

use std::path::PathBuf;

/// Result type for qbank-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in qbank-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Not a git working tree: {path}")]
    NotARepository { path: PathBuf },

    #[error("{path} is outside the working tree at {workdir}")]
    OutsideWorkdir { path: PathBuf, workdir: PathBuf },
}
