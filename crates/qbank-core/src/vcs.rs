//! Version-control collaborator
//!
//! When commit tracking is enabled the engine asks for the commit that
//! last touched each file and records it on the manifest entry.

use std::path::Path;

use crate::Result;
use qbank_git::GitCommits;

/// Answers which commit last touched a file
pub trait CommitSource {
    /// Hash of the most recent commit touching `file`, or `None` if the
    /// file has never been committed
    fn commit_hash_of(&self, file: &Path) -> Result<Option<String>>;
}

impl CommitSource for GitCommits {
    fn commit_hash_of(&self, file: &Path) -> Result<Option<String>> {
        Ok(GitCommits::commit_hash_of(self, file)?)
    }
}
