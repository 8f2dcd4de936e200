//! Git integration for question bank sync
//!
//! Answers one question for the reconciliation engine: which commit last
//! touched a given file. The engine compares that hash against the one
//! recorded when the file was last pushed to decide whether a push can be
//! skipped.

pub mod commits;
pub mod error;

pub use commits::GitCommits;
pub use error::{Error, Result};
