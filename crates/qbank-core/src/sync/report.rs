//! Report types returned by every sync flow

use serde::{Deserialize, Serialize};

/// Why an item was left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Category lies outside the configured subcategory
    OutOfScope,
    /// Already in the manifest and the run only creates
    AlreadyTracked,
    /// File has not changed since it was last pushed
    Unchanged,
    /// No category marker could be resolved for the file's directory
    NoCategory(String),
    /// The user declined a deletion
    Declined,
    /// A remote call or local write failed for this item only
    Failed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfScope => write!(f, "outside the configured subcategory"),
            Self::AlreadyTracked => write!(f, "already tracked"),
            Self::Unchanged => write!(f, "unchanged since last push"),
            Self::NoCategory(reason) => write!(f, "no category: {reason}"),
            Self::Declined => write!(f, "declined"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// An item a flow did not act on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Entity id or repository-relative file path
    pub item: String,
    pub reason: SkipReason,
}

/// Outcome of one sync flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Files created locally, or entities created remotely
    pub created: Vec<String>,
    /// Items refreshed from, or pushed to, the remote
    pub updated: Vec<String>,
    /// Entities removed from the manifest or the remote
    pub deleted: Vec<String>,
    pub skipped: Vec<SkippedItem>,
    /// Failures that did not concern a single item
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skipped item
    pub fn skip(&mut self, item: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedItem {
            item: item.into(),
            reason,
        });
    }

    /// Items skipped for `reason`
    pub fn skipped_for(&self, reason: &SkipReason) -> impl Iterator<Item = &str> {
        self.skipped
            .iter()
            .filter(move |s| &s.reason == reason)
            .map(|s| s.item.as_str())
    }

    /// Whether any failure was recorded
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
            || self
                .skipped
                .iter()
                .any(|s| matches!(s.reason, SkipReason::Failed(_) | SkipReason::NoCategory(_)))
    }

    /// Number of items acted on
    pub fn changes(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }
}
