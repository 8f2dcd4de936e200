//! Manifest store
//!
//! The manifest is the persisted mapping between remote question ids and
//! files in the repository, plus the sync state of each pair. It is the
//! source of truth every flow reconciles against. Entity ids and file paths
//! are each unique within a manifest.

mod context;
mod entry;

pub use context::{ContextLevel, ManifestContext, Scope};
pub use entry::{ManifestEntry, StagedEntry, Version};
pub(crate) use entry::string_or_number;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use qbank_fs::{NormalizedPath, io};

/// What an upsert did to the manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new entry was appended
    Inserted,
    /// An existing entry was updated in place
    Updated,
    /// The id was unknown and the record carried no file path
    Rejected,
}

/// Counts from merging staged records into a manifest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

impl MergeSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.rejected
    }
}

/// Persisted record of tracked questions for one repository root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub context: ManifestContext,
    #[serde(default)]
    questions: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest for a scope
    pub fn new(context: ManifestContext) -> Self {
        Self {
            context,
            questions: Vec::new(),
        }
    }

    /// Load a manifest from disk
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] if the file does not exist and
    /// [`Error::ManifestParse`] if it cannot be decoded.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        let content = match io::read_text(path) {
            Ok(content) => content,
            Err(e) if e.is_not_found() => {
                return Err(Error::ManifestNotFound {
                    path: path.to_native(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| Error::ManifestParse {
            path: path.to_native(),
            message: e.to_string(),
        })
    }

    /// Save the manifest, replacing the file atomically
    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        io::write_text(path, &content)?;
        tracing::debug!(path = %path, entries = self.questions.len(), "Saved manifest");
        Ok(())
    }

    /// All tracked entries, in insertion order
    pub fn questions(&self) -> &[ManifestEntry] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Get an entry by remote id
    pub fn get(&self, entity_id: &str) -> Option<&ManifestEntry> {
        self.questions.iter().find(|q| q.entity_id == entity_id)
    }

    /// Get a mutable reference to an entry by remote id
    pub fn get_mut(&mut self, entity_id: &str) -> Option<&mut ManifestEntry> {
        self.questions.iter_mut().find(|q| q.entity_id == entity_id)
    }

    /// Find the entry tracking a file
    pub fn find_by_path(&self, file_path: &NormalizedPath) -> Option<&ManifestEntry> {
        self.questions.iter().find(|q| &q.file_path == file_path)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut ManifestEntry> {
        self.questions.iter_mut()
    }

    /// Insert or update an entry from a staged record
    ///
    /// Fields the record lacks keep their current values. A record whose
    /// file path is held by another id displaces that stale entry.
    pub fn upsert(&mut self, staged: &StagedEntry) -> UpsertOutcome {
        if let Some(path) = &staged.file_path {
            let before = self.questions.len();
            self.questions
                .retain(|q| q.entity_id == staged.entity_id || &q.file_path != path);
            if self.questions.len() != before {
                tracing::warn!(
                    path = %path,
                    entity_id = %staged.entity_id,
                    "Replaced stale manifest entry holding the same file"
                );
            }
        }

        if let Some(entry) = self.get_mut(&staged.entity_id) {
            entry.apply(staged);
            return UpsertOutcome::Updated;
        }

        match staged.clone().into_entry() {
            Some(entry) => {
                self.questions.push(entry);
                UpsertOutcome::Inserted
            }
            None => UpsertOutcome::Rejected,
        }
    }

    /// Upsert every staged record in order
    pub fn merge_staged<'a>(
        &mut self,
        records: impl IntoIterator<Item = &'a StagedEntry>,
    ) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for record in records {
            match self.upsert(record) {
                UpsertOutcome::Inserted => summary.inserted += 1,
                UpsertOutcome::Updated => summary.updated += 1,
                UpsertOutcome::Rejected => {
                    tracing::warn!(
                        entity_id = %record.entity_id,
                        "Staged record for an unknown question has no file path"
                    );
                    summary.rejected += 1;
                }
            }
        }
        summary
    }

    /// Remove an entry by remote id
    pub fn remove(&mut self, entity_id: &str) -> Option<ManifestEntry> {
        let pos = self.questions.iter().position(|q| q.entity_id == entity_id)?;
        Some(self.questions.remove(pos))
    }

    /// Keep only entries matching `keep`, returning the removed ones
    pub fn retain(&mut self, mut keep: impl FnMut(&ManifestEntry) -> bool) -> Vec<ManifestEntry> {
        let (kept, removed) = std::mem::take(&mut self.questions)
            .into_iter()
            .partition(|q| keep(q));
        self.questions = kept;
        removed
    }
}
