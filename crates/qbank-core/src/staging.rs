//! Staging log
//!
//! Every successful remote round trip appends one JSON line here before the
//! manifest is touched. At the end of a run the log is merged into the
//! manifest and deleted; a log that survives a crash is merged at the start
//! of the next run, so the manifest can always be rebuilt from it.

use std::io::ErrorKind;

use crate::manifest::{Manifest, MergeSummary, StagedEntry};
use crate::{Error, Result};
use qbank_fs::{NormalizedPath, io};

/// Append-only, newline-delimited log of pending manifest updates
#[derive(Debug, Clone)]
pub struct StagingLog {
    path: NormalizedPath,
}

impl StagingLog {
    pub fn new(path: NormalizedPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    /// Whether a log is present on disk
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append one record, creating the log if needed
    ///
    /// # Errors
    ///
    /// Returns [`Error::Staging`] if the record cannot be written. A run
    /// that cannot stage results must not keep calling the remote.
    pub fn append(&self, record: &StagedEntry) -> Result<()> {
        serde_jsonlines::append_json_lines(self.path.to_native(), [record]).map_err(|source| {
            Error::Staging {
                path: self.path.to_native(),
                source,
            }
        })?;
        tracing::trace!(entity_id = %record.entity_id, "Staged manifest update");
        Ok(())
    }

    /// Read every decodable record in order
    ///
    /// A line that does not decode, such as one truncated by a crash, is
    /// skipped with a warning.
    pub fn read(&self) -> Result<Vec<StagedEntry>> {
        let lines = serde_jsonlines::json_lines::<StagedEntry, _>(self.path.to_native())
            .map_err(|source| self.staging_error(source))?;

        let mut records = Vec::new();
        for (index, line) in lines.enumerate() {
            match line {
                Ok(record) => records.push(record),
                Err(e) if e.kind() == ErrorKind::InvalidData || e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::warn!(
                        path = %self.path,
                        line = index + 1,
                        error = %e,
                        "Skipping undecodable staging record"
                    );
                }
                Err(source) => return Err(self.staging_error(source)),
            }
        }
        Ok(records)
    }

    /// Delete the log
    pub fn remove(&self) -> Result<()> {
        io::remove_if_exists(&self.path)?;
        Ok(())
    }

    /// Merge the log into the manifest at `manifest_path`, then delete it
    ///
    /// The manifest is replaced atomically before the log is removed, so a
    /// crash at any point leaves either the old manifest plus the log, or
    /// the merged manifest. Re-running the merge in the first case is safe
    /// because upserts are idempotent.
    pub fn commit(&self, manifest_path: &NormalizedPath) -> Result<MergeSummary> {
        let records = self.read()?;
        let mut manifest = Manifest::load(manifest_path)?;

        let summary = manifest.merge_staged(&records);
        manifest.save(manifest_path)?;
        self.remove()?;

        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = summary.rejected,
            "Merged staging log into manifest"
        );
        Ok(summary)
    }

    fn staging_error(&self, source: std::io::Error) -> Error {
        Error::Staging {
            path: self.path.to_native(),
            source,
        }
    }
}
