//! Recovery and tidy procedures
//!
//! - **recover**: merge a staging log left behind by an interrupted run
//! - **tidy**: prune manifest entries whose remote question disappeared
//! - **delete_orphans**: delete remote questions that lost their local side

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::category::in_scope;
use crate::manifest::MergeSummary;
use crate::remote::{Remote, RemoteEntity, ScopeFilter};
use crate::sync::{SkipReason, SyncEngine, SyncReport};
use qbank_fs::NormalizedPath;

/// Why a remote question is a deletion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanKind {
    /// Tracked in the manifest but its file is gone
    MissingFile,
    /// Present remotely but not tracked in the manifest
    Untracked,
}

/// A remote question offered for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orphan {
    pub kind: OrphanKind,
    pub entity_id: String,
    pub name: String,
    pub category_path: String,
    /// Recorded file path, for tracked questions
    pub file_path: Option<NormalizedPath>,
}

impl<R: Remote> SyncEngine<R> {
    /// Merge a staging log left by an interrupted run
    ///
    /// Returns `None` when there is no log. Safe to call repeatedly.
    pub fn recover(&self) -> Result<Option<MergeSummary>> {
        let log = self.staging_log();
        if !log.exists() {
            return Ok(None);
        }
        tracing::warn!(path = %log.path(), "Recovering staging log from an interrupted run");

        // A crash before the first save can leave a log without a manifest
        self.load_or_init_manifest()?;
        log.commit(&self.manifest_path()).map(Some)
    }

    /// Remove manifest entries whose question no longer exists remotely
    ///
    /// Lists the whole scope, not just the configured subcategory, then
    /// looks up any still-missing ids individually in case they moved to
    /// another part of the scope. A failed listing leaves the manifest
    /// untouched and is reported in `errors`.
    pub fn tidy(&self) -> Result<SyncReport> {
        self.recover()?;
        let mut manifest = self.load_manifest()?;
        let mut report = SyncReport::new();

        let listing = match self.remote.list(&ScopeFilter::whole(&self.scope)) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!(error = %e, "Remote listing failed; manifest left untouched");
                report.errors.push(format!("Remote listing failed: {e}"));
                return Ok(report);
            }
        };
        let mut present: HashSet<String> = listing.into_iter().map(|q| q.entity_id).collect();

        let missing: Vec<String> = manifest
            .questions()
            .iter()
            .filter(|q| !present.contains(&q.entity_id))
            .map(|q| q.entity_id.clone())
            .collect();
        if !missing.is_empty() {
            match self.remote.list(&ScopeFilter::entities(&self.scope, missing)) {
                Ok(found) => present.extend(found.into_iter().map(|q| q.entity_id)),
                Err(e) => {
                    tracing::warn!(error = %e, "Remote lookup failed; manifest left untouched");
                    report.errors.push(format!("Remote lookup failed: {e}"));
                    return Ok(report);
                }
            }
        }

        let removed = manifest.retain(|q| present.contains(&q.entity_id));
        for entry in &removed {
            tracing::info!(entity_id = %entry.entity_id, path = %entry.file_path, "Removed from manifest");
            report.deleted.push(entry.entity_id.clone());
        }
        if !removed.is_empty() {
            manifest.save(&self.manifest_path())?;
        }
        Ok(report)
    }

    /// Find remote questions with no local counterpart in scope
    ///
    /// Tracked questions whose file is missing come first, followed by
    /// remote questions the manifest does not track.
    pub fn find_orphans(&self) -> Result<Vec<Orphan>> {
        let manifest = self.load_manifest()?;
        let options = self.options(&manifest)?;
        let subcategory = options.subcategory.as_deref();
        let listing = self
            .remote
            .list(&ScopeFilter::category(&self.scope, subcategory))
            .map_err(|e| crate::Error::remote("list", e))?;

        let orphan = |kind: OrphanKind, remote: &RemoteEntity, file_path: Option<NormalizedPath>| Orphan {
            kind,
            entity_id: remote.entity_id.clone(),
            name: remote.name.clone(),
            category_path: remote.category_path.clone(),
            file_path,
        };

        let in_scope_listing = listing
            .iter()
            .filter(|remote| in_scope(&remote.category_path, subcategory));
        let mut missing_files = Vec::new();
        let mut untracked = Vec::new();
        for remote in in_scope_listing {
            match manifest.get(&remote.entity_id) {
                Some(entry) if !self.root.join(entry.file_path.as_str()).is_file() => {
                    missing_files.push(orphan(
                        OrphanKind::MissingFile,
                        remote,
                        Some(entry.file_path.clone()),
                    ));
                }
                Some(_) => {}
                None => untracked.push(orphan(OrphanKind::Untracked, remote, None)),
            }
        }
        missing_files.extend(untracked);
        Ok(missing_files)
    }

    /// Delete orphaned remote questions the caller confirms
    ///
    /// `confirm` is asked once per orphan. Confirmed deletions of tracked
    /// questions also remove them from the manifest. A remote that
    /// declines or fails a deletion leaves that question untouched.
    pub fn delete_orphans(&self, mut confirm: impl FnMut(&Orphan) -> bool) -> Result<SyncReport> {
        self.recover()?;
        let mut report = SyncReport::new();
        let orphans = match self.find_orphans() {
            Ok(orphans) => orphans,
            Err(e) if !e.is_fatal() => {
                tracing::warn!(error = %e, "Could not list orphans");
                report.errors.push(e.to_string());
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let mut manifest = self.load_manifest()?;
        let mut dirty = false;
        for orphan in &orphans {
            if !confirm(orphan) {
                report.skip(orphan.entity_id.clone(), SkipReason::Declined);
                continue;
            }
            match self.remote.delete(&orphan.entity_id) {
                Ok(true) => {
                    tracing::info!(entity_id = %orphan.entity_id, "Deleted remote question");
                    dirty |= manifest.remove(&orphan.entity_id).is_some();
                    report.deleted.push(orphan.entity_id.clone());
                }
                Ok(false) => {
                    tracing::warn!(entity_id = %orphan.entity_id, "Remote declined deletion");
                    report.skip(
                        orphan.entity_id.clone(),
                        SkipReason::Failed("remote declined deletion".to_string()),
                    );
                }
                Err(e) => {
                    tracing::warn!(entity_id = %orphan.entity_id, error = %e, "Deletion failed");
                    report.skip(orphan.entity_id.clone(), SkipReason::Failed(e.to_string()));
                }
            }
        }

        if dirty {
            manifest.save(&self.manifest_path())?;
        }
        Ok(report)
    }
}
