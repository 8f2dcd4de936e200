//! Import: repository files into the remote
//!
//! Runs in two passes over the import directory. The category pass makes
//! sure every category declared by a marker exists remotely; any failure
//! there aborts the run because questions would reference missing
//! categories. The question pass then uploads and pushes each question
//! file whose content changed since it was last pushed.

use std::collections::HashMap;

use crate::category::{in_scope, read_category_marker};
use crate::config::SyncOptions;
use crate::manifest::{Manifest, StagedEntry};
use crate::remote::{PushRequest, Remote, ScopeFilter};
use crate::{Error, Result};
use qbank_fs::NormalizedPath;

use super::engine::SyncEngine;
use super::report::{SkipReason, SyncReport};
use super::walk;

impl<R: Remote> SyncEngine<R> {
    /// Push local categories and changed question files to the remote
    ///
    /// # Errors
    ///
    /// Fails before pushing anything if a tracked question was edited
    /// remotely since it was last synced ([`Error::VersionConflict`]), and
    /// aborts if a category cannot be created ([`Error::CategoryCreation`]).
    pub fn import(&self) -> Result<SyncReport> {
        self.recover()?;
        let mut manifest = self.load_or_init_manifest()?;
        let options = self.options(&manifest)?;
        let mut report = SyncReport::new();

        if self.tracks_commits(&options) {
            self.refresh_commits(&mut manifest, &mut report);
        }
        self.check_versions(&manifest, &options)?;

        let directories = walk::directories(&self.import_base(&options))?;
        self.import_categories(&directories, &options, &mut report)?;
        self.import_questions(&directories, &manifest, &options, &mut report)?;
        self.finish(&manifest, &mut report)?;

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "Import finished"
        );
        Ok(report)
    }

    fn tracks_commits(&self, options: &SyncOptions) -> bool {
        options.use_vcs && self.vcs.is_some()
    }

    fn import_base(&self, options: &SyncOptions) -> NormalizedPath {
        match &options.subdirectory {
            Some(sub) => self.root.join(sub.as_str()),
            None => self.root.clone(),
        }
    }

    /// Record the commit that last touched each tracked file
    fn refresh_commits(&self, manifest: &mut Manifest, report: &mut SyncReport) {
        let Some(vcs) = &self.vcs else { return };
        for entry in manifest.entries_mut() {
            let file = self.root.join(entry.file_path.as_str());
            if !file.is_file() {
                continue;
            }
            match vcs.commit_hash_of(&file.to_native()) {
                Ok(Some(hash)) => entry.scm_commit_current = Some(hash),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %entry.file_path, error = %e, "Could not read commit");
                    report.errors.push(format!("{}: {e}", entry.file_path));
                }
            }
        }
    }

    /// Refuse to import over questions edited remotely since the last sync
    fn check_versions(&self, manifest: &Manifest, options: &SyncOptions) -> Result<()> {
        if manifest.is_empty() {
            return Ok(());
        }
        let listing = self
            .remote
            .list(&ScopeFilter::category(&self.scope, options.subcategory.as_deref()))
            .map_err(|e| Error::remote("list", e))?;

        let conflicts: Vec<String> = listing
            .iter()
            .filter(|remote| in_scope(&remote.category_path, options.subcategory.as_deref()))
            .filter_map(|remote| {
                let entry = manifest.get(&remote.entity_id)?;
                (!entry.knows_version(&remote.version))
                    .then(|| format!("{} ({})", entry.file_path, entry.entity_id))
            })
            .collect();

        if conflicts.is_empty() {
            return Ok(());
        }
        tracing::error!(count = conflicts.len(), "Questions changed remotely; export them first");
        Err(Error::VersionConflict { entries: conflicts })
    }

    /// Ensure every declared category exists remotely
    fn import_categories(
        &self,
        directories: &[NormalizedPath],
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> Result<()> {
        for dir in directories {
            let category = match read_category_marker(dir) {
                Ok(category) => category,
                Err(Error::MarkerNotFound { .. }) => continue,
                Err(e) => {
                    tracing::warn!(path = %dir, error = %e, "Skipping category");
                    report.skip(self.relative(dir), SkipReason::NoCategory(e.to_string()));
                    continue;
                }
            };
            if options.ignore.matches(&category) {
                tracing::debug!(category = %category, "Ignoring category");
                continue;
            }

            if let Err(source) = self.remote.ensure_category(&self.scope, &category) {
                tracing::error!(category = %category, error = %source, "Category creation failed");
                return Err(Error::CategoryCreation { category, source });
            }
            tracing::debug!(category = %category, "Category ensured");
        }
        Ok(())
    }

    /// Upload and push every changed question file
    fn import_questions(
        &self,
        directories: &[NormalizedPath],
        manifest: &Manifest,
        options: &SyncOptions,
        report: &mut SyncReport,
    ) -> Result<()> {
        let log = self.staging_log();
        let mut categories: HashMap<&NormalizedPath, std::result::Result<String, String>> =
            HashMap::new();

        for dir in directories {
            for file in walk::question_files(dir, &options.format)? {
                let relative = self.relative(&file);
                let category = categories
                    .entry(dir)
                    .or_insert_with(|| read_category_marker(dir).map_err(|e| e.to_string()));

                let category = match category {
                    Ok(category) => category.clone(),
                    Err(reason) => {
                        tracing::warn!(path = %relative, %reason, "No category for question");
                        report.skip(relative, SkipReason::NoCategory(reason.clone()));
                        continue;
                    }
                };
                if options.ignore.matches(&category) {
                    continue;
                }

                let existing = manifest.find_by_path(&NormalizedPath::new(&relative));
                if existing.is_some_and(|entry| entry.is_unchanged()) {
                    tracing::debug!(path = %relative, "Unchanged since last push");
                    report.skip(relative, SkipReason::Unchanged);
                    continue;
                }

                let content = match self.remote.upload(&file.to_native()) {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::warn!(path = %relative, error = %e, "Upload failed");
                        report.skip(relative, SkipReason::Failed(e.to_string()));
                        continue;
                    }
                };
                let request = PushRequest {
                    entity_id: existing.map(|entry| entry.entity_id.clone()),
                    content,
                    category_path: category,
                    scope: self.scope.clone(),
                    imported_version: existing.and_then(|entry| entry.imported_version.clone()),
                    exported_version: existing.and_then(|entry| entry.exported_version.clone()),
                };
                let outcome = match self.remote.push(&request) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(path = %relative, error = %e, "Push rejected");
                        report.skip(relative, SkipReason::Failed(e.to_string()));
                        continue;
                    }
                };

                let mut staged = StagedEntry {
                    file_path: Some(NormalizedPath::new(&relative)),
                    format: Some(options.format.clone()),
                    imported_version: Some(outcome.version),
                    context: Some(self.scope.clone()),
                    ..StagedEntry::new(outcome.entity_id.clone())
                };
                if self.tracks_commits(options) {
                    match existing {
                        Some(entry) => staged.scm_commit_remote = entry.scm_commit_current.clone(),
                        None => {
                            let hash = self.first_commit_of(&file);
                            staged.scm_commit_current = hash.clone();
                            staged.scm_commit_remote = hash;
                        }
                    }
                }
                log.append(&staged)?;

                tracing::debug!(path = %relative, entity_id = %outcome.entity_id, "Pushed question");
                if existing.is_some() {
                    report.updated.push(relative);
                } else {
                    report.created.push(relative);
                }
            }
        }
        Ok(())
    }

    fn first_commit_of(&self, file: &NormalizedPath) -> Option<String> {
        let vcs = self.vcs.as_ref()?;
        match vcs.commit_hash_of(&file.to_native()) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(path = %file, error = %e, "Could not read commit");
                None
            }
        }
    }

    fn relative(&self, path: &NormalizedPath) -> String {
        path.relative_to(&self.root)
            .map_or_else(|_| path.to_string(), |p| p.to_string())
    }
}
