//! Export: remote questions into repository files
//!
//! One driver covers both export flows. Each listed question is planned
//! with [`plan_export`] and the resulting action is applied:
//!
//! - **Create** fetches the question with its category chain, materializes
//!   the category directories, writes a new file and stages the entry.
//! - **Update** fetches the question and overwrites the tracked file,
//!   updating the in-memory manifest which is saved at the end of the run.

use crate::category::{CategoryDecl, CategoryResolver, in_scope};
use crate::config::SyncOptions;
use crate::manifest::{Manifest, ManifestEntry, StagedEntry};
use crate::remote::{Remote, RemoteEntity, ScopeFilter};
use crate::{Error, Result};
use qbank_fs::{NormalizedPath, io};

use super::engine::SyncEngine;
use super::naming::unique_file_path;
use super::report::{SkipReason, SyncReport};

/// Which export flows run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportMode {
    /// Only create files for questions not yet tracked
    CreateOnly,
    /// Create untracked questions and refresh tracked ones
    #[default]
    Refresh,
}

/// What to do with one remote question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportAction {
    Create,
    Update,
    Skip(SkipReason),
}

/// Decide how to export `remote` given its manifest entry, if any
pub fn plan_export(
    existing: Option<&ManifestEntry>,
    remote: &RemoteEntity,
    subcategory: Option<&str>,
    mode: ExportMode,
) -> ExportAction {
    if !in_scope(&remote.category_path, subcategory) {
        return ExportAction::Skip(SkipReason::OutOfScope);
    }
    match (existing, mode) {
        (None, _) => ExportAction::Create,
        (Some(_), ExportMode::CreateOnly) => ExportAction::Skip(SkipReason::AlreadyTracked),
        (Some(_), ExportMode::Refresh) => ExportAction::Update,
    }
}

impl<R: Remote> SyncEngine<R> {
    /// Export remote questions into the repository
    ///
    /// Per-question failures are skipped and reported. The run fails only
    /// when the manifest or staging log cannot be used, or the remote
    /// listing is unavailable.
    pub fn export(&self, mode: ExportMode) -> Result<SyncReport> {
        self.recover()?;
        let mut manifest = self.load_or_init_manifest()?;
        let mut report = self.stage_export(&mut manifest, mode)?;
        self.finish(&manifest, &mut report)?;

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            skipped = report.skipped.len(),
            "Export finished"
        );
        Ok(report)
    }

    /// Run the export driver without merging the staging log
    ///
    /// Updates are applied to `manifest` in memory; creates are only
    /// staged. [`recover`](Self::recover) or the end of [`export`](Self::export)
    /// merges them.
    pub fn stage_export(&self, manifest: &mut Manifest, mode: ExportMode) -> Result<SyncReport> {
        let options = self.options(manifest)?;
        let listing = self
            .remote
            .list(&ScopeFilter::category(&self.scope, options.subcategory.as_deref()))
            .map_err(|e| Error::remote("list", e))?;

        let mut resolver = CategoryResolver::new(self.root.clone(), options.subcategory.clone());
        let log = self.staging_log();
        let mut report = SyncReport::new();

        for entity in &listing {
            let action = plan_export(
                manifest.get(&entity.entity_id),
                entity,
                options.subcategory.as_deref(),
                mode,
            );
            let outcome = match action {
                ExportAction::Skip(reason) => {
                    tracing::debug!(entity_id = %entity.entity_id, %reason, "Skipping question");
                    report.skip(entity.entity_id.clone(), reason);
                    continue;
                }
                ExportAction::Create => self
                    .create_file(entity, &options, &mut resolver)
                    .and_then(|staged| {
                        log.append(&staged)?;
                        Ok(staged.file_path)
                    })
                    .map(|path| (true, path)),
                ExportAction::Update => match manifest.get_mut(&entity.entity_id) {
                    Some(entry) => self
                        .refresh_file(entry, entity)
                        .map(|path| (false, Some(path))),
                    None => continue,
                },
            };

            match outcome {
                Ok((created, path)) => {
                    let label = path.map_or_else(|| entity.entity_id.clone(), |p| p.to_string());
                    if created {
                        report.created.push(label);
                    } else {
                        report.updated.push(label);
                    }
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(entity_id = %entity.entity_id, error = %e, "Export aborted");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(entity_id = %entity.entity_id, error = %e, "Skipping question");
                    report.skip(entity.entity_id.clone(), SkipReason::Failed(e.to_string()));
                }
            }
        }

        if manifest.context.default_subdirectory.is_none()
            && let Some(matched) = resolver.matched_subdirectory()
        {
            manifest.context.default_subdirectory = Some(matched.to_string());
        }
        Ok(report)
    }

    /// Fetch an untracked question and write it to a new file
    fn create_file(
        &self,
        entity: &RemoteEntity,
        options: &SyncOptions,
        resolver: &mut CategoryResolver,
    ) -> Result<StagedEntry> {
        let fetched = self
            .remote
            .fetch(&entity.entity_id, true)
            .map_err(|e| Error::remote("fetch", e))?;

        let chain = if fetched.category_chain.is_empty() {
            vec![CategoryDecl::new(entity.category_path.clone())]
        } else {
            fetched.category_chain
        };
        let mut leaf = self.root.clone();
        for decl in &chain {
            leaf = resolver.materialize(decl)?;
        }

        let file = unique_file_path(&leaf, &entity.name, &options.format);
        io::write_new(&file, fetched.payload.as_bytes())?;
        let relative = file.relative_to(&self.root)?;
        tracing::debug!(entity_id = %entity.entity_id, path = %relative, "Exported question");

        Ok(StagedEntry {
            file_path: Some(relative),
            format: Some(options.format.clone()),
            exported_version: Some(fetched.version),
            context: Some(self.scope.clone()),
            ..StagedEntry::new(entity.entity_id.clone())
        })
    }

    /// Fetch a tracked question and overwrite its file
    fn refresh_file(&self, entry: &mut ManifestEntry, entity: &RemoteEntity) -> Result<NormalizedPath> {
        let fetched = self
            .remote
            .fetch(&entity.entity_id, false)
            .map_err(|e| Error::remote("fetch", e))?;

        let file = self.root.join(entry.file_path.as_str());
        io::write_text(&file, &fetched.payload)?;
        entry.exported_version = Some(fetched.version);
        tracing::debug!(entity_id = %entity.entity_id, path = %entry.file_path, "Refreshed question");
        Ok(entry.file_path.clone())
    }
}
