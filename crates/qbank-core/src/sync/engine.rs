//! SyncEngine: one repository root against one remote scope

use crate::config::{SyncConfig, SyncOptions};
use crate::manifest::{Manifest, Scope};
use crate::remote::Remote;
use crate::staging::StagingLog;
use crate::vcs::CommitSource;
use crate::{Error, Result};
use qbank_fs::NormalizedPath;

use super::report::SyncReport;

/// Engine for reconciling a repository root with a remote question bank
///
/// The engine provides these operations:
/// - **export**: pull remote questions into files (create and refresh)
/// - **import**: push categories and changed files to the remote
/// - **recover**: merge a staging log left by an interrupted run
/// - **tidy**: drop manifest entries whose remote question is gone
/// - **delete_orphans**: delete remote questions with no local counterpart
///
/// Every operation starts by recovering, so a crash between a remote call
/// and the manifest merge is repaired before any new work.
pub struct SyncEngine<R> {
    pub(crate) root: NormalizedPath,
    pub(crate) scope: Scope,
    pub(crate) config: SyncConfig,
    pub(crate) remote: R,
    pub(crate) vcs: Option<Box<dyn CommitSource>>,
}

impl<R: Remote> SyncEngine<R> {
    /// Create an engine for `root`, which mirrors `scope`
    pub fn new(root: NormalizedPath, scope: Scope, config: SyncConfig, remote: R) -> Self {
        Self {
            root,
            scope,
            config,
            remote,
            vcs: None,
        }
    }

    /// Use `vcs` to track the commit each file was pushed from
    ///
    /// Commit tracking only happens when the configuration enables it.
    pub fn with_vcs(mut self, vcs: impl CommitSource + 'static) -> Self {
        self.vcs = Some(Box::new(vcs));
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Get the path to the manifest file
    pub fn manifest_path(&self) -> NormalizedPath {
        self.root.join(&self.config.manifest_file_name(&self.scope))
    }

    /// Get the staging log for this root and scope
    pub fn staging_log(&self) -> StagingLog {
        StagingLog::new(self.root.join(&self.config.staging_file_name(&self.scope)))
    }

    /// Load the manifest
    ///
    /// # Errors
    ///
    /// Fails if the manifest is missing, cannot be parsed, or was written
    /// for a different scope.
    pub fn load_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        let manifest = Manifest::load(&path)?;
        if manifest.context.scope != self.scope {
            return Err(Error::ContextMismatch {
                path: path.to_native(),
                expected: self.scope.to_string(),
                found: manifest.context.scope.to_string(),
            });
        }
        Ok(manifest)
    }

    /// Load the manifest, creating and saving an empty one on a first run
    pub fn load_or_init_manifest(&self) -> Result<Manifest> {
        match self.load_manifest() {
            Err(Error::ManifestNotFound { .. }) => {
                let manifest = Manifest::new(self.config.initial_context(&self.scope));
                manifest.save(&self.manifest_path())?;
                tracing::info!(path = %self.manifest_path(), scope = %self.scope, "Created manifest");
                Ok(manifest)
            }
            other => other,
        }
    }

    /// Effective options for a run against `manifest`
    pub fn options(&self, manifest: &Manifest) -> Result<SyncOptions> {
        SyncOptions::resolve(&self.config, &manifest.context)
    }

    /// Persist in-memory changes, then merge whatever the run staged
    ///
    /// The in-memory save is best-effort: a failure is reported and the
    /// next run reconciles again. Merging the staging log is not.
    pub(crate) fn finish(&self, manifest: &Manifest, report: &mut SyncReport) -> Result<()> {
        let path = self.manifest_path();
        if let Err(e) = manifest.save(&path) {
            tracing::warn!(path = %path, error = %e, "Could not save manifest");
            report.errors.push(format!("Could not save manifest: {e}"));
        }

        let log = self.staging_log();
        if log.exists() {
            log.commit(&path)?;
        }
        Ok(())
    }
}
