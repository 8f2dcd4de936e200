//! Sync configuration
//!
//! [`SyncConfig`] is read from an optional `.qbanksync.toml` (or `.json`,
//! `.yaml`) at the repository root. [`SyncOptions`] layers it over the
//! defaults recorded in the manifest context: explicit configuration wins,
//! then manifest defaults, then built-in defaults.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::category::IgnorePattern;
use crate::manifest::{ManifestContext, Scope};
use crate::sync::sanitize_file_name;
use qbank_fs::{ConfigStore, NormalizedPath};

/// Stem of the configuration file at the repository root
pub const CONFIG_STEM: &str = ".qbanksync";

/// Per-repository settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Name of the remote instance, used in manifest file names
    pub instance: String,
    /// Extension of question files
    pub format: String,
    /// Track the commit each file was last pushed from
    pub use_vcs: bool,
    pub subcategory: Option<String>,
    pub subdirectory: Option<String>,
    pub ignore_pattern: Option<String>,
    pub remote_url: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            instance: "qbank".to_string(),
            format: "xml".to_string(),
            use_vcs: false,
            subcategory: None,
            subdirectory: None,
            ignore_pattern: None,
            remote_url: None,
        }
    }
}

impl SyncConfig {
    /// Load the configuration file under `root`, or defaults if there is none
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be parsed.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let store = ConfigStore::new();
        match store.find(root, CONFIG_STEM) {
            Some(path) => {
                tracing::debug!(path = %path, "Loading sync config");
                Ok(store.load(&path)?)
            }
            None => Ok(Self::default()),
        }
    }

    /// Save the configuration as `.qbanksync.toml` under `root`
    pub fn save(&self, root: &NormalizedPath) -> Result<()> {
        let path = root.join(&format!("{CONFIG_STEM}.toml"));
        ConfigStore::new().save(&path, self)?;
        Ok(())
    }

    fn file_stem(&self, scope: &Scope) -> String {
        format!(
            "{}_{}_{}",
            sanitize_file_name(&self.instance),
            scope.level,
            sanitize_file_name(scope.name())
        )
    }

    /// File name of the manifest for `scope`
    pub fn manifest_file_name(&self, scope: &Scope) -> String {
        format!("{}_question_manifest.json", self.file_stem(scope))
    }

    /// File name of the staging log for `scope`
    pub fn staging_file_name(&self, scope: &Scope) -> String {
        format!("{}_manifest_update.tmp", self.file_stem(scope))
    }

    /// Context recorded in a newly created manifest
    pub fn initial_context(&self, scope: &Scope) -> ManifestContext {
        ManifestContext {
            remote_url: self.remote_url.clone(),
            default_subcategory: self.subcategory.clone(),
            default_subdirectory: self.subdirectory.clone(),
            default_ignore_pattern: self.ignore_pattern.clone(),
            ..ManifestContext::new(scope.clone())
        }
    }
}

/// Effective settings for one run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Only categories at or below this path take part
    pub subcategory: Option<String>,
    /// Directory, relative to the root, that import walks
    pub subdirectory: Option<NormalizedPath>,
    pub ignore: IgnorePattern,
    pub format: String,
    pub use_vcs: bool,
}

impl SyncOptions {
    /// Layer `config` over the defaults in `context`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIgnorePattern`](crate::Error::InvalidIgnorePattern)
    /// if the effective ignore pattern is not a valid regex.
    pub fn resolve(config: &SyncConfig, context: &ManifestContext) -> Result<Self> {
        let pick = |explicit: &Option<String>, fallback: &Option<String>| {
            explicit
                .clone()
                .or_else(|| fallback.clone())
                .filter(|value| !value.trim().is_empty())
        };

        let subcategory = pick(&config.subcategory, &context.default_subcategory);
        let subdirectory =
            pick(&config.subdirectory, &context.default_subdirectory).map(NormalizedPath::new);
        let ignore_source = pick(&config.ignore_pattern, &context.default_ignore_pattern);

        Ok(Self {
            subcategory,
            subdirectory,
            ignore: IgnorePattern::parse(ignore_source.as_deref())?,
            format: config.format.clone(),
            use_vcs: config.use_vcs,
        })
    }
}
