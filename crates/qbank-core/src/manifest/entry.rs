//! Manifest rows and the partial records staged during a run

use serde::{Deserialize, Deserializer, Serialize};

use super::context::Scope;
use qbank_fs::NormalizedPath;

/// Opaque remote version token
///
/// Servers report versions as integers or strings; both decode to the
/// same token and only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for Version {
    fn from(v: u64) -> Self {
        Self(v.to_string())
    }
}

impl From<&str> for Version {
    fn from(v: &str) -> Self {
        Self(v.to_string())
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(Self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Unsigned(u64),
    Signed(i64),
}

/// Accept a JSON string or integer as a string.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Unsigned(n) => n.to_string(),
        StringOrNumber::Signed(n) => n.to_string(),
    })
}

/// One tracked question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "questionbankentryid", deserialize_with = "string_or_number")]
    pub entity_id: String,
    /// Path relative to the manifest directory
    #[serde(rename = "filepath")]
    pub file_path: NormalizedPath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Version the remote assigned when this file was last pushed
    #[serde(default, rename = "importedversion", skip_serializing_if = "Option::is_none")]
    pub imported_version: Option<Version>,
    /// Version last pulled from the remote into this file
    #[serde(default, rename = "exportedversion", skip_serializing_if = "Option::is_none")]
    pub exported_version: Option<Version>,
    /// Commit that last touched the file, as of the latest run
    #[serde(default, rename = "currentcommit", skip_serializing_if = "Option::is_none")]
    pub scm_commit_current: Option<String>,
    /// Commit whose content the remote is believed to hold
    #[serde(default, rename = "remotecommit", skip_serializing_if = "Option::is_none")]
    pub scm_commit_remote: Option<String>,
    /// Scope the question was imported into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Scope>,
}

impl ManifestEntry {
    pub fn new(entity_id: impl Into<String>, file_path: impl Into<NormalizedPath>) -> Self {
        Self {
            entity_id: entity_id.into(),
            file_path: file_path.into(),
            format: None,
            imported_version: None,
            exported_version: None,
            scm_commit_current: None,
            scm_commit_remote: None,
            context: None,
        }
    }

    /// True when the file's commit matches what the remote already holds.
    ///
    /// Entries without commit tracking are never considered unchanged.
    pub fn is_unchanged(&self) -> bool {
        matches!(
            (&self.scm_commit_current, &self.scm_commit_remote),
            (Some(current), Some(remote)) if current == remote
        )
    }

    /// Whether `version` is one this repository has already seen.
    pub fn knows_version(&self, version: &Version) -> bool {
        self.exported_version.as_ref() == Some(version)
            || self.imported_version.as_ref() == Some(version)
    }

    /// Overwrite every field the staged record carries.
    pub fn apply(&mut self, staged: &StagedEntry) {
        if let Some(path) = &staged.file_path {
            self.file_path = path.clone();
        }
        if let Some(format) = &staged.format {
            self.format = Some(format.clone());
        }
        if let Some(v) = &staged.imported_version {
            self.imported_version = Some(v.clone());
        }
        if let Some(v) = &staged.exported_version {
            self.exported_version = Some(v.clone());
        }
        if let Some(c) = &staged.scm_commit_current {
            self.scm_commit_current = Some(c.clone());
        }
        if let Some(c) = &staged.scm_commit_remote {
            self.scm_commit_remote = Some(c.clone());
        }
        if let Some(context) = &staged.context {
            self.context = Some(context.clone());
        }
    }
}

/// A partial manifest entry written to the staging log
///
/// Absent fields leave the manifest's existing values untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedEntry {
    #[serde(rename = "questionbankentryid", deserialize_with = "string_or_number")]
    pub entity_id: String,
    #[serde(default, rename = "filepath", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<NormalizedPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "importedversion", skip_serializing_if = "Option::is_none")]
    pub imported_version: Option<Version>,
    #[serde(default, rename = "exportedversion", skip_serializing_if = "Option::is_none")]
    pub exported_version: Option<Version>,
    #[serde(default, rename = "currentcommit", skip_serializing_if = "Option::is_none")]
    pub scm_commit_current: Option<String>,
    #[serde(default, rename = "remotecommit", skip_serializing_if = "Option::is_none")]
    pub scm_commit_remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Scope>,
}

impl StagedEntry {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Self::default()
        }
    }

    /// Build a complete entry, if the record carries a file path.
    pub fn into_entry(self) -> Option<ManifestEntry> {
        let file_path = self.file_path.clone()?;
        let mut entry = ManifestEntry::new(self.entity_id.clone(), file_path);
        entry.apply(&self);
        Some(entry)
    }
}
