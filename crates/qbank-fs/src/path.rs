//! Forward-slash paths used throughout manifests and the engine

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A path with `/` separators and no repeated or trailing separators.
///
/// Manifest entries store paths relative to the repository root in this
/// form so a manifest written on one platform resolves on another.
/// Conversion to a native path only happens at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NormalizedPath {
    inner: String,
}

fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().map(|c| if c == '\\' { '/' } else { c }) {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: normalize(&path.as_ref().to_string_lossy()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Platform-native form for I/O.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append `segment`, which may itself contain separators.
    pub fn join(&self, segment: &str) -> Self {
        if self.inner.is_empty() {
            return Self::new(segment);
        }
        Self {
            inner: normalize(&format!("{}/{segment}", self.inner)),
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.inner == "/" {
            return None;
        }
        let (head, _) = self.inner.rsplit_once('/')?;
        let head = if head.is_empty() { "/" } else { head };
        Some(Self {
            inner: head.to_string(),
        })
    }

    /// Last component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.inner.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Last component without its extension.
    pub fn file_stem(&self) -> Option<&str> {
        let name = self.file_name()?;
        Some(split_extension(name).map_or(name, |(stem, _)| stem))
    }

    pub fn extension(&self) -> Option<&str> {
        split_extension(self.file_name()?).map(|(_, ext)| ext)
    }

    /// This path with `base` removed from its front.
    ///
    /// Matches whole components only, so `/repo/top` is not inside `/repo/to`.
    /// A path relative to itself is empty.
    pub fn relative_to(&self, base: &NormalizedPath) -> Result<Self> {
        let rest = if self.inner == base.inner {
            Some("")
        } else if base.inner == "/" {
            self.inner.strip_prefix('/')
        } else {
            self.inner
                .strip_prefix(base.inner.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
        };
        rest.map(|rest| Self {
            inner: rest.to_string(),
        })
        .ok_or_else(|| Error::NotRelative {
            path: self.inner.clone(),
            base: base.inner.clone(),
        })
    }

    /// True when `base` is this path or one of its ancestors.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        self.relative_to(base).is_ok()
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Split `name.ext`; dotfiles such as `.qbanksync` have no extension.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.').filter(|(stem, _)| !stem.is_empty())
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

impl From<NormalizedPath> for String {
    fn from(p: NormalizedPath) -> Self {
        p.inner
    }
}
