//! Remote scope and per-repository context
//!
//! A repository root mirrors exactly one remote scope: the system question
//! bank, a course category, a course, or a single module. The manifest
//! records that scope together with the defaults later runs fall back to.

use serde::{Deserialize, Serialize};

/// Level of the remote context that owns a question bank
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    System,
    CourseCategory,
    #[default]
    Course,
    Module,
}

impl ContextLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::CourseCategory => "coursecategory",
            Self::Course => "course",
            Self::Module => "module",
        }
    }
}

impl std::fmt::Display for ContextLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies the remote context a question bank belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    #[serde(rename = "contextlevel")]
    pub level: ContextLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, rename = "coursecategory", skip_serializing_if = "Option::is_none")]
    pub course_category: Option<String>,
}

impl Scope {
    pub fn system() -> Self {
        Self {
            level: ContextLevel::System,
            ..Self::default()
        }
    }

    pub fn course(name: impl Into<String>) -> Self {
        Self {
            level: ContextLevel::Course,
            course: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn module(course: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            level: ContextLevel::Module,
            course: Some(course.into()),
            module: Some(module.into()),
            ..Self::default()
        }
    }

    pub fn course_category(name: impl Into<String>) -> Self {
        Self {
            level: ContextLevel::CourseCategory,
            course_category: Some(name.into()),
            ..Self::default()
        }
    }

    /// Name of the context at this scope's level
    pub fn name(&self) -> &str {
        let name = match self.level {
            ContextLevel::System => None,
            ContextLevel::CourseCategory => self.course_category.as_deref(),
            ContextLevel::Course => self.course.as_deref(),
            ContextLevel::Module => self.module.as_deref(),
        };
        name.unwrap_or("system")
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.level {
            ContextLevel::System => write!(f, "system"),
            ContextLevel::Module => write!(
                f,
                "module {} in course {}",
                self.name(),
                self.course.as_deref().unwrap_or("?")
            ),
            level => write!(f, "{} {}", level, self.name()),
        }
    }
}

/// Per-repository context stored at the top of the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestContext {
    #[serde(flatten)]
    pub scope: Scope,
    /// Base URL of the remote server this repository syncs with
    #[serde(default, rename = "remoteurl", skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    /// Category path used when a run names no subcategory
    #[serde(default, rename = "defaultsubcategory", skip_serializing_if = "Option::is_none")]
    pub default_subcategory: Option<String>,
    /// Directory (relative to the root) matching `default_subcategory`
    #[serde(default, rename = "defaultsubdirectory", skip_serializing_if = "Option::is_none")]
    pub default_subdirectory: Option<String>,
    /// Regex applied to category path segments to exclude them from import
    #[serde(default, rename = "defaultignorecat", skip_serializing_if = "Option::is_none")]
    pub default_ignore_pattern: Option<String>,
}

impl ManifestContext {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }
}
