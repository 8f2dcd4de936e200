//! Core reconciliation layer for question bank sync
//!
//! This crate keeps a file-based question repository and a remote question
//! bank in step, implementing:
//!
//! - **Manifest store**: persisted id↔file mapping with per-question sync state
//! - **Staging log**: crash-safe record of results merged into the manifest
//! - **Category resolver**: category paths ↔ directories with marker files
//! - **Remote adapter**: the [`Remote`] trait and an RPC implementation
//! - **SyncEngine**: export, import, recover, tidy and orphan deletion
//!
//! # Architecture
//!
//! ```text
//!                 caller (CLI, scripts)
//!                         |
//!                    qbank-core
//!                         |
//!              +----------+----------+
//!              |                     |
//!          qbank-fs              qbank-git
//! ```
//!
//! # Example
//!
//! ```ignore
//! use qbank_core::{ExportMode, Scope, SyncConfig, SyncEngine};
//! use qbank_fs::NormalizedPath;
//!
//! let root = NormalizedPath::new("/work/physics-bank");
//! let config = SyncConfig::load(&root)?;
//! let engine = SyncEngine::new(root, Scope::course("Physics 101"), config, remote);
//! let report = engine.export(ExportMode::Refresh)?;
//! ```

pub mod category;
pub mod config;
pub mod error;
pub mod manifest;
pub mod recovery;
pub mod remote;
pub mod staging;
pub mod sync;
pub mod vcs;

pub use category::{CategoryDecl, CategoryResolver, IgnorePattern, MARKER_FILE};
pub use config::{SyncConfig, SyncOptions};
pub use error::{Error, Result};
pub use manifest::{
    ContextLevel, Manifest, ManifestContext, ManifestEntry, MergeSummary, Scope, StagedEntry,
    UpsertOutcome, Version,
};
pub use recovery::{Orphan, OrphanKind};
pub use remote::{
    ContentRef, FetchedEntity, PushOutcome, PushRequest, Remote, RemoteEntity, RemoteError,
    RequestParams, Response, RpcRemote, ScopeFilter, Transport,
};
pub use staging::StagingLog;
pub use sync::{ExportAction, ExportMode, SkipReason, SkippedItem, SyncEngine, SyncReport};
pub use vcs::CommitSource;
