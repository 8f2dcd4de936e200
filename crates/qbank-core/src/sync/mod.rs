//! Reconciliation engine
//!
//! This module provides:
//! - **export**: create files for unseen remote questions and refresh
//!   tracked ones (one driver, see [`plan_export`])
//! - **import**: push categories, then changed question files, to the remote
//! - **report**: typed per-run outcome returned by every flow
//! - **naming**: collision-free file names for exported questions

mod engine;
mod export;
mod import;
mod naming;
mod report;
mod walk;

pub use engine::SyncEngine;
pub use export::{ExportAction, ExportMode, plan_export};
pub use naming::{MAX_FILE_STEM, sanitize_file_name, unique_file_path};
pub use report::{SkipReason, SkippedItem, SyncReport};
