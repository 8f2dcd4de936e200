//! Filesystem primitives for question bank sync
//!
//! Provides forward-slash path handling, atomic writes and a format-agnostic
//! configuration store shared by the higher layers.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use path::NormalizedPath;
