//! File writes that never leave a half-written manifest behind

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Hidden sibling of `path` used as the staging file for a replace
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn write_synced(file: &mut File, path: &Path, content: &[u8]) -> Result<()> {
    file.write_all(content).map_err(|e| Error::io(path, e))?;
    file.sync_all().map_err(|e| Error::io(path, e))
}

/// Replace `path` with `content` in one step.
///
/// Writes a locked sibling temp file, then renames it over the target, so
/// readers see either the old or the new content.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    ensure_parent(&target)?;

    let temp = temp_sibling(&target);
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp)
        .map_err(|e| Error::io(&temp, e))?;

    file.lock_exclusive()
        .map_err(|_| Error::LockFailed { path: target.clone() })?;
    let written = write_synced(&mut file, &temp, content);
    // Released on drop too
    let _ = FileExt::unlock(&file);
    drop(file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp);
        return Err(e);
    }
    fs::rename(&temp, &target).map_err(|e| Error::io(&target, e))
}

/// Create a file that must not exist yet.
///
/// Fails with [`Error::AlreadyExists`] instead of truncating an existing file.
pub fn write_new(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    ensure_parent(&target)?;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => Error::AlreadyExists {
                path: target.clone(),
            },
            _ => Error::io(&target, e),
        })?;
    write_synced(&mut file, &target, content)
}

pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(native, e))
}

/// Atomic [`write_atomic`] for text.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Remove a file; `Ok(false)` if it was already gone.
pub fn remove_if_exists(path: &NormalizedPath) -> Result<bool> {
    let native = path.to_native();
    match fs::remove_file(&native) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(native, e)),
    }
}
