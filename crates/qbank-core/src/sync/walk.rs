//! Repository tree traversal for import

use std::fs;

use crate::Result;
use crate::category::MARKER_FILE;
use qbank_fs::NormalizedPath;

/// Directories at and below `base`, parents before children.
///
/// Siblings are visited in name order and hidden directories (such as
/// `.git`) are skipped. A missing `base` yields nothing.
pub(crate) fn directories(base: &NormalizedPath) -> Result<Vec<NormalizedPath>> {
    let mut out = Vec::new();
    if base.is_dir() {
        visit(base, &mut out)?;
    }
    Ok(out)
}

fn visit(dir: &NormalizedPath, out: &mut Vec<NormalizedPath>) -> Result<()> {
    out.push(dir.clone());
    let mut children: Vec<String> = entries(dir)?
        .into_iter()
        .filter(|(name, is_dir)| *is_dir && !name.starts_with('.'))
        .map(|(name, _)| name)
        .collect();
    children.sort();
    for child in children {
        visit(&dir.join(&child), out)?;
    }
    Ok(())
}

/// Question files directly inside `dir`, in name order
pub(crate) fn question_files(dir: &NormalizedPath, format: &str) -> Result<Vec<NormalizedPath>> {
    let suffix = format!(".{format}");
    let mut names: Vec<String> = entries(dir)?
        .into_iter()
        .filter(|(name, is_dir)| {
            !is_dir && name.ends_with(&suffix) && name != MARKER_FILE && !name.starts_with('.')
        })
        .map(|(name, _)| name)
        .collect();
    names.sort();
    Ok(names.iter().map(|name| dir.join(name)).collect())
}

fn entries(dir: &NormalizedPath) -> Result<Vec<(String, bool)>> {
    let native = dir.to_native();
    let read = fs::read_dir(&native).map_err(|e| qbank_fs::Error::io(&native, e))?;

    let mut out = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| qbank_fs::Error::io(&native, e))?;
        let file_type = entry.file_type().map_err(|e| qbank_fs::Error::io(entry.path(), e))?;
        out.push((entry.file_name().to_string_lossy().into_owned(), file_type.is_dir()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_parents_first_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for sub in ["top/B", "top/A/sub2", "top/A/sub1", ".git/objects"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        let root = NormalizedPath::new(dir.path());

        let found: Vec<String> = directories(&root)
            .unwrap()
            .iter()
            .map(|d| d.relative_to(&root).unwrap().as_str().to_string())
            .collect();

        assert_eq!(found, ["", "top", "top/A", "top/A/sub1", "top/A/sub2", "top/B"]);
    }

    #[test]
    fn question_files_exclude_marker_and_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xml", "a.xml", MARKER_FILE, "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let root = NormalizedPath::new(dir.path());

        let files: Vec<_> = question_files(&root, "xml")
            .unwrap()
            .into_iter()
            .map(|f| f.file_name().unwrap().to_string())
            .collect();

        assert_eq!(files, ["a.xml", "b.xml"]);
    }

    #[test]
    fn missing_base_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = NormalizedPath::new(dir.path().join("nope"));
        assert!(directories(&missing).unwrap().is_empty());
    }
}
