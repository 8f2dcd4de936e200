//! [`TestRepo`] scratch repository for sync scenarios.

use std::fs;
use std::path::Path;

use qbank_core::{MARKER_FILE, category};
use qbank_fs::NormalizedPath;
use tempfile::TempDir;

/// A temporary repository root with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use qbank_test_utils::TestRepo;
///
/// let repo = TestRepo::new();
/// repo.write_marker("top", "top");
/// repo.write("top/q.xml", "<quiz/>");
/// repo.assert_file_exists("top/q.xml");
/// ```
pub struct TestRepo {
    temp_dir: TempDir,
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRepo {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Return the root path of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Return the root as a [`NormalizedPath`].
    pub fn path(&self) -> NormalizedPath {
        NormalizedPath::new(self.root())
    }

    /// Initialise the directory as a git repository with an identity.
    pub fn init_git(&self) -> git2::Repository {
        crate::git::real_git_repo(self.root())
    }

    /// Write a file (relative to root), creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full_path = self.root().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    /// Write a category marker declaring `category_path` into `directory`.
    pub fn write_marker(&self, directory: &str, category_path: &str) {
        let dir = if directory.is_empty() {
            self.path()
        } else {
            self.path().join(directory)
        };
        fs::create_dir_all(dir.to_native()).unwrap();
        category::write_category_marker(&dir, category_path, None).unwrap();
    }

    /// Read a file relative to root.
    ///
    /// # Panics
    /// Panics if the file cannot be read.
    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Remove a file relative to root.
    pub fn remove(&self, path: &str) {
        fs::remove_file(self.root().join(path)).unwrap();
    }

    /// Every file below root (relative, forward slashes, sorted), skipping `.git`.
    pub fn files(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect(self.root(), self.root(), &mut out);
        out.sort();
        out
    }

    /// Files below root whose name ends with `suffix`, excluding category markers.
    pub fn files_ending_with(&self, suffix: &str) -> Vec<String> {
        self.files()
            .into_iter()
            .filter(|f| f.ends_with(suffix) && !f.ends_with(MARKER_FILE))
            .collect()
    }

    /// Category markers below root.
    pub fn markers(&self) -> Vec<String> {
        self.files()
            .into_iter()
            .filter(|f| f.ends_with(MARKER_FILE))
            .collect()
    }

    /// Assert that `path` (relative to the repo root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }

    /// Assert that the file at `path` (relative to root) contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, path: &str, content: &str) {
        let file_content = self.read(path);
        assert!(
            file_content.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            path,
            content,
            file_content
        );
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<String>) {
    for entry in fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let path = entry.path();
        if entry.file_name() == ".git" {
            continue;
        }
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let relative = path.strip_prefix(root).unwrap();
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
}
