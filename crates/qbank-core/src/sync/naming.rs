//! File names for exported questions

use std::sync::LazyLock;

use regex::Regex;

use crate::category::truncate_to_bytes;
use qbank_fs::NormalizedPath;

/// Longest file stem written for a question, in bytes.
///
/// Leaves room for a `_N` counter and the extension under the usual
/// 255-byte file name limit.
pub const MAX_FILE_STEM: usize = 230;

static UNSAFE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\-]+").expect("Invalid file name regex"));

/// Turn a question name into a safe file stem.
///
/// Runs of characters other than word characters and `-` become a single
/// `-`, and the result is cut to [`MAX_FILE_STEM`] bytes on a character
/// boundary.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced = UNSAFE_RUN.replace_all(name.trim(), "-");
    let stem = truncate_to_bytes(&replaced, MAX_FILE_STEM).to_string();
    if stem.is_empty() || stem.chars().all(|c| c == '-') {
        "question".to_string()
    } else {
        stem
    }
}

/// First free path for `name` in `directory`.
///
/// Tries `<stem>.<format>`, then `<stem>_2.<format>`, `<stem>_3.<format>`
/// and so on. The result depends only on what already exists on disk.
pub fn unique_file_path(directory: &NormalizedPath, name: &str, format: &str) -> NormalizedPath {
    let stem = sanitize_file_name(name);
    let mut candidate = directory.join(&format!("{stem}.{format}"));
    let mut counter = 2;
    while candidate.exists() {
        candidate = directory.join(&format!("{stem}_{counter}.{format}"));
        counter += 1;
    }
    candidate
}
