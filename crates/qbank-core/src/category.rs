//! Category path resolution
//!
//! Remote categories form a tree addressed by slash-delimited paths such as
//! `top/Unit 1/Vectors`. A literal slash inside a category name is written
//! doubled (`A//B`). Each category maps to a directory whose path segments
//! are the sanitized category names, and each materialized category
//! directory holds a marker file declaring the full category path.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};
use qbank_fs::{NormalizedPath, io};

/// Name of the marker file in every category directory
pub const MARKER_FILE: &str = "qbank_category.xml";

/// Characters that may not appear in a directory name
const DISALLOWED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest directory name written for a category, in bytes
pub const MAX_SEGMENT_BYTES: usize = 240;

static MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<question\s+type="category"\s*>.*?<category>\s*<text>(.*?)</text>"#)
        .expect("Invalid category marker regex")
});

/// Split a category path into its segment names.
///
/// Splits on single `/`; a doubled `//` is a literal slash inside a name.
/// Each segment is trimmed.
pub fn split_category_path(category_path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = category_path.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '/' {
            if chars.peek() == Some(&'/') {
                chars.next();
                current.push('/');
            } else {
                segments.push(current.trim().to_string());
                current.clear();
            }
        } else {
            current.push(c);
        }
    }
    segments.push(current.trim().to_string());
    segments
}

/// Make a category name safe to use as a directory name.
pub fn sanitize_segment(segment: &str) -> String {
    let replaced: String = segment
        .trim()
        .chars()
        .map(|c| if DISALLOWED.contains(&c) || c.is_control() { '-' } else { c })
        .collect();
    let replaced = truncate_to_bytes(&replaced, MAX_SEGMENT_BYTES);

    if replaced.is_empty() {
        "_".to_string()
    } else if replaced.chars().all(|c| c == '.') {
        "-".repeat(replaced.len())
    } else {
        replaced.to_string()
    }
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub(crate) fn truncate_to_bytes(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = text
        .char_indices()
        .map(|(idx, c)| idx + c.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    &text[..end]
}

/// Map a category path to the sequence of directory names holding it.
pub fn path_to_directories(category_path: &str) -> Vec<String> {
    split_category_path(category_path)
        .iter()
        .map(|segment| sanitize_segment(segment))
        .collect()
}

/// Whether `category_path` is `subcategory` or one of its descendants.
///
/// A descendant continues the subcategory path with exactly one `/`, so
/// `top/A2` is not inside `top/A` and neither is `top/A//B` (a sibling
/// whose name contains a slash). With no subcategory every path is in scope.
pub fn in_scope(category_path: &str, subcategory: Option<&str>) -> bool {
    let Some(subcategory) = subcategory else {
        return true;
    };
    match category_path.strip_prefix(subcategory) {
        Some("") => true,
        Some(rest) => rest.starts_with('/') && !rest.starts_with("//"),
        None => false,
    }
}

/// Render the marker file for a category.
pub fn render_marker(category_path: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <quiz>\n\
         \x20 <question type=\"category\">\n\
         \x20   <category>\n\
         \x20     <text>{}</text>\n\
         \x20   </category>\n\
         \x20 </question>\n\
         </quiz>\n",
        escape_xml(category_path)
    )
}

/// Extract the declared category path from marker content.
pub fn parse_marker(content: &str) -> Option<String> {
    let caps = MARKER_REGEX.captures(content)?;
    let text = unescape_xml(caps.get(1)?.as_str().trim());
    if text.is_empty() { None } else { Some(text) }
}

/// Read the category path declared by the marker in `directory`.
///
/// # Errors
///
/// [`Error::MarkerNotFound`] if the directory has no marker and
/// [`Error::MarkerParse`] if the marker declares no category.
pub fn read_category_marker(directory: &NormalizedPath) -> Result<String> {
    let marker = directory.join(MARKER_FILE);
    let content = match io::read_text(&marker) {
        Ok(content) => content,
        Err(e) if e.is_not_found() => {
            return Err(Error::MarkerNotFound {
                path: directory.to_native(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    parse_marker(&content).ok_or_else(|| Error::MarkerParse {
        path: marker.to_native(),
        message: "no <category><text> element".to_string(),
    })
}

/// Write a new marker file into `directory`.
///
/// Uses `content` verbatim when given, otherwise renders a marker for
/// `category_path`. Never overwrites an existing marker.
pub fn write_category_marker(
    directory: &NormalizedPath,
    category_path: &str,
    content: Option<&str>,
) -> Result<()> {
    let marker = directory.join(MARKER_FILE);
    let rendered;
    let body = match content {
        Some(content) => content,
        None => {
            rendered = render_marker(category_path);
            &rendered
        }
    };
    io::write_new(&marker, body.as_bytes())?;
    tracing::debug!(category = %category_path, path = %marker, "Wrote category marker");
    Ok(())
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// One category declaration accompanying a fetched question
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CategoryDecl {
    /// Full category path
    pub path: String,
    /// Marker content supplied by the remote, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl CategoryDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

/// Materializes category directories under a repository root
///
/// Remembers which directories already hold a marker during a run so each
/// marker is written once. When a materialized category equals the
/// configured subcategory its directory is recorded as the matched
/// subdirectory.
#[derive(Debug)]
pub struct CategoryResolver {
    root: NormalizedPath,
    subcategory: Option<String>,
    materialized: HashSet<NormalizedPath>,
    matched_subdirectory: Option<NormalizedPath>,
}

impl CategoryResolver {
    pub fn new(root: NormalizedPath, subcategory: Option<String>) -> Self {
        Self {
            root,
            subcategory,
            materialized: HashSet::new(),
            matched_subdirectory: None,
        }
    }

    /// Directory that holds `category_path`
    pub fn directory_for(&self, category_path: &str) -> NormalizedPath {
        path_to_directories(category_path)
            .iter()
            .fold(self.root.clone(), |dir, segment| dir.join(segment))
    }

    /// Create the directory for a category and write its marker if missing
    pub fn materialize(&mut self, decl: &CategoryDecl) -> Result<NormalizedPath> {
        let directory = self.directory_for(&decl.path);

        if self.subcategory.as_deref() == Some(decl.path.as_str()) {
            self.matched_subdirectory = Some(directory.relative_to(&self.root)?);
        }

        if self.materialized.contains(&directory) {
            return Ok(directory);
        }

        std::fs::create_dir_all(directory.to_native())
            .map_err(|e| qbank_fs::Error::io(directory.to_native(), e))?;
        if !directory.join(MARKER_FILE).exists() {
            write_category_marker(&directory, &decl.path, decl.content.as_deref())?;
        }
        self.materialized.insert(directory.clone());
        Ok(directory)
    }

    /// Directory (relative to the root) of the configured subcategory, once seen
    pub fn matched_subdirectory(&self) -> Option<&NormalizedPath> {
        self.matched_subdirectory.as_ref()
    }
}

/// Regex matched against each segment of a category path
#[derive(Debug, Clone, Default)]
pub struct IgnorePattern {
    regex: Option<Regex>,
}

impl IgnorePattern {
    /// Compile a pattern. Surrounding `/` delimiters are accepted and stripped.
    pub fn parse(pattern: Option<&str>) -> Result<Self> {
        let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
            return Ok(Self::default());
        };
        let body = match pattern.strip_prefix('/').and_then(|p| p.strip_suffix('/')) {
            Some(inner) if !inner.is_empty() => inner,
            _ => pattern,
        };
        let regex = Regex::new(body).map_err(|source| Error::InvalidIgnorePattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self { regex: Some(regex) })
    }

    /// True if any segment of the category path matches
    pub fn matches(&self, category_path: &str) -> bool {
        match &self.regex {
            Some(regex) => split_category_path(category_path)
                .iter()
                .any(|segment| regex.is_match(segment)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("top", &["top"])]
    #[case("top/A/sub1", &["top", "A", "sub1"])]
    #[case(" top / A ", &["top", "A"])]
    #[case("top/A//B/C", &["top", "A-B", "C"])]
    #[case("top/what?", &["top", "what-"])]
    #[case("top/../x", &["top", "--", "x"])]
    #[case("top//", &["top-"])]
    fn directories_from_category_path(#[case] path: &str, #[case] expected: &[&str]) {
        assert_eq!(path_to_directories(path), expected);
    }

    #[test]
    fn split_collapses_escaped_slashes() {
        assert_eq!(split_category_path("top/A//B"), vec!["top", "A/B"]);
    }

    #[test]
    fn long_segments_fit_a_directory_name() {
        let name = "ж".repeat(200);
        let segment = sanitize_segment(&name);
        assert_eq!(segment.len(), MAX_SEGMENT_BYTES);
        assert_eq!(segment, "ж".repeat(MAX_SEGMENT_BYTES / 2));
    }

    #[test]
    fn truncation_stops_at_character_boundary() {
        assert_eq!(truncate_to_bytes("aжb", 2), "a");
        assert_eq!(truncate_to_bytes("aжb", 3), "aж");
        assert_eq!(truncate_to_bytes("ж", 1), "");
        assert_eq!(truncate_to_bytes("short", 240), "short");
    }

    #[rstest]
    #[case("top/sub", Some("top/sub"), true)]
    #[case("top/sub/child", Some("top/sub"), true)]
    #[case("top/sub2", Some("top/sub"), false)]
    #[case("top/sub//x", Some("top/sub"), false)]
    #[case("top", Some("top/sub"), false)]
    #[case("anything", None, true)]
    fn scope_predicate(#[case] path: &str, #[case] sub: Option<&str>, #[case] expected: bool) {
        assert_eq!(in_scope(path, sub), expected);
    }

    #[test]
    fn marker_round_trips_special_characters() {
        let content = render_marker("top/R&D <draft>");
        assert_eq!(parse_marker(&content).as_deref(), Some("top/R&D <draft>"));
    }

    #[test]
    fn parse_marker_rejects_other_content() {
        assert_eq!(parse_marker("<quiz><question type=\"multichoice\"/></quiz>"), None);
    }

    #[test]
    fn write_marker_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let root = NormalizedPath::new(dir.path());

        write_category_marker(&root, "top", None).unwrap();
        assert!(write_category_marker(&root, "other", None).is_err());
        assert_eq!(read_category_marker(&root).unwrap(), "top");
    }

    #[test]
    fn read_marker_reports_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let root = NormalizedPath::new(dir.path());
        assert!(matches!(read_category_marker(&root), Err(Error::MarkerNotFound { .. })));

        std::fs::write(dir.path().join(MARKER_FILE), "<quiz/>").unwrap();
        assert!(matches!(read_category_marker(&root), Err(Error::MarkerParse { .. })));
    }

    #[test]
    fn resolver_records_matched_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let root = NormalizedPath::new(dir.path());
        let mut resolver = CategoryResolver::new(root.clone(), Some("top/A//B".into()));

        resolver.materialize(&CategoryDecl::new("top")).unwrap();
        assert!(resolver.matched_subdirectory().is_none());

        let leaf = resolver.materialize(&CategoryDecl::new("top/A//B")).unwrap();
        assert_eq!(leaf, root.join("top").join("A-B"));
        assert_eq!(resolver.matched_subdirectory().unwrap().as_str(), "top/A-B");
        assert_eq!(read_category_marker(&leaf).unwrap(), "top/A//B");
    }

    #[test]
    fn resolver_keeps_existing_markers() {
        let dir = tempfile::tempdir().unwrap();
        let root = NormalizedPath::new(dir.path());
        write_category_marker(&root.join("top"), "top", Some("<custom/>")).unwrap();

        let mut resolver = CategoryResolver::new(root.clone(), None);
        resolver.materialize(&CategoryDecl::new("top")).unwrap();

        let content = std::fs::read_to_string(dir.path().join("top").join(MARKER_FILE)).unwrap();
        assert_eq!(content, "<custom/>");
    }

    #[rstest]
    #[case(Some("/^\\*/"), "top/*hidden/x", true)]
    #[case(Some("^\\*"), "top/visible", false)]
    #[case(Some("^drafts$"), "top/drafts", true)]
    #[case(Some("^drafts$"), "top/drafts2", false)]
    #[case(None, "top/*hidden", false)]
    fn ignore_pattern_matches_segments(
        #[case] pattern: Option<&str>,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        let ignore = IgnorePattern::parse(pattern).unwrap();
        assert_eq!(ignore.matches(path), expected);
    }

    #[test]
    fn invalid_ignore_pattern_is_rejected() {
        assert!(matches!(
            IgnorePattern::parse(Some("(")),
            Err(Error::InvalidIgnorePattern { .. })
        ));
    }
}
