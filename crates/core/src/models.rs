//! Domain model types shared by the parsers, the reconciler and the executor.
//!
//! All of these are plain immutable records; none hold resource handles.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extension of documentation files, without the leading dot.
pub const DOC_EXTENSION: &str = "md";

/// Location sentinel for rows that were not created because of a dry run.
pub const DRY_RUN_LOCATION: &str = "<not created due to dry run>";

/// Location sentinel for rows that could not be created.
pub const FAIL_LOCATION: &str = "<not created due to error>";

/// Skip reason recorded for every action during a dry run.
pub const DRY_RUN_REASON: &str = "dry run";

/// Skip reason recorded when page deletion is disabled.
pub const NOT_DELETE_REASON: &str = "deletion of topics is disabled";

// ---------------------------------------------------------------------------
// Table path
// ---------------------------------------------------------------------------

/// Normalized identifier of a navigation table row.
///
/// Segments are lower-case and contain no separators: whitespace, underscores
/// and pipes become hyphens, and hyphens split segments. The wire form joins
/// segments with `-`, so a path rendered to the table and parsed back
/// compares equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct TablePath(Vec<String>);

impl TablePath {
    /// Build a table path from raw segments, normalizing each.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let normalized = segments
            .into_iter()
            .flat_map(|segment| {
                segment
                    .as_ref()
                    .to_lowercase()
                    .chars()
                    .map(|c| if c.is_whitespace() || c == '_' || c == '|' { '-' } else { c })
                    .collect::<String>()
                    .split('-')
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        Self(normalized)
    }

    /// Table path of a path relative to the docs root; the documentation
    /// extension of the last component is dropped.
    pub fn from_relative_path(relative: &Path) -> Self {
        let mut parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        if let Some(last) = parts.last_mut() {
            let stem = Path::new(last.as_str())
                .extension()
                .filter(|ext| ext.eq_ignore_ascii_case(DOC_EXTENSION))
                .and_then(|_| Path::new(last.as_str()).file_stem())
                .map(|stem| stem.to_string_lossy().into_owned());
            if let Some(stem) = stem {
                *last = stem;
            }
        }
        Self::from_segments(parts)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// This path extended with further raw segments.
    pub fn join<S: AsRef<str>>(&self, segment: S) -> Self {
        let mut joined = self.0.clone();
        joined.extend(Self::from_segments([segment]).0);
        Self(joined)
    }

    /// Remainder of this path below `parent`, if `parent` is a strict prefix.
    pub fn strip_prefix(&self, parent: &TablePath) -> Option<TablePath> {
        if parent.0.len() < self.0.len() && self.0.starts_with(&parent.0) {
            Some(Self(self.0[parent.0.len()..].to_vec()))
        } else {
            None
        }
    }
}

impl std::fmt::Display for TablePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("-"))
    }
}

impl From<TablePath> for String {
    fn from(path: TablePath) -> Self {
        path.to_string()
    }
}

impl From<String> for TablePath {
    fn from(value: String) -> Self {
        Self::from_segments([value])
    }
}

// ---------------------------------------------------------------------------
// Local items
// ---------------------------------------------------------------------------

/// One file or directory under the docs root, as produced by a tree scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    /// Absolute path of the file or directory.
    pub local_path: PathBuf,
    /// Number of ancestor directories including the docs root (>= 1).
    pub level: usize,
    pub table_path: TablePath,
    pub navlink_title: String,
    pub alphabetical_rank: usize,
    pub navlink_hidden: bool,
}

/// One entry of the contents index nested list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexContentsListItem {
    /// 1-based nesting depth.
    pub hierarchy: usize,
    pub reference_title: String,
    /// Relative path from the docs root, or an absolute URL.
    pub reference_value: String,
    /// Position in the original list.
    pub rank: usize,
    /// The item was inside an HTML comment.
    pub hidden: bool,
    pub table_path: TablePath,
}

impl IndexContentsListItem {
    /// The reference is an absolute URL rather than a local path.
    pub fn is_url(&self) -> bool {
        is_absolute_url(&self.reference_value)
    }

    /// The reference links somewhere other than the document server.
    pub fn is_external(&self, server_hostname: &str) -> bool {
        link_host(&self.reference_value)
            .is_some_and(|host| !host.eq_ignore_ascii_case(server_hostname))
    }
}

/// Something the local side wants in the navigation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalItem {
    Path(PathInfo),
    Contents(IndexContentsListItem),
}

impl LocalItem {
    pub fn level(&self) -> usize {
        match self {
            Self::Path(info) => info.level,
            Self::Contents(item) => item.hierarchy,
        }
    }

    pub fn table_path(&self) -> &TablePath {
        match self {
            Self::Path(info) => &info.table_path,
            Self::Contents(item) => &item.table_path,
        }
    }

    pub fn navlink_title(&self) -> &str {
        match self {
            Self::Path(info) => &info.navlink_title,
            Self::Contents(item) => &item.reference_title,
        }
    }

    pub fn hidden(&self) -> bool {
        match self {
            Self::Path(info) => info.navlink_hidden,
            Self::Contents(item) => item.hidden,
        }
    }
}

// ---------------------------------------------------------------------------
// Navigation table rows
// ---------------------------------------------------------------------------

/// Where a navlink points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavlinkTarget {
    /// No page of its own; a folder-like grouping node.
    Group,
    /// A page on the server (path-only) or an external URL.
    Link(String),
}

impl NavlinkTarget {
    pub fn link(&self) -> Option<&str> {
        match self {
            Self::Group => None,
            Self::Link(link) => Some(link),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Navlink {
    pub title: String,
    pub target: NavlinkTarget,
    pub hidden: bool,
}

/// The three kinds of navigation table rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    Group,
    ExternalRef,
    Page,
}

/// One row of the server-side navigation table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRow {
    pub level: usize,
    pub path: TablePath,
    pub navlink: Navlink,
}

impl TableRow {
    pub fn is_group(&self) -> bool {
        matches!(self.navlink.target, NavlinkTarget::Group)
    }

    /// The row links somewhere other than the document server.
    pub fn is_external(&self, server_hostname: &str) -> bool {
        self.navlink
            .target
            .link()
            .and_then(link_host)
            .is_some_and(|host| !host.eq_ignore_ascii_case(server_hostname))
    }

    pub fn kind(&self, server_hostname: &str) -> RowKind {
        if self.is_group() {
            RowKind::Group
        } else if self.is_external(server_hostname) {
            RowKind::ExternalRef
        } else {
            RowKind::Page
        }
    }

    /// Render the row in the navigation table wire format.
    pub fn to_markdown(&self, server_hostname: &str) -> String {
        let level = if self.navlink.hidden {
            " ".to_string()
        } else {
            format!(" {} ", self.level)
        };
        let link = match self.navlink.target.link() {
            None => String::new(),
            Some(link) if self.is_external(server_hostname) => link.to_string(),
            Some(link) => path_only(link).to_string(),
        };
        format!(
            "|{level}| {} | [{}]({link}) |",
            self.path, self.navlink.title
        )
    }
}

/// Whether `value` is an absolute http(s) URL.
pub fn is_absolute_url(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Host of an absolute URL, without port. `None` for relative links.
pub fn link_host(link: &str) -> Option<&str> {
    if !is_absolute_url(link) {
        return None;
    }
    let rest = link.trim().split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    let host = authority.rsplit('@').next().unwrap_or(authority);
    Some(host.split(':').next().unwrap_or(host))
}

/// Strip scheme and host from an absolute URL; relative links pass through.
pub fn path_only(link: &str) -> &str {
    let trimmed = link.trim();
    if !is_absolute_url(trimmed) {
        return trimmed;
    }
    match trimmed.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
        None => trimmed,
    }
}

// ---------------------------------------------------------------------------
// Index page
// ---------------------------------------------------------------------------

/// The local index file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFile {
    pub title: String,
    pub content: Option<String>,
}

/// A page fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub content: String,
}

/// The root index / cover page, local and remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub server: Option<Page>,
    pub local: IndexFile,
    /// Name of the documented project, used in topic titles.
    pub name: String,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of executing one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionResult {
    Success,
    Skip,
    Fail,
}

impl std::fmt::Display for ActionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Where the result of an action lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLocation {
    Url(String),
    Path(PathBuf),
    DryRun,
    Failed,
}

impl std::fmt::Display for ReportLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::DryRun => write!(f, "{DRY_RUN_LOCATION}"),
            Self::Failed => write!(f, "{FAIL_LOCATION}"),
        }
    }
}

/// Execution result for a single action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    /// The row that should now exist in the table, if any.
    pub table_row: Option<TableRow>,
    pub location: Option<ReportLocation>,
    pub result: ActionResult,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(level: usize, path: &str, title: &str, target: NavlinkTarget) -> TableRow {
        TableRow {
            level,
            path: TablePath::from_segments([path]),
            navlink: Navlink {
                title: title.into(),
                target,
                hidden: false,
            },
        }
    }

    #[test]
    fn test_table_path_normalization() {
        let path = TablePath::from_segments(["My Dir", "Some_File"]);
        assert_eq!(path.to_string(), "my-dir-some-file");
        assert_eq!(path, TablePath::from_segments(["my-dir-some-file"]));
    }

    #[test]
    fn test_table_path_keeps_unicode_and_dots() {
        let path = TablePath::from_relative_path(Path::new("Café/v1.2 Notes.md"));
        assert_eq!(path.to_string(), "café-v1.2-notes");

        let path = TablePath::from_segments(["a|b\tc"]);
        assert_eq!(path.segments(), ["a", "b", "c"]);
    }

    #[test]
    fn test_table_path_from_relative_path_drops_extension() {
        let path = TablePath::from_relative_path(Path::new("how-to/Install.md"));
        assert_eq!(path.segments(), ["how", "to", "install"]);

        let dir = TablePath::from_relative_path(Path::new("reference/"));
        assert_eq!(dir.to_string(), "reference");
    }

    #[test]
    fn test_table_path_strip_prefix() {
        let parent = TablePath::from_segments(["dir"]);
        let child = parent.join("child page");
        assert_eq!(child.to_string(), "dir-child-page");
        assert_eq!(child.strip_prefix(&parent).unwrap().to_string(), "child-page");
        assert!(parent.strip_prefix(&parent).is_none());
    }

    #[test]
    fn test_row_kinds() {
        let host = "discourse.example.com";
        assert_eq!(row(1, "g", "G", NavlinkTarget::Group).kind(host), RowKind::Group);
        assert_eq!(
            row(1, "p", "P", NavlinkTarget::Link("/t/p/1".into())).kind(host),
            RowKind::Page
        );
        assert_eq!(
            row(
                1,
                "p",
                "P",
                NavlinkTarget::Link("https://discourse.example.com/t/p/1".into())
            )
            .kind(host),
            RowKind::Page
        );
        assert_eq!(
            row(1, "e", "E", NavlinkTarget::Link("https://canonical.com".into())).kind(host),
            RowKind::ExternalRef
        );
    }

    #[test]
    fn test_to_markdown() {
        let host = "discourse.example.com";
        let page = row(
            2,
            "dir-doc",
            "Doc",
            NavlinkTarget::Link("https://discourse.example.com/t/doc/7".into()),
        );
        assert_eq!(page.to_markdown(host), "| 2 | dir-doc | [Doc](/t/doc/7) |");

        let mut group = row(1, "dir", "Dir", NavlinkTarget::Group);
        group.navlink.hidden = true;
        assert_eq!(group.to_markdown(host), "| | dir | [Dir]() |");

        let external = row(1, "ext", "Ext", NavlinkTarget::Link("https://example.org/a".into()));
        assert_eq!(
            external.to_markdown(host),
            "| 1 | ext | [Ext](https://example.org/a) |"
        );
    }

    #[test]
    fn test_link_helpers() {
        assert_eq!(link_host("https://user@Host.io:8080/x"), Some("Host.io"));
        assert_eq!(link_host("/t/x/1"), None);
        assert_eq!(path_only("https://host.io/t/x/1"), "/t/x/1");
        assert_eq!(path_only("https://host.io"), "/");
        assert_eq!(path_only("/t/x/1"), "/t/x/1");
    }
}
