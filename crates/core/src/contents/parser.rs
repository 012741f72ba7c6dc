//! Parser for the contents index nested list.
//!
//! Parsing happens in two phases. Lines are first matched against the item
//! grammar `{whitespace}{leader}[title](value)`, where the leader is `-`, `*`,
//! `N.` or `a.`. Hierarchy is then assigned by walking the items with an
//! explicit stack of `(directory, whitespace expectation)` frames: an item
//! indented deeper than its predecessor opens a new frame when the
//! predecessor is a directory, and a shallower item closes frames until the
//! recorded expectation matches.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, info};

use crate::contents::tree::{DocsTree, EntryKind};
use crate::errors::FormatError;
use crate::models::{is_absolute_url, link_host, IndexContentsListItem, TablePath, DOC_EXTENSION};

static CONTENTS_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#\s*contents\s*$").expect("contents heading pattern is valid")
});

static ITEM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-|\*|[0-9]+\.|[a-zA-Z]+\.)\s*\[(?P<title>.*)\]\((?P<value>.*)\)$")
        .expect("item pattern is valid")
});

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// A list line that matched the item grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedLine {
    line: String,
    whitespace: usize,
    title: String,
    value: String,
    hidden: bool,
}

/// One level of nesting while assigning hierarchy.
#[derive(Debug)]
struct Frame {
    directory: PathBuf,
    whitespace: usize,
}

/// Lines of the `# Contents` section of an index file, heading excluded.
///
/// The section ends at the next line starting with `#`. Returns an empty
/// slice when there is no such section.
pub fn extract_contents_section(index_content: &str) -> Vec<&str> {
    index_content
        .lines()
        .skip_while(|line| !CONTENTS_HEADING.is_match(line))
        .skip(1)
        .take_while(|line| !line.starts_with('#'))
        .collect()
}

/// Whether the index file has a contents section.
pub fn has_contents_section(index_content: &str) -> bool {
    index_content.lines().any(|line| CONTENTS_HEADING.is_match(line))
}

/// Parse the contents section of an index file.
///
/// Absolute URLs on `server_hostname` are rejected: a page on the server is
/// referenced through its local file.
pub fn from_index<T: DocsTree>(
    index_content: &str,
    tree: &T,
    server_hostname: &str,
) -> Result<Vec<IndexContentsListItem>, FormatError> {
    parse_lines(&extract_contents_section(index_content), tree, server_hostname)
}

/// Parse a contents list, validating every reference against `tree`.
pub fn parse_list<T: DocsTree>(
    list_text: &str,
    tree: &T,
    server_hostname: &str,
) -> Result<Vec<IndexContentsListItem>, FormatError> {
    parse_lines(&list_text.lines().collect::<Vec<_>>(), tree, server_hostname)
}

fn parse_lines<T: DocsTree>(
    lines: &[&str],
    tree: &T,
    server_hostname: &str,
) -> Result<Vec<IndexContentsListItem>, FormatError> {
    let parsed = parse_items(lines)?;
    let items = assign_hierarchy(&parsed, tree, server_hostname)?;
    info!(count = items.len(), "parsed contents index");
    Ok(items)
}

fn parse_items(lines: &[&str]) -> Result<Vec<ParsedLine>, FormatError> {
    let mut parsed = Vec::new();
    let mut in_comment = false;

    for line in lines {
        let whitespace = line.chars().take_while(|c| c.is_whitespace()).count();
        let mut rest = line.trim();
        let mut hidden = in_comment;

        if let Some(after) = rest.strip_prefix(COMMENT_START) {
            rest = after.trim_start();
            hidden = true;
            in_comment = true;
        }
        if let Some(before) = rest.strip_suffix(COMMENT_END) {
            rest = before.trim_end();
            in_comment = false;
        }
        if rest.is_empty() {
            continue;
        }

        let caps = ITEM_PATTERN.captures(rest).ok_or_else(|| FormatError::ContentsLine {
            line: line.to_string(),
        })?;

        if parsed.is_empty() && whitespace != 0 {
            return Err(FormatError::IndentedFirstItem {
                line: line.to_string(),
            });
        }

        parsed.push(ParsedLine {
            line: line.to_string(),
            whitespace,
            title: caps["title"].trim().to_string(),
            value: caps["value"].trim().to_string(),
            hidden,
        });
    }

    Ok(parsed)
}

fn assign_hierarchy<T: DocsTree>(
    parsed: &[ParsedLine],
    tree: &T,
    server_hostname: &str,
) -> Result<Vec<IndexContentsListItem>, FormatError> {
    let mut items = Vec::with_capacity(parsed.len());
    let mut stack = vec![Frame {
        directory: PathBuf::new(),
        whitespace: 0,
    }];

    for (rank, item) in parsed.iter().enumerate() {
        let Some(frame) = stack.last() else {
            break;
        };

        if item.whitespace > frame.whitespace {
            return Err(FormatError::UnexpectedIndent {
                line: item.line.clone(),
            });
        }

        if link_host(&item.value).is_some_and(|host| host.eq_ignore_ascii_case(server_hostname)) {
            return Err(FormatError::OnHostReference {
                line: item.line.clone(),
                host: server_hostname.to_string(),
            });
        }

        let (kind, table_path) = if is_absolute_url(&item.value) {
            (None, TablePath::from_relative_path(&frame.directory).join(&item.title))
        } else {
            let relative = normalize_reference(&item.value).ok_or_else(|| {
                FormatError::MissingReference {
                    line: item.line.clone(),
                }
            })?;
            let kind = tree
                .entry_kind(&relative)
                .ok_or_else(|| FormatError::MissingReference {
                    line: item.line.clone(),
                })?;
            if kind == EntryKind::File && !has_doc_extension(&relative) {
                return Err(FormatError::WrongExtension {
                    line: item.line.clone(),
                    extension: DOC_EXTENSION.to_string(),
                });
            }
            if relative.parent() != Some(frame.directory.as_path()) {
                return Err(FormatError::WrongParent {
                    line: item.line.clone(),
                    expected_parent: display_directory(&frame.directory),
                });
            }
            (Some((kind, relative.clone())), TablePath::from_relative_path(&relative))
        };

        let hierarchy = stack.len();
        debug!(hierarchy, value = %item.value, hidden = item.hidden, "contents item");
        items.push(IndexContentsListItem {
            hierarchy,
            reference_title: item.title.clone(),
            reference_value: item.value.clone(),
            rank,
            hidden: item.hidden,
            table_path,
        });

        let Some(next) = parsed.get(rank + 1) else {
            continue;
        };
        let expected = frame.whitespace;
        if next.whitespace > expected {
            // Only directories can have nested items; anything else fails on
            // the next iteration.
            if let Some((EntryKind::Directory, directory)) = kind {
                stack.push(Frame {
                    directory,
                    whitespace: next.whitespace,
                });
            }
        } else if next.whitespace < expected {
            while stack.len() > 1
                && stack
                    .last()
                    .is_some_and(|frame| frame.whitespace > next.whitespace)
            {
                stack.pop();
            }
        }
    }

    Ok(items)
}

/// Normalized relative path of a reference, or `None` when it escapes the
/// docs root.
pub(crate) fn normalize_reference(value: &str) -> Option<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in Path::new(value.trim()).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if normalized.as_os_str().is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn has_doc_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DOC_EXTENSION))
}

fn display_directory(directory: &Path) -> String {
    if directory.as_os_str().is_empty() {
        ".".to_string()
    } else {
        directory.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const HOST: &str = "discourse.example.com";

    fn tree(entries: &[(&str, EntryKind)]) -> BTreeMap<PathBuf, EntryKind> {
        entries
            .iter()
            .map(|(path, kind)| (PathBuf::from(path), *kind))
            .collect()
    }

    fn summary(items: &[IndexContentsListItem]) -> Vec<(usize, &str, bool)> {
        items
            .iter()
            .map(|i| (i.hierarchy, i.reference_value.as_str(), i.hidden))
            .collect()
    }

    #[test]
    fn test_directory_with_nested_file() {
        let tree = tree(&[
            ("dirA", EntryKind::Directory),
            ("dirA/b.md", EntryKind::File),
        ]);
        let items = parse_list("- [A](dirA)\n  - [B](dirA/b.md)", &tree, HOST).unwrap();
        assert_eq!(
            items,
            vec![
                IndexContentsListItem {
                    hierarchy: 1,
                    reference_title: "A".into(),
                    reference_value: "dirA".into(),
                    rank: 0,
                    hidden: false,
                    table_path: TablePath::from_segments(["dira"]),
                },
                IndexContentsListItem {
                    hierarchy: 2,
                    reference_title: "B".into(),
                    reference_value: "dirA/b.md".into(),
                    rank: 1,
                    hidden: false,
                    table_path: TablePath::from_segments(["dira", "b"]),
                },
            ]
        );
    }

    #[test]
    fn test_leaders_and_dedent() {
        let tree = tree(&[
            ("a", EntryKind::Directory),
            ("a/b", EntryKind::Directory),
            ("a/b/c.md", EntryKind::File),
            ("a/d.md", EntryKind::File),
            ("e.md", EntryKind::File),
        ]);
        let list = "1. [A](a)\n    a. [B](a/b)\n        * [C](a/b/c.md)\n    b. [D](a/d.md)\n2. [E](e.md)";
        let items = parse_list(list, &tree, HOST).unwrap();
        assert_eq!(
            summary(&items),
            vec![
                (1, "a", false),
                (2, "a/b", false),
                (3, "a/b/c.md", false),
                (2, "a/d.md", false),
                (1, "e.md", false),
            ]
        );
        let ranks: Vec<usize> = items.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dedent_over_several_levels() {
        let tree = tree(&[
            ("a", EntryKind::Directory),
            ("a/b", EntryKind::Directory),
            ("a/b/c.md", EntryKind::File),
            ("z.md", EntryKind::File),
        ]);
        let list = "- [A](a)\n  - [B](a/b)\n    - [C](a/b/c.md)\n- [Z](z.md)";
        let items = parse_list(list, &tree, HOST).unwrap();
        assert_eq!(items[3].hierarchy, 1);
    }

    #[test]
    fn test_hidden_items() {
        let tree = tree(&[
            ("a.md", EntryKind::File),
            ("b.md", EntryKind::File),
            ("c.md", EntryKind::File),
            ("d.md", EntryKind::File),
        ]);
        let list = "- [A](a.md)\n<!-- - [B](b.md) -->\n<!--\n- [C](c.md)\n-->\n- [D](d.md)";
        let items = parse_list(list, &tree, HOST).unwrap();
        assert_eq!(
            summary(&items),
            vec![
                (1, "a.md", false),
                (1, "b.md", true),
                (1, "c.md", true),
                (1, "d.md", false),
            ]
        );
    }

    #[test]
    fn test_external_reference() {
        let tree = tree(&[("guides", EntryKind::Directory)]);
        let list = "- [Guides](guides)\n  - [Charmhub](https://charmhub.io/docs)";
        let items = parse_list(list, &tree, HOST).unwrap();
        assert_eq!(items[1].hierarchy, 2);
        assert!(items[1].is_external(HOST));
        assert_eq!(items[1].table_path.to_string(), "guides-charmhub");
    }

    #[test]
    fn test_reference_to_server_topic_is_error() {
        let tree = tree(&[("a.md", EntryKind::File)]);
        let list = "- [A](a.md)\n- [Community](https://Discourse.Example.com/t/community/5)";
        let err = parse_list(list, &tree, HOST).unwrap_err();
        assert_eq!(
            err,
            FormatError::OnHostReference {
                line: "- [Community](https://Discourse.Example.com/t/community/5)".into(),
                host: HOST.into(),
            }
        );
    }

    #[test]
    fn test_first_item_indented() {
        let tree = tree(&[("a.md", EntryKind::File)]);
        let err = parse_list("  - [A](a.md)", &tree, HOST).unwrap_err();
        assert_eq!(
            err,
            FormatError::IndentedFirstItem {
                line: "  - [A](a.md)".into()
            }
        );
    }

    #[test]
    fn test_invalid_line_includes_line() {
        let tree = tree(&[]);
        let err = parse_list("- A without link", &tree, HOST).unwrap_err();
        assert!(err.to_string().contains("- A without link"));
    }

    #[test]
    fn test_indent_after_file_is_error() {
        let tree = tree(&[("a.md", EntryKind::File), ("b.md", EntryKind::File)]);
        let err = parse_list("- [A](a.md)\n  - [B](b.md)", &tree, HOST).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedIndent { .. }));
    }

    #[test]
    fn test_dedent_to_unknown_indentation_is_error() {
        let tree = tree(&[
            ("a", EntryKind::Directory),
            ("a/b.md", EntryKind::File),
            ("c.md", EntryKind::File),
        ]);
        let err = parse_list("- [A](a)\n    - [B](a/b.md)\n  - [C](c.md)", &tree, HOST).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedIndent { .. }));
    }

    #[test]
    fn test_missing_reference() {
        let err = parse_list("- [A](missing.md)", &tree(&[]), HOST).unwrap_err();
        assert!(matches!(err, FormatError::MissingReference { .. }));

        let err = parse_list("- [A](../outside.md)", &tree(&[]), HOST).unwrap_err();
        assert!(matches!(err, FormatError::MissingReference { .. }));
    }

    #[test]
    fn test_wrong_extension() {
        let tree = tree(&[("notes.txt", EntryKind::File)]);
        let err = parse_list("- [Notes](notes.txt)", &tree, HOST).unwrap_err();
        assert!(matches!(err, FormatError::WrongExtension { .. }));
    }

    #[test]
    fn test_wrong_parent() {
        let tree = tree(&[
            ("a", EntryKind::Directory),
            ("b", EntryKind::Directory),
            ("b/c.md", EntryKind::File),
        ]);
        let err = parse_list("- [A](a)\n  - [C](b/c.md)", &tree, HOST).unwrap_err();
        assert_eq!(
            err,
            FormatError::WrongParent {
                line: "  - [C](b/c.md)".into(),
                expected_parent: "a".into(),
            }
        );

        let err = parse_list("- [C](b/c.md)", &tree, HOST).unwrap_err();
        assert!(matches!(
            err,
            FormatError::WrongParent { ref expected_parent, .. } if expected_parent == "."
        ));
    }

    #[test]
    fn test_empty_group_directory_without_children() {
        // A directory followed by a sibling at the same indentation is kept as
        // an empty group; the same holds for a directory that ends the list.
        let tree = tree(&[
            ("empty", EntryKind::Directory),
            ("last", EntryKind::Directory),
            ("a.md", EntryKind::File),
        ]);
        let items = parse_list("- [Empty](empty)\n- [A](a.md)\n- [Last](last)", &tree, HOST).unwrap();
        assert_eq!(
            summary(&items),
            vec![(1, "empty", false), (1, "a.md", false), (1, "last", false)]
        );
    }

    #[test]
    fn test_extract_contents_section() {
        let content = "# Title\n\nIntro\n\n# CONTENTS\n\n- [A](a.md)\n- [B](b.md)\n\n# Navigation\n| x |";
        assert_eq!(
            extract_contents_section(content),
            vec!["", "- [A](a.md)", "- [B](b.md)", ""]
        );
        assert!(has_contents_section(content));
        assert!(extract_contents_section("# Title\nbody").is_empty());
    }

    #[test]
    fn test_from_index_with_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("guides")).unwrap();
        std::fs::write(dir.path().join("guides/setup.md"), "# Setup").unwrap();
        let content = "Welcome\n\n# Contents\n1. [Guides](guides)\n  1. [Setup](guides/setup.md)\n";

        let tree = crate::contents::FsDocsTree::new(dir.path());
        let items = from_index(content, &tree, HOST).unwrap();
        assert_eq!(summary(&items), vec![(1, "guides", false), (2, "guides/setup.md", false)]);
    }
}
