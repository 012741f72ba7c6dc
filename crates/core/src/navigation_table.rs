//! Parser and renderer for the server-side navigation table.
//!
//! The table lives on the index topic and looks like:
//!
//! ```text
//! # Navigation
//!
//! | level | path | navlink |
//! | -- | -- | -- |
//! | 1 | tutorial | [Tutorial](/t/tutorial/12) |
//! |   | secret | [Secret](/t/secret/13) |
//! | 1 | how-to | [How-to guides]() |
//! ```
//!
//! A blank level column marks a hidden row at the same level as the previous
//! row, or at level 1 when it is the first row. Prose around the table, the header and the separator row are ignored.

use std::sync::LazyLock;

use regex_lite::Regex;
use tracing::{debug, info};

use crate::discourse::DiscourseApi;
use crate::errors::{CoreError, FormatError, PermissionError};
use crate::models::{link_host, path_only, Navlink, NavlinkTarget, RowKind, TablePath, TableRow};

/// Heading and header rows that open a rendered navigation table.
pub const NAVIGATION_TABLE_START: &str =
    "# Navigation\n\n| level | path | navlink |\n| -- | -- | -- |";

static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\|\s*level\s*\|\s*path\s*\|\s*navlink\s*\|\s*$")
        .expect("header pattern is valid")
});

static FILLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\|\s*:?-+:?\s*){3}\|\s*$").expect("filler pattern is valid")
});

static ROW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\|\s*(?P<level>[1-9][0-9]*)?\s*\|\s*(?P<path>[^|\s]+)\s*\|\s*\[(?P<title>[^\]]*)\]\(\s*(?P<link>[^)\s]*)\s*\)\s*\|\s*$",
    )
    .expect("row pattern is valid")
});

static NAVIGATION_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#\s*navigation\s*$").expect("navigation heading pattern is valid")
});

fn is_table_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

/// Parse every navigation table row in `page`.
///
/// Links on `server_hostname` are reduced to their path; external links are
/// kept as-is. No permission checks are made, see [`from_page`].
pub fn parse_rows(page: &str, server_hostname: &str) -> Result<Vec<TableRow>, FormatError> {
    let mut rows: Vec<TableRow> = Vec::new();

    for line in page.lines() {
        if !is_table_line(line) || HEADER_PATTERN.is_match(line) || FILLER_PATTERN.is_match(line)
        {
            continue;
        }

        let caps = ROW_PATTERN
            .captures(line)
            .ok_or_else(|| FormatError::TableRow { line: line.to_string() })?;

        let (level, hidden) = match caps.name("level") {
            Some(level) => (
                level
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| FormatError::TableRow { line: line.to_string() })?,
                false,
            ),
            // A first row can only sit at level 1.
            None => (rows.last().map_or(1, |previous| previous.level), true),
        };

        let link = caps.name("link").map_or("", |m| m.as_str());
        let target = if link.is_empty() {
            NavlinkTarget::Group
        } else {
            match link_host(link) {
                Some(host) if !host.eq_ignore_ascii_case(server_hostname) => {
                    NavlinkTarget::Link(link.to_string())
                }
                _ => NavlinkTarget::Link(path_only(link).to_string()),
            }
        };

        let row = TableRow {
            level,
            path: TablePath::from_segments([&caps["path"]]),
            navlink: Navlink {
                title: caps["title"].trim().to_string(),
                target,
                hidden,
            },
        };
        debug!(level = row.level, path = %row.path, hidden, "parsed navigation row");
        rows.push(row);
    }

    info!(count = rows.len(), "parsed navigation table");
    Ok(rows)
}

/// Parse the navigation table of the server index page and make sure every
/// page it lists can be edited with the configured credentials.
pub fn from_page<D: DiscourseApi>(page: &str, discourse: &D) -> Result<Vec<TableRow>, CoreError> {
    let rows = parse_rows(page, discourse.host())?;

    for row in &rows {
        if row.kind(discourse.host()) != RowKind::Page {
            continue;
        }
        let Some(link) = row.navlink.target.link() else {
            continue;
        };
        let url = discourse.absolute_url(link);
        match discourse.check_topic_write_permission(&url) {
            Ok(true) => {}
            Ok(false) => return Err(PermissionError::Denied { url }.into()),
            Err(source) => return Err(PermissionError::Check { url, source }.into()),
        }
    }

    Ok(rows)
}

/// Render `rows` as a complete navigation table, header included.
pub fn render(rows: &[TableRow], server_hostname: &str) -> String {
    let mut out = String::from(NAVIGATION_TABLE_START);
    for row in rows {
        out.push('\n');
        out.push_str(&row.to_markdown(server_hostname));
    }
    out
}

/// Content of an index page without a previously embedded navigation table.
pub fn strip_navigation_table(content: &str) -> &str {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if NAVIGATION_HEADING.is_match(line.trim_end_matches(['\r', '\n'])) {
            return &content[..offset];
        }
        offset += line.len();
    }
    content
}
