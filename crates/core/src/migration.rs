//! Migration of server-hosted documentation into a local docs tree.
//!
//! The navigation table is walked in order while tracking the enclosing
//! groups, the same way contents index nesting is tracked. Page rows become
//! documents fetched from the server, groups become directories, and a group
//! nothing is written into gets a `.gitkeep` placeholder. The index file is
//! written last.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::contents::parser::has_contents_section;
use crate::discourse::DiscourseApi;
use crate::errors::{CoreError, FormatError, MigrationError, MigrationFailure};
use crate::models::{
    ActionReport, ActionResult, ReportLocation, RowKind, TableRow, DOC_EXTENSION,
};
use crate::navigation_table::strip_navigation_table;

/// Placeholder file that keeps an otherwise empty directory in version
/// control.
pub const GITKEEP: &str = ".gitkeep";

const DEFAULT_INDEX_FILE: &str = "index.md";

/// One file to materialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationItem {
    /// A page fetched from `link` and written to `path`.
    Document {
        path: PathBuf,
        link: String,
        table_row: TableRow,
    },
    /// An empty placeholder for a group without documents.
    Gitkeep { path: PathBuf, table_row: TableRow },
}

impl MigrationItem {
    pub fn path(&self) -> &Path {
        match self {
            Self::Document { path, .. } | Self::Gitkeep { path, .. } => path,
        }
    }

    pub fn table_row(&self) -> &TableRow {
        match self {
            Self::Document { table_row, .. } | Self::Gitkeep { table_row, .. } => table_row,
        }
    }
}

/// An entry of the generated contents index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentsEntry {
    pub level: usize,
    pub title: String,
    /// Relative path, or the absolute URL of an external reference.
    pub value: String,
    pub hidden: bool,
}

/// Everything the migration will write, computed before any I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    pub items: Vec<MigrationItem>,
    pub contents: Vec<ContentsEntry>,
}

struct GroupFrame {
    row: TableRow,
    directory: PathBuf,
    has_children: bool,
}

/// Plan the files for `rows`, validating the level structure first.
pub fn plan(rows: &[TableRow], server_hostname: &str) -> Result<MigrationPlan, FormatError> {
    let mut plan = MigrationPlan::default();
    let mut groups: Vec<GroupFrame> = Vec::new();

    for row in rows {
        while groups.len() >= row.level {
            if let Some(frame) = groups.pop() {
                close_group(frame, &mut plan);
            }
        }
        if row.level != groups.len() + 1 {
            return Err(FormatError::LevelJump {
                path: row.path.to_string(),
                previous: groups.len(),
                level: row.level,
            });
        }

        let parent_dir = groups
            .last()
            .map(|frame| frame.directory.clone())
            .unwrap_or_default();
        let name = groups
            .last()
            .and_then(|frame| row.path.strip_prefix(&frame.row.path))
            .unwrap_or_else(|| row.path.clone());

        match row.kind(server_hostname) {
            RowKind::Group => {
                let directory = parent_dir.join(name.to_string());
                mark_child(&mut groups);
                plan.contents.push(entry(row, path_value(&directory)));
                groups.push(GroupFrame {
                    row: row.clone(),
                    directory,
                    has_children: false,
                });
            }
            RowKind::Page => {
                let path = parent_dir.join(format!("{name}.{DOC_EXTENSION}"));
                mark_child(&mut groups);
                plan.contents.push(entry(row, path_value(&path)));
                plan.items.push(MigrationItem::Document {
                    path,
                    link: row.navlink.target.link().unwrap_or_default().to_string(),
                    table_row: row.clone(),
                });
            }
            RowKind::ExternalRef => {
                let link = row.navlink.target.link().unwrap_or_default().to_string();
                plan.contents.push(entry(row, link));
            }
        }
    }

    while let Some(frame) = groups.pop() {
        close_group(frame, &mut plan);
    }

    debug!(items = plan.items.len(), "planned migration");
    Ok(plan)
}

fn mark_child(groups: &mut [GroupFrame]) {
    if let Some(parent) = groups.last_mut() {
        parent.has_children = true;
    }
}

fn close_group(frame: GroupFrame, plan: &mut MigrationPlan) {
    if !frame.has_children {
        plan.items.push(MigrationItem::Gitkeep {
            path: frame.directory.join(GITKEEP),
            table_row: frame.row,
        });
    }
}

fn entry(row: &TableRow, value: String) -> ContentsEntry {
    ContentsEntry {
        level: row.level,
        title: row.navlink.title.clone(),
        value,
        hidden: row.navlink.hidden,
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Render a `# Contents` section with two spaces of indentation per level.
/// Hidden entries are wrapped in an HTML comment.
pub fn render_contents(entries: &[ContentsEntry]) -> String {
    let mut out = String::from("# Contents");
    out.push('\n');
    for entry in entries {
        let indent = "  ".repeat(entry.level.saturating_sub(1));
        let item = format!("1. [{}]({})", entry.title, entry.value);
        out.push('\n');
        if entry.hidden {
            out.push_str(&format!("{indent}<!-- {item} -->"));
        } else {
            out.push_str(&format!("{indent}{item}"));
        }
    }
    out
}

/// Body of the migrated index file: the server index without its navigation
/// table, with a contents section appended when it has none.
pub fn index_content(server_index: &str, contents: &[ContentsEntry]) -> String {
    let body = strip_navigation_table(server_index).trim();
    if has_contents_section(body) || contents.is_empty() {
        format!("{body}\n")
    } else if body.is_empty() {
        format!("{}\n", render_contents(contents))
    } else {
        format!("{body}\n\n{}\n", render_contents(contents))
    }
}

/// Writes server documentation into a local docs directory.
pub struct MigrationEngine<'a, D> {
    discourse: &'a D,
    index_file: String,
}

impl<'a, D: DiscourseApi> MigrationEngine<'a, D> {
    pub fn new(discourse: &'a D) -> Self {
        Self {
            discourse,
            index_file: DEFAULT_INDEX_FILE.to_string(),
        }
    }

    pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
        self.index_file = index_file.into();
        self
    }

    /// Migrate every row, then write the index file.
    ///
    /// All items are attempted; if any failed, the collected failures are
    /// returned as a [`MigrationError`].
    pub fn run(
        &self,
        rows: &[TableRow],
        server_index: &str,
        docs_dir: &Path,
    ) -> Result<Vec<ActionReport>, CoreError> {
        let plan = plan(rows, self.discourse.host())?;
        info!(
            items = plan.items.len(),
            docs_dir = %docs_dir.display(),
            "starting migration"
        );

        let mut reports = Vec::with_capacity(plan.items.len() + 1);
        let mut failures = Vec::new();

        for item in &plan.items {
            let target = docs_dir.join(item.path());
            let outcome = match item {
                MigrationItem::Document { link, .. } => self.write_document(link, &target),
                MigrationItem::Gitkeep { .. } => write_file(&target, ""),
            };
            reports.push(self.report(item.table_row(), &target, outcome, &mut failures));
        }

        let index_path = docs_dir.join(&self.index_file);
        let outcome = write_file(&index_path, &index_content(server_index, &plan.contents));
        match outcome {
            Ok(()) => reports.push(ActionReport {
                table_row: None,
                location: Some(ReportLocation::Path(index_path)),
                result: ActionResult::Success,
                reason: None,
            }),
            Err(reason) => {
                warn!(path = %index_path.display(), %reason, "failed to write index file");
                failures.push(MigrationFailure {
                    path: index_path.clone(),
                    reason: reason.clone(),
                });
                reports.push(ActionReport {
                    table_row: None,
                    location: Some(ReportLocation::Path(index_path)),
                    result: ActionResult::Fail,
                    reason: Some(reason),
                });
            }
        }

        if !failures.is_empty() {
            return Err(MigrationError { failures }.into());
        }
        info!(written = reports.len(), "migration complete");
        Ok(reports)
    }

    fn write_document(&self, link: &str, target: &Path) -> Result<(), String> {
        let url = self.discourse.absolute_url(link);
        let content = self
            .discourse
            .retrieve_topic(&url)
            .map_err(|err| err.to_string())?;
        write_file(target, &content)
    }

    fn report(
        &self,
        row: &TableRow,
        target: &Path,
        outcome: Result<(), String>,
        failures: &mut Vec<MigrationFailure>,
    ) -> ActionReport {
        match outcome {
            Ok(()) => {
                debug!(path = %target.display(), "migrated");
                ActionReport {
                    table_row: Some(row.clone()),
                    location: Some(ReportLocation::Path(target.to_path_buf())),
                    result: ActionResult::Success,
                    reason: None,
                }
            }
            Err(reason) => {
                warn!(path = %target.display(), %reason, "migration item failed");
                failures.push(MigrationFailure {
                    path: target.to_path_buf(),
                    reason: reason.clone(),
                });
                ActionReport {
                    table_row: Some(row.clone()),
                    location: Some(ReportLocation::Path(target.to_path_buf())),
                    result: ActionResult::Fail,
                    reason: Some(reason),
                }
            }
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| err.to_string())?;
    }
    std::fs::write(path, content).map_err(|err| err.to_string())
}
