//! Reconciliation of the local docs tree against the server navigation table.
//!
//! Local items and table rows are matched on their `(level, table path)` key.
//! Keys only present locally become creates, keys only present on the server
//! become deletes, and keys present on both sides are resolved through the
//! [`resolution`] matrix on the local item kind and the row kind.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::action::{Action, ContentChange, IndexAction, IndexContentChange, NavlinkChange};
use crate::discourse::DiscourseApi;
use crate::errors::{CoreError, ReconciliationError, RepositoryError, ServerError};
use crate::models::{
    Index, LocalItem, Navlink, NavlinkTarget, RowKind, TablePath, TableRow,
};
use crate::navigation_table;
use crate::repository::{RepositoryApi, DOCUMENTATION_TAG};

type Key = (usize, TablePath);

/// Kind of a local item, as seen by the resolution matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Directory,
    File,
    ExternalRef,
}

/// One step of resolving a key present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CompareGroup,
    CompareExternalRef,
    ComparePage,
    CreateGroup,
    CreatePage,
    CreateExternalRef,
    DeletePage,
}

/// Steps for a key that has both a local item and a table row, in emission
/// order.
pub fn resolution(local: LocalKind, row: RowKind) -> &'static [Step] {
    match (local, row) {
        (LocalKind::Directory, RowKind::Group) => &[Step::CompareGroup],
        (LocalKind::Directory, RowKind::ExternalRef) => &[Step::CreateGroup],
        (LocalKind::Directory, RowKind::Page) => &[Step::DeletePage, Step::CreateGroup],
        (LocalKind::File, RowKind::Group | RowKind::ExternalRef) => &[Step::CreatePage],
        (LocalKind::File, RowKind::Page) => &[Step::ComparePage],
        (LocalKind::ExternalRef, RowKind::Group) => &[Step::CreateExternalRef],
        (LocalKind::ExternalRef, RowKind::ExternalRef) => &[Step::CompareExternalRef],
        (LocalKind::ExternalRef, RowKind::Page) => &[Step::DeletePage, Step::CreateExternalRef],
    }
}

/// Decides the actions that bring the server in line with the local tree.
pub struct Reconciler<'a, D, R> {
    discourse: &'a D,
    repository: &'a R,
    base_path: PathBuf,
    base_tag: String,
}

impl<'a, D: DiscourseApi, R: RepositoryApi> Reconciler<'a, D, R> {
    /// `base_path` is the repository root; base content is looked up by the
    /// local path relative to it.
    pub fn new(discourse: &'a D, repository: &'a R, base_path: impl Into<PathBuf>) -> Self {
        Self {
            discourse,
            repository,
            base_path: base_path.into(),
            base_tag: DOCUMENTATION_TAG.to_string(),
        }
    }

    pub fn with_base_tag(mut self, tag: impl Into<String>) -> Self {
        self.base_tag = tag.into();
        self
    }

    /// Actions for every key, local order first, then server-only keys in
    /// sorted order.
    pub fn run(
        &self,
        local_items: &[LocalItem],
        table_rows: &[TableRow],
    ) -> Result<Vec<Action>, CoreError> {
        let mut local_keys: Vec<Key> = Vec::with_capacity(local_items.len());
        let mut local_map: HashMap<Key, &LocalItem> = HashMap::with_capacity(local_items.len());
        for item in local_items {
            let key = (item.level(), item.table_path().clone());
            if local_map.contains_key(&key) {
                warn!(level = key.0, path = %key.1, "duplicate local item, keeping the first");
                continue;
            }
            local_map.insert(key.clone(), item);
            local_keys.push(key);
        }

        let mut row_map: HashMap<Key, &TableRow> = HashMap::with_capacity(table_rows.len());
        for row in table_rows {
            row_map
                .entry((row.level, row.path.clone()))
                .or_insert(row);
        }

        let server_only: BTreeSet<&Key> = row_map
            .keys()
            .filter(|key| !local_map.contains_key(*key))
            .collect();

        let mut actions = Vec::with_capacity(local_keys.len() + server_only.len());
        for key in &local_keys {
            let item = local_map[key];
            match row_map.get(key) {
                Some(row) => actions.extend(self.both(item, row)?),
                None => actions.push(self.local_only(item)?),
            }
        }
        for key in server_only {
            actions.push(self.server_only(row_map[key])?);
        }

        for action in &actions {
            debug!(
                operation = %action.operation(),
                kind = %action.kind(),
                level = action.level(),
                path = %action.path(),
                "reconciled"
            );
        }
        info!(
            local = local_keys.len(),
            rows = table_rows.len(),
            actions = actions.len(),
            "reconciliation complete"
        );
        Ok(actions)
    }

    fn local_only(&self, item: &LocalItem) -> Result<Action, CoreError> {
        let action = match local_kind(item, self.discourse.host())? {
            LocalKind::Directory => create_group(item),
            LocalKind::File => self.create_page(item)?,
            LocalKind::ExternalRef => create_external_ref(item),
        };
        Ok(action)
    }

    fn server_only(&self, row: &TableRow) -> Result<Action, CoreError> {
        let action = match row.kind(self.discourse.host()) {
            RowKind::Group => Action::DeleteGroup {
                level: row.level,
                path: row.path.clone(),
                navlink: row.navlink.clone(),
            },
            RowKind::ExternalRef => Action::DeleteExternalRef {
                level: row.level,
                path: row.path.clone(),
                navlink: row.navlink.clone(),
            },
            RowKind::Page => self.delete_page(row)?,
        };
        Ok(action)
    }

    fn both(&self, item: &LocalItem, row: &TableRow) -> Result<Vec<Action>, CoreError> {
        if item.level() != row.level || item.table_path() != &row.path {
            return Err(ReconciliationError::KeyMismatch {
                local_level: item.level(),
                local_path: item.table_path().to_string(),
                row_level: row.level,
                row_path: row.path.to_string(),
            }
            .into());
        }

        let local = local_kind(item, self.discourse.host())?;
        let steps = resolution(local, row.kind(self.discourse.host()));
        let mut actions = Vec::with_capacity(steps.len());
        for step in steps {
            let action = match step {
                Step::CompareGroup => compare_group(item, row),
                Step::CompareExternalRef => compare_external_ref(item, row),
                Step::ComparePage => self.compare_page(item, row)?,
                Step::CreateGroup => create_group(item),
                Step::CreatePage => self.create_page(item)?,
                Step::CreateExternalRef => create_external_ref(item),
                Step::DeletePage => self.delete_page(row)?,
            };
            actions.push(action);
        }
        Ok(actions)
    }

    fn create_page(&self, item: &LocalItem) -> Result<Action, CoreError> {
        let content = match item {
            LocalItem::Path(info) => read_local(&info.local_path)?,
            LocalItem::Contents(contents) => {
                return Err(
                    ReconciliationError::UnresolvedContentsItem(contents.reference_value.clone())
                        .into(),
                )
            }
        };
        Ok(Action::CreatePage {
            level: item.level(),
            path: item.table_path().clone(),
            navlink_title: item.navlink_title().to_string(),
            content,
            navlink_hidden: item.hidden(),
        })
    }

    fn delete_page(&self, row: &TableRow) -> Result<Action, CoreError> {
        let content = self.server_content(row)?;
        Ok(Action::DeletePage {
            level: row.level,
            path: row.path.clone(),
            navlink: row.navlink.clone(),
            content,
        })
    }

    fn compare_page(&self, item: &LocalItem, row: &TableRow) -> Result<Action, CoreError> {
        let LocalItem::Path(info) = item else {
            return Err(ReconciliationError::UnresolvedContentsItem(
                item.table_path().to_string(),
            )
            .into());
        };

        let server = self.server_content(row)?;
        let local = read_local(&info.local_path)?;

        if server.trim() == local.trim()
            && row.navlink.title == info.navlink_title
            && row.navlink.hidden == info.navlink_hidden
        {
            return Ok(Action::NoopPage {
                level: row.level,
                path: row.path.clone(),
                navlink: row.navlink.clone(),
                content: local,
            });
        }

        let base = self.base_content(&info.local_path)?;
        Ok(Action::UpdatePage {
            level: row.level,
            path: row.path.clone(),
            navlink_change: NavlinkChange {
                old: row.navlink.clone(),
                new: Navlink {
                    title: info.navlink_title.clone(),
                    target: row.navlink.target.clone(),
                    hidden: info.navlink_hidden,
                },
            },
            content_change: ContentChange {
                base,
                server,
                local,
            },
        })
    }

    fn server_content(&self, row: &TableRow) -> Result<String, ServerError> {
        let link = row.navlink.target.link().unwrap_or_default();
        let url = self.discourse.absolute_url(link);
        self.discourse
            .retrieve_topic(&url)
            .map_err(|source| ServerError { url, source })
    }

    /// Content of `local_path` at the base tag; `None` when the file was not
    /// tracked there.
    fn base_content(&self, local_path: &Path) -> Result<Option<String>, ReconciliationError> {
        let relative = local_path.strip_prefix(&self.base_path).map_err(|_| {
            ReconciliationError::OutsideBasePath {
                path: local_path.to_path_buf(),
                base: self.base_path.clone(),
            }
        })?;
        let relative = relative.to_string_lossy().replace('\\', "/");

        match self
            .repository
            .get_file_content_from_tag(&relative, &self.base_tag)
        {
            Ok(content) => Ok(Some(content)),
            Err(RepositoryError::FileNotFound { .. }) => {
                debug!(path = %relative, tag = %self.base_tag, "file not tracked at base tag");
                Ok(None)
            }
            Err(RepositoryError::TagNotFound(tag)) => {
                Err(ReconciliationError::BaseTagMissing { tag, path: relative })
            }
            Err(source) => Err(ReconciliationError::Repository {
                path: relative,
                source,
            }),
        }
    }
}

fn local_kind(item: &LocalItem, server_hostname: &str) -> Result<LocalKind, ReconciliationError> {
    match item {
        LocalItem::Path(info) if info.local_path.is_dir() => Ok(LocalKind::Directory),
        LocalItem::Path(_) => Ok(LocalKind::File),
        LocalItem::Contents(contents) if contents.is_external(server_hostname) => {
            Ok(LocalKind::ExternalRef)
        }
        LocalItem::Contents(contents) => Err(ReconciliationError::UnresolvedContentsItem(
            contents.reference_value.clone(),
        )),
    }
}

fn read_local(path: &Path) -> Result<String, ReconciliationError> {
    std::fs::read_to_string(path).map_err(|source| ReconciliationError::LocalRead {
        path: path.to_path_buf(),
        source,
    })
}

fn external_value(item: &LocalItem) -> String {
    match item {
        LocalItem::Contents(contents) => contents.reference_value.clone(),
        LocalItem::Path(info) => info.local_path.display().to_string(),
    }
}

fn create_group(item: &LocalItem) -> Action {
    Action::CreateGroup {
        level: item.level(),
        path: item.table_path().clone(),
        navlink_title: item.navlink_title().to_string(),
        navlink_hidden: item.hidden(),
    }
}

fn create_external_ref(item: &LocalItem) -> Action {
    Action::CreateExternalRef {
        level: item.level(),
        path: item.table_path().clone(),
        navlink_title: item.navlink_title().to_string(),
        navlink_value: external_value(item),
        navlink_hidden: item.hidden(),
    }
}

fn compare_group(item: &LocalItem, row: &TableRow) -> Action {
    if row.navlink.title == item.navlink_title() && row.navlink.hidden == item.hidden() {
        return Action::NoopGroup {
            level: row.level,
            path: row.path.clone(),
            navlink: row.navlink.clone(),
        };
    }
    Action::UpdateGroup {
        level: row.level,
        path: row.path.clone(),
        navlink_change: NavlinkChange {
            old: row.navlink.clone(),
            new: Navlink {
                title: item.navlink_title().to_string(),
                target: NavlinkTarget::Group,
                hidden: item.hidden(),
            },
        },
    }
}

fn compare_external_ref(item: &LocalItem, row: &TableRow) -> Action {
    let value = external_value(item);
    if row.navlink.title == item.navlink_title()
        && row.navlink.target.link() == Some(value.as_str())
        && row.navlink.hidden == item.hidden()
    {
        return Action::NoopExternalRef {
            level: row.level,
            path: row.path.clone(),
            navlink: row.navlink.clone(),
        };
    }
    Action::UpdateExternalRef {
        level: row.level,
        path: row.path.clone(),
        navlink_change: NavlinkChange {
            old: row.navlink.clone(),
            new: Navlink {
                title: item.navlink_title().to_string(),
                target: NavlinkTarget::Link(value),
                hidden: item.hidden(),
            },
        },
    }
}

/// Decide what to do with the index page once the final rows are known.
///
/// The page body is the local index content without any embedded navigation
/// table, followed by a table rendered from `rows`.
pub fn index_page(index: &Index, rows: &[TableRow], server_hostname: &str) -> IndexAction {
    let local = index.local.content.as_deref().unwrap_or_default();
    let body = navigation_table::strip_navigation_table(local).trim();
    let table = navigation_table::render(rows, server_hostname);
    let content = format!("{body}\n\n{table}").trim().to_string();

    match &index.server {
        None => IndexAction::Create {
            title: index.local.title.clone(),
            content,
        },
        Some(page) if page.content.trim() != content => IndexAction::Update {
            url: page.url.clone(),
            content_change: IndexContentChange {
                old: page.content.clone(),
                new: content,
            },
        },
        Some(page) => IndexAction::Noop {
            url: page.url.clone(),
            content,
        },
    }
}
