//! Actions emitted by the reconciler.
//!
//! An [`Action`] is one cell of the operation x kind grid:
//!
//! | operation | Page | Group | ExternalRef |
//! |-----------|------|-------|-------------|
//! | Create    | title, content, hidden | title, hidden | title, value, hidden |
//! | Noop      | navlink, content | navlink | navlink |
//! | Update    | navlink change, content change | navlink change | navlink change |
//! | Delete    | navlink, server content | navlink | navlink |
//!
//! Every variant carries the row `level` and `path`.

use crate::models::{Navlink, TablePath};

/// What an action does to its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Noop,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Noop => write!(f, "noop"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// What kind of row an action targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Page,
    Group,
    ExternalRef,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Group => write!(f, "group"),
            Self::ExternalRef => write!(f, "external_ref"),
        }
    }
}

/// Old and new navlink of an updated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavlinkChange {
    pub old: Navlink,
    pub new: Navlink,
}

/// The three contents involved in updating a page.
///
/// `base` is `None` when the file was never synchronized; the update can then
/// only proceed when `local` and `server` already agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    pub base: Option<String>,
    pub server: String,
    pub local: String,
}

impl ContentChange {
    /// Local and server content agree, ignoring surrounding whitespace.
    pub fn is_unchanged(&self) -> bool {
        self.local.trim() == self.server.trim()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreatePage {
        level: usize,
        path: TablePath,
        navlink_title: String,
        content: String,
        navlink_hidden: bool,
    },
    CreateGroup {
        level: usize,
        path: TablePath,
        navlink_title: String,
        navlink_hidden: bool,
    },
    CreateExternalRef {
        level: usize,
        path: TablePath,
        navlink_title: String,
        navlink_value: String,
        navlink_hidden: bool,
    },
    NoopPage {
        level: usize,
        path: TablePath,
        navlink: Navlink,
        content: String,
    },
    NoopGroup {
        level: usize,
        path: TablePath,
        navlink: Navlink,
    },
    NoopExternalRef {
        level: usize,
        path: TablePath,
        navlink: Navlink,
    },
    UpdatePage {
        level: usize,
        path: TablePath,
        navlink_change: NavlinkChange,
        content_change: ContentChange,
    },
    UpdateGroup {
        level: usize,
        path: TablePath,
        navlink_change: NavlinkChange,
    },
    UpdateExternalRef {
        level: usize,
        path: TablePath,
        navlink_change: NavlinkChange,
    },
    DeletePage {
        level: usize,
        path: TablePath,
        navlink: Navlink,
        /// Server content at decision time, kept for dry-run diagnostics.
        content: String,
    },
    DeleteGroup {
        level: usize,
        path: TablePath,
        navlink: Navlink,
    },
    DeleteExternalRef {
        level: usize,
        path: TablePath,
        navlink: Navlink,
    },
}

impl Action {
    pub fn operation(&self) -> Operation {
        match self {
            Self::CreatePage { .. } | Self::CreateGroup { .. } | Self::CreateExternalRef { .. } => {
                Operation::Create
            }
            Self::NoopPage { .. } | Self::NoopGroup { .. } | Self::NoopExternalRef { .. } => {
                Operation::Noop
            }
            Self::UpdatePage { .. } | Self::UpdateGroup { .. } | Self::UpdateExternalRef { .. } => {
                Operation::Update
            }
            Self::DeletePage { .. } | Self::DeleteGroup { .. } | Self::DeleteExternalRef { .. } => {
                Operation::Delete
            }
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreatePage { .. }
            | Self::NoopPage { .. }
            | Self::UpdatePage { .. }
            | Self::DeletePage { .. } => ActionKind::Page,
            Self::CreateGroup { .. }
            | Self::NoopGroup { .. }
            | Self::UpdateGroup { .. }
            | Self::DeleteGroup { .. } => ActionKind::Group,
            Self::CreateExternalRef { .. }
            | Self::NoopExternalRef { .. }
            | Self::UpdateExternalRef { .. }
            | Self::DeleteExternalRef { .. } => ActionKind::ExternalRef,
        }
    }

    pub fn level(&self) -> usize {
        match self {
            Self::CreatePage { level, .. }
            | Self::CreateGroup { level, .. }
            | Self::CreateExternalRef { level, .. }
            | Self::NoopPage { level, .. }
            | Self::NoopGroup { level, .. }
            | Self::NoopExternalRef { level, .. }
            | Self::UpdatePage { level, .. }
            | Self::UpdateGroup { level, .. }
            | Self::UpdateExternalRef { level, .. }
            | Self::DeletePage { level, .. }
            | Self::DeleteGroup { level, .. }
            | Self::DeleteExternalRef { level, .. } => *level,
        }
    }

    pub fn path(&self) -> &TablePath {
        match self {
            Self::CreatePage { path, .. }
            | Self::CreateGroup { path, .. }
            | Self::CreateExternalRef { path, .. }
            | Self::NoopPage { path, .. }
            | Self::NoopGroup { path, .. }
            | Self::NoopExternalRef { path, .. }
            | Self::UpdatePage { path, .. }
            | Self::UpdateGroup { path, .. }
            | Self::UpdateExternalRef { path, .. }
            | Self::DeletePage { path, .. }
            | Self::DeleteGroup { path, .. }
            | Self::DeleteExternalRef { path, .. } => path,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} (level {}, path {})",
            self.operation(),
            self.kind(),
            self.level(),
            self.path()
        )
    }
}

/// Old and new content of the index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexContentChange {
    pub old: String,
    pub new: String,
}

/// What to do with the index page. There is no delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAction {
    Create { title: String, content: String },
    Update { url: String, content_change: IndexContentChange },
    Noop { url: String, content: String },
}

impl IndexAction {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::Update { .. } => Operation::Update,
            Self::Noop { .. } => Operation::Noop,
        }
    }

    /// Content the index page has once this action ran.
    pub fn content(&self) -> &str {
        match self {
            Self::Create { content, .. } | Self::Noop { content, .. } => content,
            Self::Update { content_change, .. } => &content_change.new,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NavlinkTarget;

    fn navlink(title: &str) -> Navlink {
        Navlink {
            title: title.into(),
            target: NavlinkTarget::Group,
            hidden: false,
        }
    }

    #[test]
    fn test_operation_and_kind_axes() {
        let path = TablePath::from_segments(["dir"]);
        let update = Action::UpdateGroup {
            level: 1,
            path: path.clone(),
            navlink_change: NavlinkChange {
                old: navlink("Old"),
                new: navlink("New"),
            },
        };
        assert_eq!(update.operation(), Operation::Update);
        assert_eq!(update.kind(), ActionKind::Group);
        assert_eq!(update.path(), &path);
        assert_eq!(update.to_string(), "update group (level 1, path dir)");

        let delete = Action::DeleteExternalRef {
            level: 2,
            path,
            navlink: navlink("Site"),
        };
        assert_eq!(delete.operation(), Operation::Delete);
        assert_eq!(delete.kind(), ActionKind::ExternalRef);
        assert_eq!(delete.level(), 2);
    }

    #[test]
    fn test_content_change_ignores_surrounding_whitespace() {
        let change = ContentChange {
            base: None,
            server: "body\n".into(),
            local: "  body".into(),
        };
        assert!(change.is_unchanged());
    }

    #[test]
    fn test_index_action_content() {
        let action = IndexAction::Update {
            url: "https://host/t/index/1".into(),
            content_change: IndexContentChange {
                old: "old".into(),
                new: "new".into(),
            },
        };
        assert_eq!(action.content(), "new");
        assert_eq!(action.operation(), Operation::Update);
    }
}
