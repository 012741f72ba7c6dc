//! Error types for the docs gatekeeper core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. Failures while *executing* an action never show up here: they
//! are degraded to a failed [`ActionReport`](crate::models::ActionReport).

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Conflicts(#[from] UnresolvedConflicts),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Any transport or API failure reported by the document server client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("discourse request failed: {0}")]
pub struct DiscourseError(pub String);

/// Errors from the repository client used to look up base content.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The file was not tracked at the requested tag.
    #[error("file '{path}' not found at tag '{tag}'")]
    FileNotFound { path: String, tag: String },

    /// The tag itself does not exist.
    #[error("tag '{0}' not found")]
    TagNotFound(String),

    /// Any other repository failure.
    #[error("repository client error: {0}")]
    Client(String),
}

// ---------------------------------------------------------------------------
// Input format errors
// ---------------------------------------------------------------------------

/// Malformed contents index or navigation table input. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A non-blank line in the contents section is not a list item.
    #[error("invalid contents index item, expected '<leader> [<title>](<value>)': {line:?}")]
    ContentsLine { line: String },

    /// The first item of the contents list is indented.
    #[error("the first item of the contents index must not be indented: {line:?}")]
    IndentedFirstItem { line: String },

    /// An item is indented deeper than its predecessor allows.
    #[error("item is indented but does not follow a directory reference: {line:?}")]
    UnexpectedIndent { line: String },

    /// The reference neither exists locally nor is an absolute URL.
    #[error(
        "the reference value must be a relative path to an existing file or directory, \
         or an absolute http(s) URL: {line:?}"
    )]
    MissingReference { line: String },

    /// A file reference that is not a documentation file.
    #[error("referenced file must have the '.{extension}' extension: {line:?}")]
    WrongExtension { line: String, extension: String },

    /// The reference is not an immediate child of the enclosing directory.
    #[error("item is expected to be in directory '{expected_parent}': {line:?}")]
    WrongParent { line: String, expected_parent: String },

    /// A table-looking line that matches no row grammar.
    #[error("invalid navigation table row: {line:?}")]
    TableRow { line: String },

    /// A contents item links to a topic on the document server itself.
    #[error(
        "contents index item links to the document server {host}; \
         reference the local file instead: {line:?}"
    )]
    OnHostReference { line: String, host: String },

    /// Consecutive rows jump down more than one level.
    #[error("navigation table row '{path}' jumps from level {previous} to {level}")]
    LevelJump { path: String, previous: usize, level: usize },
}

// ---------------------------------------------------------------------------
// Reconciliation errors
// ---------------------------------------------------------------------------

/// Internal invariant violations and fatal lookups while reconciling.
#[derive(Debug, Error)]
pub enum ReconciliationError {
    /// A local item and a table row met under one key but disagree on it.
    #[error(
        "local item and table row keys differ: local ({local_level}, {local_path}), \
         row ({row_level}, {row_path})"
    )]
    KeyMismatch {
        local_level: usize,
        local_path: String,
        row_level: usize,
        row_path: String,
    },

    /// A contents index item that refers to a local path reached the
    /// reconciler without being resolved to a path info first.
    #[error("contents index item '{0}' must be resolved to a local path before reconciling")]
    UnresolvedContentsItem(String),

    /// A contents index item has no matching path info.
    #[error("contents index references '{0}' but no matching local path was scanned")]
    UnknownContentsReference(String),

    /// The tag recording the last synchronized content is missing.
    #[error("base content tag '{tag}' not found, cannot determine base content for '{path}'")]
    BaseTagMissing { tag: String, path: String },

    /// Any other failure fetching base content.
    #[error("failed to fetch base content for '{path}': {source}")]
    Repository {
        path: String,
        #[source]
        source: RepositoryError,
    },

    /// Local path is not below the repository base path.
    #[error("local path '{path}' is not within base path '{base}'")]
    OutsideBasePath { path: PathBuf, base: PathBuf },

    /// A local documentation file could not be read.
    #[error("failed to read local file '{path}': {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A document-server failure while fetching content needed to decide an
/// action.
#[derive(Debug, Error)]
#[error("failed to retrieve '{url}' from the server: {source}")]
pub struct ServerError {
    pub url: String,
    #[source]
    pub source: DiscourseError,
}

/// The credentials in use cannot edit a page listed in the navigation table.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("no write permission for topic '{url}'")]
    Denied { url: String },

    #[error("failed to check write permission for topic '{url}': {source}")]
    Check {
        url: String,
        #[source]
        source: DiscourseError,
    },
}

// ---------------------------------------------------------------------------
// Merge / conflict errors
// ---------------------------------------------------------------------------

/// A three-way merge that cannot be completed automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("could not automatically merge, conflicts:\n{diff}")]
pub struct MergeConflict {
    /// Merged text including `<<<<<<<` / `=======` / `>>>>>>>` markers.
    pub diff: String,
}

/// One update that cannot be resolved automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub path: String,
    pub description: String,
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.description)
    }
}

/// Pre-flight failure raised before any action executes.
#[derive(Debug, Error)]
#[error("{} unresolved conflict(s):\n{}", .problems.len(), render_lines(.problems))]
pub struct UnresolvedConflicts {
    pub problems: Vec<Problem>,
}

// ---------------------------------------------------------------------------
// Migration errors
// ---------------------------------------------------------------------------

/// A single document or placeholder that could not be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for MigrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Aggregate failure of the migration flow, raised after every item ran.
#[derive(Debug, Error)]
#[error("migration failed for {} item(s):\n{}", .failures.len(), render_lines(.failures))]
pub struct MigrationError {
    pub failures: Vec<MigrationFailure>,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn render_lines<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  - {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
