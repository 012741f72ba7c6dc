//! Orchestration of a full docs synchronization run.
//!
//! The [`SyncEngine`] drives one run end to end:
//!
//! 1. Parse the navigation table of the server index page, checking that
//!    every listed page is editable.
//! 2. Parse the contents index of the local index file and order the scanned
//!    tree by it.
//! 3. Reconcile local items against the table rows.
//! 4. Fail before any mutation if an update cannot be merged.
//! 5. Execute every action, then rebuild and execute the index page action
//!    from the rows the actions actually produced.
//!
//! [`SyncEngine::migrate`] runs the reverse flow, from the server into a
//! local docs directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::GatekeeperConfig;
use crate::conflict::ConflictChecker;
use crate::contents::{self, FsDocsTree};
use crate::discourse::DiscourseApi;
use crate::errors::CoreError;
use crate::executor::{outcomes, ActionExecutor};
use crate::migration::MigrationEngine;
use crate::models::{ActionReport, ActionResult, Index, PathInfo, TableRow};
use crate::navigation_table;
use crate::reconcile::{index_page, Reconciler};
use crate::repository::RepositoryApi;

/// Snapshot of the local side for one run.
#[derive(Debug, Clone)]
pub struct ReconcileInput {
    /// Every file and directory under the docs root, as scanned.
    pub path_infos: Vec<PathInfo>,
    pub index: Index,
    /// Directory contents index references are relative to.
    pub docs_root: PathBuf,
    /// Repository root; base content is looked up relative to it.
    pub base_path: PathBuf,
}

/// Result of a synchronization run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// One report per action, in execution order.
    pub reports: Vec<ActionReport>,
    pub index_report: ActionReport,
    /// Outcome per topic URL, index included.
    pub topics: BTreeMap<String, ActionResult>,
}

impl SyncOutcome {
    /// Whether any action failed.
    pub fn has_failures(&self) -> bool {
        self.reports
            .iter()
            .chain(std::iter::once(&self.index_report))
            .any(|report| report.result == ActionResult::Fail)
    }
}

/// Drives reconciliation and migration runs against one server.
pub struct SyncEngine<D, R> {
    config: GatekeeperConfig,
    discourse: D,
    repository: R,
}

impl<D: DiscourseApi, R: RepositoryApi> SyncEngine<D, R> {
    pub fn new(config: GatekeeperConfig, discourse: D, repository: R) -> Self {
        info!(host = %config.discourse.host, "initializing sync engine");
        Self {
            config,
            discourse,
            repository,
        }
    }

    pub fn discourse(&self) -> &D {
        &self.discourse
    }

    /// Bring the server in line with the local docs.
    pub fn reconcile(&self, input: ReconcileInput) -> Result<SyncOutcome, CoreError> {
        let host = self.discourse.host();
        info!(
            docs_root = %input.docs_root.display(),
            dry_run = self.config.sync.dry_run,
            "starting reconciliation"
        );

        let rows = match &input.index.server {
            Some(page) => navigation_table::from_page(&page.content, &self.discourse)?,
            None => Vec::new(),
        };

        let items = match &input.index.local.content {
            Some(content) => {
                contents::from_index(content, &FsDocsTree::new(&input.docs_root), host)?
            }
            None => Vec::new(),
        };
        let local = contents::order_local_items(input.path_infos, &items, &input.docs_root)?;

        let actions = Reconciler::new(&self.discourse, &self.repository, &input.base_path)
            .with_base_tag(&self.config.sync.base_tag)
            .run(&local, &rows)?;

        ConflictChecker::check(&actions)?;

        let executor = ActionExecutor::new(&self.discourse, self.config.executor_options());
        let reports = executor.run_all(&actions);

        let final_rows: Vec<TableRow> = reports
            .iter()
            .filter_map(|report| report.table_row.clone())
            .collect();
        let index_action = index_page(&input.index, &final_rows, host);
        let index_report = executor.run_index(&index_action);

        let mut topics = outcomes(&reports);
        topics.extend(outcomes(std::slice::from_ref(&index_report)));

        let outcome = SyncOutcome {
            reports,
            index_report,
            topics,
        };
        info!(
            actions = outcome.reports.len(),
            failed = outcome.has_failures(),
            "reconciliation complete"
        );
        Ok(outcome)
    }

    /// Write the server documentation into `docs_dir`.
    pub fn migrate(&self, index: &Index, docs_dir: &Path) -> Result<Vec<ActionReport>, CoreError> {
        let Some(page) = &index.server else {
            warn!("no server index page, nothing to migrate");
            return Ok(Vec::new());
        };

        let rows = navigation_table::parse_rows(&page.content, self.discourse.host())?;
        MigrationEngine::new(&self.discourse)
            .with_index_file(&self.config.docs.index_file)
            .run(&rows, &page.content, docs_dir)
    }
}
