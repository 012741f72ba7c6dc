//! Execution of reconciled actions against the document server.
//!
//! Each action maps to at most one server mutation. Server failures never
//! escape: they are recorded as a [`ActionResult::Fail`] report so sibling
//! actions still run.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::action::{Action, IndexAction, NavlinkChange};
use crate::conflict::checker::content_problem;
use crate::conflict::merger::Merger;
use crate::discourse::DiscourseApi;
use crate::models::{
    path_only, ActionReport, ActionResult, Navlink, NavlinkTarget, ReportLocation, TablePath,
    TableRow, DRY_RUN_LOCATION, DRY_RUN_REASON, NOT_DELETE_REASON,
};

/// Switches that change how actions are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Report what would happen without touching the server.
    pub dry_run: bool,
    /// Delete topics whose pages disappeared locally.
    pub delete_topics: bool,
    /// Project name used in topic titles.
    pub name: String,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            delete_topics: true,
            name: String::new(),
        }
    }
}

/// Title of the topic holding a documentation page.
pub fn page_title(name: &str, navlink_title: &str) -> String {
    if name.is_empty() {
        navlink_title.to_string()
    } else {
        format!("{name} docs: {navlink_title}")
    }
}

pub struct ActionExecutor<'a, D> {
    discourse: &'a D,
    options: ExecutorOptions,
}

impl<'a, D: DiscourseApi> ActionExecutor<'a, D> {
    pub fn new(discourse: &'a D, options: ExecutorOptions) -> Self {
        Self { discourse, options }
    }

    /// Execute `actions` in order, one report each.
    pub fn run_all(&self, actions: &[Action]) -> Vec<ActionReport> {
        actions.iter().map(|action| self.run(action)).collect()
    }

    /// Execute a single action.
    pub fn run(&self, action: &Action) -> ActionReport {
        let report = if self.options.dry_run {
            dry_run_report(action)
        } else {
            self.apply(action)
        };

        match report.result {
            ActionResult::Fail => warn!(
                action = %action,
                reason = report.reason.as_deref().unwrap_or_default(),
                "action failed"
            ),
            result => info!(action = %action, result = %result, "action executed"),
        }
        report
    }

    fn apply(&self, action: &Action) -> ActionReport {
        match action {
            Action::CreatePage {
                level,
                path,
                navlink_title,
                content,
                navlink_hidden,
            } => {
                let title = page_title(&self.options.name, navlink_title);
                match self.discourse.create_topic(&title, content) {
                    Ok(url) => success(
                        Some(row(
                            *level,
                            path,
                            navlink_title,
                            NavlinkTarget::Link(path_only(&url).to_string()),
                            *navlink_hidden,
                        )),
                        Some(ReportLocation::Url(url)),
                    ),
                    Err(err) => fail(None, Some(ReportLocation::Failed), err.to_string()),
                }
            }
            Action::CreateGroup {
                level,
                path,
                navlink_title,
                navlink_hidden,
            } => success(
                Some(row(*level, path, navlink_title, NavlinkTarget::Group, *navlink_hidden)),
                None,
            ),
            Action::CreateExternalRef {
                level,
                path,
                navlink_title,
                navlink_value,
                navlink_hidden,
            } => success(
                Some(row(
                    *level,
                    path,
                    navlink_title,
                    NavlinkTarget::Link(navlink_value.clone()),
                    *navlink_hidden,
                )),
                None,
            ),
            Action::NoopPage {
                level,
                path,
                navlink,
                ..
            } => success(
                Some(table_row(*level, path, navlink)),
                self.page_location(navlink),
            ),
            Action::NoopGroup {
                level,
                path,
                navlink,
            }
            | Action::NoopExternalRef {
                level,
                path,
                navlink,
            }
            | Action::UpdateExternalRef {
                level,
                path,
                navlink_change: NavlinkChange { new: navlink, .. },
            }
            | Action::UpdateGroup {
                level,
                path,
                navlink_change: NavlinkChange { new: navlink, .. },
            } => success(Some(table_row(*level, path, navlink)), None),
            Action::UpdatePage {
                level,
                path,
                navlink_change,
                content_change,
            } => {
                let new_row = table_row(*level, path, &navlink_change.new);
                let old_row = table_row(*level, path, &navlink_change.old);
                let location = self.page_location(&navlink_change.old);

                if content_change.is_unchanged() {
                    return success(Some(new_row), location);
                }
                let Some(base) = &content_change.base else {
                    let reason = content_problem(content_change).unwrap_or_default();
                    return fail(Some(old_row), location, reason);
                };
                let merged =
                    match Merger::merge(base, &content_change.server, &content_change.local) {
                        Ok(merged) => merged,
                        Err(conflict) => {
                            return fail(Some(old_row), location, conflict.to_string())
                        }
                    };
                let Some(link) = navlink_change.old.target.link() else {
                    return fail(Some(old_row), location, "page row has no link".to_string());
                };
                let url = self.discourse.absolute_url(link);
                match self.discourse.update_topic(&url, &merged) {
                    Ok(()) => success(Some(new_row), location),
                    Err(err) => fail(Some(old_row), location, err.to_string()),
                }
            }
            Action::DeletePage {
                level,
                path,
                navlink,
                ..
            } => {
                let location = self.page_location(navlink);
                if !self.options.delete_topics {
                    return skip(None, location, NOT_DELETE_REASON);
                }
                let Some(link) = navlink.target.link() else {
                    return fail(
                        Some(table_row(*level, path, navlink)),
                        location,
                        "page row has no link".to_string(),
                    );
                };
                match self.discourse.delete_topic(&self.discourse.absolute_url(link)) {
                    Ok(()) => success(None, location),
                    Err(err) => fail(
                        Some(table_row(*level, path, navlink)),
                        location,
                        err.to_string(),
                    ),
                }
            }
            Action::DeleteGroup { .. } | Action::DeleteExternalRef { .. } => success(None, None),
        }
    }

    fn page_location(&self, navlink: &Navlink) -> Option<ReportLocation> {
        navlink
            .target
            .link()
            .map(|link| ReportLocation::Url(self.discourse.absolute_url(link)))
    }

    /// Execute the index action. Must run after every other action.
    pub fn run_index(&self, action: &IndexAction) -> ActionReport {
        if self.options.dry_run {
            let location = match action {
                IndexAction::Create { .. } => ReportLocation::DryRun,
                IndexAction::Update { url, .. } | IndexAction::Noop { url, .. } => {
                    ReportLocation::Url(url.clone())
                }
            };
            return skip(None, Some(location), DRY_RUN_REASON);
        }

        let report = match action {
            IndexAction::Create { title, content } => {
                match self.discourse.create_topic(title, content) {
                    Ok(url) => success(None, Some(ReportLocation::Url(url))),
                    Err(err) => fail(None, Some(ReportLocation::Failed), err.to_string()),
                }
            }
            IndexAction::Update {
                url,
                content_change,
            } => match self.discourse.update_topic(url, &content_change.new) {
                Ok(()) => success(None, Some(ReportLocation::Url(url.clone()))),
                Err(err) => fail(None, Some(ReportLocation::Url(url.clone())), err.to_string()),
            },
            IndexAction::Noop { url, .. } => success(None, Some(ReportLocation::Url(url.clone()))),
        };
        info!(operation = %action.operation(), result = %report.result, "index action executed");
        report
    }
}

fn dry_run_report(action: &Action) -> ActionReport {
    let (table_row, location) = match action {
        Action::CreatePage {
            level,
            path,
            navlink_title,
            navlink_hidden,
            ..
        } => (
            Some(row(
                *level,
                path,
                navlink_title,
                NavlinkTarget::Link(DRY_RUN_LOCATION.to_string()),
                *navlink_hidden,
            )),
            Some(ReportLocation::DryRun),
        ),
        Action::CreateGroup {
            level,
            path,
            navlink_title,
            navlink_hidden,
        } => (
            Some(row(*level, path, navlink_title, NavlinkTarget::Group, *navlink_hidden)),
            None,
        ),
        Action::CreateExternalRef {
            level,
            path,
            navlink_title,
            navlink_value,
            navlink_hidden,
        } => (
            Some(row(
                *level,
                path,
                navlink_title,
                NavlinkTarget::Link(navlink_value.clone()),
                *navlink_hidden,
            )),
            None,
        ),
        Action::NoopPage {
            level,
            path,
            navlink,
            ..
        }
        | Action::NoopGroup {
            level,
            path,
            navlink,
        }
        | Action::NoopExternalRef {
            level,
            path,
            navlink,
        } => (Some(table_row(*level, path, navlink)), None),
        Action::UpdatePage {
            level,
            path,
            navlink_change,
            ..
        }
        | Action::UpdateGroup {
            level,
            path,
            navlink_change,
        }
        | Action::UpdateExternalRef {
            level,
            path,
            navlink_change,
        } => (Some(table_row(*level, path, &navlink_change.new)), None),
        Action::DeletePage { .. } | Action::DeleteGroup { .. } | Action::DeleteExternalRef { .. } => {
            (None, None)
        }
    };
    skip(table_row, location, DRY_RUN_REASON)
}

fn row(level: usize, path: &TablePath, title: &str, target: NavlinkTarget, hidden: bool) -> TableRow {
    TableRow {
        level,
        path: path.clone(),
        navlink: Navlink {
            title: title.to_string(),
            target,
            hidden,
        },
    }
}

fn table_row(level: usize, path: &TablePath, navlink: &Navlink) -> TableRow {
    TableRow {
        level,
        path: path.clone(),
        navlink: navlink.clone(),
    }
}

fn success(table_row: Option<TableRow>, location: Option<ReportLocation>) -> ActionReport {
    ActionReport {
        table_row,
        location,
        result: ActionResult::Success,
        reason: None,
    }
}

fn skip(table_row: Option<TableRow>, location: Option<ReportLocation>, reason: &str) -> ActionReport {
    ActionReport {
        table_row,
        location,
        result: ActionResult::Skip,
        reason: Some(reason.to_string()),
    }
}

fn fail(table_row: Option<TableRow>, location: Option<ReportLocation>, reason: String) -> ActionReport {
    ActionReport {
        table_row,
        location,
        result: ActionResult::Fail,
        reason: Some(reason),
    }
}

/// Outcome per location (topic URL, or local path for migrations).
///
/// Reports without a location, such as group rows, are left out.
pub fn outcomes(reports: &[ActionReport]) -> BTreeMap<String, ActionResult> {
    reports
        .iter()
        .filter_map(|report| {
            report
                .location
                .as_ref()
                .map(|location| (location.to_string(), report.result))
        })
        .collect()
}
