//! Pre-flight conflict check over the action stream.
//!
//! Every page update is dry-merged before anything executes, so a run with an
//! unresolvable conflict fails without touching the server.

use tracing::{debug, info, warn};

use crate::action::{Action, ContentChange};
use crate::conflict::merger::Merger;
use crate::errors::{Problem, UnresolvedConflicts};

const MISSING_BASE_DESCRIPTION: &str = "cannot execute the update because the file was not found \
     at the base tag and the local and server content differ; make the contents identical and \
     try again";

/// Stateless checker for update actions that cannot be merged automatically.
pub struct ConflictChecker;

impl ConflictChecker {
    /// One [`Problem`] per page update that cannot be resolved.
    pub fn problems(actions: &[Action]) -> Vec<Problem> {
        let problems: Vec<Problem> = actions
            .iter()
            .filter_map(|action| match action {
                Action::UpdatePage {
                    path,
                    content_change,
                    ..
                } => content_problem(content_change).map(|description| Problem {
                    path: path.to_string(),
                    description,
                }),
                _ => None,
            })
            .collect();

        info!(count = problems.len(), "conflict check complete");
        problems
    }

    /// Fail with every problem when any update cannot be resolved.
    pub fn check(actions: &[Action]) -> Result<(), UnresolvedConflicts> {
        let problems = Self::problems(actions);
        if problems.is_empty() {
            return Ok(());
        }
        for problem in &problems {
            warn!(path = %problem.path, "unresolved conflict");
        }
        Err(UnresolvedConflicts { problems })
    }
}

/// Why the content change cannot be applied, if it cannot.
pub fn content_problem(change: &ContentChange) -> Option<String> {
    match &change.base {
        None if change.is_unchanged() => None,
        None => Some(MISSING_BASE_DESCRIPTION.to_string()),
        Some(base) => {
            let conflict = Merger::conflicts(base, &change.server, &change.local);
            if conflict.is_some() {
                debug!("update cannot be merged automatically");
            }
            conflict
        }
    }
}
