//! Three-way merge of page content.
//!
//! Uses the `diffy` crate to perform a line-based diff3 merge between the
//! base (last synchronized) content, "theirs" (the server) and "ours" (the
//! local file).

use tracing::{debug, info};

use crate::errors::MergeConflict;

/// Stateless three-way merge engine.
pub struct Merger;

impl Merger {
    /// Merge the changes of `theirs` and `ours` relative to `base`.
    ///
    /// Lines changed in only one branch are taken from that branch. Lines
    /// changed differently in both are a conflict: the returned
    /// [`MergeConflict`] carries the text with `<<<<<<<` / `=======` /
    /// `>>>>>>>` markers around the competing hunks.
    pub fn merge(base: &str, theirs: &str, ours: &str) -> Result<String, MergeConflict> {
        if theirs == base {
            debug!("theirs == base, ours wins cleanly");
            return Ok(ours.to_string());
        }
        if ours == base {
            debug!("ours == base, theirs wins cleanly");
            return Ok(theirs.to_string());
        }
        if theirs == ours {
            debug!("theirs == ours, identical changes");
            return Ok(ours.to_string());
        }

        info!("performing three-way merge");

        // diffy works on whole lines; a missing final newline would glue the
        // last line to the conflict markers.
        let base_lines = with_final_newline(base);
        let theirs_lines = with_final_newline(theirs);
        let ours_lines = with_final_newline(ours);

        match diffy::merge(&base_lines, &ours_lines, &theirs_lines) {
            Ok(merged) => {
                debug!("clean three-way merge");
                if ours.ends_with('\n') || theirs.ends_with('\n') {
                    Ok(merged)
                } else {
                    Ok(merged.strip_suffix('\n').unwrap_or(&merged).to_string())
                }
            }
            Err(diff) => {
                debug!("three-way merge produced conflicts");
                Err(MergeConflict { diff })
            }
        }
    }

    /// Describe why `merge` would fail, or `None` when it would succeed.
    pub fn conflicts(base: &str, theirs: &str, ours: &str) -> Option<String> {
        Self::merge(base, theirs, ours)
            .err()
            .map(|conflict| conflict.to_string())
    }
}

fn with_final_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_files() {
        let base = "line1\nline2\nline3\n";
        assert_eq!(Merger::merge(base, base, base).unwrap(), base);
    }

    #[test]
    fn test_only_ours_changed() {
        assert_eq!(Merger::merge("a", "a", "b").unwrap(), "b");
    }

    #[test]
    fn test_only_theirs_changed() {
        let base = "line1\nline2\nline3\n";
        let theirs = "line1\nline2\nmodified\n";
        assert_eq!(Merger::merge(base, theirs, base).unwrap(), theirs);
    }

    #[test]
    fn test_same_change_both_sides() {
        assert_eq!(Merger::merge("old\n", "new\n", "new\n").unwrap(), "new\n");
    }

    #[test]
    fn test_non_overlapping_changes() {
        let base = "aaa\nbbb\nccc\nddd\neee\n";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE\n";
        let ours = "AAA\nbbb\nccc\nddd\neee\n";
        let merged = Merger::merge(base, theirs, ours).unwrap();
        assert_eq!(merged, "AAA\nbbb\nccc\nddd\nEEE\n");
    }

    #[test]
    fn test_non_overlapping_changes_without_final_newline() {
        let base = "aaa\nbbb\nccc\nddd\neee";
        let theirs = "aaa\nbbb\nccc\nddd\nEEE";
        let ours = "AAA\nbbb\nccc\nddd\neee";
        assert_eq!(
            Merger::merge(base, theirs, ours).unwrap(),
            "AAA\nbbb\nccc\nddd\nEEE"
        );
    }

    #[test]
    fn test_conflicting_changes() {
        let err = Merger::merge("a", "b", "c").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains('b'));
        assert!(msg.contains('c'));
        assert!(msg.contains("<<<<<<<"));
        assert!(msg.contains("======="));
        assert!(msg.contains(">>>>>>>"));
    }

    #[test]
    fn test_conflicts_wrapper() {
        assert!(Merger::conflicts("a", "a", "b").is_none());

        let description = Merger::conflicts(
            "line1\noriginal\nline3\n",
            "line1\ntheirs_version\nline3\n",
            "line1\nours_version\nline3\n",
        )
        .unwrap();
        assert!(description.contains("theirs_version"));
        assert!(description.contains("ours_version"));
    }
}
