//! Ordering of the scanned tree by the contents index.
//!
//! Items named by the contents index come first, in list order, and take
//! their navlink title and hidden flag from the list. Whatever the list does
//! not mention is appended alphabetically at the end of its containing
//! directory, or of the root.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::contents::parser::normalize_reference;
use crate::errors::ReconciliationError;
use crate::models::{IndexContentsListItem, LocalItem, PathInfo};

struct Ordering<'a> {
    infos: &'a [PathInfo],
    relatives: Vec<PathBuf>,
    by_relative: HashMap<PathBuf, usize>,
    children: BTreeMap<PathBuf, Vec<usize>>,
    emitted: HashSet<usize>,
    output: Vec<LocalItem>,
}

impl Ordering<'_> {
    fn emit(&mut self, index: usize, item: &IndexContentsListItem) {
        let mut info = self.infos[index].clone();
        info.navlink_title = item.reference_title.clone();
        info.navlink_hidden = item.hidden;
        self.emitted.insert(index);
        self.output.push(LocalItem::Path(info));
    }

    /// Emit the unmentioned descendants of `directory`, depth first.
    fn emit_leftovers(&mut self, directory: &Path) {
        let Some(children) = self.children.get(directory).cloned() else {
            return;
        };
        for index in children {
            if !self.emitted.insert(index) {
                continue;
            }
            let info = self.infos[index].clone();
            debug!(path = %info.table_path, "appending item missing from contents index");
            self.output.push(LocalItem::Path(info));
            let relative = self.relatives[index].clone();
            self.emit_leftovers(&relative);
        }
    }
}

/// Order `path_infos` for reconciliation using the parsed contents index.
///
/// `docs_root` is the directory the contents references are relative to;
/// every path info must live below it.
pub fn order_local_items(
    path_infos: Vec<PathInfo>,
    items: &[IndexContentsListItem],
    docs_root: &Path,
) -> Result<Vec<LocalItem>, ReconciliationError> {
    let mut relatives = Vec::with_capacity(path_infos.len());
    for info in &path_infos {
        let relative = info
            .local_path
            .strip_prefix(docs_root)
            .map_err(|_| ReconciliationError::OutsideBasePath {
                path: info.local_path.clone(),
                base: docs_root.to_path_buf(),
            })?
            .to_path_buf();
        relatives.push(relative);
    }

    let mut children: BTreeMap<PathBuf, Vec<usize>> = BTreeMap::new();
    for (index, relative) in relatives.iter().enumerate() {
        let parent = relative.parent().unwrap_or(Path::new("")).to_path_buf();
        children.entry(parent).or_default().push(index);
    }
    for siblings in children.values_mut() {
        siblings.sort_by_key(|&index| (path_infos[index].alphabetical_rank, index));
    }

    let mut ordering = Ordering {
        infos: &path_infos,
        by_relative: relatives
            .iter()
            .enumerate()
            .map(|(index, relative)| (relative.clone(), index))
            .collect(),
        relatives,
        children,
        emitted: HashSet::new(),
        output: Vec::with_capacity(path_infos.len() + items.len()),
    };

    let mut open: Vec<PathBuf> = Vec::new();
    for item in items {
        while open.len() >= item.hierarchy {
            if let Some(directory) = open.pop() {
                ordering.emit_leftovers(&directory);
            }
        }

        if item.is_url() {
            ordering.output.push(LocalItem::Contents(item.clone()));
            continue;
        }

        let relative = normalize_reference(&item.reference_value)
            .ok_or_else(|| ReconciliationError::UnknownContentsReference(item.reference_value.clone()))?;
        let index = *ordering
            .by_relative
            .get(&relative)
            .ok_or_else(|| ReconciliationError::UnknownContentsReference(item.reference_value.clone()))?;
        ordering.emit(index, item);
        open.push(relative);
    }

    while let Some(directory) = open.pop() {
        ordering.emit_leftovers(&directory);
    }
    ordering.emit_leftovers(Path::new(""));

    // Anything still left has no scanned parent; keep input order.
    for (index, info) in path_infos.iter().enumerate() {
        if ordering.emitted.insert(index) {
            ordering.output.push(LocalItem::Path(info.clone()));
        }
    }

    info!(count = ordering.output.len(), "ordered local items");
    Ok(ordering.output)
}
