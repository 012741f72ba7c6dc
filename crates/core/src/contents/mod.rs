//! Contents index: parsing, validation against the docs tree, and ordering
//! of the scanned tree.

pub mod parser;
pub mod sort;
pub mod tree;

pub use parser::{extract_contents_section, from_index, has_contents_section, parse_list};
pub use sort::order_local_items;
pub use tree::{DocsTree, EntryKind, FsDocsTree};
