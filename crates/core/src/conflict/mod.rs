//! Content merging and conflict detection.
//!
//! The conflict subsystem is responsible for:
//! 1. **Merging** -- three-way merges of base, server and local page content.
//! 2. **Checking** -- scanning page updates before execution and failing the
//!    run when any of them cannot be merged automatically.

pub mod checker;
pub mod merger;

pub use checker::ConflictChecker;
pub use merger::Merger;
