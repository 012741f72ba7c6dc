//! Docs gatekeeper core library.
//!
//! This crate keeps a local directory of Markdown documentation and the
//! navigation table of a Discourse index topic in sync: parsing of the
//! navigation table and of the contents index, reconciliation into actions,
//! three-way merge and conflict checking, action execution, and migration of
//! server docs into a local tree.

pub mod action;
pub mod config;
pub mod conflict;
pub mod contents;
pub mod discourse;
pub mod errors;
pub mod executor;
pub mod migration;
pub mod models;
pub mod navigation_table;
pub mod reconcile;
pub mod repository;
pub mod sync_engine;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience.
pub use action::{Action, IndexAction};
pub use config::GatekeeperConfig;
pub use conflict::{ConflictChecker, Merger};
pub use discourse::DiscourseApi;
pub use errors::CoreError;
pub use executor::{ActionExecutor, ExecutorOptions};
pub use migration::MigrationEngine;
pub use reconcile::Reconciler;
pub use repository::RepositoryApi;
pub use sync_engine::{ReconcileInput, SyncEngine, SyncOutcome};
