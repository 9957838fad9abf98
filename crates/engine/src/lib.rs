//! The DraftDB engine
//!
//! Composes the storage, concurrency, and durability layers behind one
//! facade, [`DocumentStore`]:
//!
//! - [`version_store`]: append-only per-document version history with
//!   branches, merges, rollback, and retention
//! - [`database`]: the facade orchestrating save / get / delete / search
//!   plus lock, conflict, version, branch, and backup operations
//! - [`events`]: bounded fan-out event channel for collaborators
//! - [`integrity`]: fail-fast document validation
//!
//! Every public operation is callable from any thread; each internal
//! table is owned by exactly one component and synchronized behind it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod events;
pub mod integrity;
pub mod options;
pub mod version_store;

pub use config::EngineConfig;
pub use database::{DocumentStore, MergeReport, StoreStats};
pub use events::{EventBus, StoreEvent};
pub use options::{
    DeleteOptions, DeleteReport, DocumentView, GetOptions, MergeOptions, SaveOptions, SaveOutcome,
    SearchQuery, SearchResults, SortBy, SortOrder, VersionSummary,
};
pub use version_store::{CreateVersionOptions, HistoryFilter, VersionComparison, VersionStore};

// Re-export the concurrency surface callers interact with directly
pub use draftdb_concurrency::{
    detect, resolve_all, strategy, AcquireRequest, Clock, LockConfig, ManualClock,
    ResolutionContext, ResolutionStrategy, SystemClock,
};
pub use draftdb_durability::{BackupEntry, BackupStore};
pub use draftdb_storage::{CacheStats, PrimaryStore};
