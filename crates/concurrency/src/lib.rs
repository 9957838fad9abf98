//! Concurrency layer for DraftDB
//!
//! This crate arbitrates concurrent access to documents:
//! - [`LockManager`]: multi-granularity exclusive/shared locks with TTL
//!   auto-release and heuristic deadlock-risk gating
//! - [`detector`]: pure, deterministic conflict detection between two
//!   document snapshots
//! - [`resolver`]: pluggable resolution strategies (manual, automatic,
//!   assisted-merge)
//! - [`ConflictLog`]: per-document conflict and resolution history
//!
//! Lock expiry is swept from an injected [`Clock`], so tests drive time
//! explicitly instead of sleeping.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod deadlock;
pub mod detector;
pub mod history;
pub mod lock_table;
pub mod manager;
pub mod resolver;

pub use clock::{Clock, ManualClock, SystemClock};
pub use deadlock::{DeadlockEstimator, WaitForGraphEstimator};
pub use detector::detect;
pub use history::ConflictLog;
pub use manager::{AcquireRequest, LockConfig, LockManager};
pub use resolver::{
    resolve_all, strategy, AssistedMerge, Automatic, Manual, ResolutionContext,
    ResolutionStrategy,
};
