//! Error types for the document store
//!
//! This module defines all error kinds surfaced by the system. We use
//! `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Propagation policy: expired locks are recovered locally (auto-release)
//! and never surface here; every other failure carries enough structured
//! context (holder, expiry, conflict list, version numbers) for the caller
//! to act on it.

use crate::conflict::Conflict;
use crate::semver::SemVer;
use crate::timestamp::Timestamp;
use crate::types::{BranchName, HolderId};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kind of resource named by a [`Error::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A document
    Document,
    /// A version within a document's history
    Version,
    /// A branch within a document's history
    Branch,
    /// A backup bundle
    Backup,
    /// A lock
    Lock,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceKind::Document => "document",
            ResourceKind::Version => "version",
            ResourceKind::Branch => "branch",
            ResourceKind::Backup => "backup",
            ResourceKind::Lock => "lock",
        };
        write!(f, "{}", s)
    }
}

/// Error taxonomy for the document store
#[derive(Debug, Error)]
pub enum Error {
    /// Document, version, branch, or backup absent. Surfaced directly,
    /// never retried.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of resource was missing
        kind: ResourceKind,
        /// Identifier of the missing resource
        id: String,
    },

    /// An exclusive lock is held by another holder. The holder identity
    /// and expiry let the caller retry later.
    #[error("locked by {holder} until {expires_at}")]
    LockConflict {
        /// Current holder of the blocking lock
        holder: HolderId,
        /// When the blocking lock auto-releases
        expires_at: Timestamp,
    },

    /// Granting the lock would risk a circular wait. Never silently
    /// granted; the caller should back off for `suggested_wait`.
    #[error("deadlock risk {score:.2}; retry after {suggested_wait:?}")]
    DeadlockRisk {
        /// Heuristic risk score in [0, 1]
        score: f64,
        /// Suggested back-off before retrying
        suggested_wait: Duration,
    },

    /// Stale base version on write (optimistic concurrency). The caller
    /// must re-fetch and retry.
    #[error("version conflict: base {expected} is stale, head is {actual}")]
    VersionConflict {
        /// The base version the caller presented
        expected: SemVer,
        /// The actual head of the history
        actual: SemVer,
    },

    /// Document failed validation. Fails fast before any lock, version,
    /// or persistence side effect.
    #[error("integrity check failed on {field}: {reason}")]
    Integrity {
        /// The offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Merge attempted with unresolved conflicts and `force` not set.
    /// No partial merge occurs.
    #[error("merge blocked by {} unresolved conflict(s)", conflicts.len())]
    UnresolvedConflicts {
        /// The conflicts that must be resolved (or forced past) first
        conflicts: Vec<Conflict>,
    },

    /// Branch creation with a name that already exists on the document
    #[error("branch '{name}' already exists")]
    BranchExists {
        /// The duplicate name
        name: BranchName,
    },

    /// Invalid argument or state
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error (backup files, persistence)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Primary storage layer error
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Construct a [`Error::NotFound`] for a document
    pub fn document_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            kind: ResourceKind::Document,
            id: id.to_string(),
        }
    }

    /// Construct a [`Error::NotFound`] for a version
    pub fn version_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            kind: ResourceKind::Version,
            id: id.to_string(),
        }
    }

    /// Construct a [`Error::NotFound`] for a branch
    pub fn branch_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            kind: ResourceKind::Branch,
            id: id.to_string(),
        }
    }

    /// Construct a [`Error::NotFound`] for a backup
    pub fn backup_not_found(id: impl ToString) -> Self {
        Error::NotFound {
            kind: ResourceKind::Backup,
            id: id.to_string(),
        }
    }

    /// Construct a [`Error::InvalidInput`]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Construct a [`Error::Integrity`]
    pub fn integrity(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Integrity {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
