//! Version records
//!
//! A [`VersionRecord`] is one immutable entry in a document's history:
//! the version triple, who and when, the changesets that produced it, and
//! a full snapshot of the document at that point. Snapshots are shared
//! `Arc`s — rollback and branch resolution hand out the same allocation
//! instead of deep-copying.
//!
//! Records are created once per accepted mutation and never mutated
//! afterwards; only the retention policy may remove them.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::changeset::ChangeSet;
use crate::document::Document;
use crate::semver::SemVer;
use crate::timestamp::Timestamp;
use crate::types::{BranchName, UserId};

/// One immutable entry in a document's version history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// The version triple, strictly greater than every earlier entry
    pub number: SemVer,
    /// When the version was created
    pub timestamp: Timestamp,
    /// Who created it
    pub author: UserId,
    /// The changesets that produced it
    pub changes: Vec<ChangeSet>,
    /// Optional free-text message
    pub message: Option<String>,
    /// The branch this version belongs to
    pub branch: BranchName,
    /// Full snapshot of the document at this version
    snapshot: Arc<Document>,
}

impl VersionRecord {
    /// Create a record snapshotting `document`
    pub fn new(
        number: SemVer,
        document: Document,
        author: UserId,
        changes: Vec<ChangeSet>,
        message: Option<String>,
        branch: BranchName,
        timestamp: Timestamp,
    ) -> Self {
        VersionRecord {
            number,
            timestamp,
            author,
            changes,
            message,
            branch,
            snapshot: Arc::new(document),
        }
    }

    /// Create a record reusing an existing snapshot allocation
    ///
    /// For callers that already hold a snapshot `Arc` (re-tagging a
    /// version onto another line, importing history): the new record's
    /// snapshot *is* the given allocation, shared, not copied.
    pub fn with_shared_snapshot(
        number: SemVer,
        snapshot: Arc<Document>,
        author: UserId,
        changes: Vec<ChangeSet>,
        message: Option<String>,
        branch: BranchName,
        timestamp: Timestamp,
    ) -> Self {
        VersionRecord {
            number,
            timestamp,
            author,
            changes,
            message,
            branch,
            snapshot,
        }
    }

    /// The snapshot taken at this version
    pub fn snapshot(&self) -> &Document {
        &self.snapshot
    }

    /// The snapshot, shared
    pub fn snapshot_arc(&self) -> Arc<Document> {
        Arc::clone(&self.snapshot)
    }
}
