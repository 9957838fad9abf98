//! Branch and merge types
//!
//! A branch is a named pointer into a document's version sequence, not a
//! separate storage area: resolving a branch returns the newest version
//! tagged with its name, falling back to the base version. Merges append
//! to the target line and are recorded one [`MergeRecord`] per attempt,
//! blocked attempts included.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::conflict::StrategyKind;
use crate::semver::SemVer;
use crate::timestamp::Timestamp;
use crate::types::{BranchName, UserId};

/// A named branch of a document's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// Unique name within the document
    pub name: BranchName,
    /// The version the branch was created from
    pub base_version: SemVer,
    /// Who created it
    pub created_by: UserId,
    /// When
    pub created_at: Timestamp,
    /// Whether the branch has been merged
    pub merged: bool,
    /// When it was merged, once merged
    pub merged_at: Option<Timestamp>,
    /// Who merged it, once merged
    pub merged_by: Option<UserId>,
}

impl Branch {
    /// Create an unmerged branch
    pub fn new(
        name: BranchName,
        base_version: SemVer,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Self {
        Branch {
            name,
            base_version,
            created_by,
            created_at,
            merged: false,
            merged_at: None,
            merged_by: None,
        }
    }

    /// Mark the branch merged
    pub fn mark_merged(&mut self, by: UserId, at: Timestamp) {
        self.merged = true;
        self.merged_at = Some(at);
        self.merged_by = Some(by);
    }
}

/// How a merge attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeOutcome {
    /// Clean merge, no unresolved conflicts
    Merged,
    /// Unresolved conflicts and `force` not set; target untouched
    Blocked,
    /// Merged despite conflicts (`force`); conflicts recorded
    Forced,
}

impl MergeOutcome {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeOutcome::Merged => "merged",
            MergeOutcome::Blocked => "blocked",
            MergeOutcome::Forced => "forced",
        }
    }
}

impl fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of one merge attempt
///
/// Append-only: one record per attempt, including blocked ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    /// Branch the changes came from
    pub source: BranchName,
    /// Branch the changes went to
    pub target: BranchName,
    /// When the attempt happened
    pub timestamp: Timestamp,
    /// Who attempted it
    pub actor: UserId,
    /// How many conflicts were detected
    pub conflict_count: usize,
    /// The resolution strategy in effect
    pub strategy: StrategyKind,
    /// How the attempt ended
    pub outcome: MergeOutcome,
    /// The target-line version the merge produced, if any
    pub merged_version: Option<SemVer>,
}
