//! Facade operation options and results

use draftdb_core::{
    BranchName, Conflict, Document, DocumentStatus, DocumentType, HolderId, Lock, LockMode,
    SemVer, StrategyKind, Timestamp, UserId, VersionBump,
};
use std::sync::Arc;
use std::time::Duration;

/// Options for [`crate::DocumentStore::save`]
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Append a version record for this save (default true)
    pub create_version: bool,
    /// Which component of the version triple to bump
    pub bump: VersionBump,
    /// Free-text version message
    pub message: Option<String>,
    /// Lock mode taken around the write
    pub lock_mode: LockMode,
    /// Lock TTL override
    pub lock_ttl: Option<Duration>,
    /// Write a backup bundle after committing
    pub create_backup: bool,
    /// Overwrite despite detected conflicts (conflicts are still
    /// recorded) and bypass the deadlock-risk gate
    pub force: bool,
    /// Who is saving; defaults to the document's `last_modified_by`
    pub actor: Option<UserId>,
    /// Lock holder identity; defaults to the actor's id
    pub holder: Option<HolderId>,
    /// Branch line the version lands on
    pub branch: BranchName,
    /// The version the caller based their edit on; defaults to the
    /// document's own `version` field
    pub base_version: Option<SemVer>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            create_version: true,
            bump: VersionBump::Patch,
            message: None,
            lock_mode: LockMode::Exclusive,
            lock_ttl: None,
            create_backup: false,
            force: false,
            actor: None,
            holder: None,
            branch: BranchName::main(),
            base_version: None,
        }
    }
}

impl SaveOptions {
    /// Set the version bump
    pub fn with_bump(mut self, bump: VersionBump) -> Self {
        self.bump = bump;
        self
    }

    /// Set the version message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the acting user
    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Set the lock holder
    pub fn with_holder(mut self, holder: impl Into<HolderId>) -> Self {
        self.holder = Some(holder.into());
        self
    }

    /// Target a branch line
    pub fn on_branch(mut self, branch: BranchName) -> Self {
        self.branch = branch;
        self
    }

    /// Request a backup after commit
    pub fn with_backup(mut self) -> Self {
        self.create_backup = true;
        self
    }

    /// Overwrite despite conflicts
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    /// Skip version creation
    pub fn without_version(mut self) -> Self {
        self.create_version = false;
        self
    }
}

/// Result of a save: committed, or blocked by conflicts
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// The save committed
    Saved {
        /// The stored document (shared snapshot)
        document: Arc<Document>,
        /// The version the save produced, when versioning was on
        version: Option<SemVer>,
    },
    /// Concurrent edits collided and `force` was not set; nothing was
    /// written
    Conflicted {
        /// The detected conflicts
        conflicts: Vec<Conflict>,
    },
}

impl SaveOutcome {
    /// Whether the save committed
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    /// The conflicts, when blocked
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            SaveOutcome::Conflicted { conflicts } => conflicts,
            SaveOutcome::Saved { .. } => &[],
        }
    }
}

/// Options for [`crate::DocumentStore::get`]
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    /// Skip the cache and read the primary store
    pub bypass_cache: bool,
    /// Attach the live locks on the document
    pub include_lock_info: bool,
    /// Attach a version summary
    pub include_version_info: bool,
    /// Attach the recorded conflict history
    pub include_conflict_history: bool,
}

impl GetOptions {
    /// Attach every kind of metadata
    pub fn with_everything() -> Self {
        GetOptions {
            bypass_cache: false,
            include_lock_info: true,
            include_version_info: true,
            include_conflict_history: true,
        }
    }
}

/// Compact view of a document's version state
#[derive(Debug, Clone, PartialEq)]
pub struct VersionSummary {
    /// Current head version
    pub current: SemVer,
    /// Total versions retained
    pub total_versions: usize,
    /// Author of the head version
    pub last_author: UserId,
    /// Timestamp of the head version
    pub last_modified: Timestamp,
}

/// A document plus requested metadata, returned by `get`
#[derive(Debug, Clone)]
pub struct DocumentView {
    /// The document (shared snapshot)
    pub document: Arc<Document>,
    /// Live locks, when requested
    pub locks: Option<Vec<Lock>>,
    /// Version summary, when requested
    pub version: Option<VersionSummary>,
    /// Conflict history, when requested
    pub conflicts: Option<Vec<Conflict>>,
}

/// Options for [`crate::DocumentStore::delete`]
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Delete even when someone else holds a lock
    pub force: bool,
    /// Write a final backup before deleting
    pub create_backup: bool,
    /// Keep the version history and conflict log around
    pub keep_history: bool,
    /// Who is deleting (for the foreign-lock check)
    pub holder: Option<HolderId>,
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteReport {
    /// When the delete committed
    pub deleted_at: Timestamp,
}

/// Sort key for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Last-modified timestamp (the default)
    #[default]
    UpdatedAt,
    /// Creation timestamp
    CreatedAt,
    /// Title, lexicographic
    Title,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Descending (the default)
    #[default]
    Desc,
    /// Ascending
    Asc,
}

/// A search request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Full-text terms; all must match
    pub text: Option<String>,
    /// Restrict to a document type
    pub doc_type: Option<DocumentType>,
    /// Restrict to a status
    pub status: Option<DocumentStatus>,
    /// Restrict to documents carrying all of these tags
    pub tags: Vec<String>,
    /// Sort key
    pub sort_by: SortBy,
    /// Sort direction
    pub sort_order: SortOrder,
    /// Page size
    pub limit: usize,
    /// Page offset
    pub offset: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            text: None,
            doc_type: None,
            status: None,
            tags: Vec::new(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            limit: 20,
            offset: 0,
        }
    }
}

impl SearchQuery {
    /// A full-text query with defaults
    pub fn text(query: impl Into<String>) -> Self {
        SearchQuery {
            text: Some(query.into()),
            ..Self::default()
        }
    }
}

/// Search results: one page of hydrated documents plus the total count
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// The page of matching documents
    pub hits: Vec<Document>,
    /// Matches before pagination
    pub total: usize,
}

/// Options for [`crate::DocumentStore::merge_branch`]
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Merge despite unresolved conflicts (recorded, never dropped)
    pub force: bool,
    /// Strategy applied to detected conflicts before deciding
    pub strategy: StrategyKind,
    /// Who is merging
    pub actor: UserId,
}

impl MergeOptions {
    /// A non-forced merge by `actor` with the given strategy
    pub fn new(actor: UserId, strategy: StrategyKind) -> Self {
        MergeOptions {
            force: false,
            strategy,
            actor,
        }
    }

    /// Merge despite unresolved conflicts
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}
