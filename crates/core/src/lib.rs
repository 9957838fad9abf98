//! Core types for the DraftDB document store
//!
//! This crate defines the shared vocabulary of the system: the document
//! model, semantic version triples, changesets, version records, branches,
//! locks, conflicts, and the unified error taxonomy. It contains no
//! behavior beyond what the types themselves guarantee — the stores and
//! managers that own tables of these types live in the sibling crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod branch;
pub mod changeset;
pub mod conflict;
pub mod document;
pub mod error;
pub mod limits;
pub mod lock;
pub mod semver;
pub mod timestamp;
pub mod types;
pub mod version;

pub use branch::{Branch, MergeOutcome, MergeRecord};
pub use changeset::{diff_documents, ChangeKind, ChangeSet, FieldPath, FieldValue};
pub use conflict::{
    Conflict, ConflictKind, ConflictPayload, MetadataField, PermissionRole, ResolutionOutcome,
    ResolutionRecord, Severity, Side, StrategyKind,
};
pub use document::{
    Complexity, ContentFormat, Document, DocumentContent, DocumentMetadata, DocumentStatus,
    Permissions, Section, Visibility,
};
pub use error::{Error, ResourceKind, Result};
pub use lock::{FieldRef, Granularity, Lock, LockKey, LockMode, LockPriority, LockScope};
pub use semver::{SemVer, VersionBump};
pub use timestamp::Timestamp;
pub use types::{
    BranchName, ConflictId, DocumentId, DocumentType, HolderId, LockId, SectionId, UserId,
};
pub use version::VersionRecord;
