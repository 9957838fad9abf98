//! DraftDB - Embedded versioned document store for collaborative editing
//!
//! DraftDB tracks every mutation to a structured document as an immutable
//! version, supports divergent branches and merges, arbitrates concurrent
//! access through multi-granularity locks, and detects and resolves
//! conflicts when independent edits collide.
//!
//! # Quick Start
//!
//! ```ignore
//! use draftdb::{Document, DocumentStore, EngineConfig, SaveOptions};
//!
//! // Open an in-memory store
//! let store = DocumentStore::open(EngineConfig::default())?;
//!
//! // Save a document (seeds version 1.0.0)
//! let doc = Document::new("Q3 Pitch", alice);
//! let outcome = store.save(doc, SaveOptions::default())?;
//! ```
//!
//! # Architecture
//!
//! All operations go through the [`DocumentStore`] facade, which composes
//! the version store, lock manager, conflict detector and resolver, cache,
//! search index, and backup archive. Internal tables are owned by their
//! component and never shared as mutable references.

// Re-export the public API from draftdb-engine
pub use draftdb_core::{
    Branch, BranchName, ChangeSet, Conflict, ConflictPayload, Document, DocumentContent,
    DocumentId, DocumentStatus, DocumentType, Error, FieldPath, FieldValue, HolderId, Lock,
    LockKey, LockMode, LockScope, MergeRecord, Result, Section, SectionId, SemVer, Severity,
    StrategyKind, Timestamp, UserId, VersionBump, VersionRecord, Visibility,
};
pub use draftdb_engine::*;
