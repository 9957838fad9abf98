//! Primary store abstraction
//!
//! The primary store is the system of record for current document state.
//! Version history lives in the engine's version store; backups live in
//! the durability crate. Implementations must be safe to call from any
//! thread.

use draftdb_core::{Document, DocumentId, Result};

/// Pluggable persistence underneath the facade
///
/// The in-memory implementation is [`crate::MemoryStore`]; a disk-backed
/// implementation can be swapped in without touching the engine.
pub trait PrimaryStore: Send + Sync {
    /// Persist the current state of a document, replacing any previous state
    fn persist(&self, document: &Document) -> Result<()>;

    /// Load a document by id
    fn load(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// Remove a document. Returns `true` if it existed.
    fn remove(&self, id: &DocumentId) -> Result<bool>;

    /// Whether a document exists
    fn contains(&self, id: &DocumentId) -> Result<bool>;

    /// All stored document ids, in no particular order
    fn list_ids(&self) -> Result<Vec<DocumentId>>;

    /// Number of stored documents
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
