//! In-memory primary store
//!
//! A concurrent map of current document state: the single-process
//! authority behind the facade. Deliberately simple; durability concerns
//! (backups) live in the durability crate.

use dashmap::DashMap;
use draftdb_core::{Document, DocumentId, Result};

use crate::traits::PrimaryStore;

/// Concurrent in-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<DocumentId, Document>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }
}

impl PrimaryStore for MemoryStore {
    fn persist(&self, document: &Document) -> Result<()> {
        self.documents.insert(document.id, document.clone());
        Ok(())
    }

    fn load(&self, id: &DocumentId) -> Result<Option<Document>> {
        Ok(self.documents.get(id).map(|entry| entry.value().clone()))
    }

    fn remove(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.documents.remove(id).is_some())
    }

    fn contains(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.documents.contains_key(id))
    }

    fn list_ids(&self) -> Result<Vec<DocumentId>> {
        Ok(self.documents.iter().map(|entry| *entry.key()).collect())
    }

    fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::UserId;

    #[test]
    fn test_persist_and_load() {
        let store = MemoryStore::new();
        let doc = Document::new("T", UserId::new());
        store.persist(&doc).unwrap();

        let loaded = store.load(&doc.id).unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_persist_replaces() {
        let store = MemoryStore::new();
        let mut doc = Document::new("T", UserId::new());
        store.persist(&doc).unwrap();

        doc.title = "T2".into();
        store.persist(&doc).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(&doc.id).unwrap().unwrap().title, "T2");
    }

    #[test]
    fn test_remove() {
        let store = MemoryStore::new();
        let doc = Document::new("T", UserId::new());
        store.persist(&doc).unwrap();

        assert!(store.remove(&doc.id).unwrap());
        assert!(!store.remove(&doc.id).unwrap());
        assert!(store.load(&doc.id).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_contains_and_list() {
        let store = MemoryStore::new();
        let a = Document::new("A", UserId::new());
        let b = Document::new("B", UserId::new());
        store.persist(&a).unwrap();
        store.persist(&b).unwrap();

        assert!(store.contains(&a.id).unwrap());
        let mut ids = store.list_ids().unwrap();
        ids.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
