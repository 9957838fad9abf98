//! The lock table
//!
//! Plain data structure owned by the [`crate::LockManager`] behind its
//! mutex — nothing here synchronizes. Locks are grouped per document so
//! granularity composition (document covers section covers field) is a
//! scan over one small vector.

use draftdb_core::{DocumentId, HolderId, Lock, LockId, LockKey, LockMode, LockScope, Timestamp};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Locks held on one document. Most documents carry a handful at most.
type DocLocks = SmallVec<[Lock; 4]>;

/// All held locks, grouped by document
#[derive(Debug, Default)]
pub struct LockTable {
    by_doc: FxHashMap<DocumentId, DocLocks>,
    doc_of: FxHashMap<LockId, DocumentId>,
}

impl LockTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a granted lock
    pub fn insert(&mut self, lock: Lock) {
        self.doc_of.insert(lock.id, lock.key.document);
        self.by_doc.entry(lock.key.document).or_default().push(lock);
    }

    /// Find the first live lock that blocks `holder` from taking
    /// `mode` on `scope`
    ///
    /// A lock blocks when it is held by someone else, its scope overlaps
    /// the requested scope, and at least one of the two sides is
    /// exclusive (shared-with-shared co-grants).
    pub fn blocking(
        &self,
        document: &DocumentId,
        scope: &LockScope,
        mode: LockMode,
        holder: &HolderId,
    ) -> Option<&Lock> {
        self.by_doc.get(document)?.iter().find(|l| {
            l.holder != *holder
                && l.key.scope.overlaps(scope)
                && (l.mode == LockMode::Exclusive || mode == LockMode::Exclusive)
        })
    }

    /// A mutable handle to the lock `holder` already has on exactly
    /// `scope` with `mode`, for TTL refresh on re-acquire
    pub fn held_by_mut(
        &mut self,
        document: &DocumentId,
        scope: &LockScope,
        mode: LockMode,
        holder: &HolderId,
    ) -> Option<&mut Lock> {
        self.by_doc
            .get_mut(document)?
            .iter_mut()
            .find(|l| l.holder == *holder && l.key.scope == *scope && l.mode == mode)
    }

    /// Whether `holder` already holds a lock covering `scope`
    pub fn holds_covering(
        &self,
        document: &DocumentId,
        scope: &LockScope,
        holder: &HolderId,
    ) -> bool {
        self.by_doc
            .get(document)
            .is_some_and(|locks| locks.iter().any(|l| l.holder == *holder && l.key.scope.covers(scope)))
    }

    /// All locks on a document, any granularity
    pub fn locks_on(&self, document: &DocumentId) -> &[Lock] {
        self.by_doc.get(document).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Locks `holder` holds on exactly `key`
    pub fn find(&self, key: &LockKey, holder: &HolderId) -> Option<&Lock> {
        self.by_doc
            .get(&key.document)?
            .iter()
            .find(|l| l.key.scope == key.scope && l.holder == *holder)
    }

    /// Remove every lock on `key`, filtered by holder when given
    ///
    /// Returns the removed locks.
    pub fn remove(&mut self, key: &LockKey, holder: Option<&HolderId>) -> Vec<Lock> {
        let Some(locks) = self.by_doc.get_mut(&key.document) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        locks.retain(|l| {
            let matches =
                l.key.scope == key.scope && holder.map_or(true, |h| l.holder == *h);
            if matches {
                removed.push(l.clone());
            }
            !matches
        });
        if locks.is_empty() {
            self.by_doc.remove(&key.document);
        }
        for lock in &removed {
            self.doc_of.remove(&lock.id);
        }
        removed
    }

    /// Remove a lock by id (expiry sweep path). Returns it if present.
    pub fn remove_by_id(&mut self, id: &LockId) -> Option<Lock> {
        let doc = self.doc_of.remove(id)?;
        let locks = self.by_doc.get_mut(&doc)?;
        let pos = locks.iter().position(|l| l.id == *id)?;
        let lock = locks.swap_remove(pos);
        if locks.is_empty() {
            self.by_doc.remove(&doc);
        }
        Some(lock)
    }

    /// Total held locks
    pub fn len(&self) -> usize {
        self.doc_of.len()
    }

    /// Whether no locks are held
    pub fn is_empty(&self) -> bool {
        self.doc_of.is_empty()
    }

    /// Invariant check used by tests: at most one exclusive holder per
    /// overlapping scope pair, and never exclusive alongside shared
    pub fn exclusivity_holds(&self) -> bool {
        self.by_doc.values().all(|locks| {
            locks.iter().enumerate().all(|(i, a)| {
                locks.iter().skip(i + 1).all(|b| {
                    !(a.key.scope.overlaps(&b.key.scope)
                        && a.holder != b.holder
                        && (a.mode == LockMode::Exclusive || b.mode == LockMode::Exclusive))
                })
            })
        })
    }
}

/// Build a lock value; the manager assigns expiry from its clock
#[allow(clippy::too_many_arguments)]
pub fn build_lock(
    key: LockKey,
    holder: HolderId,
    mode: LockMode,
    acquired_at: Timestamp,
    expires_at: Timestamp,
    reason: Option<String>,
    priority: draftdb_core::LockPriority,
) -> Lock {
    Lock {
        id: LockId::new(),
        key,
        holder,
        mode,
        acquired_at,
        expires_at,
        reason,
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::{FieldRef, LockPriority};

    fn lock(doc: DocumentId, scope: LockScope, holder: &str, mode: LockMode) -> Lock {
        build_lock(
            LockKey {
                document: doc,
                scope,
            },
            HolderId::new(holder),
            mode,
            Timestamp::from_secs(0),
            Timestamp::from_secs(60),
            None,
            LockPriority::Normal,
        )
    }

    #[test]
    fn test_exclusive_blocks_foreign_request() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Exclusive));

        let blocking = table.blocking(
            &doc,
            &LockScope::Section("problem".into()),
            LockMode::Exclusive,
            &HolderId::new("bob"),
        );
        assert!(blocking.is_some());
        assert_eq!(blocking.unwrap().holder.as_str(), "alice");
    }

    #[test]
    fn test_own_lock_never_blocks() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Exclusive));

        assert!(table
            .blocking(
                &doc,
                &LockScope::Document,
                LockMode::Exclusive,
                &HolderId::new("alice")
            )
            .is_none());
    }

    #[test]
    fn test_shared_with_shared_allowed() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Shared));

        assert!(table
            .blocking(
                &doc,
                &LockScope::Document,
                LockMode::Shared,
                &HolderId::new("bob")
            )
            .is_none());
        // ... but an exclusive request against the shared lock is blocked
        assert!(table
            .blocking(
                &doc,
                &LockScope::Document,
                LockMode::Exclusive,
                &HolderId::new("bob")
            )
            .is_some());
    }

    #[test]
    fn test_disjoint_field_locks_independent() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(
            doc,
            LockScope::Field(FieldRef::in_section("problem", "body")),
            "alice",
            LockMode::Exclusive,
        ));

        assert!(table
            .blocking(
                &doc,
                &LockScope::Field(FieldRef::in_section("solution", "body")),
                LockMode::Exclusive,
                &HolderId::new("bob")
            )
            .is_none());
    }

    #[test]
    fn test_section_blocks_inner_field() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(
            doc,
            LockScope::Section("problem".into()),
            "alice",
            LockMode::Exclusive,
        ));

        assert!(table
            .blocking(
                &doc,
                &LockScope::Field(FieldRef::in_section("problem", "body")),
                LockMode::Exclusive,
                &HolderId::new("bob")
            )
            .is_some());
    }

    #[test]
    fn test_remove_by_holder() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Shared));
        table.insert(lock(doc, LockScope::Document, "bob", LockMode::Shared));

        let key = LockKey::document(doc);
        let removed = table.remove(&key, Some(&HolderId::new("alice")));
        assert_eq!(removed.len(), 1);
        assert_eq!(table.locks_on(&doc).len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_by_id() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        let l = lock(doc, LockScope::Document, "alice", LockMode::Exclusive);
        let id = l.id;
        table.insert(l);

        assert!(table.remove_by_id(&id).is_some());
        assert!(table.remove_by_id(&id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_holds_covering() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Exclusive));

        let field = LockScope::Field(FieldRef::in_section("problem", "body"));
        assert!(table.holds_covering(&doc, &field, &HolderId::new("alice")));
        assert!(!table.holds_covering(&doc, &field, &HolderId::new("bob")));
    }

    #[test]
    fn test_exclusivity_invariant_checker() {
        let mut table = LockTable::new();
        let doc = DocumentId::new();
        table.insert(lock(doc, LockScope::Document, "alice", LockMode::Shared));
        table.insert(lock(doc, LockScope::Document, "bob", LockMode::Shared));
        assert!(table.exclusivity_holds());

        table.insert(lock(doc, LockScope::Document, "carol", LockMode::Exclusive));
        assert!(!table.exclusivity_holds());
    }
}
