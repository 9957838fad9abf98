//! Lock types
//!
//! Locks arbitrate concurrent access at three granularities: whole
//! document, one section, or a single field. A document-level lock covers
//! every section and field lock on that document; a section lock covers
//! the fields inside it; field locks are otherwise independent.
//!
//! Invariant: at most one exclusive lock per (document, scope) at a time;
//! any number of shared locks may coexist as long as no exclusive lock is
//! held on the same or an overlapping scope.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timestamp::Timestamp;
use crate::types::{DocumentId, HolderId, LockId, SectionId};

/// Exclusive or shared access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockMode {
    /// Sole access; blocks every other holder
    Exclusive,
    /// Co-readable; blocks only exclusive requests
    Shared,
}

impl LockMode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LockMode::Exclusive => "exclusive",
            LockMode::Shared => "shared",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Scheduling priority of a lock request
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum LockPriority {
    /// Background work
    Low,
    /// Interactive editing (the default)
    #[default]
    Normal,
    /// Administrative operations
    High,
}

/// Granularity of a lock scope
///
/// Ordering reflects coverage: `Document > Section > Field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// A single field
    Field,
    /// One section and its fields
    Section,
    /// The whole document
    Document,
}

impl Granularity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Document => "document",
            Granularity::Section => "section",
            Granularity::Field => "field",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a lockable field, optionally scoped to a section
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    /// The enclosing section, if the field lives inside one
    pub section: Option<SectionId>,
    /// Field name (`body`, `heading`, `metadata.tags`, …)
    pub name: String,
}

impl FieldRef {
    /// A field inside a section
    pub fn in_section(section: impl Into<SectionId>, name: impl Into<String>) -> Self {
        FieldRef {
            section: Some(section.into()),
            name: name.into(),
        }
    }

    /// A top-level field (title, metadata, …)
    pub fn top_level(name: impl Into<String>) -> Self {
        FieldRef {
            section: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(s) => write!(f, "{}.{}", s, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// What a lock protects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockScope {
    /// The whole document
    Document,
    /// One section (and the fields inside it)
    Section(SectionId),
    /// A single field
    Field(FieldRef),
}

impl LockScope {
    /// The granularity of this scope
    pub fn granularity(&self) -> Granularity {
        match self {
            LockScope::Document => Granularity::Document,
            LockScope::Section(_) => Granularity::Section,
            LockScope::Field(_) => Granularity::Field,
        }
    }

    /// Whether this scope covers (is equal to or encloses) `other`
    ///
    /// Document covers everything on the document; a section covers
    /// itself and the fields inside it; a field covers only itself.
    pub fn covers(&self, other: &LockScope) -> bool {
        match (self, other) {
            (LockScope::Document, _) => true,
            (LockScope::Section(a), LockScope::Section(b)) => a == b,
            (LockScope::Section(a), LockScope::Field(f)) => f.section.as_ref() == Some(a),
            (LockScope::Field(a), LockScope::Field(b)) => a == b,
            _ => false,
        }
    }

    /// Whether two scopes overlap (either covers the other)
    pub fn overlaps(&self, other: &LockScope) -> bool {
        self.covers(other) || other.covers(self)
    }
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockScope::Document => write!(f, "document"),
            LockScope::Section(s) => write!(f, "section:{}", s),
            LockScope::Field(field) => write!(f, "field:{}", field),
        }
    }
}

/// Composite lock key: document plus scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    /// The document
    pub document: DocumentId,
    /// What on the document
    pub scope: LockScope,
}

impl LockKey {
    /// Key for a document-level lock
    pub fn document(document: DocumentId) -> Self {
        LockKey {
            document,
            scope: LockScope::Document,
        }
    }

    /// Key for a section-level lock
    pub fn section(document: DocumentId, section: impl Into<SectionId>) -> Self {
        LockKey {
            document,
            scope: LockScope::Section(section.into()),
        }
    }

    /// Key for a field-level lock
    pub fn field(document: DocumentId, field: FieldRef) -> Self {
        LockKey {
            document,
            scope: LockScope::Field(field),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.document, self.scope)
    }
}

/// A granted lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lock {
    /// Unique id of this grant
    pub id: LockId,
    /// What is locked
    pub key: LockKey,
    /// Who holds it
    pub holder: HolderId,
    /// Exclusive or shared
    pub mode: LockMode,
    /// When it was granted
    pub acquired_at: Timestamp,
    /// When it auto-releases
    pub expires_at: Timestamp,
    /// Optional free-text reason
    pub reason: Option<String>,
    /// Scheduling priority
    pub priority: LockPriority,
}

impl Lock {
    /// Whether this lock has expired at `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_id() -> DocumentId {
        DocumentId::new()
    }

    #[test]
    fn test_document_covers_everything() {
        let doc = LockScope::Document;
        assert!(doc.covers(&LockScope::Document));
        assert!(doc.covers(&LockScope::Section(SectionId::from("problem"))));
        assert!(doc.covers(&LockScope::Field(FieldRef::top_level("title"))));
    }

    #[test]
    fn test_section_covers_own_fields_only() {
        let section = LockScope::Section(SectionId::from("problem"));
        assert!(section.covers(&LockScope::Section(SectionId::from("problem"))));
        assert!(!section.covers(&LockScope::Section(SectionId::from("solution"))));
        assert!(section.covers(&LockScope::Field(FieldRef::in_section("problem", "body"))));
        assert!(!section.covers(&LockScope::Field(FieldRef::in_section("solution", "body"))));
        assert!(!section.covers(&LockScope::Field(FieldRef::top_level("title"))));
        assert!(!section.covers(&LockScope::Document));
    }

    #[test]
    fn test_field_covers_only_itself() {
        let field = LockScope::Field(FieldRef::in_section("problem", "body"));
        assert!(field.covers(&field.clone()));
        assert!(!field.covers(&LockScope::Field(FieldRef::in_section("problem", "heading"))));
        assert!(!field.covers(&LockScope::Document));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let doc = LockScope::Document;
        let field = LockScope::Field(FieldRef::top_level("title"));
        assert!(doc.overlaps(&field));
        assert!(field.overlaps(&doc));

        let a = LockScope::Field(FieldRef::in_section("problem", "body"));
        let b = LockScope::Field(FieldRef::in_section("solution", "body"));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_granularity_of_scopes() {
        assert_eq!(LockScope::Document.granularity(), Granularity::Document);
        assert_eq!(
            LockScope::Section(SectionId::from("x")).granularity(),
            Granularity::Section
        );
        assert_eq!(
            LockScope::Field(FieldRef::top_level("title")).granularity(),
            Granularity::Field
        );
    }

    #[test]
    fn test_lock_expiry() {
        let lock = Lock {
            id: LockId::new(),
            key: LockKey::document(doc_id()),
            holder: HolderId::new("alice"),
            mode: LockMode::Exclusive,
            acquired_at: Timestamp::from_secs(10),
            expires_at: Timestamp::from_secs(20),
            reason: None,
            priority: LockPriority::Normal,
        };
        assert!(!lock.is_expired(Timestamp::from_secs(19)));
        assert!(lock.is_expired(Timestamp::from_secs(20)));
        assert!(lock.is_expired(Timestamp::from_secs(21)));
    }

    #[test]
    fn test_lock_key_display() {
        let id = doc_id();
        let key = LockKey::section(id, "problem");
        assert!(key.to_string().contains("section:problem"));
    }

    #[test]
    fn test_lock_key_hash_equality() {
        use std::collections::HashSet;
        let id = doc_id();
        let mut set = HashSet::new();
        set.insert(LockKey::section(id, "problem"));
        set.insert(LockKey::section(id, "problem"));
        set.insert(LockKey::section(id, "solution"));
        assert_eq!(set.len(), 2);
    }
}
