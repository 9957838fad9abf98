//! Per-document conflict history
//!
//! Retains every detected conflict and every resolution outcome for
//! analytics. Append-only from the engine's perspective; the whole
//! history for a document is dropped only when the document itself is
//! deleted without `keep_history`.

use draftdb_core::{Conflict, DocumentId, ResolutionRecord};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

#[derive(Default)]
struct LogInner {
    conflicts: FxHashMap<DocumentId, Vec<Conflict>>,
    resolutions: FxHashMap<DocumentId, Vec<ResolutionRecord>>,
}

/// Conflict and resolution history, keyed by document
#[derive(Default)]
pub struct ConflictLog {
    inner: Mutex<LogInner>,
}

impl ConflictLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append detected conflicts for a document
    pub fn record_conflicts(&self, document: DocumentId, conflicts: &[Conflict]) {
        if conflicts.is_empty() {
            return;
        }
        self.inner
            .lock()
            .conflicts
            .entry(document)
            .or_default()
            .extend_from_slice(conflicts);
    }

    /// Append resolution outcomes for a document
    pub fn record_resolutions(&self, document: DocumentId, records: &[ResolutionRecord]) {
        if records.is_empty() {
            return;
        }
        self.inner
            .lock()
            .resolutions
            .entry(document)
            .or_default()
            .extend_from_slice(records);
    }

    /// Every conflict ever recorded for a document
    pub fn conflicts_for(&self, document: &DocumentId) -> Vec<Conflict> {
        self.inner
            .lock()
            .conflicts
            .get(document)
            .cloned()
            .unwrap_or_default()
    }

    /// Every resolution ever recorded for a document
    pub fn resolutions_for(&self, document: &DocumentId) -> Vec<ResolutionRecord> {
        self.inner
            .lock()
            .resolutions
            .get(document)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the whole history for a document
    pub fn clear_document(&self, document: &DocumentId) {
        let mut inner = self.inner.lock();
        inner.conflicts.remove(document);
        inner.resolutions.remove(document);
    }

    /// Number of documents with recorded conflicts
    pub fn len(&self) -> usize {
        self.inner.lock().conflicts.len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::{
        ConflictPayload, FieldPath, MetadataField, FieldValue, ResolutionOutcome, StrategyKind,
        Timestamp,
    };

    fn conflict(doc: DocumentId) -> Conflict {
        Conflict::new(
            doc,
            ConflictPayload::Metadata {
                field: MetadataField::Status,
                original: FieldValue::Text("a".into()),
                modified: FieldValue::Text("b".into()),
            },
            FieldPath::metadata("status"),
            Timestamp::from_secs(1),
        )
    }

    #[test]
    fn test_record_and_fetch_conflicts() {
        let log = ConflictLog::new();
        let doc = DocumentId::new();
        log.record_conflicts(doc, &[conflict(doc), conflict(doc)]);
        log.record_conflicts(doc, &[conflict(doc)]);

        assert_eq!(log.conflicts_for(&doc).len(), 3);
        assert_eq!(log.len(), 1);
        assert!(log.conflicts_for(&DocumentId::new()).is_empty());
    }

    #[test]
    fn test_empty_batch_is_a_no_op() {
        let log = ConflictLog::new();
        log.record_conflicts(DocumentId::new(), &[]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_record_resolutions() {
        let log = ConflictLog::new();
        let doc = DocumentId::new();
        let record = ResolutionRecord {
            conflict: conflict(doc),
            strategy: StrategyKind::Manual,
            outcome: ResolutionOutcome::Deferred,
            resolved_at: Timestamp::from_secs(2),
        };
        log.record_resolutions(doc, &[record]);
        assert_eq!(log.resolutions_for(&doc).len(), 1);
    }

    #[test]
    fn test_clear_document() {
        let log = ConflictLog::new();
        let doc = DocumentId::new();
        log.record_conflicts(doc, &[conflict(doc)]);
        log.clear_document(&doc);
        assert!(log.conflicts_for(&doc).is_empty());
        assert!(log.is_empty());
    }
}
