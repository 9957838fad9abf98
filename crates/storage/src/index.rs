//! Search index
//!
//! Secondary indexes that answer the facade's search operation without
//! scanning the primary store: a token inverted index over title,
//! description, and section text, plus attribute indexes by type, status,
//! and tag. Ranking beyond token match is out of scope — the facade
//! sorts by document attributes.

use draftdb_core::{Document, DocumentId, DocumentStatus, DocumentType};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

/// Tokenize text into lowercase alphanumeric terms
///
/// Pipeline: split on non-alphanumeric boundaries → lowercase → drop
/// single-character terms. Shared with the version store's similarity
/// heuristic so both see the same token stream.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

#[derive(Default)]
struct IndexInner {
    term_docs: FxHashMap<String, HashSet<DocumentId>>,
    doc_terms: FxHashMap<DocumentId, HashSet<String>>,
    by_type: FxHashMap<DocumentType, HashSet<DocumentId>>,
    by_status: FxHashMap<DocumentStatus, HashSet<DocumentId>>,
    by_tag: FxHashMap<String, HashSet<DocumentId>>,
    all: HashSet<DocumentId>,
}

impl IndexInner {
    fn detach(&mut self, id: &DocumentId) {
        if let Some(terms) = self.doc_terms.remove(id) {
            for term in terms {
                if let Some(docs) = self.term_docs.get_mut(&term) {
                    docs.remove(id);
                    if docs.is_empty() {
                        self.term_docs.remove(&term);
                    }
                }
            }
        }
        for docs in self.by_type.values_mut() {
            docs.remove(id);
        }
        for docs in self.by_status.values_mut() {
            docs.remove(id);
        }
        for docs in self.by_tag.values_mut() {
            docs.remove(id);
        }
        self.all.remove(id);
    }
}

/// Token and attribute index over the stored documents
#[derive(Default)]
pub struct SearchIndex {
    inner: RwLock<IndexInner>,
}

impl SearchIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index or re-index a document
    pub fn upsert(&self, document: &Document) {
        let mut terms: HashSet<String> = HashSet::new();
        terms.extend(tokenize(&document.title));
        terms.extend(tokenize(&document.description));
        for block in document.content.text_blocks() {
            terms.extend(tokenize(block));
        }
        for tag in &document.metadata.tags {
            terms.extend(tokenize(tag));
        }

        let mut inner = self.inner.write();
        inner.detach(&document.id);
        for term in &terms {
            inner
                .term_docs
                .entry(term.clone())
                .or_default()
                .insert(document.id);
        }
        inner.doc_terms.insert(document.id, terms);
        inner
            .by_type
            .entry(document.doc_type)
            .or_default()
            .insert(document.id);
        inner
            .by_status
            .entry(document.metadata.status)
            .or_default()
            .insert(document.id);
        for tag in &document.metadata.tags {
            inner
                .by_tag
                .entry(tag.to_lowercase())
                .or_default()
                .insert(document.id);
        }
        inner.all.insert(document.id);
    }

    /// Drop a document from every index
    pub fn remove(&self, id: &DocumentId) {
        self.inner.write().detach(id);
    }

    /// Documents containing every term of `query`
    ///
    /// An empty or sub-token query matches everything.
    pub fn matching_text(&self, query: &str) -> HashSet<DocumentId> {
        let terms = tokenize(query);
        let inner = self.inner.read();
        if terms.is_empty() {
            return inner.all.clone();
        }
        let mut result: Option<HashSet<DocumentId>> = None;
        for term in terms {
            let docs = inner.term_docs.get(&term).cloned().unwrap_or_default();
            result = Some(match result {
                None => docs,
                Some(acc) => acc.intersection(&docs).copied().collect(),
            });
            if result.as_ref().is_some_and(|r| r.is_empty()) {
                break;
            }
        }
        result.unwrap_or_default()
    }

    /// Documents of a type
    pub fn with_type(&self, doc_type: DocumentType) -> HashSet<DocumentId> {
        self.inner
            .read()
            .by_type
            .get(&doc_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Documents in a status
    pub fn with_status(&self, status: DocumentStatus) -> HashSet<DocumentId> {
        self.inner
            .read()
            .by_status
            .get(&status)
            .cloned()
            .unwrap_or_default()
    }

    /// Documents carrying a tag (case-insensitive)
    pub fn with_tag(&self, tag: &str) -> HashSet<DocumentId> {
        self.inner
            .read()
            .by_tag
            .get(&tag.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Every indexed document
    pub fn all_ids(&self) -> HashSet<DocumentId> {
        self.inner.read().all.clone()
    }

    /// Number of indexed documents
    pub fn len(&self) -> usize {
        self.inner.read().all.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::{DocumentContent, Section, UserId};

    fn doc(title: &str, body: &str) -> Document {
        Document::new(title, UserId::new()).with_content(DocumentContent::Structured {
            sections: vec![Section::with_body("main", "Main", body)],
        })
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Hello, World!"), vec!["hello", "world"]);
        assert_eq!(tokenize("a b cd"), vec!["cd"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_text_match_all_terms() {
        let index = SearchIndex::new();
        let a = doc("Market sizing", "the market is large");
        let b = doc("Pricing", "pricing is hard");
        index.upsert(&a);
        index.upsert(&b);

        let hits = index.matching_text("market large");
        assert_eq!(hits.len(), 1);
        assert!(hits.contains(&a.id));

        assert!(index.matching_text("nonexistent").is_empty());
    }

    #[test]
    fn test_empty_query_matches_all() {
        let index = SearchIndex::new();
        let a = doc("A doc", "x");
        index.upsert(&a);
        assert_eq!(index.matching_text("").len(), 1);
    }

    #[test]
    fn test_upsert_replaces_old_terms() {
        let index = SearchIndex::new();
        let mut d = doc("Alpha", "first body");
        index.upsert(&d);
        assert!(!index.matching_text("alpha").is_empty());

        d.title = "Beta".into();
        index.upsert(&d);
        assert!(index.matching_text("alpha").is_empty());
        assert!(!index.matching_text("beta").is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_attribute_indexes() {
        let index = SearchIndex::new();
        let mut d = doc("Plan", "body");
        d.doc_type = DocumentType::Plan;
        d.metadata.status = DocumentStatus::InReview;
        d.metadata.tags = vec!["Q3".into()];
        index.upsert(&d);

        assert!(index.with_type(DocumentType::Plan).contains(&d.id));
        assert!(index.with_type(DocumentType::Pitch).is_empty());
        assert!(index.with_status(DocumentStatus::InReview).contains(&d.id));
        assert!(index.with_tag("q3").contains(&d.id));
    }

    #[test]
    fn test_remove() {
        let index = SearchIndex::new();
        let d = doc("Gone", "soon");
        index.upsert(&d);
        index.remove(&d.id);
        assert!(index.matching_text("gone").is_empty());
        assert!(index.is_empty());
    }
}
