//! Document integrity checks
//!
//! Runs before any lock, version, or persistence side effect: a document
//! that fails here costs nothing. Bounds come from
//! [`draftdb_core::limits`].

use draftdb_core::{limits, Document, DocumentContent, Error, Result};
use std::collections::HashSet;

/// Validate a document against the model limits
///
/// # Errors
///
/// Returns [`Error::Integrity`] naming the offending field.
pub fn check_document(document: &Document) -> Result<()> {
    if document.title.trim().is_empty() {
        return Err(Error::integrity("title", "must not be empty"));
    }
    if document.title.len() > limits::MAX_TITLE_LEN {
        return Err(Error::integrity(
            "title",
            format!("exceeds {} bytes", limits::MAX_TITLE_LEN),
        ));
    }
    if document.description.len() > limits::MAX_DESCRIPTION_LEN {
        return Err(Error::integrity(
            "description",
            format!("exceeds {} bytes", limits::MAX_DESCRIPTION_LEN),
        ));
    }

    match &document.content {
        DocumentContent::Structured { sections } => {
            if sections.len() > limits::MAX_SECTIONS {
                return Err(Error::integrity(
                    "content.sections",
                    format!("more than {} sections", limits::MAX_SECTIONS),
                ));
            }
            let mut seen = HashSet::new();
            for section in sections {
                if section.id.as_str().is_empty() {
                    return Err(Error::integrity("content.sections", "empty section id"));
                }
                if !seen.insert(&section.id) {
                    return Err(Error::integrity(
                        "content.sections",
                        format!("duplicate section id '{}'", section.id),
                    ));
                }
                if section.body.len() > limits::MAX_SECTION_BODY_LEN {
                    return Err(Error::integrity(
                        "content.sections",
                        format!(
                            "section '{}' body exceeds {} bytes",
                            section.id,
                            limits::MAX_SECTION_BODY_LEN
                        ),
                    ));
                }
            }
        }
        DocumentContent::Freeform { body } => {
            if body.len() > limits::MAX_FREEFORM_BODY_LEN {
                return Err(Error::integrity(
                    "content.body",
                    format!("exceeds {} bytes", limits::MAX_FREEFORM_BODY_LEN),
                ));
            }
        }
    }

    if document.metadata.tags.len() > limits::MAX_TAGS {
        return Err(Error::integrity(
            "metadata.tags",
            format!("more than {} tags", limits::MAX_TAGS),
        ));
    }
    for tag in &document.metadata.tags {
        if tag.is_empty() || tag.len() > limits::MAX_TAG_LEN {
            return Err(Error::integrity(
                "metadata.tags",
                format!("tag '{}' is empty or exceeds {} bytes", tag, limits::MAX_TAG_LEN),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::{Section, UserId};

    fn valid() -> Document {
        Document::new("Fine", UserId::new())
    }

    #[test]
    fn test_valid_document_passes() {
        assert!(check_document(&valid()).is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        let mut doc = valid();
        doc.title = "   ".into();
        let err = check_document(&doc).unwrap_err();
        assert!(matches!(err, Error::Integrity { field: "title", .. }));
    }

    #[test]
    fn test_oversized_title_rejected() {
        let mut doc = valid();
        doc.title = "x".repeat(limits::MAX_TITLE_LEN + 1);
        assert!(check_document(&doc).is_err());
    }

    #[test]
    fn test_duplicate_section_ids_rejected() {
        let mut doc = valid();
        doc.content = DocumentContent::Structured {
            sections: vec![Section::new("dup", "A"), Section::new("dup", "B")],
        };
        let err = check_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity {
                field: "content.sections",
                ..
            }
        ));
    }

    #[test]
    fn test_too_many_tags_rejected() {
        let mut doc = valid();
        doc.metadata.tags = (0..=limits::MAX_TAGS).map(|i| format!("t{}", i)).collect();
        assert!(check_document(&doc).is_err());
    }

    #[test]
    fn test_empty_tag_rejected() {
        let mut doc = valid();
        doc.metadata.tags = vec!["".into()];
        assert!(check_document(&doc).is_err());
    }
}
