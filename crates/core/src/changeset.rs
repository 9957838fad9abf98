//! Changesets: the typed difference between two document states
//!
//! Every version record carries the list of [`ChangeSet`] entries that
//! produced it. Changesets are a tagged union — add, modify, remove, or
//! rollback — over typed [`FieldValue`]s, so downstream consumers match
//! exhaustively instead of inspecting stringly-typed payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::document::{ContentFormat, Document, DocumentStatus, Visibility};
use crate::semver::SemVer;
use crate::types::{SectionId, UserId};

/// Dotted path to a document field, e.g. `content.sections.problem.body`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldPath(String);

impl FieldPath {
    /// Path to a top-level field (`title`, `description`)
    pub fn top(field: &str) -> Self {
        FieldPath(field.to_string())
    }

    /// Path to a metadata field (`metadata.status`)
    pub fn metadata(field: &str) -> Self {
        FieldPath(format!("metadata.{}", field))
    }

    /// Path to a permission list (`permissions.editors`)
    pub fn permissions(role: &str) -> Self {
        FieldPath(format!("permissions.{}", role))
    }

    /// Path to a section field (`content.sections.<id>.<field>`)
    pub fn section(id: &SectionId, field: &str) -> Self {
        FieldPath(format!("content.sections.{}.{}", id, field))
    }

    /// Path to the freeform body (`content.body`)
    pub fn body() -> Self {
        FieldPath("content.body".to_string())
    }

    /// Path to the content format discriminant (`content.format`)
    pub fn format() -> Self {
        FieldPath("content.format".to_string())
    }

    /// Get the dotted path
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed field value carried by changesets and conflicts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text (titles, descriptions, section bodies, categories)
    Text(String),
    /// Boolean flag (completion, derived-content)
    Flag(bool),
    /// Term list (tags)
    Terms(Vec<String>),
    /// Lifecycle status
    Status(DocumentStatus),
    /// Visibility
    Visibility(Visibility),
    /// Content format
    Format(ContentFormat),
    /// User list (permission roles)
    Users(Vec<UserId>),
}

/// Discriminant of a [`ChangeSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A field appeared
    Added,
    /// A field changed value
    Modified,
    /// A field disappeared
    Removed,
    /// History restored to an earlier snapshot
    Rollback,
}

/// One entry in a version's change list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeSet {
    /// A field appeared
    Added {
        /// Where
        path: FieldPath,
        /// The new value
        value: FieldValue,
    },
    /// A field changed value
    Modified {
        /// Where
        path: FieldPath,
        /// Value before
        old: FieldValue,
        /// Value after
        new: FieldValue,
    },
    /// A field disappeared
    Removed {
        /// Where
        path: FieldPath,
        /// Value before removal
        old: FieldValue,
    },
    /// The document was restored to an earlier version's snapshot
    Rollback {
        /// The version whose snapshot was restored
        to: SemVer,
    },
}

impl ChangeSet {
    /// The discriminant of this entry
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeSet::Added { .. } => ChangeKind::Added,
            ChangeSet::Modified { .. } => ChangeKind::Modified,
            ChangeSet::Removed { .. } => ChangeKind::Removed,
            ChangeSet::Rollback { .. } => ChangeKind::Rollback,
        }
    }

    /// The path this entry touches, if any (rollbacks touch everything)
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            ChangeSet::Added { path, .. }
            | ChangeSet::Modified { path, .. }
            | ChangeSet::Removed { path, .. } => Some(path),
            ChangeSet::Rollback { .. } => None,
        }
    }
}

/// Compute the changesets that turn `old` into `new`
///
/// Field-by-field over title, description, content, metadata, and
/// permissions. Sections are matched by id; a format change (structured ↔
/// freeform) is reported as a single `content.format` modification.
pub fn diff_documents(old: &Document, new: &Document) -> Vec<ChangeSet> {
    let mut changes = Vec::new();

    if old.title != new.title {
        changes.push(ChangeSet::Modified {
            path: FieldPath::top("title"),
            old: FieldValue::Text(old.title.clone()),
            new: FieldValue::Text(new.title.clone()),
        });
    }
    if old.description != new.description {
        changes.push(ChangeSet::Modified {
            path: FieldPath::top("description"),
            old: FieldValue::Text(old.description.clone()),
            new: FieldValue::Text(new.description.clone()),
        });
    }

    diff_content(old, new, &mut changes);
    diff_metadata(old, new, &mut changes);
    diff_permissions(old, new, &mut changes);

    changes
}

fn diff_content(old: &Document, new: &Document, changes: &mut Vec<ChangeSet>) {
    use crate::document::DocumentContent;

    let old_fmt = old.content.format();
    let new_fmt = new.content.format();
    if old_fmt != new_fmt {
        changes.push(ChangeSet::Modified {
            path: FieldPath::format(),
            old: FieldValue::Format(old_fmt),
            new: FieldValue::Format(new_fmt),
        });
    }

    match (&old.content, &new.content) {
        (
            DocumentContent::Structured { sections: old_secs },
            DocumentContent::Structured { sections: new_secs },
        ) => {
            for old_sec in old_secs {
                match new_secs.iter().find(|s| s.id == old_sec.id) {
                    None => changes.push(ChangeSet::Removed {
                        path: FieldPath::section(&old_sec.id, "body"),
                        old: FieldValue::Text(old_sec.body.clone()),
                    }),
                    Some(new_sec) => {
                        if old_sec.heading != new_sec.heading {
                            changes.push(ChangeSet::Modified {
                                path: FieldPath::section(&old_sec.id, "heading"),
                                old: FieldValue::Text(old_sec.heading.clone()),
                                new: FieldValue::Text(new_sec.heading.clone()),
                            });
                        }
                        if old_sec.body != new_sec.body {
                            changes.push(ChangeSet::Modified {
                                path: FieldPath::section(&old_sec.id, "body"),
                                old: FieldValue::Text(old_sec.body.clone()),
                                new: FieldValue::Text(new_sec.body.clone()),
                            });
                        }
                        if old_sec.completed != new_sec.completed {
                            changes.push(ChangeSet::Modified {
                                path: FieldPath::section(&old_sec.id, "completed"),
                                old: FieldValue::Flag(old_sec.completed),
                                new: FieldValue::Flag(new_sec.completed),
                            });
                        }
                    }
                }
            }
            for new_sec in new_secs {
                if !old_secs.iter().any(|s| s.id == new_sec.id) {
                    changes.push(ChangeSet::Added {
                        path: FieldPath::section(&new_sec.id, "body"),
                        value: FieldValue::Text(new_sec.body.clone()),
                    });
                }
            }
        }
        (DocumentContent::Freeform { body: old_body }, DocumentContent::Freeform { body: new_body }) => {
            if old_body != new_body {
                changes.push(ChangeSet::Modified {
                    path: FieldPath::body(),
                    old: FieldValue::Text(old_body.clone()),
                    new: FieldValue::Text(new_body.clone()),
                });
            }
        }
        // Format changed; the discriminant modification above covers it.
        _ => {}
    }
}

fn diff_metadata(old: &Document, new: &Document, changes: &mut Vec<ChangeSet>) {
    let (om, nm) = (&old.metadata, &new.metadata);

    if om.status != nm.status {
        changes.push(ChangeSet::Modified {
            path: FieldPath::metadata("status"),
            old: FieldValue::Status(om.status),
            new: FieldValue::Status(nm.status),
        });
    }
    if om.visibility != nm.visibility {
        changes.push(ChangeSet::Modified {
            path: FieldPath::metadata("visibility"),
            old: FieldValue::Visibility(om.visibility),
            new: FieldValue::Visibility(nm.visibility),
        });
    }
    if om.tags != nm.tags {
        changes.push(ChangeSet::Modified {
            path: FieldPath::metadata("tags"),
            old: FieldValue::Terms(om.tags.clone()),
            new: FieldValue::Terms(nm.tags.clone()),
        });
    }
    if om.ai_generated != nm.ai_generated {
        changes.push(ChangeSet::Modified {
            path: FieldPath::metadata("ai_generated"),
            old: FieldValue::Flag(om.ai_generated),
            new: FieldValue::Flag(nm.ai_generated),
        });
    }
    match (&om.category, &nm.category) {
        (Some(a), Some(b)) if a != b => changes.push(ChangeSet::Modified {
            path: FieldPath::metadata("category"),
            old: FieldValue::Text(a.clone()),
            new: FieldValue::Text(b.clone()),
        }),
        (None, Some(b)) => changes.push(ChangeSet::Added {
            path: FieldPath::metadata("category"),
            value: FieldValue::Text(b.clone()),
        }),
        (Some(a), None) => changes.push(ChangeSet::Removed {
            path: FieldPath::metadata("category"),
            old: FieldValue::Text(a.clone()),
        }),
        _ => {}
    }
}

fn diff_permissions(old: &Document, new: &Document, changes: &mut Vec<ChangeSet>) {
    let roles = [
        ("editors", &old.permissions.editors, &new.permissions.editors),
        ("viewers", &old.permissions.viewers, &new.permissions.viewers),
        (
            "commenters",
            &old.permissions.commenters,
            &new.permissions.commenters,
        ),
    ];
    for (role, old_list, new_list) in roles {
        if old_list != new_list {
            changes.push(ChangeSet::Modified {
                path: FieldPath::permissions(role),
                old: FieldValue::Users(old_list.clone()),
                new: FieldValue::Users(new_list.clone()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentContent, Section};

    fn doc() -> Document {
        Document::new("Title", UserId::new()).with_content(DocumentContent::Structured {
            sections: vec![
                Section::with_body("problem", "Problem", "X"),
                Section::with_body("solution", "Solution", "Y"),
            ],
        })
    }

    #[test]
    fn test_identical_documents_diff_empty() {
        let d = doc();
        assert!(diff_documents(&d, &d).is_empty());
    }

    #[test]
    fn test_title_change() {
        let a = doc();
        let mut b = a.clone();
        b.title = "New Title".into();
        let changes = diff_documents(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path().unwrap().as_str(), "title");
        assert_eq!(changes[0].kind(), ChangeKind::Modified);
    }

    #[test]
    fn test_section_body_change() {
        let a = doc();
        let mut b = a.clone();
        b.content.sections_mut().unwrap()[0].body = "Z".into();
        let changes = diff_documents(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].path().unwrap().as_str(),
            "content.sections.problem.body"
        );
    }

    #[test]
    fn test_section_added_and_removed() {
        let a = doc();
        let mut b = a.clone();
        {
            let secs = b.content.sections_mut().unwrap();
            secs.remove(0);
            secs.push(Section::with_body("market", "Market", "Big"));
        }
        let changes = diff_documents(&a, &b);
        let kinds: Vec<ChangeKind> = changes.iter().map(|c| c.kind()).collect();
        assert!(kinds.contains(&ChangeKind::Removed));
        assert!(kinds.contains(&ChangeKind::Added));
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_format_change_reported_once() {
        let a = doc();
        let mut b = a.clone();
        b.content = DocumentContent::Freeform {
            body: "all in one".into(),
        };
        let changes = diff_documents(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path().unwrap().as_str(), "content.format");
    }

    #[test]
    fn test_metadata_changes() {
        let a = doc();
        let mut b = a.clone();
        b.metadata.status = DocumentStatus::InReview;
        b.metadata.tags = vec!["q3".into()];
        b.metadata.category = Some("sales".into());
        let changes = diff_documents(&a, &b);
        assert_eq!(changes.len(), 3);
        let paths: Vec<&str> = changes
            .iter()
            .map(|c| c.path().unwrap().as_str())
            .collect();
        assert!(paths.contains(&"metadata.status"));
        assert!(paths.contains(&"metadata.tags"));
        assert!(paths.contains(&"metadata.category"));
    }

    #[test]
    fn test_permission_changes() {
        let a = doc();
        let mut b = a.clone();
        b.permissions.editors.push(UserId::new());
        let changes = diff_documents(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path().unwrap().as_str(), "permissions.editors");
    }

    #[test]
    fn test_rollback_has_no_path() {
        let c = ChangeSet::Rollback {
            to: SemVer::new(1, 0, 0),
        };
        assert!(c.path().is_none());
        assert_eq!(c.kind(), ChangeKind::Rollback);
    }
}
