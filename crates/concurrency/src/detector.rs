//! Conflict detection
//!
//! A pure function over two document snapshots. Five dimensions are
//! checked independently: content (section text), metadata, permissions,
//! structural (content format), and derived content (the AI-generated
//! flag). Detection is deterministic and order-independent:
//! `detect(a, b)` reports the same conflicts as `detect(b, a)` with
//! original and modified values exchanged.

use draftdb_core::{
    Conflict, ConflictPayload, Document, DocumentContent, FieldPath, FieldValue, MetadataField,
    PermissionRole, Timestamp,
};

/// Detect every conflict between two snapshots of the same document
///
/// `original` is the stored side, `modified` the incoming side. The
/// caller supplies `now` for the detection timestamps, keeping the
/// function pure.
pub fn detect(original: &Document, modified: &Document, now: Timestamp) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    check_structural(original, modified, now, &mut conflicts);
    check_content(original, modified, now, &mut conflicts);
    check_metadata(original, modified, now, &mut conflicts);
    check_permissions(original, modified, now, &mut conflicts);
    check_derived_content(original, modified, now, &mut conflicts);
    conflicts
}

/// Content dimension: pairwise-compare sections by position
///
/// Only applies when both snapshots are structured; a format change is
/// the structural dimension's concern. A section present on one side
/// only is reported against the empty string.
fn check_content(a: &Document, b: &Document, now: Timestamp, out: &mut Vec<Conflict>) {
    let (
        DocumentContent::Structured { sections: a_secs },
        DocumentContent::Structured { sections: b_secs },
    ) = (&a.content, &b.content)
    else {
        if let (
            DocumentContent::Freeform { body: a_body },
            DocumentContent::Freeform { body: b_body },
        ) = (&a.content, &b.content)
        {
            if a_body != b_body {
                out.push(Conflict::new(
                    a.id,
                    ConflictPayload::Content {
                        section: "body".into(),
                        original: a_body.clone(),
                        modified: b_body.clone(),
                    },
                    FieldPath::body(),
                    now,
                ));
            }
        }
        return;
    };

    let len = a_secs.len().max(b_secs.len());
    for i in 0..len {
        let a_sec = a_secs.get(i);
        let b_sec = b_secs.get(i);
        let a_text = a_sec.map(|s| s.body.as_str()).unwrap_or("");
        let b_text = b_sec.map(|s| s.body.as_str()).unwrap_or("");
        if a_text != b_text {
            let section = a_sec.or(b_sec).map(|s| s.id.clone()).unwrap_or_else(|| "".into());
            out.push(Conflict::new(
                a.id,
                ConflictPayload::Content {
                    section: section.clone(),
                    original: a_text.to_string(),
                    modified: b_text.to_string(),
                },
                FieldPath::section(&section, "body"),
                now,
            ));
        }
    }
}

/// Metadata dimension: category, tags, status, visibility
fn check_metadata(a: &Document, b: &Document, now: Timestamp, out: &mut Vec<Conflict>) {
    let (am, bm) = (&a.metadata, &b.metadata);

    if am.category != bm.category {
        let as_value = |c: &Option<String>| FieldValue::Text(c.clone().unwrap_or_default());
        out.push(Conflict::new(
            a.id,
            ConflictPayload::Metadata {
                field: MetadataField::Category,
                original: as_value(&am.category),
                modified: as_value(&bm.category),
            },
            FieldPath::metadata("category"),
            now,
        ));
    }
    if am.tags != bm.tags {
        out.push(Conflict::new(
            a.id,
            ConflictPayload::Metadata {
                field: MetadataField::Tags,
                original: FieldValue::Terms(am.tags.clone()),
                modified: FieldValue::Terms(bm.tags.clone()),
            },
            FieldPath::metadata("tags"),
            now,
        ));
    }
    if am.status != bm.status {
        out.push(Conflict::new(
            a.id,
            ConflictPayload::Metadata {
                field: MetadataField::Status,
                original: FieldValue::Status(am.status),
                modified: FieldValue::Status(bm.status),
            },
            FieldPath::metadata("status"),
            now,
        ));
    }
    if am.visibility != bm.visibility {
        out.push(Conflict::new(
            a.id,
            ConflictPayload::Metadata {
                field: MetadataField::Visibility,
                original: FieldValue::Visibility(am.visibility),
                modified: FieldValue::Visibility(bm.visibility),
            },
            FieldPath::metadata("visibility"),
            now,
        ));
    }
}

/// Permissions dimension: editor/viewer/commenter lists
///
/// Always high severity, never auto-resolved — access control changes
/// must be explicit.
fn check_permissions(a: &Document, b: &Document, now: Timestamp, out: &mut Vec<Conflict>) {
    let roles = [
        (
            PermissionRole::Editors,
            &a.permissions.editors,
            &b.permissions.editors,
        ),
        (
            PermissionRole::Viewers,
            &a.permissions.viewers,
            &b.permissions.viewers,
        ),
        (
            PermissionRole::Commenters,
            &a.permissions.commenters,
            &b.permissions.commenters,
        ),
    ];
    for (role, a_list, b_list) in roles {
        if a_list != b_list {
            out.push(Conflict::new(
                a.id,
                ConflictPayload::Permissions {
                    role,
                    original: a_list.clone(),
                    modified: b_list.clone(),
                },
                FieldPath::permissions(role.as_str()),
                now,
            ));
        }
    }
}

/// Structural dimension: the content format itself changed
fn check_structural(a: &Document, b: &Document, now: Timestamp, out: &mut Vec<Conflict>) {
    let (a_fmt, b_fmt) = (a.content.format(), b.content.format());
    if a_fmt != b_fmt {
        out.push(Conflict::new(
            a.id,
            ConflictPayload::Structural {
                original: a_fmt,
                modified: b_fmt,
            },
            FieldPath::format(),
            now,
        ));
    }
}

/// Derived-content dimension: the AI-generated flag diverged
fn check_derived_content(a: &Document, b: &Document, now: Timestamp, out: &mut Vec<Conflict>) {
    if a.metadata.ai_generated != b.metadata.ai_generated {
        out.push(Conflict::new(
            a.id,
            ConflictPayload::DerivedContent {
                original: a.metadata.ai_generated,
                modified: b.metadata.ai_generated,
            },
            FieldPath::metadata("ai_generated"),
            now,
        ));
    }
}
