//! Conflict types
//!
//! A [`Conflict`] records a collision between two independently edited
//! snapshots of the same document. The payload is a tagged union per
//! dimension (content, metadata, permissions, structural, derived
//! content, access), each carrying typed original and modified values so
//! resolvers match exhaustively.
//!
//! Conflicts are created by the detector, consumed by the resolver, and
//! retained in a per-document conflict log for analytics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::changeset::{FieldPath, FieldValue};
use crate::document::ContentFormat;
use crate::lock::Granularity;
use crate::timestamp::Timestamp;
use crate::types::{ConflictId, DocumentId, HolderId, SectionId, UserId};

/// Conflict severity, driving default resolution eligibility
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// Safe to auto-resolve
    Low,
    /// Auto-resolvable with care
    Medium,
    /// Manual resolution required
    High,
}

impl Severity {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolution strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Always defer to a human
    Manual,
    /// Fixed policy per conflict kind (last-writer-wins where safe)
    Automatic,
    /// Confidence-scored merge with suggestion fallback
    AssistedMerge,
}

impl StrategyKind {
    /// Get string representation (the registry key)
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Manual => "manual",
            StrategyKind::Automatic => "automatic",
            StrategyKind::AssistedMerge => "assisted-merge",
        }
    }

    /// Parse a registry key
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "manual" => Some(StrategyKind::Manual),
            "automatic" => Some(StrategyKind::Automatic),
            "assisted-merge" => Some(StrategyKind::AssistedMerge),
            _ => None,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata field a conflict is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataField {
    /// `metadata.category`
    Category,
    /// `metadata.tags`
    Tags,
    /// `metadata.status`
    Status,
    /// `metadata.visibility`
    Visibility,
}

impl MetadataField {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::Category => "category",
            MetadataField::Tags => "tags",
            MetadataField::Status => "status",
            MetadataField::Visibility => "visibility",
        }
    }
}

/// Permission role a conflict is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionRole {
    /// `permissions.editors`
    Editors,
    /// `permissions.viewers`
    Viewers,
    /// `permissions.commenters`
    Commenters,
}

impl PermissionRole {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRole::Editors => "editors",
            PermissionRole::Viewers => "viewers",
            PermissionRole::Commenters => "commenters",
        }
    }
}

/// Discriminant of a [`ConflictPayload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Section text diverged
    Content,
    /// Metadata field diverged
    Metadata,
    /// Permission list diverged
    Permissions,
    /// Content format changed
    Structural,
    /// Derived-content flag diverged
    DerivedContent,
    /// Foreign lock stands in the way (potential-access conflict)
    Access,
}

/// Typed payload of a conflict, one variant per dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConflictPayload {
    /// Two versions of a section's text
    Content {
        /// The section in question
        section: SectionId,
        /// Text in the original snapshot
        original: String,
        /// Text in the modified snapshot
        modified: String,
    },
    /// Two values of a metadata field
    Metadata {
        /// Which field
        field: MetadataField,
        /// Value in the original snapshot
        original: FieldValue,
        /// Value in the modified snapshot
        modified: FieldValue,
    },
    /// Two versions of a permission list
    Permissions {
        /// Which role list
        role: PermissionRole,
        /// List in the original snapshot
        original: Vec<UserId>,
        /// List in the modified snapshot
        modified: Vec<UserId>,
    },
    /// The content format itself changed
    Structural {
        /// Format in the original snapshot
        original: ContentFormat,
        /// Format in the modified snapshot
        modified: ContentFormat,
    },
    /// The derived-content (AI-generated) flag diverged
    DerivedContent {
        /// Flag in the original snapshot
        original: bool,
        /// Flag in the modified snapshot
        modified: bool,
    },
    /// A lock held by someone else blocks the intended access
    Access {
        /// Who holds the blocking lock
        holder: HolderId,
        /// Granularity of the blocking lock
        granularity: Granularity,
    },
}

impl ConflictPayload {
    /// The discriminant of this payload
    pub fn kind(&self) -> ConflictKind {
        match self {
            ConflictPayload::Content { .. } => ConflictKind::Content,
            ConflictPayload::Metadata { .. } => ConflictKind::Metadata,
            ConflictPayload::Permissions { .. } => ConflictKind::Permissions,
            ConflictPayload::Structural { .. } => ConflictKind::Structural,
            ConflictPayload::DerivedContent { .. } => ConflictKind::DerivedContent,
            ConflictPayload::Access { .. } => ConflictKind::Access,
        }
    }

    /// Default severity for this payload's dimension
    pub fn default_severity(&self) -> Severity {
        match self {
            ConflictPayload::Content { .. } => Severity::Medium,
            ConflictPayload::Metadata { .. } => Severity::Low,
            ConflictPayload::Permissions { .. } => Severity::High,
            ConflictPayload::Structural { .. } => Severity::High,
            ConflictPayload::DerivedContent { .. } => Severity::Medium,
            // Scaled by granularity: document > section > field
            ConflictPayload::Access { granularity, .. } => match granularity {
                Granularity::Document => Severity::High,
                Granularity::Section => Severity::Medium,
                Granularity::Field => Severity::Low,
            },
        }
    }

    /// Default resolution strategy for this payload's dimension
    ///
    /// Permission and structural changes must be explicit, so they are
    /// never auto-resolved.
    pub fn default_strategy(&self) -> StrategyKind {
        match self {
            ConflictPayload::Metadata { .. } | ConflictPayload::DerivedContent { .. } => {
                StrategyKind::Automatic
            }
            _ => StrategyKind::Manual,
        }
    }

    /// Exchange original and modified values
    ///
    /// Used by the detector's symmetry guarantee:
    /// `detect(a, b)` equals `detect(b, a)` with payloads swapped.
    pub fn swapped(&self) -> ConflictPayload {
        match self.clone() {
            ConflictPayload::Content {
                section,
                original,
                modified,
            } => ConflictPayload::Content {
                section,
                original: modified,
                modified: original,
            },
            ConflictPayload::Metadata {
                field,
                original,
                modified,
            } => ConflictPayload::Metadata {
                field,
                original: modified,
                modified: original,
            },
            ConflictPayload::Permissions {
                role,
                original,
                modified,
            } => ConflictPayload::Permissions {
                role,
                original: modified,
                modified: original,
            },
            ConflictPayload::Structural { original, modified } => ConflictPayload::Structural {
                original: modified,
                modified: original,
            },
            ConflictPayload::DerivedContent { original, modified } => {
                ConflictPayload::DerivedContent {
                    original: modified,
                    modified: original,
                }
            }
            // Access conflicts have no original/modified pair
            access @ ConflictPayload::Access { .. } => access,
        }
    }
}

/// A detected conflict between two snapshots of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Unique id of this detection
    pub id: ConflictId,
    /// The document both snapshots belong to
    pub document_id: DocumentId,
    /// Typed payload
    pub payload: ConflictPayload,
    /// Severity classification
    pub severity: Severity,
    /// Path of the conflicting field
    pub path: FieldPath,
    /// When the conflict was detected
    pub detected_at: Timestamp,
    /// The strategy expected to resolve it
    pub strategy: StrategyKind,
}

impl Conflict {
    /// Create a conflict with the payload's default severity and strategy
    pub fn new(
        document_id: DocumentId,
        payload: ConflictPayload,
        path: FieldPath,
        detected_at: Timestamp,
    ) -> Self {
        let severity = payload.default_severity();
        let strategy = payload.default_strategy();
        Conflict {
            id: ConflictId::new(),
            document_id,
            payload,
            severity,
            path,
            detected_at,
            strategy,
        }
    }

    /// The dimension of this conflict
    pub fn kind(&self) -> ConflictKind {
        self.payload.kind()
    }

    /// This conflict with original and modified values exchanged
    ///
    /// Keeps the same id and timestamp; only the payload direction flips.
    pub fn swapped(&self) -> Conflict {
        Conflict {
            payload: self.payload.swapped(),
            ..self.clone()
        }
    }
}

/// Which side of a conflict a resolution picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// Keep the original snapshot's value
    Original,
    /// Take the modified snapshot's value
    Modified,
}

/// Outcome of applying a resolution strategy to one conflict
///
/// Never silently dropped: every outcome is recorded in the conflict log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionOutcome {
    /// The strategy picked a side
    Resolved {
        /// The winning side
        winner: Side,
    },
    /// Confidence fell below the threshold; this is advice, not a change
    Suggested {
        /// The suggested side
        winner: Side,
        /// Confidence in [0, 1]
        confidence: f64,
    },
    /// The strategy defers to a human
    Deferred,
    /// The strategy refused
    Failed {
        /// Why
        reason: String,
    },
}

impl ResolutionOutcome {
    /// Whether this outcome applied a change
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved { .. })
    }
}

/// A recorded resolution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// The conflict that was processed
    pub conflict: Conflict,
    /// The strategy that processed it
    pub strategy: StrategyKind,
    /// What happened
    pub outcome: ResolutionOutcome,
    /// When
    pub resolved_at: Timestamp,
}
