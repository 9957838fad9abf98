//! The document model
//!
//! A [`Document`] is the unit of storage: identity, typed content (an
//! ordered list of named sections, or a freeform body), metadata with
//! computed statistics, role-based permissions, the current semantic
//! version, and audit fields. Documents are owned by their creator and
//! mutated only through the engine facade.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::semver::SemVer;
use crate::timestamp::Timestamp;
use crate::types::{DocumentId, DocumentType, SectionId, UserId};

/// Lifecycle status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Being written (the default)
    #[default]
    Draft,
    /// Out for review
    InReview,
    /// Finalized
    Final,
    /// Archived, read-mostly
    Archived,
}

impl DocumentStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::InReview => "in-review",
            DocumentStatus::Final => "final",
            DocumentStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who can see a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    /// Owner and explicitly listed collaborators only (the default)
    #[default]
    Private,
    /// Everyone on the owning team
    Team,
    /// Anyone with the link
    Public,
}

impl Visibility {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Team => "team",
            Visibility::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computed complexity bucket, derived from word and section counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Complexity {
    /// Short document, few sections
    #[default]
    Simple,
    /// Mid-sized document
    Moderate,
    /// Long or heavily structured document
    Rich,
}

/// Shape of a document's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentFormat {
    /// Ordered list of named sections
    Structured,
    /// Single freeform body
    Freeform,
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentFormat::Structured => "structured",
            ContentFormat::Freeform => "freeform",
        };
        write!(f, "{}", s)
    }
}

/// One named section of a structured document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Stable section name
    pub id: SectionId,
    /// Display heading
    pub heading: String,
    /// Section text
    pub body: String,
    /// Completion flag, maintained by the author
    pub completed: bool,
}

impl Section {
    /// Create an empty, incomplete section
    pub fn new(id: impl Into<SectionId>, heading: impl Into<String>) -> Self {
        Section {
            id: id.into(),
            heading: heading.into(),
            body: String::new(),
            completed: false,
        }
    }

    /// Create a section with a body
    pub fn with_body(
        id: impl Into<SectionId>,
        heading: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Section {
            id: id.into(),
            heading: heading.into(),
            body: body.into(),
            completed: false,
        }
    }
}

/// Document content: structured sections or a freeform body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentContent {
    /// Ordered list of named sections
    Structured {
        /// The sections, in display order
        sections: Vec<Section>,
    },
    /// Single freeform body
    Freeform {
        /// The whole text
        body: String,
    },
}

impl DocumentContent {
    /// Empty structured content
    pub fn empty() -> Self {
        DocumentContent::Structured {
            sections: Vec::new(),
        }
    }

    /// The format of this content
    pub fn format(&self) -> ContentFormat {
        match self {
            DocumentContent::Structured { .. } => ContentFormat::Structured,
            DocumentContent::Freeform { .. } => ContentFormat::Freeform,
        }
    }

    /// Sections of a structured document, empty slice for freeform
    pub fn sections(&self) -> &[Section] {
        match self {
            DocumentContent::Structured { sections } => sections,
            DocumentContent::Freeform { .. } => &[],
        }
    }

    /// Mutable access to the sections of a structured document
    pub fn sections_mut(&mut self) -> Option<&mut Vec<Section>> {
        match self {
            DocumentContent::Structured { sections } => Some(sections),
            DocumentContent::Freeform { .. } => None,
        }
    }

    /// Look up a section by id
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections().iter().find(|s| &s.id == id)
    }

    /// All text blocks of the content, for word counting and indexing
    pub fn text_blocks(&self) -> Vec<&str> {
        match self {
            DocumentContent::Structured { sections } => sections
                .iter()
                .flat_map(|s| [s.heading.as_str(), s.body.as_str()])
                .collect(),
            DocumentContent::Freeform { body } => vec![body.as_str()],
        }
    }
}

/// Document metadata: status, organization, and computed statistics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Lifecycle status
    pub status: DocumentStatus,
    /// Optional category
    pub category: Option<String>,
    /// Free-text tags
    pub tags: Vec<String>,
    /// Visibility
    pub visibility: Visibility,
    /// Derived-content flag: set when content was AI-generated
    pub ai_generated: bool,
    /// Computed: total words across all text blocks
    pub word_count: usize,
    /// Computed: complexity bucket
    pub complexity: Complexity,
}

/// Role-based permission lists
///
/// The engine reads this data for conflict detection; it never makes
/// authorization decisions (that is the caller's policy layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// The owner, set at creation
    pub owner: UserId,
    /// Users who may edit
    pub editors: Vec<UserId>,
    /// Users who may view
    pub viewers: Vec<UserId>,
    /// Users who may comment
    pub commenters: Vec<UserId>,
}

impl Permissions {
    /// Permissions with only an owner
    pub fn owned_by(owner: UserId) -> Self {
        Permissions {
            owner,
            editors: Vec::new(),
            viewers: Vec::new(),
            commenters: Vec::new(),
        }
    }
}

/// A versioned, structured document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity
    pub id: DocumentId,
    /// Product-level kind
    pub doc_type: DocumentType,
    /// Title
    pub title: String,
    /// One-paragraph description
    pub description: String,
    /// The content
    pub content: DocumentContent,
    /// Metadata and computed statistics
    pub metadata: DocumentMetadata,
    /// Role-based permissions
    pub permissions: Permissions,
    /// Current version triple
    pub version: SemVer,
    /// Who created the document
    pub created_by: UserId,
    /// Who last modified it
    pub last_modified_by: UserId,
    /// When it was created
    pub created_at: Timestamp,
    /// When it was last modified
    pub updated_at: Timestamp,
}

impl Document {
    /// Create an empty draft owned by `owner`
    pub fn new(title: impl Into<String>, owner: UserId) -> Self {
        let now = Timestamp::now();
        Document {
            id: DocumentId::new(),
            doc_type: DocumentType::Note,
            title: title.into(),
            description: String::new(),
            content: DocumentContent::empty(),
            metadata: DocumentMetadata::default(),
            permissions: Permissions::owned_by(owner),
            version: SemVer::INITIAL,
            created_by: owner,
            last_modified_by: owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the document type (builder-style)
    pub fn with_type(mut self, doc_type: DocumentType) -> Self {
        self.doc_type = doc_type;
        self
    }

    /// Replace the content (builder-style) and recompute statistics
    pub fn with_content(mut self, content: DocumentContent) -> Self {
        self.content = content;
        self.recompute_stats();
        self
    }

    /// Recompute `word_count` and `complexity` from the content
    ///
    /// Called by the engine on every accepted save; callers constructing
    /// documents by hand should call it after mutating content.
    pub fn recompute_stats(&mut self) {
        let words: usize = self
            .content
            .text_blocks()
            .iter()
            .map(|b| b.split_whitespace().count())
            .sum();
        let sections = self.content.sections().len();
        self.metadata.word_count = words;
        self.metadata.complexity = match (words, sections) {
            (w, s) if w > 2_000 || s > 12 => Complexity::Rich,
            (w, s) if w > 400 || s > 4 => Complexity::Moderate,
            _ => Complexity::Simple,
        };
    }

    /// Record a modification by `actor` at `now`
    pub fn touch(&mut self, actor: UserId, now: Timestamp) {
        self.last_modified_by = actor;
        self.updated_at = now;
    }

    /// Whether `user` appears in the editor list or owns the document
    ///
    /// Permission *data* only — enforcement is the caller's concern.
    pub fn is_editor(&self, user: &UserId) -> bool {
        self.permissions.owner == *user || self.permissions.editors.contains(user)
    }
}
