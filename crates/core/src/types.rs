//! Identifier types
//!
//! This module defines the foundational identifiers:
//! - DocumentId / UserId / LockId / ConflictId: UUID v4 newtypes
//! - HolderId: lock-holder identity (a session or actor name)
//! - SectionId: stable name of a document section
//! - BranchName: validated branch name, unique per document
//! - DocumentType: product-level document kind

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::limits;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier using UUID v4
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Create an identifier from raw bytes
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Parse an identifier from its string representation
            ///
            /// Accepts standard UUID format. Returns `None` for invalid input.
            pub fn from_string(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_newtype! {
    /// Unique identifier for a document
    ///
    /// Assigned once at creation and stable across every version, branch,
    /// and backup of the document.
    DocumentId
}

uuid_newtype! {
    /// Unique identifier for a user (owner, editor, viewer, commenter)
    UserId
}

uuid_newtype! {
    /// Unique identifier for a granted lock
    LockId
}

uuid_newtype! {
    /// Unique identifier for a detected conflict
    ConflictId
}

/// Identity of a lock holder
///
/// A holder is a collaborating session or actor, identified by an opaque
/// name chosen by the caller (e.g. a session id or user handle). Lock
/// release must present the same holder unless administratively forced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HolderId(String);

impl HolderId {
    /// Create a holder identity from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the holder name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HolderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Stable name of a document section
///
/// Sections are addressed by name ("problem", "solution", …) rather than
/// position, so section-level locks survive reordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectionId(String);

impl SectionId {
    /// Create a section id from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the section name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Validated branch name, unique within a document's history
///
/// Names are 1..=64 characters of ASCII alphanumerics, `-`, `_`, `/` or
/// `.`. The mainline is the reserved branch [`BranchName::MAIN`], created
/// together with the document's initial version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BranchName(String);

impl BranchName {
    /// Name of the mainline branch every document starts with
    pub const MAIN: &'static str = "main";

    /// Create a validated branch name
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the name is empty, longer than
    /// [`limits::MAX_BRANCH_NAME_LEN`], or contains characters outside
    /// `[A-Za-z0-9._/-]`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_input("branch name must not be empty"));
        }
        if name.len() > limits::MAX_BRANCH_NAME_LEN {
            return Err(Error::invalid_input(format!(
                "branch name exceeds {} characters",
                limits::MAX_BRANCH_NAME_LEN
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
        {
            return Err(Error::invalid_input(format!(
                "branch name '{}' contains invalid characters",
                name
            )));
        }
        Ok(Self(name))
    }

    /// The mainline branch
    pub fn main() -> Self {
        Self(Self::MAIN.to_string())
    }

    /// Check whether this is the mainline branch
    pub fn is_main(&self) -> bool {
        self.0 == Self::MAIN
    }

    /// Get the branch name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product-level document kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Pitch deck
    Pitch,
    /// Business plan
    Plan,
    /// Proposal
    Proposal,
    /// Free-standing note
    Note,
}

impl DocumentType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Pitch => "pitch",
            DocumentType::Plan => "plan",
            DocumentType::Proposal => "proposal",
            DocumentType::Note => "note",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
