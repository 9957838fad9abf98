//! Validation limits for the document model
//!
//! These bounds are enforced by the engine's integrity check before any
//! lock, version, or persistence side effect. They exist to fail fast on
//! malformed input, not to define the storage format.

/// Maximum length of a document title, in bytes
pub const MAX_TITLE_LEN: usize = 256;

/// Maximum length of a document description, in bytes
pub const MAX_DESCRIPTION_LEN: usize = 4_096;

/// Maximum number of sections in a structured document
pub const MAX_SECTIONS: usize = 128;

/// Maximum length of a section body, in bytes
pub const MAX_SECTION_BODY_LEN: usize = 65_536;

/// Maximum length of a freeform document body, in bytes
pub const MAX_FREEFORM_BODY_LEN: usize = 1_048_576;

/// Maximum number of tags on a document
pub const MAX_TAGS: usize = 32;

/// Maximum length of a single tag, in bytes
pub const MAX_TAG_LEN: usize = 64;

/// Maximum length of a branch name, in bytes
pub const MAX_BRANCH_NAME_LEN: usize = 64;

/// Maximum length of a lock reason, in bytes
pub const MAX_LOCK_REASON_LEN: usize = 256;

/// Maximum length of a version message, in bytes
pub const MAX_VERSION_MESSAGE_LEN: usize = 1_024;
