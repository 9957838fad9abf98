//! Document backup bundles
//!
//! A bundle is a `.docbundle.tar.zst` archive containing:
//! - `MANIFEST.json` — format metadata and xxh3 checksums
//! - `DOCUMENT.json` — the document snapshot
//! - `VERSIONS.json` — the version history (optional)
//!
//! Bundles are write-once: the writer creates them atomically and
//! nothing ever modifies one in place.

mod reader;
mod writer;

pub use reader::{BundleData, DocBundleReader};
pub use writer::DocBundleWriter;

use draftdb_core::{DocumentId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// File names inside a bundle archive
pub mod paths {
    /// Manifest entry
    pub const MANIFEST: &str = "MANIFEST.json";
    /// Document snapshot entry
    pub const DOCUMENT: &str = "DOCUMENT.json";
    /// Version history entry
    pub const VERSIONS: &str = "VERSIONS.json";
}

/// Bundle format version; bump on incompatible layout changes
pub const FORMAT_VERSION: u32 = 1;

/// File extension of a bundle
pub const BUNDLE_EXTENSION: &str = "docbundle.tar.zst";

/// Result type alias for bundle operations
pub type BundleResult<T> = std::result::Result<T, BundleError>;

/// Errors raised by bundle reading and writing
#[derive(Debug, Error)]
pub enum BundleError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tar archive failure
    #[error("archive error: {0}")]
    Archive(String),

    /// Zstd compression failure
    #[error("compression error: {0}")]
    Compression(String),

    /// An entry's checksum did not match the manifest
    #[error("checksum mismatch for {entry}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Which archive entry
        entry: String,
        /// Checksum recorded in the manifest
        expected: String,
        /// Checksum of the bytes actually read
        actual: String,
    },

    /// A required entry is missing from the archive
    #[error("bundle entry missing: {0}")]
    MissingEntry(String),

    /// The bundle was written by an incompatible format version
    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u32),
}

/// Compute the xxh3-64 checksum of a byte slice, hex-encoded
pub fn xxh3_hex(data: &[u8]) -> String {
    format!("{:016x}", xxh3_64(data))
}

/// What a bundle contains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleContents {
    /// Whether `VERSIONS.json` is present
    pub has_history: bool,
    /// Number of version records included
    pub version_count: usize,
}

/// Bundle manifest: format metadata plus per-entry checksums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    /// Bundle layout version
    pub format_version: u32,
    /// Version of the writing application
    pub app_version: String,
    /// The document this bundle snapshots
    pub document_id: DocumentId,
    /// When the bundle was written
    pub created_at: Timestamp,
    /// What the bundle contains
    pub contents: BundleContents,
    /// xxh3 checksums by entry name
    pub checksums: BTreeMap<String, String>,
}

impl BundleManifest {
    /// Create a manifest with no checksums yet
    pub fn new(
        app_version: &str,
        document_id: DocumentId,
        created_at: Timestamp,
        contents: BundleContents,
    ) -> Self {
        BundleManifest {
            format_version: FORMAT_VERSION,
            app_version: app_version.to_string(),
            document_id,
            created_at,
            contents,
            checksums: BTreeMap::new(),
        }
    }

    /// Record an entry checksum
    pub fn add_checksum(&mut self, entry: &str, checksum: impl Into<String>) {
        self.checksums.insert(entry.to_string(), checksum.into());
    }
}

/// Information returned after writing a bundle
#[derive(Debug, Clone)]
pub struct BundleInfo {
    /// The document the bundle snapshots
    pub document_id: DocumentId,
    /// Where the bundle was written
    pub path: PathBuf,
    /// Number of version records included
    pub version_count: usize,
    /// Size of the finished archive in bytes
    pub size_bytes: u64,
    /// xxh3 checksum of the finished archive
    pub checksum: String,
}
