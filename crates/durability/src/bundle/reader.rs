//! Bundle archive reader
//!
//! Reads a `.docbundle.tar.zst` archive, verifying every entry against
//! the manifest checksums before deserializing. A bundle that fails
//! verification is rejected, never partially applied.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use draftdb_core::{Document, VersionRecord};

use super::{paths, xxh3_hex, BundleError, BundleManifest, BundleResult, FORMAT_VERSION};

/// Fully verified contents of a bundle
#[derive(Debug, Clone)]
pub struct BundleData {
    /// The manifest
    pub manifest: BundleManifest,
    /// The document snapshot
    pub document: Document,
    /// The version history, when the bundle includes one
    pub versions: Option<Vec<VersionRecord>>,
}

/// Reader for document backup bundles
#[derive(Debug, Default, Clone, Copy)]
pub struct DocBundleReader;

impl DocBundleReader {
    /// Read and verify a bundle
    ///
    /// # Errors
    ///
    /// - [`BundleError::MissingEntry`] when the manifest or document
    ///   entry is absent
    /// - [`BundleError::ChecksumMismatch`] when an entry's bytes do not
    ///   match the manifest
    /// - [`BundleError::UnsupportedVersion`] for future format versions
    pub fn read(path: &Path) -> BundleResult<BundleData> {
        let file = File::open(path)?;
        let zstd_reader = zstd::Decoder::new(file)
            .map_err(|e| BundleError::Compression(format!("zstd decoder: {}", e)))?;
        let mut archive = tar::Archive::new(zstd_reader);

        let mut entries: HashMap<String, Vec<u8>> = HashMap::new();
        for entry in archive
            .entries()
            .map_err(|e| BundleError::Archive(format!("tar entries: {}", e)))?
        {
            let mut entry = entry.map_err(|e| BundleError::Archive(format!("tar entry: {}", e)))?;
            let name = entry
                .path()
                .map_err(|e| BundleError::Archive(format!("entry path: {}", e)))?
                .to_string_lossy()
                .into_owned();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            entries.insert(name, data);
        }

        let manifest_bytes = entries
            .remove(paths::MANIFEST)
            .ok_or_else(|| BundleError::MissingEntry(paths::MANIFEST.to_string()))?;
        let manifest: BundleManifest = serde_json::from_slice(&manifest_bytes)?;
        if manifest.format_version > FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion(manifest.format_version));
        }

        let document_bytes = entries
            .remove(paths::DOCUMENT)
            .ok_or_else(|| BundleError::MissingEntry(paths::DOCUMENT.to_string()))?;
        Self::verify(&manifest, paths::DOCUMENT, &document_bytes)?;
        let document: Document = serde_json::from_slice(&document_bytes)?;

        let versions = match entries.remove(paths::VERSIONS) {
            Some(bytes) => {
                Self::verify(&manifest, paths::VERSIONS, &bytes)?;
                Some(serde_json::from_slice(&bytes)?)
            }
            None if manifest.contents.has_history => {
                return Err(BundleError::MissingEntry(paths::VERSIONS.to_string()));
            }
            None => None,
        };

        debug!(path = %path.display(), document = %document.id, "bundle read");
        Ok(BundleData {
            manifest,
            document,
            versions,
        })
    }

    fn verify(manifest: &BundleManifest, entry: &str, data: &[u8]) -> BundleResult<()> {
        let expected = manifest
            .checksums
            .get(entry)
            .ok_or_else(|| BundleError::MissingEntry(format!("checksum for {}", entry)))?;
        let actual = xxh3_hex(data);
        if *expected != actual {
            return Err(BundleError::ChecksumMismatch {
                entry: entry.to_string(),
                expected: expected.clone(),
                actual,
            });
        }
        Ok(())
    }
}
