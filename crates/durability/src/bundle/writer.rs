//! Bundle archive writer
//!
//! Creates `.docbundle.tar.zst` archives with atomic write semantics:
//! the archive is assembled in a temp file and renamed into place, so
//! either the complete bundle exists or no file is left behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tar::{Builder, Header};
use tracing::debug;

use draftdb_core::{Document, Timestamp, VersionRecord};

use super::{
    paths, xxh3_hex, BundleContents, BundleError, BundleInfo, BundleManifest, BundleResult,
};

/// Writer for document backup bundles
pub struct DocBundleWriter {
    compression_level: i32,
}

impl DocBundleWriter {
    /// Default zstd compression level
    pub const DEFAULT_COMPRESSION: i32 = 3;

    /// Create a writer with the default compression level
    pub fn new() -> Self {
        Self::with_compression(Self::DEFAULT_COMPRESSION)
    }

    /// Create a writer with a specific zstd level
    pub fn with_compression(compression_level: i32) -> Self {
        Self { compression_level }
    }

    /// Write a complete bundle
    ///
    /// Atomic: on any failure the temp file is removed and `path` is
    /// untouched.
    pub fn write(
        &self,
        document: &Document,
        versions: Option<&[VersionRecord]>,
        created_at: Timestamp,
        path: &Path,
    ) -> BundleResult<BundleInfo> {
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        match self.write_inner(document, versions, created_at, &temp_path) {
            Ok(info) => {
                fs::rename(&temp_path, path)?;
                debug!(path = %path.display(), size = info.size_bytes, "bundle written");
                Ok(BundleInfo {
                    path: path.to_path_buf(),
                    ..info
                })
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }

    fn write_inner(
        &self,
        document: &Document,
        versions: Option<&[VersionRecord]>,
        created_at: Timestamp,
        path: &Path,
    ) -> BundleResult<BundleInfo> {
        let document_json = serde_json::to_vec_pretty(document)?;
        let versions_json = versions.map(serde_json::to_vec_pretty).transpose()?;
        let version_count = versions.map(|v| v.len()).unwrap_or(0);

        let mut manifest = BundleManifest::new(
            env!("CARGO_PKG_VERSION"),
            document.id,
            created_at,
            BundleContents {
                has_history: versions_json.is_some(),
                version_count,
            },
        );
        manifest.add_checksum(paths::DOCUMENT, xxh3_hex(&document_json));
        if let Some(data) = &versions_json {
            manifest.add_checksum(paths::VERSIONS, xxh3_hex(data));
        }
        let manifest_json = serde_json::to_vec_pretty(&manifest)?;

        let file = File::create(path)?;
        let buf_writer = BufWriter::new(file);
        let zstd_writer = zstd::Encoder::new(buf_writer, self.compression_level)
            .map_err(|e| BundleError::Compression(format!("zstd encoder: {}", e)))?;
        let zstd_writer = zstd_writer.auto_finish();

        let mut tar_builder = Builder::new(zstd_writer);
        self.add_entry(&mut tar_builder, paths::MANIFEST, &manifest_json)?;
        self.add_entry(&mut tar_builder, paths::DOCUMENT, &document_json)?;
        if let Some(data) = &versions_json {
            self.add_entry(&mut tar_builder, paths::VERSIONS, data)?;
        }

        let zstd_writer = tar_builder
            .into_inner()
            .map_err(|e| BundleError::Archive(format!("tar finish: {}", e)))?;
        drop(zstd_writer);

        let size_bytes = fs::metadata(path)?.len();
        let checksum = xxh3_hex(&fs::read(path)?);

        Ok(BundleInfo {
            document_id: document.id,
            path: path.to_path_buf(),
            version_count,
            size_bytes,
            checksum,
        })
    }

    fn add_entry<W: Write>(
        &self,
        builder: &mut Builder<W>,
        name: &str,
        data: &[u8],
    ) -> BundleResult<()> {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, data)
            .map_err(|e| BundleError::Archive(format!("tar append {}: {}", name, e)))
    }
}

impl Default for DocBundleWriter {
    fn default() -> Self {
        Self::new()
    }
}
