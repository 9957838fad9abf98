//! The backup archive
//!
//! A directory of write-once bundles, one per backup, named
//! `{document_id}-{version}-{yyyymmddHHMMSS}.docbundle.tar.zst`. The
//! archive creates, lists, restores, and prunes bundles; it never
//! modifies one.

use chrono::{TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use draftdb_core::{Document, DocumentId, Timestamp, VersionRecord};

use crate::bundle::{
    BundleData, BundleError, BundleInfo, BundleResult, DocBundleReader, DocBundleWriter,
    BUNDLE_EXTENSION,
};

/// One bundle on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    /// Full path of the bundle
    pub path: PathBuf,
    /// File name, which encodes document, version, and creation time
    pub file_name: String,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Directory-backed archive of document backups
pub struct BackupStore {
    dir: PathBuf,
    writer: DocBundleWriter,
}

impl BackupStore {
    /// Open an archive rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> BundleResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(BackupStore {
            dir,
            writer: DocBundleWriter::new(),
        })
    }

    /// The archive directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a new backup bundle for `document`
    ///
    /// `created_at` is encoded into the file name, so two backups taken
    /// in the same second of the same version overwrite — acceptable,
    /// since their contents are identical.
    pub fn create(
        &self,
        document: &Document,
        versions: Option<&[VersionRecord]>,
        created_at: Timestamp,
    ) -> BundleResult<BundleInfo> {
        let stamp = Utc
            .timestamp_micros(created_at.as_micros() as i64)
            .single()
            .map(|dt| dt.format("%Y%m%d%H%M%S").to_string())
            .unwrap_or_else(|| created_at.as_micros().to_string());
        let file_name = format!(
            "{}-{}-{}.{}",
            document.id, document.version, stamp, BUNDLE_EXTENSION
        );
        let path = self.dir.join(file_name);
        let info = self.writer.write(document, versions, created_at, &path)?;
        info!(document = %document.id, path = %path.display(), "backup created");
        Ok(info)
    }

    /// All bundles for a document, newest first (by the creation stamp
    /// encoded in the file name)
    pub fn list(&self, document: &DocumentId) -> BundleResult<Vec<BackupEntry>> {
        let prefix = document.to_string();
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with(&prefix) || !file_name.ends_with(BUNDLE_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata()?;
            entries.push(BackupEntry {
                path: entry.path(),
                file_name,
                size_bytes: metadata.len(),
            });
        }
        // The stamp is fixed-width, so a lexicographic comparison of the
        // trailing segment is chronological; ties fall back to the name.
        fn stamp(name: &str) -> &str {
            name.rsplit('-').next().unwrap_or(name)
        }
        entries.sort_by(|a, b| {
            stamp(&b.file_name)
                .cmp(stamp(&a.file_name))
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(entries)
    }

    /// The most recent bundle for a document
    pub fn latest(&self, document: &DocumentId) -> BundleResult<Option<BackupEntry>> {
        Ok(self.list(document)?.into_iter().next())
    }

    /// Read and verify a bundle
    pub fn restore(&self, path: &Path) -> BundleResult<BundleData> {
        DocBundleReader::read(path)
    }

    /// Read and verify the most recent bundle for a document
    pub fn restore_latest(&self, document: &DocumentId) -> BundleResult<BundleData> {
        let entry = self
            .latest(document)?
            .ok_or_else(|| BundleError::MissingEntry(format!("backup for {}", document)))?;
        self.restore(&entry.path)
    }

    /// Delete all but the newest `keep` bundles for a document
    ///
    /// Returns the number of bundles removed. Bundles themselves are
    /// write-once; pruning is the only deletion path.
    pub fn prune(&self, document: &DocumentId, keep: usize) -> BundleResult<usize> {
        let entries = self.list(document)?;
        let mut removed = 0;
        for entry in entries.into_iter().skip(keep) {
            fs::remove_file(&entry.path)?;
            debug!(path = %entry.path.display(), "backup pruned");
            removed += 1;
        }
        Ok(removed)
    }
}
