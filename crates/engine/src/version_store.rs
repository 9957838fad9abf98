//! The version store
//!
//! Owns every document's append-only version history, branch table, and
//! merge log. All mutation goes through `&self` methods that take the
//! store's mutex — version numbers are assigned under that lock, so they
//! are strictly increasing per document no matter how many writers race.
//!
//! History is append-only: rollback appends a new version carrying the
//! restored snapshot, and only the retention policy removes records.

use draftdb_core::{
    diff_documents, Branch, BranchName, ChangeKind, ChangeSet, Document, DocumentId, Error,
    MergeOutcome, MergeRecord, Result, SemVer, StrategyKind, Timestamp, UserId, VersionBump,
    VersionRecord,
};
use draftdb_storage::tokenize;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

/// Options for creating a version
#[derive(Debug, Clone)]
pub struct CreateVersionOptions {
    /// Which component to bump
    pub bump: VersionBump,
    /// Free-text message
    pub message: Option<String>,
    /// The version the caller based their edit on (stale-write check)
    pub base: SemVer,
    /// Who is writing
    pub author: UserId,
    /// The branch line the version lands on
    pub branch: BranchName,
}

/// Filter for history queries
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Only versions on this branch
    pub branch: Option<BranchName>,
    /// At most this many entries (newest first)
    pub limit: Option<usize>,
    /// Only versions created at or after this instant
    pub since: Option<Timestamp>,
}

/// Field-by-field comparison of two versions
#[derive(Debug, Clone)]
pub struct VersionComparison {
    /// The changesets that turn the first version into the second
    pub changes: Vec<ChangeSet>,
    /// Fields added
    pub added: usize,
    /// Fields modified
    pub modified: usize,
    /// Fields removed
    pub removed: usize,
    /// Token-Jaccard similarity over textual fields, in [0, 1].
    /// Advisory only — a heuristic signal, not a correctness guarantee.
    pub similarity: f64,
}

struct DocumentHistory {
    /// Append order, oldest first. Never empty once created.
    versions: Vec<VersionRecord>,
    branches: HashMap<BranchName, Branch>,
    merges: Vec<MergeRecord>,
}

impl DocumentHistory {
    fn head(&self) -> &VersionRecord {
        self.versions.last().expect("history is never empty")
    }

    fn branch_head(&self, branch: &BranchName) -> Option<&VersionRecord> {
        self.versions
            .iter()
            .rev()
            .find(|v| v.branch == *branch)
            .or_else(|| {
                let base = self.branches.get(branch)?.base_version;
                self.versions.iter().find(|v| v.number == base)
            })
    }

    fn find(&self, number: SemVer) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.number == number)
    }
}

/// Append-only version history, branch table, and merge log per document
#[derive(Default)]
pub struct VersionStore {
    inner: Mutex<FxHashMap<DocumentId, DocumentHistory>>,
}

impl VersionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document's history with version `1.0.0` and the mainline
    /// branch
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` when the document already has a
    /// history.
    pub fn create_initial(
        &self,
        document: &Document,
        author: UserId,
        now: Timestamp,
    ) -> Result<VersionRecord> {
        let mut inner = self.inner.lock();
        if inner.contains_key(&document.id) {
            return Err(Error::invalid_input(format!(
                "document {} already has a version history",
                document.id
            )));
        }

        let mut snapshot = document.clone();
        snapshot.version = SemVer::INITIAL;
        let record = VersionRecord::new(
            SemVer::INITIAL,
            snapshot,
            author,
            Vec::new(),
            Some("initial version".to_string()),
            BranchName::main(),
            now,
        );

        let mut branches = HashMap::new();
        branches.insert(
            BranchName::main(),
            Branch::new(BranchName::main(), SemVer::INITIAL, author, now),
        );
        inner.insert(
            document.id,
            DocumentHistory {
                versions: vec![record.clone()],
                branches,
                merges: Vec::new(),
            },
        );
        debug!(document = %document.id, "history seeded at 1.0.0");
        Ok(record)
    }

    /// Whether a history exists for `id`
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.inner.lock().contains_key(id)
    }

    /// The newest version across all branches
    pub fn head(&self, id: &DocumentId) -> Result<VersionRecord> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        Ok(history.head().clone())
    }

    /// The newest version on a branch (the branch base when the branch
    /// has no versions of its own yet)
    pub fn branch_head(&self, id: &DocumentId, branch: &BranchName) -> Result<VersionRecord> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        if !history.branches.contains_key(branch) {
            return Err(Error::branch_not_found(branch));
        }
        history
            .branch_head(branch)
            .cloned()
            .ok_or_else(|| Error::version_not_found(branch))
    }

    /// Validate a write base and compute the number its version would get
    ///
    /// The stale-write check runs against the branch head; the new
    /// number bumps the global head so numbers stay strictly increasing
    /// across the whole history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VersionConflict`] when `base` is not the current
    /// branch head (optimistic concurrency: re-fetch and retry).
    pub fn next_number(
        &self,
        id: &DocumentId,
        branch: &BranchName,
        base: SemVer,
        bump: VersionBump,
    ) -> Result<SemVer> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        Self::validate_base(history, branch, base)?;
        Ok(history.head().number.bump(bump))
    }

    /// Append a version snapshotting `document`
    ///
    /// Runs the same stale-base validation as [`Self::next_number`] and
    /// assigns the number atomically under the store's lock. The
    /// snapshot's `version` field is set to the assigned number.
    pub fn commit_version(
        &self,
        document: &Document,
        changes: Vec<ChangeSet>,
        opts: CreateVersionOptions,
        now: Timestamp,
    ) -> Result<VersionRecord> {
        let mut inner = self.inner.lock();
        let history = inner
            .get_mut(&document.id)
            .ok_or_else(|| Error::document_not_found(document.id))?;
        Self::validate_base(history, &opts.branch, opts.base)?;

        let number = history.head().number.bump(opts.bump);
        let mut snapshot = document.clone();
        snapshot.version = number;
        let record = VersionRecord::new(
            number,
            snapshot,
            opts.author,
            changes,
            opts.message,
            opts.branch,
            now,
        );
        history.versions.push(record.clone());
        debug!(document = %document.id, version = %number, "version appended");
        Ok(record)
    }

    /// Look up one version
    pub fn get_version(&self, id: &DocumentId, number: SemVer) -> Result<VersionRecord> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        history
            .find(number)
            .cloned()
            .ok_or_else(|| Error::version_not_found(number))
    }

    /// History entries, newest first
    pub fn history(&self, id: &DocumentId, filter: &HistoryFilter) -> Result<Vec<VersionRecord>> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        let records = history
            .versions
            .iter()
            .rev()
            .filter(|v| filter.branch.as_ref().map_or(true, |b| v.branch == *b))
            .filter(|v| filter.since.map_or(true, |ts| v.timestamp >= ts))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(records)
    }

    /// Number of retained versions
    pub fn total_versions(&self, id: &DocumentId) -> usize {
        self.inner
            .lock()
            .get(id)
            .map(|h| h.versions.len())
            .unwrap_or(0)
    }

    /// Field-by-field diff of two versions plus a similarity signal
    pub fn compare(&self, id: &DocumentId, a: SemVer, b: SemVer) -> Result<VersionComparison> {
        let (snap_a, snap_b) = {
            let inner = self.inner.lock();
            let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
            let rec_a = history.find(a).ok_or_else(|| Error::version_not_found(a))?;
            let rec_b = history.find(b).ok_or_else(|| Error::version_not_found(b))?;
            (rec_a.snapshot_arc(), rec_b.snapshot_arc())
        };

        let changes = diff_documents(&snap_a, &snap_b);
        let mut added = 0;
        let mut modified = 0;
        let mut removed = 0;
        for change in &changes {
            match change.kind() {
                ChangeKind::Added => added += 1,
                ChangeKind::Modified => modified += 1,
                ChangeKind::Removed => removed += 1,
                ChangeKind::Rollback => {}
            }
        }
        Ok(VersionComparison {
            changes,
            added,
            modified,
            removed,
            similarity: similarity(&snap_a, &snap_b),
        })
    }

    /// Restore the document to `target`'s snapshot by appending
    ///
    /// Never rewrites history: the restored state lands in a *new*
    /// patch-bumped version tagged with a rollback changeset. The
    /// restored snapshot keeps the target's content, metadata, and
    /// permissions; its version and audit fields advance.
    pub fn rollback_to(
        &self,
        id: &DocumentId,
        target: SemVer,
        author: UserId,
        now: Timestamp,
    ) -> Result<VersionRecord> {
        let mut inner = self.inner.lock();
        let history = inner.get_mut(id).ok_or_else(|| Error::document_not_found(id))?;
        let target_record = history
            .find(target)
            .ok_or_else(|| Error::version_not_found(target))?;

        let number = history.head().number.bump(VersionBump::Patch);
        let mut restored = target_record.snapshot().clone();
        restored.version = number;
        restored.touch(author, now);

        let record = VersionRecord::new(
            number,
            restored,
            author,
            vec![ChangeSet::Rollback { to: target }],
            Some(format!("rollback to {}", target)),
            BranchName::main(),
            now,
        );
        history.versions.push(record.clone());
        info!(document = %id, target = %target, new_version = %number, "rolled back");
        Ok(record)
    }

    /// Create a branch pointing at `base` (the global head by default)
    pub fn create_branch(
        &self,
        id: &DocumentId,
        name: BranchName,
        base: Option<SemVer>,
        actor: UserId,
        now: Timestamp,
    ) -> Result<Branch> {
        let mut inner = self.inner.lock();
        let history = inner.get_mut(id).ok_or_else(|| Error::document_not_found(id))?;
        if history.branches.contains_key(&name) {
            return Err(Error::BranchExists { name });
        }
        let base = base.unwrap_or(history.head().number);
        if history.find(base).is_none() {
            return Err(Error::version_not_found(base));
        }
        let branch = Branch::new(name.clone(), base, actor, now);
        history.branches.insert(name, branch.clone());
        debug!(document = %id, branch = %branch.name, base = %base, "branch created");
        Ok(branch)
    }

    /// All branches of a document
    pub fn branches(&self, id: &DocumentId) -> Result<Vec<Branch>> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        let mut branches: Vec<Branch> = history.branches.values().cloned().collect();
        branches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(branches)
    }

    /// One branch of a document
    pub fn branch(&self, id: &DocumentId, name: &BranchName) -> Result<Branch> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        history
            .branches
            .get(name)
            .cloned()
            .ok_or_else(|| Error::branch_not_found(name))
    }

    /// Append a merge audit record without touching versions (blocked
    /// attempts land here)
    pub fn record_merge(&self, id: &DocumentId, record: MergeRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        let history = inner.get_mut(id).ok_or_else(|| Error::document_not_found(id))?;
        history.merges.push(record);
        Ok(())
    }

    /// The merge log, oldest first
    pub fn merges(&self, id: &DocumentId) -> Result<Vec<MergeRecord>> {
        let inner = self.inner.lock();
        let history = inner.get(id).ok_or_else(|| Error::document_not_found(id))?;
        Ok(history.merges.clone())
    }

    /// Commit a merge: append a minor-bumped version of `merged` to the
    /// target line, mark the source branch merged, and log the attempt
    #[allow(clippy::too_many_arguments)]
    pub fn commit_merge(
        &self,
        id: &DocumentId,
        merged: &Document,
        source: &BranchName,
        target: &BranchName,
        actor: UserId,
        strategy: StrategyKind,
        conflict_count: usize,
        forced: bool,
        now: Timestamp,
    ) -> Result<(VersionRecord, MergeRecord)> {
        let mut inner = self.inner.lock();
        let history = inner.get_mut(id).ok_or_else(|| Error::document_not_found(id))?;
        if !history.branches.contains_key(source) {
            return Err(Error::branch_not_found(source));
        }
        if !history.branches.contains_key(target) {
            return Err(Error::branch_not_found(target));
        }

        let target_head = history
            .branch_head(target)
            .cloned()
            .ok_or_else(|| Error::version_not_found(target))?;

        let number = history.head().number.bump(VersionBump::Minor);
        let mut snapshot = merged.clone();
        snapshot.version = number;
        snapshot.touch(actor, now);
        let changes = diff_documents(target_head.snapshot(), &snapshot);
        let record = VersionRecord::new(
            number,
            snapshot,
            actor,
            changes,
            Some(format!("merge {} into {}", source, target)),
            target.clone(),
            now,
        );
        history.versions.push(record.clone());

        if let Some(branch) = history.branches.get_mut(source) {
            branch.mark_merged(actor, now);
        }

        let outcome = if forced {
            MergeOutcome::Forced
        } else {
            MergeOutcome::Merged
        };
        let merge_record = MergeRecord {
            source: source.clone(),
            target: target.clone(),
            timestamp: now,
            actor,
            conflict_count,
            strategy,
            outcome,
            merged_version: Some(number),
        };
        history.merges.push(merge_record.clone());
        info!(
            document = %id,
            source = %source,
            target = %target,
            version = %number,
            outcome = %outcome,
            "branch merged"
        );
        Ok((record, merge_record))
    }

    /// Prune versions outside the retention window
    ///
    /// Always keeps the newest `keep_versions` entries, every live
    /// branch's base and head, and the global head. Returns the number
    /// of versions removed.
    pub fn cleanup(
        &self,
        id: &DocumentId,
        keep_versions: usize,
        keep_days: u64,
        now: Timestamp,
    ) -> Result<usize> {
        let cutoff = now.saturating_sub(Duration::from_secs(keep_days * 24 * 3_600));
        let mut inner = self.inner.lock();
        let history = inner.get_mut(id).ok_or_else(|| Error::document_not_found(id))?;

        // Protect what branch resolution needs: the global head and the
        // resolved head of every live branch (the base record when the
        // branch has no versions of its own yet).
        let mut protected: HashSet<SemVer> = HashSet::new();
        protected.insert(history.head().number);
        for branch in history.branches.values() {
            if branch.merged {
                continue;
            }
            if let Some(head) = history.branch_head(&branch.name) {
                protected.insert(head.number);
            }
        }
        let newest: HashSet<SemVer> = history
            .versions
            .iter()
            .rev()
            .take(keep_versions)
            .map(|v| v.number)
            .collect();

        let before = history.versions.len();
        history.versions.retain(|v| {
            v.timestamp >= cutoff || newest.contains(&v.number) || protected.contains(&v.number)
        });
        let pruned = before - history.versions.len();
        if pruned > 0 {
            info!(document = %id, pruned, "version history pruned");
        }
        Ok(pruned)
    }

    /// Drop a document's entire history (delete without `keep_history`)
    pub fn remove(&self, id: &DocumentId) {
        self.inner.lock().remove(id);
    }

    /// Install a history wholesale (backup restore)
    ///
    /// Rebuilds the branch table from the version tags: each tag becomes
    /// a branch based at its earliest tagged version.
    pub fn install_history(&self, id: DocumentId, versions: Vec<VersionRecord>) -> Result<()> {
        if versions.is_empty() {
            return Err(Error::invalid_input("cannot install an empty history"));
        }
        let mut branches: HashMap<BranchName, Branch> = HashMap::new();
        for record in &versions {
            branches.entry(record.branch.clone()).or_insert_with(|| {
                Branch::new(
                    record.branch.clone(),
                    record.number,
                    record.author,
                    record.timestamp,
                )
            });
        }
        self.inner.lock().insert(
            id,
            DocumentHistory {
                versions,
                branches,
                merges: Vec::new(),
            },
        );
        Ok(())
    }

    fn validate_base(history: &DocumentHistory, branch: &BranchName, base: SemVer) -> Result<()> {
        let head = history
            .branch_head(branch)
            .ok_or_else(|| Error::branch_not_found(branch))?;
        if head.number != base {
            return Err(Error::VersionConflict {
                expected: base,
                actual: head.number,
            });
        }
        Ok(())
    }
}

/// Token-Jaccard similarity over the textual fields of two snapshots
///
/// Advisory only. Two empty documents compare as identical (1.0).
pub fn similarity(a: &Document, b: &Document) -> f64 {
    let tokens = |doc: &Document| -> HashSet<String> {
        let mut set: HashSet<String> = HashSet::new();
        set.extend(tokenize(&doc.title));
        set.extend(tokenize(&doc.description));
        for block in doc.content.text_blocks() {
            set.extend(tokenize(block));
        }
        set
    };
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdb_core::{DocumentContent, Section};
    use proptest::prelude::*;

    fn doc() -> Document {
        Document::new("Pitch", UserId::new()).with_content(DocumentContent::Structured {
            sections: vec![Section::with_body("problem", "Problem", "X")],
        })
    }

    fn opts(base: SemVer, author: UserId) -> CreateVersionOptions {
        CreateVersionOptions {
            bump: VersionBump::Patch,
            message: None,
            base,
            author,
            branch: BranchName::main(),
        }
    }

    fn now() -> Timestamp {
        Timestamp::from_secs(1_000)
    }

    #[test]
    fn test_create_initial_seeds_1_0_0() {
        let store = VersionStore::new();
        let d = doc();
        let record = store.create_initial(&d, d.created_by, now()).unwrap();
        assert_eq!(record.number, SemVer::INITIAL);
        assert_eq!(record.snapshot().version, SemVer::INITIAL);
        assert_eq!(store.total_versions(&d.id), 1);

        // Seeding twice is rejected
        assert!(store.create_initial(&d, d.created_by, now()).is_err());
    }

    #[test]
    fn test_commit_version_bumps_and_snapshots() {
        let store = VersionStore::new();
        let mut d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();

        d.title = "Pitch v2".into();
        let record = store
            .commit_version(
                &d,
                vec![],
                CreateVersionOptions {
                    bump: VersionBump::Minor,
                    ..opts(SemVer::INITIAL, d.created_by)
                },
                now(),
            )
            .unwrap();
        assert_eq!(record.number, SemVer::new(1, 1, 0));
        assert_eq!(record.snapshot().title, "Pitch v2");
        assert_eq!(record.snapshot().version, SemVer::new(1, 1, 0));
    }

    #[test]
    fn test_stale_base_rejected() {
        let store = VersionStore::new();
        let d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();
        store
            .commit_version(&d, vec![], opts(SemVer::INITIAL, d.created_by), now())
            .unwrap();

        // Another writer presenting the old base is rejected
        let err = store
            .commit_version(&d, vec![], opts(SemVer::INITIAL, d.created_by), now())
            .unwrap_err();
        match err {
            Error::VersionConflict { expected, actual } => {
                assert_eq!(expected, SemVer::INITIAL);
                assert_eq!(actual, SemVer::new(1, 0, 1));
            }
            other => panic!("expected VersionConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_rollback_appends_never_rewrites() {
        let store = VersionStore::new();
        let mut d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();

        d.content.sections_mut().unwrap()[0].body = "Y".into();
        store
            .commit_version(
                &d,
                vec![],
                CreateVersionOptions {
                    bump: VersionBump::Minor,
                    ..opts(SemVer::INITIAL, d.created_by)
                },
                now(),
            )
            .unwrap();

        let before = store.total_versions(&d.id);
        let record = store
            .rollback_to(&d.id, SemVer::INITIAL, d.created_by, now())
            .unwrap();

        assert_eq!(store.total_versions(&d.id), before + 1);
        assert_eq!(record.number, SemVer::new(1, 1, 1));
        // Restored content equals the target snapshot's
        assert_eq!(record.snapshot().content.sections()[0].body, "X");
        assert!(matches!(
            record.changes[0],
            ChangeSet::Rollback { to } if to == SemVer::INITIAL
        ));
        // The target record itself is untouched
        let target = store.get_version(&d.id, SemVer::INITIAL).unwrap();
        assert_eq!(target.snapshot().content.sections()[0].body, "X");
    }

    #[test]
    fn test_rollback_to_missing_version() {
        let store = VersionStore::new();
        let d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();
        assert!(matches!(
            store.rollback_to(&d.id, SemVer::new(9, 9, 9), d.created_by, now()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_branch_create_and_head_resolution() {
        let store = VersionStore::new();
        let mut d = doc();
        let author = d.created_by;
        store.create_initial(&d, author, now()).unwrap();

        let feature = BranchName::new("feature").unwrap();
        let branch = store
            .create_branch(&d.id, feature.clone(), None, author, now())
            .unwrap();
        assert_eq!(branch.base_version, SemVer::INITIAL);

        // With no versions of its own, the branch resolves to its base
        let head = store.branch_head(&d.id, &feature).unwrap();
        assert_eq!(head.number, SemVer::INITIAL);

        // A version on the branch moves its head; main stays put
        d.title = "branch work".into();
        store
            .commit_version(
                &d,
                vec![],
                CreateVersionOptions {
                    branch: feature.clone(),
                    ..opts(SemVer::INITIAL, author)
                },
                now(),
            )
            .unwrap();
        assert_eq!(
            store.branch_head(&d.id, &feature).unwrap().number,
            SemVer::new(1, 0, 1)
        );
        assert_eq!(
            store.branch_head(&d.id, &BranchName::main()).unwrap().number,
            SemVer::INITIAL
        );
    }

    #[test]
    fn test_duplicate_branch_rejected() {
        let store = VersionStore::new();
        let d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();
        let name = BranchName::new("feature").unwrap();
        store
            .create_branch(&d.id, name.clone(), None, d.created_by, now())
            .unwrap();
        assert!(matches!(
            store.create_branch(&d.id, name, None, d.created_by, now()),
            Err(Error::BranchExists { .. })
        ));
    }

    #[test]
    fn test_commit_merge_appends_minor_and_marks_source() {
        let store = VersionStore::new();
        let mut d = doc();
        let author = d.created_by;
        store.create_initial(&d, author, now()).unwrap();
        let feature = BranchName::new("feature").unwrap();
        store
            .create_branch(&d.id, feature.clone(), None, author, now())
            .unwrap();

        d.title = "merged title".into();
        let (record, merge_record) = store
            .commit_merge(
                &d.id,
                &d,
                &feature,
                &BranchName::main(),
                author,
                StrategyKind::Automatic,
                0,
                false,
                now(),
            )
            .unwrap();

        assert_eq!(record.number, SemVer::new(1, 1, 0));
        assert_eq!(record.branch, BranchName::main());
        assert_eq!(merge_record.outcome, MergeOutcome::Merged);
        assert_eq!(merge_record.merged_version, Some(record.number));
        assert!(store.branch(&d.id, &feature).unwrap().merged);
        assert_eq!(store.merges(&d.id).unwrap().len(), 1);
    }

    #[test]
    fn test_compare_counts_and_similarity() {
        let store = VersionStore::new();
        let mut d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();
        d.content.sections_mut().unwrap()[0].body = "X but longer now".into();
        d.metadata.tags = vec!["q3".into()];
        store
            .commit_version(&d, vec![], opts(SemVer::INITIAL, d.created_by), now())
            .unwrap();

        let cmp = store
            .compare(&d.id, SemVer::INITIAL, SemVer::new(1, 0, 1))
            .unwrap();
        assert_eq!(cmp.modified, 2); // section body + tags
        assert_eq!(cmp.added, 0);
        assert!(cmp.similarity > 0.0 && cmp.similarity < 1.0);
    }

    #[test]
    fn test_similarity_bounds() {
        let a = doc();
        assert!((similarity(&a, &a) - 1.0).abs() < f64::EPSILON);

        let mut b = a.clone();
        b.title = "completely different words".into();
        b.content = DocumentContent::Freeform {
            body: "nothing in common whatsoever".into(),
        };
        let s = similarity(&a, &b);
        assert!(s < 0.5);
    }

    #[test]
    fn test_history_filters() {
        let store = VersionStore::new();
        let mut d = doc();
        let author = d.created_by;
        store.create_initial(&d, author, now()).unwrap();

        let feature = BranchName::new("feature").unwrap();
        store
            .create_branch(&d.id, feature.clone(), None, author, now())
            .unwrap();
        d.title = "on feature".into();
        store
            .commit_version(
                &d,
                vec![],
                CreateVersionOptions {
                    branch: feature.clone(),
                    ..opts(SemVer::INITIAL, author)
                },
                Timestamp::from_secs(2_000),
            )
            .unwrap();

        let all = store.history(&d.id, &HistoryFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].number, SemVer::new(1, 0, 1));

        let on_feature = store
            .history(
                &d.id,
                &HistoryFilter {
                    branch: Some(feature),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(on_feature.len(), 1);

        let limited = store
            .history(
                &d.id,
                &HistoryFilter {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_cleanup_protects_branch_base_and_newest() {
        let store = VersionStore::new();
        let mut d = doc();
        let author = d.created_by;
        // Old versions at t=1000
        store.create_initial(&d, author, now()).unwrap();
        for i in 0..4 {
            d.title = format!("v{}", i);
            let base = store.head(&d.id).unwrap().number;
            store
                .commit_version(&d, vec![], opts(base, author), now())
                .unwrap();
        }
        // A live branch pinned at an old version
        let feature = BranchName::new("feature").unwrap();
        store
            .create_branch(&d.id, feature, Some(SemVer::new(1, 0, 2)), author, now())
            .unwrap();

        // Much later: keep 2 versions, 1-day window
        let later = Timestamp::from_secs(1_000 + 10 * 24 * 3_600);
        let pruned = store.cleanup(&d.id, 2, 1, later).unwrap();

        let remaining: Vec<SemVer> = store
            .history(&d.id, &HistoryFilter::default())
            .unwrap()
            .iter()
            .map(|v| v.number)
            .collect();
        assert!(pruned > 0);
        // Newest two retained
        assert!(remaining.contains(&SemVer::new(1, 0, 4)));
        assert!(remaining.contains(&SemVer::new(1, 0, 3)));
        // Live branch base retained even though it is old
        assert!(remaining.contains(&SemVer::new(1, 0, 2)));
        // Everything else pruned
        assert!(!remaining.contains(&SemVer::INITIAL));
        assert!(!remaining.contains(&SemVer::new(1, 0, 1)));
    }

    #[test]
    fn test_install_history_rebuilds_branches() {
        let store = VersionStore::new();
        let d = doc();
        store.create_initial(&d, d.created_by, now()).unwrap();
        let history = store.history(&d.id, &HistoryFilter::default()).unwrap();

        let restored = VersionStore::new();
        restored.install_history(d.id, history).unwrap();
        assert_eq!(restored.total_versions(&d.id), 1);
        assert!(restored.branch(&d.id, &BranchName::main()).is_ok());
    }

    proptest! {
        /// Version numbers in a history are strictly increasing no matter
        /// which bumps are requested.
        #[test]
        fn prop_version_monotonicity(bumps in proptest::collection::vec(0u8..3, 1..24)) {
            let store = VersionStore::new();
            let d = doc();
            let author = d.created_by;
            store.create_initial(&d, author, Timestamp::from_secs(1)).unwrap();

            for (i, b) in bumps.iter().enumerate() {
                let bump = match b {
                    0 => VersionBump::Major,
                    1 => VersionBump::Minor,
                    _ => VersionBump::Patch,
                };
                let base = store.head(&d.id).unwrap().number;
                store
                    .commit_version(
                        &d,
                        vec![],
                        CreateVersionOptions { bump, ..opts(base, author) },
                        Timestamp::from_secs(2 + i as u64),
                    )
                    .unwrap();
            }

            let history = store.history(&d.id, &HistoryFilter::default()).unwrap();
            // Newest-first: every entry strictly greater than the next
            for pair in history.windows(2) {
                prop_assert!(pair[0].number > pair[1].number);
            }
        }
    }
}
