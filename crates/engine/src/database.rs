//! The storage facade
//!
//! [`DocumentStore`] composes the primary store, cache, search index,
//! lock manager, version store, conflict log, event bus, and backup
//! archive behind one surface. Each call is one logical operation:
//!
//! ```text
//! save:   integrity → conflict detection → lock → stale check →
//!         persist → version append → cache → index → backup → release
//! get:    cache hit | primary load + cache repopulate (+ metadata)
//! delete: foreign-lock check → backup → remove everywhere
//! search: index candidates → filter → sort → paginate → hydrate
//! ```
//!
//! Writes are serialized behind one mutex so a concurrent save's
//! stale-base check always observes the previous save's committed
//! version. No table lock is held across backup I/O except within that
//! write section.

use draftdb_concurrency::{
    detect, resolve_all, strategy, AcquireRequest, Clock, ConflictLog, LockManager, ManualClock,
    ResolutionContext, SystemClock,
};
use draftdb_core::{
    diff_documents, Branch, BranchName, Conflict, ConflictPayload, Document, DocumentId, Error,
    FieldPath, HolderId, Lock, LockKey, LockScope, MergeOutcome, MergeRecord, ResolutionOutcome,
    ResolutionRecord, Result, SemVer, Side, StrategyKind, Timestamp, UserId, VersionRecord,
};
use draftdb_durability::{BackupEntry, BackupStore, BundleError, BundleInfo};
use draftdb_storage::{CacheStats, DocumentCache, MemoryStore, PrimaryStore, SearchIndex};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::events::{EventBus, StoreEvent};
use crate::integrity;
use crate::options::{
    DeleteOptions, DeleteReport, DocumentView, GetOptions, MergeOptions, SaveOptions, SaveOutcome,
    SearchQuery, SearchResults, SortBy, SortOrder, VersionSummary,
};
use crate::version_store::{CreateVersionOptions, HistoryFilter, VersionComparison, VersionStore};

/// Result of a merge that was allowed to proceed
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// How the merge ended (`Merged` or `Forced`)
    pub outcome: MergeOutcome,
    /// The version appended to the target line
    pub merged_version: SemVer,
    /// Every conflict detected between the branch heads
    pub conflicts: Vec<Conflict>,
    /// The strategy's outcome for each conflict
    pub resolutions: Vec<ResolutionRecord>,
}

/// Counters describing the store's current footprint
#[derive(Debug, Clone, Copy)]
pub struct StoreStats {
    /// Documents in the primary store
    pub documents: usize,
    /// Live locks across all documents
    pub live_locks: usize,
    /// Cache counters
    pub cache: CacheStats,
    /// Documents in the search index
    pub indexed: usize,
}

/// The unified document store
///
/// Safe to share across threads (`&self` everywhere); every internal
/// table is owned by one component and synchronized behind it.
pub struct DocumentStore {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn PrimaryStore>,
    cache: DocumentCache,
    index: SearchIndex,
    locks: LockManager,
    versions: VersionStore,
    conflict_log: ConflictLog,
    backups: Option<BackupStore>,
    events: EventBus,
    write_serial: Mutex<()>,
}

impl DocumentStore {
    /// Open a store on the system clock with the in-memory primary store
    pub fn open(config: EngineConfig) -> Result<Self> {
        Self::open_with(config, Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    /// Open a store on a manual clock (tests drive time by hand)
    pub fn open_with_clock(config: EngineConfig, clock: Arc<ManualClock>) -> Result<Self> {
        Self::open_with(config, Arc::new(MemoryStore::new()), clock)
    }

    /// Open a store with explicit primary store and clock
    pub fn open_with(
        config: EngineConfig,
        store: Arc<dyn PrimaryStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let backups = match &config.backup_dir {
            Some(dir) => Some(BackupStore::open(dir).map_err(bundle_err)?),
            None => None,
        };
        Ok(DocumentStore {
            cache: DocumentCache::new(config.cache_ttl),
            index: SearchIndex::new(),
            locks: LockManager::with_clock(config.lock.clone(), Arc::clone(&clock)),
            versions: VersionStore::new(),
            conflict_log: ConflictLog::new(),
            events: EventBus::new(config.event_capacity),
            write_serial: Mutex::new(()),
            backups,
            clock,
            store,
            config,
        })
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Save a document
    ///
    /// Pipeline: integrity check, conflict detection against the stored
    /// snapshot (when the caller's base is stale), lock acquisition
    /// (skipped if the caller already holds a covering lock), stale-base
    /// validation, persist, version append, cache and index update,
    /// optional backup, lock release.
    ///
    /// On any failure after lock acquisition the lock is released and no
    /// version is appended unless persistence succeeded first.
    pub fn save(&self, mut document: Document, options: SaveOptions) -> Result<SaveOutcome> {
        let now = self.clock.now();
        integrity::check_document(&document)?;
        if let Some(message) = &options.message {
            if message.len() > draftdb_core::limits::MAX_VERSION_MESSAGE_LEN {
                return Err(Error::integrity(
                    "message",
                    format!(
                        "exceeds {} bytes",
                        draftdb_core::limits::MAX_VERSION_MESSAGE_LEN
                    ),
                ));
            }
        }

        let actor = options.actor.unwrap_or(document.last_modified_by);
        let holder = options
            .holder
            .clone()
            .unwrap_or_else(|| HolderId::new(actor.to_string()));

        let _guard = self.write_serial.lock();
        let stored = self.store.load(&document.id)?;
        let is_new = stored.is_none();
        let on_main = options.branch.is_main();
        let mut base = options.base_version.unwrap_or(document.version);

        // A stale base means the caller's edit raced another commit:
        // diff the stored state against the incoming one. Branch-line
        // saves are checked against the branch head instead (below).
        if let Some(stored_doc) = stored.as_ref().filter(|_| on_main) {
            if stored_doc.version != base {
                let conflicts = detect(stored_doc, &document, now);
                if !conflicts.is_empty() {
                    self.conflict_log.record_conflicts(document.id, &conflicts);
                    self.events.emit(StoreEvent::ConflictsDetected {
                        id: document.id,
                        count: conflicts.len(),
                    });
                    if !options.force {
                        debug!(document = %document.id, count = conflicts.len(), "save blocked by conflicts");
                        return Ok(SaveOutcome::Conflicted { conflicts });
                    }
                }
                if options.force {
                    // Forced overwrite: last writer wins, conflicts stay
                    // recorded in the log.
                    base = stored_doc.version;
                }
            }
        }

        let already_held =
            self.locks
                .holds_covering(&document.id, &LockScope::Document, &holder);
        let acquired = if already_held {
            None
        } else {
            let request = AcquireRequest {
                key: LockKey::document(document.id),
                holder: holder.clone(),
                mode: options.lock_mode,
                ttl: options.lock_ttl,
                priority: Default::default(),
                reason: Some("save".to_string()),
                force: options.force,
            };
            let lock = self.locks.acquire(request)?;
            self.events.emit(StoreEvent::LockAcquired { lock: lock.clone() });
            Some(lock)
        };

        let result = self.save_locked(&mut document, &options, stored.as_ref(), base, actor, now);

        if let Some(lock) = acquired {
            match self.locks.release(&lock.key, &holder, false) {
                Ok(_) => self.events.emit(StoreEvent::LockReleased {
                    key: lock.key,
                    holder: holder.clone(),
                    forced: false,
                }),
                // The lock may have expired mid-operation; that is
                // recovered locally, not an error.
                Err(e) => debug!(error = %e, "save lock already gone at release"),
            }
        }

        let (snapshot, version) = result?;
        info!(
            document = %snapshot.id,
            version = ?version,
            new = is_new,
            "document saved"
        );
        self.events.emit(StoreEvent::DocumentSaved {
            id: snapshot.id,
            version,
            author: actor,
        });
        Ok(SaveOutcome::Saved {
            document: snapshot,
            version,
        })
    }

    fn save_locked(
        &self,
        document: &mut Document,
        options: &SaveOptions,
        stored: Option<&Document>,
        base: SemVer,
        actor: UserId,
        now: Timestamp,
    ) -> Result<(Arc<Document>, Option<SemVer>)> {
        document.touch(actor, now);
        document.recompute_stats();

        let has_history = self.versions.contains(&document.id);
        let on_main = options.branch.is_main();
        if !on_main && !has_history {
            // A branch line can only exist on a versioned document
            return Err(Error::branch_not_found(&options.branch));
        }

        // Compute the number first so the persisted state carries it;
        // the version record is appended only after persistence succeeds.
        let next = if options.create_version {
            if has_history {
                let base = if on_main && stored.is_none() {
                    // Re-saving a deleted document whose history was
                    // kept: continue from the mainline head.
                    self.versions
                        .branch_head(&document.id, &options.branch)?
                        .number
                } else {
                    base
                };
                let next =
                    self.versions
                        .next_number(&document.id, &options.branch, base, options.bump)?;
                document.version = next;
                Some((next, base))
            } else {
                document.version = SemVer::INITIAL;
                Some((SemVer::INITIAL, base))
            }
        } else {
            None
        };

        // Only the mainline is materialized in the primary store; branch
        // lines live purely in the version history.
        if on_main {
            self.store.persist(document)?;
        }

        let (snapshot, version) = match next {
            Some((_, base)) if has_history => {
                let head = self.versions.branch_head(&document.id, &options.branch)?;
                let changes = diff_documents(head.snapshot(), document);
                let record = self.versions.commit_version(
                    document,
                    changes,
                    CreateVersionOptions {
                        bump: options.bump,
                        message: options.message.clone(),
                        base,
                        author: actor,
                        branch: options.branch.clone(),
                    },
                    now,
                )?;
                (record.snapshot_arc(), Some(record.number))
            }
            Some(_) => {
                let record = self.versions.create_initial(document, actor, now)?;
                (record.snapshot_arc(), Some(record.number))
            }
            None => (Arc::new(document.clone()), None),
        };

        if on_main {
            self.cache.put(Arc::clone(&snapshot), now);
            self.index.upsert(document);
        }

        if options.create_backup {
            self.backup_document(document, now)?;
        }
        Ok((snapshot, version))
    }

    // =========================================================================
    // Get
    // =========================================================================

    /// Fetch a document, never mutating anything but the cache
    ///
    /// Returns `Ok(None)` when the document does not exist.
    pub fn get(&self, id: &DocumentId, options: GetOptions) -> Result<Option<DocumentView>> {
        let now = self.clock.now();
        let cached = if options.bypass_cache {
            None
        } else {
            self.cache.get(id, now)
        };
        let document = match cached {
            Some(doc) => doc,
            None => match self.store.load(id)? {
                Some(doc) => {
                    let arc = Arc::new(doc);
                    self.cache.put(Arc::clone(&arc), now);
                    arc
                }
                None => return Ok(None),
            },
        };

        let locks = options
            .include_lock_info
            .then(|| self.locks.locks_on(id));
        let version = if options.include_version_info && self.versions.contains(id) {
            let head = self.versions.head(id)?;
            Some(VersionSummary {
                current: head.number,
                total_versions: self.versions.total_versions(id),
                last_author: head.author,
                last_modified: head.timestamp,
            })
        } else {
            None
        };
        let conflicts = options
            .include_conflict_history
            .then(|| self.conflict_log.conflicts_for(id));

        Ok(Some(DocumentView {
            document,
            locks,
            version,
            conflicts,
        }))
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a document from the store, cache, and index
    ///
    /// Blocked by a foreign lock unless `force` is set. Optionally keeps
    /// the version history and conflict log, and writes a final backup.
    pub fn delete(&self, id: &DocumentId, options: DeleteOptions) -> Result<DeleteReport> {
        let now = self.clock.now();
        let _guard = self.write_serial.lock();

        let document = self
            .store
            .load(id)?
            .ok_or_else(|| Error::document_not_found(id))?;

        let holder = options
            .holder
            .clone()
            .unwrap_or_else(|| HolderId::new("engine"));
        if !options.force {
            if let Some(blocking) = self
                .locks
                .locks_on(id)
                .into_iter()
                .find(|l| l.holder != holder)
            {
                return Err(Error::LockConflict {
                    holder: blocking.holder,
                    expires_at: blocking.expires_at,
                });
            }
        }

        if options.create_backup {
            self.backup_document(&document, now)?;
        }

        self.store.remove(id)?;
        self.cache.invalidate(id);
        self.index.remove(id);
        if !options.keep_history {
            self.versions.remove(id);
            self.conflict_log.clear_document(id);
        }

        info!(document = %id, keep_history = options.keep_history, "document deleted");
        self.events.emit(StoreEvent::DocumentDeleted {
            id: *id,
            deleted_at: now,
        });
        Ok(DeleteReport { deleted_at: now })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Search stored documents
    ///
    /// Index lookup, attribute filters, sort, paginate, hydrate.
    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        let mut candidates: HashSet<DocumentId> = match &query.text {
            Some(text) => self.index.matching_text(text),
            None => self.index.all_ids(),
        };
        if let Some(doc_type) = query.doc_type {
            candidates = candidates
                .intersection(&self.index.with_type(doc_type))
                .copied()
                .collect();
        }
        if let Some(status) = query.status {
            candidates = candidates
                .intersection(&self.index.with_status(status))
                .copied()
                .collect();
        }
        for tag in &query.tags {
            candidates = candidates
                .intersection(&self.index.with_tag(tag))
                .copied()
                .collect();
        }

        let mut docs = Vec::with_capacity(candidates.len());
        for id in candidates {
            if let Some(doc) = self.store.load(&id)? {
                docs.push(doc);
            }
        }
        let total = docs.len();

        docs.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::Title => a.title.cmp(&b.title),
            };
            match query.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let hits = docs
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        Ok(SearchResults { hits, total })
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Acquire a lock on behalf of a collaborator
    pub fn acquire_lock(&self, request: AcquireRequest) -> Result<Lock> {
        let lock = self.locks.acquire(request)?;
        self.events.emit(StoreEvent::LockAcquired { lock: lock.clone() });
        Ok(lock)
    }

    /// Release a lock; `force` is the administrative override
    pub fn release_lock(&self, key: &LockKey, holder: &HolderId, force: bool) -> Result<Lock> {
        let lock = self.locks.release(key, holder, force)?;
        self.events.emit(StoreEvent::LockReleased {
            key: key.clone(),
            holder: holder.clone(),
            forced: force,
        });
        Ok(lock)
    }

    /// Every live lock on a document
    pub fn document_locks(&self, id: &DocumentId) -> Vec<Lock> {
        self.locks.locks_on(id)
    }

    /// Foreign locks on a document reported as potential-access conflicts
    pub fn lock_conflicts(&self, id: &DocumentId, requester: &HolderId) -> Vec<Conflict> {
        self.locks.detect_conflicts(id, requester)
    }

    // =========================================================================
    // Conflicts
    // =========================================================================

    /// Detect conflicts between two snapshots (pure; nothing recorded)
    pub fn detect_conflicts(&self, original: &Document, modified: &Document) -> Vec<Conflict> {
        detect(original, modified, self.clock.now())
    }

    /// Apply a named strategy to a batch of conflicts
    ///
    /// Every outcome is recorded in the conflict log and returned.
    pub fn resolve_conflicts(
        &self,
        id: &DocumentId,
        conflicts: &[Conflict],
        kind: StrategyKind,
        ctx: &ResolutionContext,
    ) -> Vec<ResolutionRecord> {
        let now = self.clock.now();
        let records = resolve_all(conflicts, &*strategy(kind), ctx, now);
        self.conflict_log.record_resolutions(*id, &records);
        records
    }

    /// Every conflict recorded for a document
    pub fn conflict_history(&self, id: &DocumentId) -> Vec<Conflict> {
        self.conflict_log.conflicts_for(id)
    }

    /// Every resolution recorded for a document
    pub fn resolution_history(&self, id: &DocumentId) -> Vec<ResolutionRecord> {
        self.conflict_log.resolutions_for(id)
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Version history, newest first
    pub fn version_history(
        &self,
        id: &DocumentId,
        filter: &HistoryFilter,
    ) -> Result<Vec<VersionRecord>> {
        self.versions.history(id, filter)
    }

    /// One version record
    pub fn get_version(&self, id: &DocumentId, number: SemVer) -> Result<VersionRecord> {
        self.versions.get_version(id, number)
    }

    /// Field-by-field comparison of two versions
    pub fn compare_versions(
        &self,
        id: &DocumentId,
        a: SemVer,
        b: SemVer,
    ) -> Result<VersionComparison> {
        self.versions.compare(id, a, b)
    }

    /// Restore a document to an earlier version's snapshot
    ///
    /// Appends a new patch-bumped version (history is never rewritten),
    /// persists the restored state, and returns it. `create_backup`
    /// bundles the pre-rollback state first.
    pub fn restore_to_version(
        &self,
        id: &DocumentId,
        target: SemVer,
        actor: UserId,
        create_backup: bool,
    ) -> Result<Document> {
        let now = self.clock.now();
        let _guard = self.write_serial.lock();

        if create_backup {
            let current = self
                .store
                .load(id)?
                .ok_or_else(|| Error::document_not_found(id))?;
            self.backup_document(&current, now)?;
        }

        let record = self.versions.rollback_to(id, target, actor, now)?;
        self.store.persist(record.snapshot())?;
        self.cache.put(record.snapshot_arc(), now);
        self.index.upsert(record.snapshot());

        self.events.emit(StoreEvent::VersionRestored {
            id: *id,
            restored: target,
            new_version: record.number,
        });
        Ok(record.snapshot().clone())
    }

    /// Prune version history per the configured retention policy
    pub fn cleanup_versions(&self, id: &DocumentId) -> Result<usize> {
        self.versions.cleanup(
            id,
            self.config.keep_versions,
            self.config.keep_days,
            self.clock.now(),
        )
    }

    // =========================================================================
    // Branches
    // =========================================================================

    /// Create a branch pointing at `base` (the head by default)
    pub fn create_branch(
        &self,
        id: &DocumentId,
        name: BranchName,
        base: Option<SemVer>,
        actor: UserId,
    ) -> Result<Branch> {
        let branch = self
            .versions
            .create_branch(id, name, base, actor, self.clock.now())?;
        self.events.emit(StoreEvent::BranchCreated {
            id: *id,
            name: branch.name.clone(),
        });
        Ok(branch)
    }

    /// All branches of a document
    pub fn branches(&self, id: &DocumentId) -> Result<Vec<Branch>> {
        self.versions.branches(id)
    }

    /// Resolve a branch to its newest version
    pub fn resolve_branch(&self, id: &DocumentId, name: &BranchName) -> Result<VersionRecord> {
        self.versions.branch_head(id, name)
    }

    /// The merge audit log, oldest first
    pub fn merge_log(&self, id: &DocumentId) -> Result<Vec<MergeRecord>> {
        self.versions.merges(id)
    }

    /// Merge one branch into another
    ///
    /// Three-way: a path conflicts only when both sides changed it since
    /// the source branch's base (falling back to the plain two-snapshot
    /// diff when the base version has been pruned). Conflicts run
    /// through the configured strategy first; unresolved ones block the
    /// merge with [`Error::UnresolvedConflicts`] unless `force` is set,
    /// in which case they are recorded and the source side wins.
    /// Target-side changes the source never touched survive the merge.
    /// A merge into the mainline also updates the primary store.
    ///
    /// Every attempt — blocked included — appends a [`MergeRecord`].
    pub fn merge_branch(
        &self,
        id: &DocumentId,
        source: &BranchName,
        target: &BranchName,
        options: MergeOptions,
    ) -> Result<MergeReport> {
        let now = self.clock.now();
        let _guard = self.write_serial.lock();

        let source_head = self.versions.branch_head(id, source)?;
        let target_head = self.versions.branch_head(id, target)?;

        let base_version = self.versions.branch(id, source)?.base_version;
        let base_snapshot = self
            .versions
            .get_version(id, base_version)
            .ok()
            .map(|r| r.snapshot_arc());

        let full = detect(target_head.snapshot(), source_head.snapshot(), now);
        let (conflicts, target_only) = match &base_snapshot {
            Some(base) => {
                let ours = detect(base, target_head.snapshot(), now);
                let theirs: HashSet<FieldPath> = detect(base, source_head.snapshot(), now)
                    .into_iter()
                    .map(|c| c.path)
                    .collect();
                let ours_paths: HashSet<FieldPath> =
                    ours.iter().map(|c| c.path.clone()).collect();
                let conflicts: Vec<Conflict> = full
                    .into_iter()
                    .filter(|c| ours_paths.contains(&c.path) && theirs.contains(&c.path))
                    .collect();
                let target_only: Vec<Conflict> = ours
                    .into_iter()
                    .filter(|c| !theirs.contains(&c.path))
                    .collect();
                (conflicts, target_only)
            }
            // Base pruned: be conservative, treat every divergence as a
            // conflict.
            None => (full, Vec::new()),
        };

        let ctx = ResolutionContext {
            original_modified_at: target_head.timestamp,
            modified_modified_at: source_head.timestamp,
        };
        let resolutions = resolve_all(&conflicts, &*strategy(options.strategy), &ctx, now);
        if !conflicts.is_empty() {
            self.conflict_log.record_conflicts(*id, &conflicts);
            self.conflict_log.record_resolutions(*id, &resolutions);
            self.events.emit(StoreEvent::ConflictsDetected {
                id: *id,
                count: conflicts.len(),
            });
        }

        let unresolved: Vec<Conflict> = resolutions
            .iter()
            .filter(|r| !r.outcome.is_resolved())
            .map(|r| r.conflict.clone())
            .collect();

        if !unresolved.is_empty() && !options.force {
            self.versions.record_merge(
                id,
                MergeRecord {
                    source: source.clone(),
                    target: target.clone(),
                    timestamp: now,
                    actor: options.actor,
                    conflict_count: unresolved.len(),
                    strategy: options.strategy,
                    outcome: MergeOutcome::Blocked,
                    merged_version: None,
                },
            )?;
            self.events.emit(StoreEvent::BranchMerged {
                id: *id,
                source: source.clone(),
                target: target.clone(),
                outcome: MergeOutcome::Blocked,
            });
            warn!(document = %id, source = %source, target = %target, "merge blocked");
            return Err(Error::UnresolvedConflicts {
                conflicts: unresolved,
            });
        }

        // The source side is the merge base. Target-side changes the
        // source never touched are carried over, as are conflicts the
        // strategy resolved in the target's favor.
        let mut merged = source_head.snapshot().clone();
        for kept in &target_only {
            apply_target_side(&mut merged, kept, target_head.snapshot());
        }
        for resolution in &resolutions {
            if let ResolutionOutcome::Resolved {
                winner: Side::Original,
            } = resolution.outcome
            {
                apply_target_side(&mut merged, &resolution.conflict, target_head.snapshot());
            }
        }

        let forced = !unresolved.is_empty();
        let (record, merge_record) = self.versions.commit_merge(
            id,
            &merged,
            source,
            target,
            options.actor,
            options.strategy,
            conflicts.len(),
            forced,
            now,
        )?;

        if target.is_main() {
            self.store.persist(record.snapshot())?;
            self.cache.put(record.snapshot_arc(), now);
            self.index.upsert(record.snapshot());
        }

        self.events.emit(StoreEvent::BranchMerged {
            id: *id,
            source: source.clone(),
            target: target.clone(),
            outcome: merge_record.outcome,
        });
        Ok(MergeReport {
            outcome: merge_record.outcome,
            merged_version: record.number,
            conflicts,
            resolutions,
        })
    }

    // =========================================================================
    // Backups
    // =========================================================================

    /// Write a backup bundle for a stored document now
    pub fn create_backup(&self, id: &DocumentId) -> Result<BundleInfo> {
        let document = self
            .store
            .load(id)?
            .ok_or_else(|| Error::document_not_found(id))?;
        self.backup_document(&document, self.clock.now())
    }

    /// All backup bundles for a document, newest first
    pub fn list_backups(&self, id: &DocumentId) -> Result<Vec<BackupEntry>> {
        self.backups()?.list(id).map_err(bundle_err)
    }

    /// Restore a document from its most recent backup bundle
    ///
    /// Re-persists the bundled snapshot and, when the bundle carries a
    /// history and none is live, reinstalls it.
    pub fn restore_from_backup(&self, id: &DocumentId) -> Result<Document> {
        let now = self.clock.now();
        let _guard = self.write_serial.lock();

        let data = self.backups()?.restore_latest(id).map_err(bundle_err)?;
        let document = data.document;
        self.store.persist(&document)?;
        let arc = Arc::new(document.clone());
        self.cache.put(arc, now);
        self.index.upsert(&document);

        if let Some(history) = data.versions {
            if !self.versions.contains(id) && !history.is_empty() {
                self.versions.install_history(*id, history)?;
            }
        }
        info!(document = %id, "restored from backup");
        Ok(document)
    }

    fn backup_document(&self, document: &Document, now: Timestamp) -> Result<BundleInfo> {
        let backups = self.backups()?;
        let history = if self.versions.contains(&document.id) {
            let mut records = self
                .versions
                .history(&document.id, &HistoryFilter::default())?;
            records.reverse(); // bundles store oldest first
            Some(records)
        } else {
            None
        };
        let info = backups
            .create(document, history.as_deref(), now)
            .map_err(bundle_err)?;
        backups
            .prune(&document.id, self.config.keep_backups)
            .map_err(bundle_err)?;
        self.events.emit(StoreEvent::BackupCreated {
            id: document.id,
            path: info.path.clone(),
        });
        Ok(info)
    }

    fn backups(&self) -> Result<&BackupStore> {
        self.backups
            .as_ref()
            .ok_or_else(|| Error::invalid_input("backups are not configured (no backup_dir)"))
    }

    // =========================================================================
    // Events & stats
    // =========================================================================

    /// Subscribe to store events
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Current footprint counters
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            documents: self.store.len(),
            live_locks: self.locks.len(),
            cache: self.cache.stats(),
            indexed: self.index.len(),
        }
    }
}

/// Copy the target side's current value for a conflicted field into the
/// merged document
fn apply_target_side(merged: &mut Document, conflict: &Conflict, target: &Document) {
    match &conflict.payload {
        ConflictPayload::Content { section, .. } => {
            let target_body = target
                .content
                .section(section)
                .map(|s| s.body.clone());
            if let (Some(body), Some(sections)) = (target_body, merged.content.sections_mut()) {
                if let Some(sec) = sections.iter_mut().find(|s| s.id == *section) {
                    sec.body = body;
                }
            }
        }
        ConflictPayload::Metadata { field, .. } => {
            use draftdb_core::MetadataField;
            match field {
                MetadataField::Category => {
                    merged.metadata.category = target.metadata.category.clone()
                }
                MetadataField::Tags => merged.metadata.tags = target.metadata.tags.clone(),
                MetadataField::Status => merged.metadata.status = target.metadata.status,
                MetadataField::Visibility => {
                    merged.metadata.visibility = target.metadata.visibility
                }
            }
        }
        ConflictPayload::Permissions { role, .. } => {
            use draftdb_core::PermissionRole;
            match role {
                PermissionRole::Editors => {
                    merged.permissions.editors = target.permissions.editors.clone()
                }
                PermissionRole::Viewers => {
                    merged.permissions.viewers = target.permissions.viewers.clone()
                }
                PermissionRole::Commenters => {
                    merged.permissions.commenters = target.permissions.commenters.clone()
                }
            }
        }
        ConflictPayload::Structural { .. } => {
            merged.content = target.content.clone();
        }
        ConflictPayload::DerivedContent { .. } => {
            merged.metadata.ai_generated = target.metadata.ai_generated;
        }
        ConflictPayload::Access { .. } => {}
    }
}

fn bundle_err(e: BundleError) -> Error {
    match e {
        BundleError::Io(io) => Error::Io(io),
        BundleError::MissingEntry(what) => Error::backup_not_found(what),
        other => Error::Storage(other.to_string()),
    }
}
