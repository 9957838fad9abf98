//! The lock manager
//!
//! Owns the lock table, the expiry index, and the wait registry; every
//! public operation takes the manager's mutex, sweeps due expiries
//! against the injected clock, then proceeds. Expired locks are
//! recovered locally — expiry never surfaces as an error.
//!
//! State machine per (document, scope):
//! `Unlocked → Held(exclusive | shared ×n) → Unlocked` on release or
//! expiry.
//!
//! Acquisition is first-come-first-served per key; there is no
//! starvation guarantee beyond TTL-bounded waits. A blocked acquisition
//! whose blocker (transitively) waits on the requester is surfaced as
//! [`Error::DeadlockRisk`] instead of [`Error::LockConflict`], unless
//! the requester forces past the gate.

use draftdb_core::{
    Conflict, ConflictPayload, DocumentId, Error, FieldPath, HolderId, Lock, LockId, LockKey,
    LockMode, LockPriority, LockScope, Result, Timestamp,
};
use draftdb_storage::TtlIndex;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::deadlock::{DeadlockEstimator, WaitForGraphEstimator, WaitGraph};
use crate::lock_table::{build_lock, LockTable};

/// Lock manager tuning knobs
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// TTL applied when a request does not specify one
    pub default_ttl: Duration,
    /// Upper bound on any requested TTL
    pub max_ttl: Duration,
    /// Risk score at or above which a blocked acquisition is surfaced
    /// as deadlock risk
    pub deadlock_threshold: f64,
    /// How long a recorded wait edge stays relevant
    pub wait_edge_ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            default_ttl: Duration::from_secs(30),
            max_ttl: Duration::from_secs(3_600),
            deadlock_threshold: 0.75,
            wait_edge_ttl: Duration::from_secs(30),
        }
    }
}

/// Parameters of one acquisition attempt
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    /// What to lock
    pub key: LockKey,
    /// Who is asking
    pub holder: HolderId,
    /// Exclusive or shared
    pub mode: LockMode,
    /// Requested TTL; the manager applies its default when absent
    pub ttl: Option<Duration>,
    /// Scheduling priority (recorded on the lock)
    pub priority: LockPriority,
    /// Optional free-text reason
    pub reason: Option<String>,
    /// Bypass the deadlock-risk gate (never steals a held lock)
    pub force: bool,
}

impl AcquireRequest {
    /// An exclusive request with defaults
    pub fn exclusive(key: LockKey, holder: impl Into<HolderId>) -> Self {
        AcquireRequest {
            key,
            holder: holder.into(),
            mode: LockMode::Exclusive,
            ttl: None,
            priority: LockPriority::Normal,
            reason: None,
            force: false,
        }
    }

    /// A shared request with defaults
    pub fn shared(key: LockKey, holder: impl Into<HolderId>) -> Self {
        AcquireRequest {
            mode: LockMode::Shared,
            ..Self::exclusive(key, holder)
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: LockPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Bypass the deadlock-risk gate
    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

struct WaitEdge {
    on: HolderId,
    recorded_at: Timestamp,
}

struct ManagerInner {
    table: LockTable,
    expiry: TtlIndex<LockId>,
    waits: FxHashMap<HolderId, WaitEdge>,
}

/// Multi-granularity lock manager with TTL auto-release
pub struct LockManager {
    config: LockConfig,
    clock: Arc<dyn Clock>,
    estimator: Box<dyn DeadlockEstimator>,
    inner: Mutex<ManagerInner>,
}

impl LockManager {
    /// Create a manager on the system clock
    pub fn new(config: LockConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager on an injected clock (tests drive time by hand)
    pub fn with_clock(config: LockConfig, clock: Arc<dyn Clock>) -> Self {
        LockManager {
            config,
            clock,
            estimator: Box::new(WaitForGraphEstimator),
            inner: Mutex::new(ManagerInner {
                table: LockTable::new(),
                expiry: TtlIndex::new(),
                waits: FxHashMap::default(),
            }),
        }
    }

    /// Swap in a different deadlock scoring function
    pub fn with_estimator(mut self, estimator: Box<dyn DeadlockEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Attempt to acquire a lock
    ///
    /// # Errors
    ///
    /// - [`Error::LockConflict`] when a foreign lock on an overlapping
    ///   scope blocks the request
    /// - [`Error::DeadlockRisk`] when the blocker (transitively) waits on
    ///   the requester and `force` is not set
    pub fn acquire(&self, request: AcquireRequest) -> Result<Lock> {
        if let Some(reason) = &request.reason {
            if reason.len() > draftdb_core::limits::MAX_LOCK_REASON_LEN {
                return Err(Error::invalid_input(format!(
                    "lock reason exceeds {} bytes",
                    draftdb_core::limits::MAX_LOCK_REASON_LEN
                )));
            }
        }
        let now = self.clock.now();
        let ttl = request.ttl.unwrap_or(self.config.default_ttl).min(self.config.max_ttl);

        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);
        Self::prune_wait_edges(&mut inner, now, self.config.wait_edge_ttl);

        let blocking = inner
            .table
            .blocking(
                &request.key.document,
                &request.key.scope,
                request.mode,
                &request.holder,
            )
            .map(|l| (l.holder.clone(), l.expires_at));
        if let Some((blocker, blocker_expiry)) = blocking {
            let graph: WaitGraph = inner
                .waits
                .iter()
                .map(|(who, edge)| (who.clone(), edge.on.clone()))
                .collect();
            let score = self.estimator.score(&request.holder, &blocker, &graph);

            inner.waits.insert(
                request.holder.clone(),
                WaitEdge {
                    on: blocker.clone(),
                    recorded_at: now,
                },
            );

            if score >= self.config.deadlock_threshold && !request.force {
                let suggested_wait = blocker_expiry
                    .duration_since(now)
                    .filter(|d| !d.is_zero())
                    .unwrap_or(Duration::from_millis(250));
                warn!(
                    holder = %request.holder,
                    blocker = %blocker,
                    score,
                    "acquisition gated on deadlock risk"
                );
                return Err(Error::DeadlockRisk {
                    score,
                    suggested_wait,
                });
            }

            debug!(
                key = %request.key,
                holder = %request.holder,
                blocker = %blocker,
                "lock denied"
            );
            return Err(Error::LockConflict {
                holder: blocker,
                expires_at: blocker_expiry,
            });
        }

        // Re-acquire by the same holder refreshes the TTL in place.
        let expires_at = now.saturating_add(ttl);
        let refreshed = inner
            .table
            .held_by_mut(
                &request.key.document,
                &request.key.scope,
                request.mode,
                &request.holder,
            )
            .map(|existing| {
                let old_expiry = existing.expires_at;
                existing.expires_at = expires_at;
                (existing.clone(), old_expiry)
            });
        if let Some((lock, old_expiry)) = refreshed {
            inner.expiry.remove(old_expiry, &lock.id);
            inner.expiry.insert(expires_at, lock.id);
            inner.waits.remove(&request.holder);
            debug!(key = %request.key, holder = %request.holder, "lock refreshed");
            return Ok(lock);
        }

        let lock = build_lock(
            request.key.clone(),
            request.holder.clone(),
            request.mode,
            now,
            expires_at,
            request.reason,
            request.priority,
        );
        inner.expiry.insert(expires_at, lock.id);
        inner.table.insert(lock.clone());
        inner.waits.remove(&request.holder);
        debug!(key = %request.key, holder = %request.holder, mode = %request.mode, "lock granted");
        Ok(lock)
    }

    /// Release a lock
    ///
    /// The holder must match the grant unless `force` is set
    /// (administrative override, always logged).
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when no live lock exists on the key
    /// - [`Error::LockConflict`] when the lock belongs to someone else
    ///   and `force` is not set
    pub fn release(&self, key: &LockKey, holder: &HolderId, force: bool) -> Result<Lock> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);

        let mut own = inner.table.remove(key, Some(holder));
        if let Some(lock) = own.pop() {
            inner.expiry.remove(lock.expires_at, &lock.id);
            debug!(key = %key, holder = %holder, "lock released");
            return Ok(lock);
        }

        let foreign = inner
            .table
            .locks_on(&key.document)
            .iter()
            .find(|l| l.key.scope == key.scope)
            .cloned();
        match foreign {
            None => Err(Error::NotFound {
                kind: draftdb_core::ResourceKind::Lock,
                id: key.to_string(),
            }),
            Some(lock) if !force => Err(Error::LockConflict {
                holder: lock.holder,
                expires_at: lock.expires_at,
            }),
            Some(lock) => {
                warn!(
                    key = %key,
                    owner = %lock.holder,
                    releaser = %holder,
                    "forced lock release (administrative override)"
                );
                let removed = inner.table.remove(key, Some(&lock.holder));
                for l in &removed {
                    inner.expiry.remove(l.expires_at, &l.id);
                }
                Ok(lock)
            }
        }
    }

    /// Drop every expired lock now, returning them
    ///
    /// The same sweep runs implicitly at the head of every operation;
    /// this entry point exists for callers that want to observe expiries.
    pub fn purge_expired(&self) -> Vec<Lock> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let due = inner.expiry.take_expired(now);
        let mut expired = Vec::with_capacity(due.len());
        for id in due {
            if let Some(lock) = inner.table.remove_by_id(&id) {
                expired.push(lock);
            }
        }
        if !expired.is_empty() {
            debug!(count = expired.len(), "locks auto-released");
        }
        expired
    }

    /// All live locks on a document, any granularity
    pub fn locks_on(&self, document: &DocumentId) -> Vec<Lock> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);
        inner.table.locks_on(document).to_vec()
    }

    /// Whether `holder` already holds a lock covering `scope`
    pub fn holds_covering(
        &self,
        document: &DocumentId,
        scope: &LockScope,
        holder: &HolderId,
    ) -> bool {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);
        inner.table.holds_covering(document, scope, holder)
    }

    /// Report every foreign lock on a document as a potential-access
    /// conflict, severity scaled by granularity (document > section >
    /// field)
    pub fn detect_conflicts(&self, document: &DocumentId, requester: &HolderId) -> Vec<Conflict> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);
        inner
            .table
            .locks_on(document)
            .iter()
            .filter(|l| l.holder != *requester)
            .map(|l| {
                Conflict::new(
                    *document,
                    ConflictPayload::Access {
                        holder: l.holder.clone(),
                        granularity: l.key.scope.granularity(),
                    },
                    scope_path(&l.key.scope),
                    now,
                )
            })
            .collect()
    }

    /// Number of live locks (after sweeping)
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        self.sweep(&mut inner, now);
        inner.table.len()
    }

    /// Whether no locks are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, inner: &mut ManagerInner, now: Timestamp) {
        let due = inner.expiry.take_expired(now);
        for id in due {
            if let Some(lock) = inner.table.remove_by_id(&id) {
                debug!(key = %lock.key, holder = %lock.holder, "lock expired");
            }
        }
    }

    fn prune_wait_edges(inner: &mut ManagerInner, now: Timestamp, ttl: Duration) {
        inner
            .waits
            .retain(|_, edge| edge.recorded_at.saturating_add(ttl) > now);
    }
}

/// Path label for a lock scope, used on access conflicts
fn scope_path(scope: &LockScope) -> FieldPath {
    match scope {
        LockScope::Document => FieldPath::top("document"),
        LockScope::Section(s) => FieldPath::top(&format!("content.sections.{}", s)),
        LockScope::Field(f) => match &f.section {
            Some(section) => FieldPath::section(section, &f.name),
            None => FieldPath::top(&f.name),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use draftdb_core::{ConflictKind, FieldRef, Severity};

    fn manager() -> (LockManager, Arc<ManualClock>) {
        let clock = ManualClock::starting_at(Timestamp::from_secs(1_000));
        let manager = LockManager::with_clock(LockConfig::default(), clock.clone());
        (manager, clock)
    }

    #[test]
    fn test_exclusive_then_foreign_exclusive_fails() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "alice"))
            .unwrap();

        let err = manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "bob"))
            .unwrap_err();
        match err {
            Error::LockConflict { holder, .. } => assert_eq!(holder.as_str(), "alice"),
            other => panic!("expected LockConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_shared_co_grant() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(AcquireRequest::shared(LockKey::document(doc), "alice"))
            .unwrap();
        manager
            .acquire(AcquireRequest::shared(LockKey::document(doc), "bob"))
            .unwrap();
        assert_eq!(manager.len(), 2);

        // Exclusive against the shared pair is blocked
        assert!(manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "carol"))
            .is_err());
    }

    #[test]
    fn test_ttl_auto_release() {
        let (manager, clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(
                AcquireRequest::exclusive(LockKey::document(doc), "alice")
                    .with_ttl(Duration::from_millis(100)),
            )
            .unwrap();

        // Before expiry, bob is blocked
        assert!(manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "bob"))
            .is_err());

        // After expiry, the lock is gone and bob succeeds
        clock.advance(Duration::from_millis(150));
        let lock = manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "bob"))
            .unwrap();
        assert_eq!(lock.holder.as_str(), "bob");
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_document_lock_blocks_section_and_field() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc), "alice"))
            .unwrap();

        assert!(manager
            .acquire(AcquireRequest::exclusive(
                LockKey::section(doc, "problem"),
                "bob"
            ))
            .is_err());
        assert!(manager
            .acquire(AcquireRequest::exclusive(
                LockKey::field(doc, FieldRef::in_section("problem", "body")),
                "bob"
            ))
            .is_err());
    }

    #[test]
    fn test_disjoint_fields_grant_independently() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(AcquireRequest::exclusive(
                LockKey::field(doc, FieldRef::in_section("problem", "body")),
                "alice",
            ))
            .unwrap();
        manager
            .acquire(AcquireRequest::exclusive(
                LockKey::field(doc, FieldRef::in_section("solution", "body")),
                "bob",
            ))
            .unwrap();
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_reacquire_refreshes_ttl() {
        let (manager, clock) = manager();
        let doc = DocumentId::new();
        let key = LockKey::document(doc);

        let first = manager
            .acquire(
                AcquireRequest::exclusive(key.clone(), "alice").with_ttl(Duration::from_secs(10)),
            )
            .unwrap();

        clock.advance(Duration::from_secs(8));
        let second = manager
            .acquire(
                AcquireRequest::exclusive(key.clone(), "alice").with_ttl(Duration::from_secs(10)),
            )
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.expires_at > first.expires_at);

        // The original expiry has passed but the refreshed lock lives on
        clock.advance(Duration::from_secs(4));
        assert!(manager
            .acquire(AcquireRequest::exclusive(key, "bob"))
            .is_err());
    }

    #[test]
    fn test_release_requires_matching_holder() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();
        let key = LockKey::document(doc);

        manager
            .acquire(AcquireRequest::exclusive(key.clone(), "alice"))
            .unwrap();

        let err = manager
            .release(&key, &HolderId::new("bob"), false)
            .unwrap_err();
        assert!(matches!(err, Error::LockConflict { .. }));

        // Forced release works and empties the table
        manager.release(&key, &HolderId::new("bob"), true).unwrap();
        assert!(manager.is_empty());
    }

    #[test]
    fn test_release_missing_lock_is_not_found() {
        let (manager, _clock) = manager();
        let key = LockKey::document(DocumentId::new());
        let err = manager
            .release(&key, &HolderId::new("alice"), false)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_deadlock_risk_gates_circular_wait() {
        let (manager, _clock) = manager();
        let doc_a = DocumentId::new();
        let doc_b = DocumentId::new();

        // alice holds A, bob holds B
        manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc_a), "alice"))
            .unwrap();
        manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc_b), "bob"))
            .unwrap();

        // bob tries A: plain conflict, records bob → alice
        let err = manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc_a), "bob"))
            .unwrap_err();
        assert!(matches!(err, Error::LockConflict { .. }));

        // alice tries B: blocker bob waits on alice — circular, gated
        let err = manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc_b), "alice"))
            .unwrap_err();
        match err {
            Error::DeadlockRisk { score, suggested_wait } => {
                assert!(score >= 0.75);
                assert!(!suggested_wait.is_zero());
            }
            other => panic!("expected DeadlockRisk, got {:?}", other),
        }

        // force bypasses the gate but still cannot steal the lock
        let err = manager
            .acquire(AcquireRequest::exclusive(LockKey::document(doc_b), "alice").forced())
            .unwrap_err();
        assert!(matches!(err, Error::LockConflict { .. }));
    }

    #[test]
    fn test_detect_conflicts_severity_by_granularity() {
        let (manager, _clock) = manager();
        let doc = DocumentId::new();

        manager
            .acquire(AcquireRequest::shared(LockKey::document(doc), "alice"))
            .unwrap();
        manager
            .acquire(AcquireRequest::shared(LockKey::section(doc, "problem"), "bob"))
            .unwrap();
        manager
            .acquire(AcquireRequest::shared(
                LockKey::field(doc, FieldRef::in_section("problem", "body")),
                "carol",
            ))
            .unwrap();

        let conflicts = manager.detect_conflicts(&doc, &HolderId::new("dave"));
        assert_eq!(conflicts.len(), 3);
        assert!(conflicts.iter().all(|c| c.kind() == ConflictKind::Access));

        let severities: Vec<Severity> = conflicts.iter().map(|c| c.severity).collect();
        assert!(severities.contains(&Severity::High)); // document lock
        assert!(severities.contains(&Severity::Medium)); // section lock
        assert!(severities.contains(&Severity::Low)); // field lock

        // The requester's own locks are not conflicts
        let own = manager.detect_conflicts(&doc, &HolderId::new("alice"));
        assert_eq!(own.len(), 2);
    }

    #[test]
    fn test_purge_expired_returns_locks() {
        let (manager, clock) = manager();
        let doc = DocumentId::new();
        manager
            .acquire(
                AcquireRequest::exclusive(LockKey::document(doc), "alice")
                    .with_ttl(Duration::from_millis(50)),
            )
            .unwrap();

        clock.advance(Duration::from_millis(100));
        let expired = manager.purge_expired();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].holder.as_str(), "alice");
        assert!(manager.is_empty());
    }
}
