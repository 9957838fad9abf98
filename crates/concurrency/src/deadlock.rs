//! Deadlock-risk estimation
//!
//! Granting a lock to a requester who is blocked by a holder that is
//! itself (transitively) waiting on the requester would close a wait
//! cycle. The estimator walks the wait-for graph and returns a score in
//! [0, 1]; the manager gates acquisition when the score crosses its
//! threshold. The scoring function is pluggable — the graph walk here is
//! a heuristic, not a proof of deadlock freedom.

use draftdb_core::HolderId;
use rustc_hash::FxHashMap;

/// Who is currently waiting on whom. One outstanding wait per holder.
pub type WaitGraph = FxHashMap<HolderId, HolderId>;

/// Pluggable deadlock scoring function
pub trait DeadlockEstimator: Send + Sync {
    /// Estimate the risk that `requester` waiting on `blocker` closes a
    /// cycle, given the current wait-for graph
    fn score(&self, requester: &HolderId, blocker: &HolderId, waits: &WaitGraph) -> f64;
}

/// Default estimator: walk the wait-for graph from the blocker
///
/// If the blocker reaches the requester in one hop the score is 0.9;
/// each additional hop costs 0.1. The walk is bounded, so degenerate
/// graphs cannot loop.
#[derive(Debug, Default, Clone, Copy)]
pub struct WaitForGraphEstimator;

impl WaitForGraphEstimator {
    /// Longest chain the walk will follow
    const MAX_HOPS: usize = 8;
}

impl DeadlockEstimator for WaitForGraphEstimator {
    fn score(&self, requester: &HolderId, blocker: &HolderId, waits: &WaitGraph) -> f64 {
        if requester == blocker {
            return 0.0;
        }
        let mut current = blocker;
        for hop in 0..Self::MAX_HOPS {
            match waits.get(current) {
                Some(next) if next == requester => {
                    return (0.9 - 0.1 * hop as f64).max(0.1);
                }
                Some(next) => current = next,
                None => return 0.0,
            }
        }
        0.0
    }
}
