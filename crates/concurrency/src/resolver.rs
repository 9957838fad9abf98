//! Conflict resolution strategies
//!
//! A [`ResolutionStrategy`] turns one detected conflict into an outcome.
//! Three implementations are registered by name:
//!
//! - `manual` — always defers; the conflict is surfaced to the caller
//! - `automatic` — fixed policy per conflict kind: metadata and derived
//!   content take the most recently modified side, everything else is
//!   refused
//! - `assisted-merge` — scores a proposed resolution; below the
//!   confidence floor the result is a suggestion, not an applied change
//!
//! Outcomes are never silently dropped — the caller records every one in
//! the [`crate::ConflictLog`].

use draftdb_core::{
    Conflict, ConflictKind, ResolutionOutcome, ResolutionRecord, Severity, Side, StrategyKind,
    Timestamp,
};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Timestamps the strategies resolve against
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext {
    /// When the original (stored) side was last modified
    pub original_modified_at: Timestamp,
    /// When the modified (incoming) side was last modified
    pub modified_modified_at: Timestamp,
}

impl ResolutionContext {
    /// The side that was written most recently (ties go to the incoming
    /// side, matching last-writer-wins)
    pub fn most_recent(&self) -> Side {
        if self.original_modified_at > self.modified_modified_at {
            Side::Original
        } else {
            Side::Modified
        }
    }
}

/// A pluggable resolution strategy
pub trait ResolutionStrategy: Send + Sync {
    /// Which registry entry this is
    fn kind(&self) -> StrategyKind;

    /// Process one conflict
    fn resolve(&self, conflict: &Conflict, ctx: &ResolutionContext) -> ResolutionOutcome;
}

/// Always defers to a human
#[derive(Debug, Default, Clone, Copy)]
pub struct Manual;

impl ResolutionStrategy for Manual {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Manual
    }

    fn resolve(&self, _conflict: &Conflict, _ctx: &ResolutionContext) -> ResolutionOutcome {
        ResolutionOutcome::Deferred
    }
}

/// Fixed policy per conflict kind
///
/// Metadata and derived-content conflicts take the most recent side
/// (last-writer-wins is acceptable there); every other kind is refused
/// with a reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct Automatic;

impl ResolutionStrategy for Automatic {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Automatic
    }

    fn resolve(&self, conflict: &Conflict, ctx: &ResolutionContext) -> ResolutionOutcome {
        match conflict.kind() {
            ConflictKind::Metadata | ConflictKind::DerivedContent => ResolutionOutcome::Resolved {
                winner: ctx.most_recent(),
            },
            kind => ResolutionOutcome::Failed {
                reason: format!("{:?} conflicts require manual resolution", kind),
            },
        }
    }
}

/// Scoring function used by [`AssistedMerge`]
pub type ConfidenceScorer = dyn Fn(&Conflict, &ResolutionContext) -> (Side, f64) + Send + Sync;

/// Confidence-scored merge with suggestion fallback
///
/// Proposals below `min_confidence` are returned as suggestions rather
/// than applied changes. The scorer is pluggable; the default derives
/// confidence from severity and kind.
pub struct AssistedMerge {
    min_confidence: f64,
    scorer: Box<ConfidenceScorer>,
}

impl AssistedMerge {
    /// Default confidence floor
    pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

    /// Create with the default floor and scorer
    pub fn new() -> Self {
        Self::with_min_confidence(Self::DEFAULT_MIN_CONFIDENCE)
    }

    /// Create with a custom confidence floor
    pub fn with_min_confidence(min_confidence: f64) -> Self {
        AssistedMerge {
            min_confidence,
            scorer: Box::new(default_scorer),
        }
    }

    /// Swap in a custom scoring function
    pub fn with_scorer(
        mut self,
        scorer: impl Fn(&Conflict, &ResolutionContext) -> (Side, f64) + Send + Sync + 'static,
    ) -> Self {
        self.scorer = Box::new(scorer);
        self
    }
}

impl Default for AssistedMerge {
    fn default() -> Self {
        Self::new()
    }
}

/// Default confidence heuristic
///
/// Low-severity metadata scores well above the floor; medium severity
/// lands below it (suggestion); manual-only kinds score zero.
fn default_scorer(conflict: &Conflict, ctx: &ResolutionContext) -> (Side, f64) {
    let winner = ctx.most_recent();
    let confidence = match (conflict.kind(), conflict.severity) {
        (ConflictKind::Metadata, Severity::Low) => 0.9,
        (ConflictKind::DerivedContent, _) => 0.8,
        (ConflictKind::Metadata, _) => 0.6,
        (ConflictKind::Content, _) => 0.5,
        _ => 0.0,
    };
    (winner, confidence)
}

impl ResolutionStrategy for AssistedMerge {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AssistedMerge
    }

    fn resolve(&self, conflict: &Conflict, ctx: &ResolutionContext) -> ResolutionOutcome {
        match conflict.kind() {
            // Access control and format changes must be explicit
            ConflictKind::Permissions | ConflictKind::Structural | ConflictKind::Access => {
                ResolutionOutcome::Deferred
            }
            _ => {
                let (winner, confidence) = (self.scorer)(conflict, ctx);
                if confidence >= self.min_confidence {
                    ResolutionOutcome::Resolved { winner }
                } else {
                    ResolutionOutcome::Suggested { winner, confidence }
                }
            }
        }
    }
}

static MANUAL: Lazy<Arc<dyn ResolutionStrategy>> = Lazy::new(|| Arc::new(Manual));
static AUTOMATIC: Lazy<Arc<dyn ResolutionStrategy>> = Lazy::new(|| Arc::new(Automatic));
static ASSISTED: Lazy<Arc<dyn ResolutionStrategy>> = Lazy::new(|| Arc::new(AssistedMerge::new()));

/// Look up a registered strategy
pub fn strategy(kind: StrategyKind) -> Arc<dyn ResolutionStrategy> {
    match kind {
        StrategyKind::Manual => Arc::clone(&MANUAL),
        StrategyKind::Automatic => Arc::clone(&AUTOMATIC),
        StrategyKind::AssistedMerge => Arc::clone(&ASSISTED),
    }
}

/// Run a strategy over a batch of conflicts, producing one record each
pub fn resolve_all(
    conflicts: &[Conflict],
    strategy: &dyn ResolutionStrategy,
    ctx: &ResolutionContext,
    now: Timestamp,
) -> Vec<ResolutionRecord> {
    conflicts
        .iter()
        .map(|conflict| ResolutionRecord {
            conflict: conflict.clone(),
            strategy: strategy.kind(),
            outcome: strategy.resolve(conflict, ctx),
            resolved_at: now,
        })
        .collect()
}
