//! Store events
//!
//! An explicit bounded channel replaces callback listeners: collaborators
//! (notification and activity services) subscribe and drain at their own
//! pace. Delivery is best-effort — a subscriber whose queue is full
//! misses that event, and a disconnected subscriber is dropped on the
//! next emit. The storage core never blocks on a listener.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use draftdb_core::{
    BranchName, DocumentId, HolderId, Lock, LockKey, MergeOutcome, SemVer, Timestamp, UserId,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::warn;

/// Something the store did that collaborators may care about
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A save committed
    DocumentSaved {
        /// The document
        id: DocumentId,
        /// The version the save produced, when versioning was on
        version: Option<SemVer>,
        /// Who saved
        author: UserId,
    },
    /// A document was deleted
    DocumentDeleted {
        /// The document
        id: DocumentId,
        /// When
        deleted_at: Timestamp,
    },
    /// A lock was granted
    LockAcquired {
        /// The grant
        lock: Lock,
    },
    /// A lock was released (manually; expiry is silent)
    LockReleased {
        /// What was released
        key: LockKey,
        /// Who released it
        holder: HolderId,
        /// Whether it was an administrative override
        forced: bool,
    },
    /// Conflict detection found collisions
    ConflictsDetected {
        /// The document
        id: DocumentId,
        /// How many conflicts
        count: usize,
    },
    /// A branch was created
    BranchCreated {
        /// The document
        id: DocumentId,
        /// The branch
        name: BranchName,
    },
    /// A merge attempt finished
    BranchMerged {
        /// The document
        id: DocumentId,
        /// Source branch
        source: BranchName,
        /// Target branch
        target: BranchName,
        /// How it ended
        outcome: MergeOutcome,
    },
    /// A rollback appended a restoring version
    VersionRestored {
        /// The document
        id: DocumentId,
        /// The version whose snapshot was restored
        restored: SemVer,
        /// The new version carrying that snapshot
        new_version: SemVer,
    },
    /// A backup bundle was written
    BackupCreated {
        /// The document
        id: DocumentId,
        /// Where the bundle lives
        path: PathBuf,
    },
}

/// Bounded fan-out event channel
///
/// Each subscriber gets its own bounded queue; `emit` never blocks.
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl EventBus {
    /// Create a bus whose subscriber queues hold `capacity` events
    pub fn new(capacity: usize) -> Self {
        EventBus {
            capacity,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe; the receiver sees every event emitted from now on
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber
    ///
    /// Full queues drop the event for that subscriber; disconnected
    /// subscribers are removed.
    pub fn emit(&self, event: StoreEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("event subscriber queue full; event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved_event() -> StoreEvent {
        StoreEvent::DocumentSaved {
            id: DocumentId::new(),
            version: Some(SemVer::INITIAL),
            author: UserId::new(),
        }
    }

    #[test]
    fn test_subscribe_and_receive() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();

        let event = saved_event();
        bus.emit(event.clone());
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[test]
    fn test_fan_out_to_all_subscribers() {
        let bus = EventBus::new(8);
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.emit(saved_event());
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn test_full_queue_drops_event_without_blocking() {
        let bus = EventBus::new(1);
        let rx = bus.subscribe();

        bus.emit(saved_event());
        bus.emit(saved_event()); // queue full, dropped

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        // Subscriber still registered
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_disconnected_subscriber_removed() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe();
        drop(rx);

        bus.emit(saved_event());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
