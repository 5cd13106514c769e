//! Per-session pending-foal cache.
//!
//! Each session owns exactly one [`FoalSlot`], created lazily in the
//! session's storage on first access. The slot holds the last published
//! value, the lifecycle phase, and the subscribers. Publishing replaces the
//! value and notifies every live subscriber.
//!
//! ## State machine
//!
//! ```text
//! Absent --start--> Submitting --signed--> Confirming --refresh--> Pending | Absent
//!                        |
//!                        +--rejected--> (previous phase)
//! ```

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::PendingFoal;
use crate::client::ContractClient;
use crate::session::Session;

/// Storage key of the slot inside a session.
const SLOT_KEY: &str = "speedh.pending_foal";

/// Lifecycle phase of a session's pending foal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FoalPhase {
    /// No pending foal.
    Absent,
    /// A transaction is being signed.
    Submitting,
    /// A transaction was submitted and awaits inclusion.
    Confirming,
    /// A pending foal exists.
    Pending,
}

impl FoalPhase {
    /// Resting phase for a cached value.
    #[must_use]
    pub const fn resting(foal: Option<&PendingFoal>) -> Self {
        if foal.is_some() {
            Self::Pending
        } else {
            Self::Absent
        }
    }

    /// Whether a transaction is in flight.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Submitting | Self::Confirming)
    }
}

/// What subscribers receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoalSnapshot {
    /// Cached value.
    pub foal: Option<PendingFoal>,
    /// Phase at publication time.
    pub phase: FoalPhase,
    /// Monotonic publication counter.
    pub revision: u64,
}

/// Identifies one subscriber of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A live subscription. Dropping it stops delivery at the next publication.
#[derive(Debug)]
pub struct FoalSubscription {
    id: ListenerId,
    receiver: Receiver<FoalSnapshot>,
}

impl FoalSubscription {
    /// Identifier for [`FoalSlot::unsubscribe`].
    #[must_use]
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Raw channel.
    #[must_use]
    pub const fn receiver(&self) -> &Receiver<FoalSnapshot> {
        &self.receiver
    }

    /// Drains queued snapshots and returns the newest, if any.
    #[must_use]
    pub fn latest(&self) -> Option<FoalSnapshot> {
        self.receiver.try_iter().last()
    }
}

struct SlotState {
    foal: Option<PendingFoal>,
    phase: FoalPhase,
    revision: u64,
    next_listener: u64,
    listeners: Vec<(ListenerId, Sender<FoalSnapshot>)>,
}

impl SlotState {
    fn snapshot(&self) -> FoalSnapshot {
        FoalSnapshot {
            foal: self.foal.clone(),
            phase: self.phase,
            revision: self.revision,
        }
    }

    fn notify(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.listeners
            .retain(|(_, sender)| sender.send(snapshot.clone()).is_ok());
    }
}

/// One session's pending-foal cache cell.
pub struct FoalSlot {
    state: Mutex<SlotState>,
    // Serializes mutating operations of one session.
    gate: tokio::sync::Mutex<()>,
}

impl Default for FoalSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FoalSlot {
    /// Empty slot in the `Absent` phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                foal: None,
                phase: FoalPhase::Absent,
                revision: 0,
                next_listener: 0,
                listeners: Vec::new(),
            }),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Waits until no other operation of this session is in flight.
    pub(crate) async fn begin_operation(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Cached value. Never touches the network.
    #[must_use]
    pub fn value(&self) -> Option<PendingFoal> {
        self.state.lock().foal.clone()
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FoalPhase {
        self.state.lock().phase
    }

    /// Value, phase and revision together.
    #[must_use]
    pub fn snapshot(&self) -> FoalSnapshot {
        self.state.lock().snapshot()
    }

    /// Replaces the value and settles the phase. Returns the new revision.
    pub fn publish(&self, foal: Option<PendingFoal>) -> u64 {
        let mut state = self.state.lock();
        state.phase = FoalPhase::resting(foal.as_ref());
        state.foal = foal;
        state.notify();
        state.revision
    }

    /// Enters a transient phase without changing the value.
    pub(crate) fn enter(&self, phase: FoalPhase) {
        let mut state = self.state.lock();
        if state.phase != phase {
            state.phase = phase;
            state.notify();
        }
    }

    /// Returns to the resting phase of the cached value.
    pub(crate) fn settle(&self) {
        let mut state = self.state.lock();
        let resting = FoalPhase::resting(state.foal.as_ref());
        if state.phase != resting {
            state.phase = resting;
            state.notify();
        }
    }

    /// Registers a subscriber. The current snapshot is delivered immediately.
    #[must_use]
    pub fn subscribe(&self) -> FoalSubscription {
        let (sender, receiver) = unbounded();
        let mut state = self.state.lock();
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        // Unbounded and freshly created, so this cannot fail.
        let _ = sender.send(state.snapshot());
        state.listeners.push((id, sender));
        FoalSubscription { id, receiver }
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.state.lock().listeners.retain(|(l, _)| *l != id);
    }

    /// Live subscribers.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

/// Reads and refreshes sessions' pending-foal slots.
#[derive(Clone)]
pub struct FoalStateStore {
    client: Arc<ContractClient>,
}

impl FoalStateStore {
    /// Store reading through `client`.
    #[must_use]
    pub fn new(client: Arc<ContractClient>) -> Self {
        Self { client }
    }

    /// Contract client in use.
    #[must_use]
    pub fn client(&self) -> &Arc<ContractClient> {
        &self.client
    }

    /// The session's slot, created `Absent` on first access.
    #[must_use]
    pub fn slot(&self, session: &Session) -> Arc<FoalSlot> {
        session.storage().get_or_init(SLOT_KEY, FoalSlot::new)
    }

    /// Last published value. Never touches the network.
    #[must_use]
    pub fn current(&self, session: &Session) -> Option<PendingFoal> {
        self.slot(session).value()
    }

    /// Re-reads the pending foal and publishes the result.
    ///
    /// No bound account publishes `None` without a network call. A failed
    /// read is logged and published as `None`.
    pub async fn refresh(&self, session: &Session) -> Option<PendingFoal> {
        let slot = self.slot(session);
        let Some(owner) = session.address() else {
            slot.publish(None);
            return None;
        };

        let foal = match self.client.pending_foal(session.chain_id(), owner).await {
            Ok(foal) => foal,
            Err(error) => {
                warn!(%owner, chain_id = session.chain_id(), %error, "pending foal read failed");
                None
            }
        };
        let revision = slot.publish(foal.clone());
        debug!(%owner, revision, present = foal.is_some(), "pending foal refreshed");
        foal
    }

    /// Subscribes to the session's slot and schedules a refresh.
    ///
    /// The subscriber sees the cached snapshot first, then the refreshed one.
    pub async fn watch(&self, session: &Session) -> FoalSubscription {
        let subscription = self.slot(session).subscribe();
        self.refresh(session).await;
        subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foal(points: u64) -> PendingFoal {
        PendingFoal {
            total_points: points,
            ..PendingFoal::default()
        }
    }

    #[test]
    fn test_new_slot_is_absent() {
        let slot = FoalSlot::new();
        assert_eq!(slot.phase(), FoalPhase::Absent);
        assert!(slot.value().is_none());
        assert_eq!(slot.snapshot().revision, 0);
    }

    #[test]
    fn test_subscribe_replays_current() {
        let slot = FoalSlot::new();
        slot.publish(Some(foal(120)));
        let sub = slot.subscribe();
        let first = sub.receiver().try_recv().unwrap();
        assert_eq!(first.foal, Some(foal(120)));
        assert_eq!(first.phase, FoalPhase::Pending);
    }

    #[test]
    fn test_publish_notifies_every_subscriber() {
        let slot = FoalSlot::new();
        let a = slot.subscribe();
        let b = slot.subscribe();
        slot.publish(Some(foal(5)));
        assert_eq!(a.latest().unwrap().foal, Some(foal(5)));
        assert_eq!(b.latest().unwrap().foal, Some(foal(5)));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let slot = FoalSlot::new();
        let sub = slot.subscribe();
        let _ = sub.latest();
        slot.unsubscribe(sub.id());
        slot.publish(Some(foal(1)));
        assert!(sub.latest().is_none());
        assert_eq!(slot.listener_count(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let slot = FoalSlot::new();
        drop(slot.subscribe());
        slot.publish(None);
        assert_eq!(slot.listener_count(), 0);
    }

    #[test]
    fn test_transient_phase_keeps_value() {
        let slot = FoalSlot::new();
        slot.publish(Some(foal(9)));
        slot.enter(FoalPhase::Submitting);
        assert_eq!(slot.phase(), FoalPhase::Submitting);
        assert_eq!(slot.value(), Some(foal(9)));
        slot.settle();
        assert_eq!(slot.phase(), FoalPhase::Pending);
    }

    #[test]
    fn test_revision_is_monotonic() {
        let slot = FoalSlot::new();
        let r1 = slot.publish(None);
        let r2 = slot.publish(Some(foal(1)));
        assert!(r2 > r1);
    }
}
