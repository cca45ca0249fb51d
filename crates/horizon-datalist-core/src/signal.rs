//! Typed signals for widget/host communication.
//!
//! A [`Signal<Args>`] is a typed, instance-owned event channel: the widget
//! connects slots (callbacks) and the host emits values into it. Signals
//! replace string-named events on a page-global dispatch surface, so two
//! widgets only ever see the channels they were handed.
//!
//! Connections are keyed by [`ConnectionId`]. Long-lived listeners hold a
//! [`ConnectionGuard`] instead, which removes the slot when dropped.
//!
//! # Emission semantics
//!
//! Slots run synchronously on the emitting thread, one emission at a time.
//! The slot list is snapshotted before the first slot runs and the internal
//! lock is released, so a slot may connect, disconnect or emit again without
//! deadlocking:
//!
//! - A slot disconnected *during* an emission is still called in that round.
//! - A slot connected *during* an emission is first called on the next emit.
//!
//! # Example
//!
//! ```
//! use horizon_datalist_core::Signal;
//!
//! let page_changed = Signal::<u64>::new();
//!
//! let listener = page_changed.connect(|page| assert!(*page > 0));
//!
//! assert_eq!(page_changed.emit(2), 1);
//! assert!(page_changed.disconnect(listener));
//! assert_eq!(page_changed.emit(3), 0);
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, accepted by [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Typed event channel delivering `&Args` to every connected slot.
pub struct Signal<Args> {
    slots: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(SlotMap::with_key()),
        }
    }

    /// Register `slot`; it stays connected until disconnected by id.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let slot: Slot<Args> = Arc::new(slot);
        self.slots.lock().insert(slot)
    }

    /// Like [`connect`](Self::connect), but the slot lives only as long as the
    /// returned guard. The guard holds the signal weakly.
    pub fn connect_guarded<F>(self: &Arc<Self>, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: Arc::downgrade(self),
        }
    }

    /// Remove a slot. `false` when `id` was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.slots.lock().remove(id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Deliver `args` to the slots connected at call time and return how many
    /// ran.
    #[tracing::instrument(skip_all, target = "horizon_datalist_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) -> usize {
        let round: Vec<Slot<Args>> = self.slots.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = round.len(), "emit");

        round.iter().for_each(|slot| slot(&args));
        round.len()
    }
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Signal::new()
    }
}

impl<Args: 'static> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.connection_count())
            .finish()
    }
}

/// Disconnects its slot on drop.
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use horizon_datalist_core::Signal;
///
/// let total_rows = Arc::new(Signal::<u64>::new());
/// let seen = Arc::new(AtomicU64::new(0));
///
/// let guard = {
///     let seen = seen.clone();
///     total_rows.connect_guarded(move |&rows| {
///         seen.store(rows, Ordering::SeqCst);
///     })
/// };
/// total_rows.emit(250);
/// drop(guard);
/// total_rows.emit(500);
///
/// assert_eq!(seen.load(Ordering::SeqCst), 250);
/// ```
pub struct ConnectionGuard<Args: 'static> {
    id: ConnectionId,
    signal: Weak<Signal<Args>>,
}

impl<Args: 'static> ConnectionGuard<Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// `false` once the signal is dropped or the slot removed by id.
    pub fn is_connected(&self) -> bool {
        match self.signal.upgrade() {
            Some(signal) => signal.slots.lock().contains_key(self.id),
            None => false,
        }
    }
}

impl<Args: 'static> fmt::Debug for ConnectionGuard<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl<Args: 'static> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        let Some(signal) = self.signal.upgrade() else {
            return;
        };
        signal.disconnect(self.id);
    }
}
