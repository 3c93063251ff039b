//! Handle table for managed-side listener objects.

use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

// Shared across tables so a handle never resolves in a table that did not issue it.
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to a managed-side listener. `0` is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub const NULL: ListenerId = ListenerId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Display for ListenerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ListenerSlot<L: ?Sized> {
    listener: Arc<L>,
    pins: usize,
}

type Slots<L> = Mutex<BTreeMap<ListenerId, ListenerSlot<L>>>;

/// Registry of live listener objects and their pin counts.
pub struct ListenerTable<L: ?Sized> {
    slots: Arc<Slots<L>>,
}

impl<L: ?Sized> ListenerTable<L> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Publishes a listener object and returns its handle.
    pub fn insert(&self, listener: Arc<L>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        lock_slots(&self.slots).insert(id, ListenerSlot { listener, pins: 0 });
        id
    }

    /// Takes a pin on a live listener.
    ///
    /// Returns `None` for the null handle, unknown handles and finalized
    /// listeners.
    pub fn pin(&self, id: ListenerId) -> Option<PinnedListener<L>> {
        if id.is_null() {
            return None;
        }
        let mut slots = lock_slots(&self.slots);
        let slot = slots.get_mut(&id)?;
        slot.pins += 1;
        Some(PinnedListener {
            id,
            listener: Arc::clone(&slot.listener),
            slots: Arc::downgrade(&self.slots),
        })
    }

    /// Finalizes a listener once the managed side drops it.
    ///
    /// Refused (returns `false`) while any pin is outstanding, or when the
    /// handle is unknown.
    pub fn finalize(&self, id: ListenerId) -> bool {
        let mut slots = lock_slots(&self.slots);
        match slots.get(&id) {
            Some(slot) if slot.pins == 0 => {
                slots.remove(&id);
                debug!("event=listener_finalize module=listener status=ok listener={id}");
                true
            }
            Some(slot) => {
                debug!(
                    "event=listener_finalize module=listener status=refused listener={} pins={}",
                    id, slot.pins
                );
                false
            }
            None => false,
        }
    }

    pub fn pin_count(&self, id: ListenerId) -> usize {
        lock_slots(&self.slots)
            .get(&id)
            .map(|slot| slot.pins)
            .unwrap_or(0)
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        lock_slots(&self.slots).contains_key(&id)
    }

    pub fn len(&self) -> usize {
        lock_slots(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_slots(&self.slots).is_empty()
    }
}

impl<L: ?Sized> Default for ListenerTable<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerTable<L> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

/// Ownership token for one pin on a listener.
///
/// The listener cannot be finalized while the token is alive. Dropping the
/// token releases the pin.
pub struct PinnedListener<L: ?Sized> {
    id: ListenerId,
    listener: Arc<L>,
    slots: Weak<Slots<L>>,
}

impl<L: ?Sized> PinnedListener<L> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn listener(&self) -> &Arc<L> {
        &self.listener
    }

    /// Releases the pin now instead of at end of scope.
    pub fn release(self) {
        drop(self);
    }
}

impl<L: ?Sized> Drop for PinnedListener<L> {
    fn drop(&mut self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let mut guard = lock_slots(&slots);
        if let Some(slot) = guard.get_mut(&self.id) {
            slot.pins = slot.pins.saturating_sub(1);
        }
    }
}

fn lock_slots<L: ?Sized>(
    slots: &Slots<L>,
) -> MutexGuard<'_, BTreeMap<ListenerId, ListenerSlot<L>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{ListenerId, ListenerTable};
    use std::sync::Arc;

    #[test]
    fn null_and_unknown_handles_do_not_pin() {
        let table: ListenerTable<str> = ListenerTable::new();
        assert!(table.pin(ListenerId::NULL).is_none());
        assert!(table.pin(ListenerId::new(u64::MAX)).is_none());
    }

    #[test]
    fn pin_blocks_finalize_until_released() {
        let table: ListenerTable<str> = ListenerTable::new();
        let id = table.insert(Arc::from("listener"));

        let pin = table.pin(id).expect("live listener pins");
        assert_eq!(pin.id(), id);
        assert_eq!(&**pin.listener(), "listener");
        assert_eq!(table.pin_count(id), 1);
        assert!(!table.finalize(id));

        pin.release();
        assert_eq!(table.pin_count(id), 0);
        assert!(table.finalize(id));
        assert!(!table.contains(id));
        assert!(table.pin(id).is_none());
    }

    #[test]
    fn handles_are_unique_across_tables() {
        let first: ListenerTable<str> = ListenerTable::new();
        let second: ListenerTable<str> = ListenerTable::new();
        let id = first.insert(Arc::from("a"));
        second.insert(Arc::from("b"));
        assert!(second.pin(id).is_none());
        assert_eq!(first.len(), 1);
        assert!(!second.is_empty());
    }

    #[test]
    fn pins_are_counted_per_token() {
        let table: ListenerTable<str> = ListenerTable::new();
        let id = table.insert(Arc::from("listener"));
        let first = table.pin(id).expect("first pin");
        let second = table.pin(id).expect("second pin");
        assert_eq!(table.pin_count(id), 2);
        drop(first);
        assert_eq!(table.pin_count(id), 1);
        drop(second);
        assert!(table.finalize(id));
    }

    #[test]
    fn pin_outliving_its_table_drops_quietly() {
        let table: ListenerTable<str> = ListenerTable::new();
        let id = table.insert(Arc::from("listener"));
        let pin = table.pin(id).expect("live listener pins");
        drop(table);
        assert_eq!(&**pin.listener(), "listener");
        drop(pin);
    }
}
