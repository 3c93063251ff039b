//! Single-subscription callback adapter.
//!
//! An adapter pins one managed-side listener, registers exactly one handler
//! for its event kind, and forwards each delivered payload after marshaling.
//! Delivery may happen on any thread; `destroy()` is the synchronization
//! point after which the listener is no longer touched.

use crate::adapter::error::{AdapterError, AdapterResult};
use crate::dispatch::event_kind::EventKind;
use crate::dispatch::registry::{CallbackHandler, CallbackRegistry, RegistrationId};
use crate::listener::contract::ListenerError;
use crate::listener::table::{ListenerId, ListenerTable, PinnedListener};
use crate::model::marshal::MarshalError;
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

/// Binds one native event kind to its marshaling and listener method.
pub trait CallbackEvent: Send + Sync + 'static {
    const KIND: EventKind;
    type Listener: ?Sized + Send + Sync + 'static;
    type Marshaled;

    fn marshal(bytes: &[u8]) -> Result<Self::Marshaled, MarshalError>;

    fn invoke(listener: &Self::Listener, event: Self::Marshaled) -> Result<(), ListenerError>;
}

/// Delivery counters for one adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Type-erased view used by owners holding adapters of several kinds.
pub trait ManagedAdapter: Send + Sync {
    fn kind(&self) -> EventKind;
    fn listener_id(&self) -> ListenerId;
    fn stats(&self) -> AdapterStats;
    fn is_destroyed(&self) -> bool;
    fn destroy(&self) -> bool;
}

enum Lifecycle<L: ?Sized> {
    Registered {
        // `None` only between pinning and the registry accepting the handler.
        registration: Option<RegistrationId>,
        pin: PinnedListener<L>,
    },
    Destroyed,
}

struct AdapterState<L: ?Sized> {
    lifecycle: Lifecycle<L>,
    in_flight: Vec<ThreadId>,
    // Pin of an adapter destroyed from inside its own delivery; released when
    // the last in-flight delivery ends.
    deferred_pin: Option<PinnedListener<L>>,
}

struct AdapterShared<E: CallbackEvent> {
    listener_id: ListenerId,
    state: Mutex<AdapterState<E::Listener>>,
    idle: Condvar,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Adapter for one event kind `E`. Destroyed on drop.
pub struct CallbackAdapter<E: CallbackEvent> {
    shared: Arc<AdapterShared<E>>,
    registry: Arc<dyn CallbackRegistry>,
}

impl<E: CallbackEvent> CallbackAdapter<E> {
    /// Pins `listener_id` and subscribes to `E::KIND`.
    ///
    /// # Errors
    /// - `InvalidHandle` when the handle is null, unknown or finalized. No
    ///   registration is attempted.
    /// - `Registration` when the registry refuses the handler. The pin is
    ///   released before returning.
    pub fn new(
        registry: Arc<dyn CallbackRegistry>,
        listeners: &ListenerTable<E::Listener>,
        listener_id: ListenerId,
    ) -> AdapterResult<Self> {
        let pin = listeners
            .pin(listener_id)
            .ok_or(AdapterError::InvalidHandle(listener_id))?;

        let shared = Arc::new(AdapterShared::<E> {
            listener_id,
            state: Mutex::new(AdapterState {
                lifecycle: Lifecycle::Registered {
                    registration: None,
                    pin,
                },
                in_flight: Vec::new(),
                deferred_pin: None,
            }),
            idle: Condvar::new(),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });

        let registration = registry
            .register(E::KIND, delivery_handler(Arc::downgrade(&shared)))
            .map_err(|err| {
                warn!(
                    "event=adapter_register module=adapter status=error kind={} listener={} error={}",
                    E::KIND,
                    listener_id,
                    err
                );
                AdapterError::Registration(err)
            })?;

        if let Lifecycle::Registered {
            registration: slot, ..
        } = &mut shared.lock_state().lifecycle
        {
            *slot = Some(registration);
        }
        debug!(
            "event=adapter_register module=adapter status=ok kind={} listener={} registration={}",
            E::KIND,
            listener_id,
            registration
        );

        Ok(Self { shared, registry })
    }

    /// Unregisters, waits out deliveries running on other threads, then
    /// releases the listener pin.
    ///
    /// Returns `false` when the adapter was already destroyed. Safe to call
    /// from inside this adapter's own listener callback.
    pub fn destroy(&self) -> bool {
        self.shared.destroy(self.registry.as_ref())
    }

    pub fn kind(&self) -> EventKind {
        E::KIND
    }

    pub fn listener_id(&self) -> ListenerId {
        self.shared.listener_id
    }

    pub fn registration(&self) -> Option<RegistrationId> {
        match &self.shared.lock_state().lifecycle {
            Lifecycle::Registered { registration, .. } => *registration,
            Lifecycle::Destroyed => None,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.shared.lock_state().lifecycle, Lifecycle::Destroyed)
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<E: CallbackEvent> Drop for CallbackAdapter<E> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<E: CallbackEvent> ManagedAdapter for CallbackAdapter<E> {
    fn kind(&self) -> EventKind {
        CallbackAdapter::kind(self)
    }

    fn listener_id(&self) -> ListenerId {
        CallbackAdapter::listener_id(self)
    }

    fn stats(&self) -> AdapterStats {
        CallbackAdapter::stats(self)
    }

    fn is_destroyed(&self) -> bool {
        CallbackAdapter::is_destroyed(self)
    }

    fn destroy(&self) -> bool {
        CallbackAdapter::destroy(self)
    }
}

impl<E: CallbackEvent> AdapterShared<E> {
    fn on_event(&self, bytes: &[u8]) -> AdapterResult<()> {
        let listener = self.begin_delivery()?;
        let outcome = E::marshal(bytes)
            .map_err(AdapterError::from)
            .and_then(|event| {
                panic::catch_unwind(AssertUnwindSafe(|| E::invoke(&*listener, event)))
                    .unwrap_or_else(|payload| Err(ListenerError::from_panic(payload.as_ref())))
                    .map_err(AdapterError::from)
            });
        drop(listener);
        self.end_delivery();

        if outcome.is_ok() {
            self.delivered.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    fn begin_delivery(&self) -> AdapterResult<Arc<E::Listener>> {
        let mut state = self.lock_state();
        let listener = match &state.lifecycle {
            Lifecycle::Registered { pin, .. } => Arc::clone(pin.listener()),
            Lifecycle::Destroyed => return Err(AdapterError::AlreadyDestroyed),
        };
        state.in_flight.push(thread::current().id());
        Ok(listener)
    }

    fn end_delivery(&self) {
        let current = thread::current().id();
        let mut state = self.lock_state();
        if let Some(position) = state.in_flight.iter().position(|id| *id == current) {
            state.in_flight.swap_remove(position);
        }
        let deferred = if state.in_flight.is_empty() {
            state.deferred_pin.take()
        } else {
            None
        };
        drop(state);
        self.idle.notify_all();

        if let Some(pin) = deferred {
            let listener_id = pin.id();
            pin.release();
            debug!(
                "event=adapter_pin_release module=adapter status=ok kind={} listener={} mode=deferred",
                E::KIND,
                listener_id
            );
        }
    }

    fn destroy(&self, registry: &dyn CallbackRegistry) -> bool {
        let current = thread::current().id();
        let mut state = self.lock_state();
        let (registration, pin) =
            match std::mem::replace(&mut state.lifecycle, Lifecycle::Destroyed) {
                Lifecycle::Registered { registration, pin } => (registration, pin),
                Lifecycle::Destroyed => return false,
            };
        drop(state);

        let unregistered = registration
            .map(|registration| registry.unregister(registration))
            .unwrap_or(false);

        // The calling thread may itself be inside a delivery of this adapter;
        // its pin then outlives that delivery.
        let mut state = self.lock_state();
        while state.in_flight.iter().any(|id| *id != current) {
            state = self
                .idle
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let deferred = state.in_flight.contains(&current);
        if deferred {
            state.deferred_pin = Some(pin);
            drop(state);
        } else {
            drop(state);
            pin.release();
        }

        debug!(
            "event=adapter_destroy module=adapter status=ok kind={} listener={} unregistered={} pin_release_deferred={} delivered={} dropped={}",
            E::KIND,
            self.listener_id,
            unregistered,
            deferred,
            self.delivered.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed)
        );
        true
    }

    fn lock_state(&self) -> MutexGuard<'_, AdapterState<E::Listener>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn delivery_handler<E: CallbackEvent>(shared: Weak<AdapterShared<E>>) -> CallbackHandler {
    Arc::new(move |bytes: &[u8]| {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        if let Err(err) = shared.on_event(bytes) {
            shared.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                "event=callback_deliver module=adapter status=dropped kind={} listener={} code={} error={}",
                E::KIND,
                shared.listener_id,
                err.code(),
                err
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{AdapterStats, CallbackAdapter, CallbackEvent, ManagedAdapter};
    use crate::adapter::error::AdapterError;
    use crate::dispatch::event_kind::EventKind;
    use crate::dispatch::registry::{
        CallbackHandler, CallbackRegistry, DispatchError, RegistrationId,
    };
    use crate::listener::contract::ListenerError;
    use crate::listener::table::{ListenerId, ListenerTable};
    use crate::model::marshal::MarshalError;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingListener {
        seen: Mutex<Vec<u8>>,
    }

    struct RecordingEvent;

    impl CallbackEvent for RecordingEvent {
        const KIND: EventKind = EventKind::UserStatsStored;
        type Listener = RecordingListener;
        type Marshaled = u8;

        fn marshal(bytes: &[u8]) -> Result<u8, MarshalError> {
            match bytes {
                [value] => Ok(*value),
                other => Err(MarshalError::PayloadLength {
                    expected: 1,
                    actual: other.len(),
                }),
            }
        }

        fn invoke(listener: &RecordingListener, event: u8) -> Result<(), ListenerError> {
            match event {
                0xEE => Err(ListenerError::new("rejected")),
                0xFF => panic!("recording listener panic"),
                value => {
                    listener.seen.lock().expect("seen lock").push(value);
                    Ok(())
                }
            }
        }
    }

    #[derive(Default)]
    struct CountingRegistry {
        handlers: Mutex<BTreeMap<RegistrationId, CallbackHandler>>,
        registers: Mutex<u32>,
        unregisters: Mutex<u32>,
        refuse: bool,
    }

    impl CountingRegistry {
        fn deliver(&self, bytes: &[u8]) {
            let handlers: Vec<CallbackHandler> =
                self.handlers.lock().expect("lock").values().cloned().collect();
            for handler in handlers {
                handler(bytes);
            }
        }
    }

    impl CallbackRegistry for CountingRegistry {
        fn register(
            &self,
            _kind: EventKind,
            handler: CallbackHandler,
        ) -> Result<RegistrationId, DispatchError> {
            if self.refuse {
                return Err(DispatchError::ShutDown);
            }
            let mut registers = self.registers.lock().expect("lock");
            *registers += 1;
            let id = RegistrationId::new(u64::from(*registers));
            self.handlers.lock().expect("lock").insert(id, handler);
            Ok(id)
        }

        fn unregister(&self, registration: RegistrationId) -> bool {
            *self.unregisters.lock().expect("lock") += 1;
            self.handlers
                .lock()
                .expect("lock")
                .remove(&registration)
                .is_some()
        }
    }

    type Fixture = (
        Arc<CountingRegistry>,
        ListenerTable<RecordingListener>,
        Arc<RecordingListener>,
        ListenerId,
    );

    fn setup() -> Fixture {
        let registry = Arc::new(CountingRegistry::default());
        let table = ListenerTable::new();
        let listener = Arc::new(RecordingListener::default());
        let id = table.insert(Arc::clone(&listener));
        (registry, table, listener, id)
    }

    #[test]
    fn construct_then_destroy_unregisters_once_and_unpins() {
        let (registry, table, _listener, id) = setup();
        let adapter = CallbackAdapter::<RecordingEvent>::new(registry.clone(), &table, id)
            .expect("adapter constructs");
        assert_eq!(table.pin_count(id), 1);
        assert!(adapter.registration().is_some());

        assert!(adapter.destroy());
        assert!(!adapter.destroy());
        drop(adapter);

        assert_eq!(*registry.unregisters.lock().expect("lock"), 1);
        assert_eq!(table.pin_count(id), 0);
        assert!(table.finalize(id));
    }

    #[test]
    fn null_handle_fails_without_registering() {
        let (registry, table, _listener, _id) = setup();
        let err = CallbackAdapter::<RecordingEvent>::new(registry.clone(), &table, ListenerId::NULL)
            .err()
            .expect("null handle is rejected");
        assert_eq!(err, AdapterError::InvalidHandle(ListenerId::NULL));
        assert_eq!(*registry.registers.lock().expect("lock"), 0);
    }

    #[test]
    fn refused_registration_releases_pin() {
        let registry = Arc::new(CountingRegistry {
            refuse: true,
            ..CountingRegistry::default()
        });
        let table = ListenerTable::new();
        let id = table.insert(Arc::new(RecordingListener::default()));

        let err = CallbackAdapter::<RecordingEvent>::new(registry, &table, id)
            .err()
            .expect("registration is refused");
        assert_eq!(err, AdapterError::Registration(DispatchError::ShutDown));
        assert_eq!(table.pin_count(id), 0);
    }

    #[test]
    fn failed_deliveries_are_dropped_and_later_events_still_arrive() {
        let (registry, table, listener, id) = setup();
        let adapter = CallbackAdapter::<RecordingEvent>::new(registry.clone(), &table, id)
            .expect("adapter constructs");

        registry.deliver(&[1]);
        registry.deliver(&[1, 2]);
        registry.deliver(&[0xEE]);
        registry.deliver(&[0xFF]);
        registry.deliver(&[2]);

        assert_eq!(*listener.seen.lock().expect("lock"), vec![1, 2]);
        assert_eq!(
            adapter.stats(),
            AdapterStats {
                delivered: 2,
                dropped: 3
            }
        );
    }

    #[test]
    fn destroy_from_inside_own_callback_keeps_pin_until_delivery_returns() {
        // (destroyed, pin count, finalize accepted) observed inside the callback.
        type Observed = (bool, usize, bool);
        type Hook = Box<dyn FnOnce() -> Observed + Send>;

        struct SelfDestroy;
        #[derive(Default)]
        struct SelfDestroyListener {
            hook: Mutex<Option<Hook>>,
            observed: Mutex<Option<Observed>>,
        }
        impl CallbackEvent for SelfDestroy {
            const KIND: EventKind = EventKind::UserStatsStored;
            type Listener = SelfDestroyListener;
            type Marshaled = ();

            fn marshal(_bytes: &[u8]) -> Result<(), MarshalError> {
                Ok(())
            }

            fn invoke(listener: &SelfDestroyListener, _event: ()) -> Result<(), ListenerError> {
                let hook = listener.hook.lock().expect("lock").take();
                if let Some(hook) = hook {
                    *listener.observed.lock().expect("lock") = Some(hook());
                }
                Ok(())
            }
        }

        let registry = Arc::new(CountingRegistry::default());
        let table = ListenerTable::new();
        let listener = Arc::new(SelfDestroyListener::default());
        let id = table.insert(Arc::clone(&listener));
        let adapter = Arc::new(
            CallbackAdapter::<SelfDestroy>::new(registry.clone(), &table, id)
                .expect("adapter constructs"),
        );
        let hooked = Arc::clone(&adapter);
        let hooked_table = table.clone();
        *listener.hook.lock().expect("lock") = Some(Box::new(move || {
            let destroyed = hooked.destroy();
            (destroyed, hooked_table.pin_count(id), hooked_table.finalize(id))
        }));

        registry.deliver(&[]);
        assert_eq!(
            *listener.observed.lock().expect("lock"),
            Some((true, 1, false)),
            "listener must stay pinned while its own callback is running"
        );
        assert!(adapter.is_destroyed());
        assert_eq!(table.pin_count(id), 0);
        assert_eq!(*registry.unregisters.lock().expect("lock"), 1);
        assert!(table.finalize(id));
    }

    #[test]
    fn managed_view_delegates() {
        let (registry, table, _listener, id) = setup();
        let adapter: Box<dyn ManagedAdapter> = Box::new(
            CallbackAdapter::<RecordingEvent>::new(registry, &table, id).expect("adapter constructs"),
        );
        assert_eq!(adapter.kind(), EventKind::UserStatsStored);
        assert_eq!(adapter.listener_id(), id);
        assert!(!adapter.is_destroyed());
        assert!(adapter.destroy());
        assert!(adapter.is_destroyed());
    }
}
