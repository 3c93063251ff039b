//! In-process callback dispatcher.
//!
//! Stands in for the SDK's own callback loop: the native side posts raw
//! payloads, and the owner pumps `run_callbacks()` at its polling cadence.

use crate::dispatch::event_kind::{EventKind, RawEvent};
use crate::dispatch::registry::{CallbackHandler, CallbackRegistry, DispatchError, RegistrationId};
use log::{debug, warn};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum number of posted but not yet pumped events.
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

struct Registration {
    kind: EventKind,
    handler: CallbackHandler,
}

#[derive(Default)]
struct DispatcherState {
    // Keyed by monotonically issued id, so iteration order is registration order.
    registrations: BTreeMap<RegistrationId, Registration>,
    queue: VecDeque<RawEvent>,
    shut_down: bool,
}

/// FIFO callback pump keyed by event kind.
pub struct CallbackDispatcher {
    config: DispatcherConfig,
    state: Mutex<DispatcherState>,
    next_id: AtomicU64,
}

impl CallbackDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            state: Mutex::new(DispatcherState::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Queues one native occurrence for the next pump.
    ///
    /// # Errors
    /// - `QueueFull` when `queue_capacity` events are already pending.
    /// - `ShutDown` after `shutdown()`.
    pub fn post(&self, event: RawEvent) -> Result<(), DispatchError> {
        let mut state = self.lock_state();
        if state.shut_down {
            return Err(DispatchError::ShutDown);
        }
        if state.queue.len() >= self.config.queue_capacity {
            warn!(
                "event=callback_post module=dispatch status=rejected kind={} reason=queue_full capacity={}",
                event.kind, self.config.queue_capacity
            );
            return Err(DispatchError::QueueFull {
                capacity: self.config.queue_capacity,
            });
        }
        state.queue.push_back(event);
        Ok(())
    }

    /// Delivers every event queued before this call, in posting order.
    ///
    /// Events posted by handlers during the pump wait for the next call.
    /// Returns the number of handler invocations.
    pub fn run_callbacks(&self) -> usize {
        let pending = std::mem::take(&mut self.lock_state().queue);
        let mut invocations = 0;
        for event in pending {
            let handlers = self.handlers_for(event.kind);
            if handlers.is_empty() {
                debug!(
                    "event=callback_deliver module=dispatch status=skipped kind={} reason=no_handler",
                    event.kind
                );
                continue;
            }
            for handler in handlers {
                handler(&event.bytes);
                invocations += 1;
            }
        }
        invocations
    }

    pub fn pending(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn registration_count(&self, kind: EventKind) -> usize {
        self.lock_state()
            .registrations
            .values()
            .filter(|registration| registration.kind == kind)
            .count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_state().shut_down
    }

    /// Drops all registrations and pending events; later posts are refused.
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        let dropped_events = state.queue.len();
        let dropped_registrations = state.registrations.len();
        state.queue.clear();
        state.registrations.clear();
        debug!(
            "event=dispatcher_shutdown module=dispatch status=ok dropped_events={} dropped_registrations={}",
            dropped_events, dropped_registrations
        );
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<CallbackHandler> {
        self.lock_state()
            .registrations
            .values()
            .filter(|registration| registration.kind == kind)
            .map(|registration| registration.handler.clone())
            .collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, DispatcherState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CallbackDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl CallbackRegistry for CallbackDispatcher {
    fn register(
        &self,
        kind: EventKind,
        handler: CallbackHandler,
    ) -> Result<RegistrationId, DispatchError> {
        let mut state = self.lock_state();
        if state.shut_down {
            return Err(DispatchError::ShutDown);
        }
        let id = RegistrationId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        state.registrations.insert(id, Registration { kind, handler });
        debug!(
            "event=callback_register module=dispatch status=ok kind={} registration={}",
            kind, id
        );
        Ok(id)
    }

    fn unregister(&self, registration: RegistrationId) -> bool {
        let removed = self.lock_state().registrations.remove(&registration);
        match removed {
            Some(entry) => {
                debug!(
                    "event=callback_unregister module=dispatch status=ok kind={} registration={}",
                    entry.kind, registration
                );
                true
            }
            None => false,
        }
    }
}
