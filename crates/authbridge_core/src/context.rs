//! Owning context for a set of adapters.
//!
//! # Responsibility
//! - Own the dispatcher, listener tables and every live adapter.
//! - Tear everything down in a fixed order on shutdown.
//!
//! # Invariants
//! - Adapters are destroyed before the dispatcher is shut down.
//! - Adapter destruction never runs while the adapter map lock is held.
//! - After `shutdown()`, new registrations fail with `AlreadyDestroyed`.

use crate::adapter::callback_adapter::{AdapterStats, ManagedAdapter};
use crate::adapter::error::{AdapterError, AdapterResult};
use crate::adapter::events::{UserCallbackAdapter, UserStatsReceivedAdapter, UserStatsStoredAdapter};
use crate::dispatch::dispatcher::{CallbackDispatcher, DispatcherConfig};
use crate::dispatch::event_kind::{EventKind, RawEvent};
use crate::dispatch::registry::DispatchError;
use crate::listener::contract::{UserCallbackListener, UserStatsCallbackListener};
use crate::listener::table::{ListenerId, ListenerTable};
use crate::model::auth::ValidateAuthTicketResponse;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Context-local adapter handle. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdapterId(u64);

impl AdapterId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Display for AdapterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Adapters created by `register_user_stats_callback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStatsAdapterIds {
    pub received: AdapterId,
    pub stored: AdapterId,
}

#[derive(Default)]
struct AdapterSet {
    live: BTreeMap<AdapterId, Box<dyn ManagedAdapter>>,
    shut_down: bool,
}

/// Dispatcher, listener handles and adapters for one bridge session.
pub struct BridgeContext {
    dispatcher: Arc<CallbackDispatcher>,
    user_listeners: ListenerTable<dyn UserCallbackListener>,
    stats_listeners: ListenerTable<dyn UserStatsCallbackListener>,
    adapters: Mutex<AdapterSet>,
    next_adapter_id: AtomicU64,
}

impl BridgeContext {
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            dispatcher: Arc::new(CallbackDispatcher::new(config)),
            user_listeners: ListenerTable::new(),
            stats_listeners: ListenerTable::new(),
            adapters: Mutex::new(AdapterSet::default()),
            next_adapter_id: AtomicU64::new(1),
        }
    }

    pub fn dispatcher(&self) -> &Arc<CallbackDispatcher> {
        &self.dispatcher
    }

    pub fn user_listeners(&self) -> &ListenerTable<dyn UserCallbackListener> {
        &self.user_listeners
    }

    pub fn stats_listeners(&self) -> &ListenerTable<dyn UserStatsCallbackListener> {
        &self.stats_listeners
    }

    /// Creates the auth-ticket adapter for one user listener handle.
    pub fn register_user_callback(&self, listener_id: ListenerId) -> AdapterResult<AdapterId> {
        self.ensure_running()?;
        let adapter =
            UserCallbackAdapter::new(self.dispatcher.clone(), &self.user_listeners, listener_id)?;
        self.adopt(Box::new(adapter))
    }

    /// Creates both user-stats adapters for one listener handle.
    ///
    /// Either both adapters are live on return, or neither is.
    pub fn register_user_stats_callback(
        &self,
        listener_id: ListenerId,
    ) -> AdapterResult<UserStatsAdapterIds> {
        self.ensure_running()?;
        let received = UserStatsReceivedAdapter::new(
            self.dispatcher.clone(),
            &self.stats_listeners,
            listener_id,
        )?;
        let stored =
            UserStatsStoredAdapter::new(self.dispatcher.clone(), &self.stats_listeners, listener_id)?;

        let received = self.adopt(Box::new(received))?;
        match self.adopt(Box::new(stored)) {
            Ok(stored) => Ok(UserStatsAdapterIds { received, stored }),
            Err(err) => {
                self.destroy_adapter(received);
                Err(err)
            }
        }
    }

    /// Destroys one adapter. Returns `false` for unknown ids.
    pub fn destroy_adapter(&self, id: AdapterId) -> bool {
        let removed = self.lock_adapters().live.remove(&id);
        match removed {
            Some(adapter) => {
                adapter.destroy();
                true
            }
            None => false,
        }
    }

    pub fn adapter_stats(&self, id: AdapterId) -> Option<AdapterStats> {
        self.lock_adapters().live.get(&id).map(|adapter| adapter.stats())
    }

    pub fn adapter_kind(&self, id: AdapterId) -> Option<EventKind> {
        self.lock_adapters().live.get(&id).map(|adapter| adapter.kind())
    }

    pub fn adapter_count(&self) -> usize {
        self.lock_adapters().live.len()
    }

    /// Queues one raw native event.
    pub fn post(&self, event: RawEvent) -> Result<(), DispatchError> {
        self.dispatcher.post(event)
    }

    /// Encodes and queues one auth-ticket validation result.
    pub fn post_validate_auth_ticket(
        &self,
        response: ValidateAuthTicketResponse,
    ) -> Result<(), DispatchError> {
        self.post(RawEvent::new(
            EventKind::ValidateAuthTicketResponse,
            response.encode(),
        ))
    }

    /// One pump of the dispatcher.
    pub fn run_callbacks(&self) -> usize {
        self.dispatcher.run_callbacks()
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_adapters().shut_down
    }

    /// Destroys every adapter, then shuts the dispatcher down. Idempotent.
    pub fn shutdown(&self) {
        let drained = {
            let mut adapters = self.lock_adapters();
            if adapters.shut_down {
                return;
            }
            adapters.shut_down = true;
            std::mem::take(&mut adapters.live)
        };

        let count = drained.len();
        for adapter in drained.into_values() {
            adapter.destroy();
        }
        self.dispatcher.shutdown();
        info!(
            "event=bridge_shutdown module=context status=ok destroyed_adapters={}",
            count
        );
    }

    fn ensure_running(&self) -> AdapterResult<()> {
        if self.is_shut_down() {
            return Err(AdapterError::AlreadyDestroyed);
        }
        Ok(())
    }

    fn adopt(&self, adapter: Box<dyn ManagedAdapter>) -> AdapterResult<AdapterId> {
        let mut adapters = self.lock_adapters();
        if adapters.shut_down {
            drop(adapters);
            adapter.destroy();
            return Err(AdapterError::AlreadyDestroyed);
        }
        let id = AdapterId(self.next_adapter_id.fetch_add(1, Ordering::Relaxed));
        debug!(
            "event=adapter_adopt module=context status=ok adapter={} kind={} listener={}",
            id,
            adapter.kind(),
            adapter.listener_id()
        );
        adapters.live.insert(id, adapter);
        Ok(id)
    }

    fn lock_adapters(&self) -> MutexGuard<'_, AdapterSet> {
        self.adapters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for BridgeContext {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Drop for BridgeContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
