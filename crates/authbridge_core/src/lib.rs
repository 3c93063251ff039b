//! Callback-adapter bridge between a native game-platform SDK and listeners
//! owned by a managed runtime.
//! This crate is the single source of truth for adapter lifecycle invariants.

pub mod adapter;
pub mod context;
pub mod dispatch;
pub mod listener;
pub mod logging;
pub mod model;

pub use adapter::callback_adapter::{AdapterStats, CallbackAdapter, CallbackEvent, ManagedAdapter};
pub use adapter::error::{AdapterError, AdapterResult};
pub use adapter::events::{
    UserCallbackAdapter, UserStatsReceivedAdapter, UserStatsReceivedEvent, UserStatsStoredAdapter,
    UserStatsStoredEvent, ValidateAuthTicketEvent,
};
pub use context::{AdapterId, BridgeContext, UserStatsAdapterIds};
pub use dispatch::dispatcher::{CallbackDispatcher, DispatcherConfig};
pub use dispatch::event_kind::{EventKind, RawEvent};
pub use dispatch::registry::{CallbackHandler, CallbackRegistry, DispatchError, RegistrationId};
pub use listener::contract::{ListenerError, UserCallbackListener, UserStatsCallbackListener};
pub use listener::table::{ListenerId, ListenerTable, PinnedListener};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::auth::{AuthSessionResponse, ValidateAuthTicket, ValidateAuthTicketResponse};
pub use model::marshal::MarshalError;
pub use model::stats::{SteamResult, UserStatsReceived, UserStatsStored};
pub use model::steam_id::SteamId;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
