//! FFI use-case API for managed-runtime calls.
//!
//! # Responsibility
//! - Expose listener, adapter and pump operations to Dart via FRB.
//! - Own the process-wide `BridgeContext`.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Handles crossing the boundary are raw `u64`; `0` is never issued.

use crate::mailbox::{AuthTicketEvent, MailboxListener};
use authbridge_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AdapterId, BridgeContext, DispatchError, DispatcherConfig, ListenerId, SteamId,
    ValidateAuthTicketResponse,
};
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

const QUEUE_CAPACITY_ENV: &str = "AUTHBRIDGE_QUEUE_CAPACITY";

static BRIDGE: OnceLock<FfiBridge> = OnceLock::new();

struct FfiBridge {
    context: BridgeContext,
    mailboxes: Mutex<BTreeMap<ListenerId, Arc<MailboxListener>>>,
}

impl FfiBridge {
    fn lock_mailboxes(&self) -> MutexGuard<'_, BTreeMap<ListenerId, Arc<MailboxListener>>> {
        self.mailboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes bridge logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory for rolling logs.
/// - Returns empty string on success, error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Result envelope for bridge commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeActionResponse {
    pub ok: bool,
    /// Created adapter handle, when the command creates one.
    pub adapter_id: Option<u64>,
    /// Stable short error code (`invalid_handle`, `queue_full`, ...).
    pub error_code: Option<String>,
    pub message: String,
}

impl BridgeActionResponse {
    fn success(message: impl Into<String>, adapter_id: Option<u64>) -> Self {
        Self {
            ok: true,
            adapter_id,
            error_code: None,
            message: message.into(),
        }
    }

    fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            adapter_id: None,
            error_code: Some(code.to_string()),
            message: message.into(),
        }
    }
}

/// Auth validation outcome as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTicketEventItem {
    pub steam_id: u64,
    pub account_id: u32,
    /// Snake-case response label, e.g. `ok`, `vac_banned`.
    pub response: String,
    pub response_code: i32,
    pub owner_steam_id: u64,
}

/// Creates a mailbox listener and returns its handle.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_create_listener() -> u64 {
    let bridge = bridge();
    let mailbox = Arc::new(MailboxListener::default());
    let id = bridge.context.user_listeners().insert(mailbox.clone());
    bridge.lock_mailboxes().insert(id, mailbox);
    id.raw()
}

/// Finalizes a listener handle. Refused (`false`) while an adapter pins it.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_release_listener(listener_id: u64) -> bool {
    let bridge = bridge();
    let id = ListenerId::new(listener_id);
    if !bridge.context.user_listeners().finalize(id) {
        return false;
    }
    bridge.lock_mailboxes().remove(&id);
    true
}

/// Registers an auth-ticket adapter for one listener handle.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_register_user_callback(listener_id: u64) -> BridgeActionResponse {
    match bridge()
        .context
        .register_user_callback(ListenerId::new(listener_id))
    {
        Ok(adapter_id) => {
            BridgeActionResponse::success("User callback registered.", Some(adapter_id.raw()))
        }
        Err(err) => BridgeActionResponse::failure(
            err.code(),
            format!("bridge_register_user_callback failed: {err}"),
        ),
    }
}

/// Destroys one adapter. Idempotent; `false` for unknown or destroyed ids.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_destroy_adapter(adapter_id: u64) -> bool {
    bridge().context.destroy_adapter(AdapterId::new(adapter_id))
}

/// Queues one native auth validation result, as the SDK would.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_post_validate_auth_ticket(
    steam_id: u64,
    response_code: i32,
    owner_steam_id: u64,
) -> BridgeActionResponse {
    let payload = ValidateAuthTicketResponse {
        steam_id: SteamId::new(steam_id),
        response_code,
        owner_steam_id: SteamId::new(owner_steam_id),
    };
    match bridge().context.post_validate_auth_ticket(payload) {
        Ok(()) => BridgeActionResponse::success("Event queued.", None),
        Err(err) => post_failure(&err),
    }
}

fn post_failure(err: &DispatchError) -> BridgeActionResponse {
    BridgeActionResponse::failure(
        err.code(),
        format!("bridge_post_validate_auth_ticket failed: {err}"),
    )
}

/// Pumps queued callbacks once; returns the number of deliveries attempted.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_run_callbacks() -> u32 {
    u32::try_from(bridge().context.run_callbacks()).unwrap_or(u32::MAX)
}

/// Drains events delivered to one mailbox listener, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn bridge_drain_auth_events(listener_id: u64) -> Vec<AuthTicketEventItem> {
    let mailbox = bridge()
        .lock_mailboxes()
        .get(&ListenerId::new(listener_id))
        .cloned();
    match mailbox {
        Some(mailbox) => mailbox.drain().into_iter().map(to_event_item).collect(),
        None => Vec::new(),
    }
}

fn bridge() -> &'static FfiBridge {
    BRIDGE.get_or_init(|| {
        let config = resolve_dispatcher_config();
        info!(
            "event=ffi_bridge_init module=ffi status=ok queue_capacity={}",
            config.queue_capacity
        );
        FfiBridge {
            context: BridgeContext::new(config),
            mailboxes: Mutex::new(BTreeMap::new()),
        }
    })
}

fn resolve_dispatcher_config() -> DispatcherConfig {
    let mut config = DispatcherConfig::default();
    if let Ok(raw) = std::env::var(QUEUE_CAPACITY_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(value) if value > 0 => config.queue_capacity = value,
            _ => warn!(
                "event=ffi_config module=ffi status=ignored key={} reason=invalid_value",
                QUEUE_CAPACITY_ENV
            ),
        }
    }
    config
}

fn to_event_item(event: AuthTicketEvent) -> AuthTicketEventItem {
    AuthTicketEventItem {
        steam_id: event.steam_id.raw(),
        account_id: event.steam_id.account_id(),
        response: event.response.as_str().to_string(),
        response_code: event.response.code(),
        owner_steam_id: event.owner_steam_id.raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        bridge_create_listener, bridge_destroy_adapter, bridge_drain_auth_events,
        bridge_post_validate_auth_ticket, bridge_register_user_callback, bridge_release_listener,
        bridge_run_callbacks, core_version, init_logging, ping, post_failure,
        AuthTicketEventItem,
    };
    use authbridge_core::DispatchError;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    // Tests share one global dispatcher; pumping tests run one at a time and
    // use unique subjects so assertions stay local.
    static NEXT_SUBJECT: AtomicU64 = AtomicU64::new(1_000);
    static PUMP_SERIAL: Mutex<()> = Mutex::new(());

    fn serial() -> MutexGuard<'static, ()> {
        PUMP_SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unique_subject() -> u64 {
        NEXT_SUBJECT.fetch_add(1, Ordering::Relaxed)
    }

    fn events_for(listener_id: u64, steam_id: u64) -> Vec<AuthTicketEventItem> {
        bridge_drain_auth_events(listener_id)
            .into_iter()
            .filter(|item| item.steam_id == steam_id)
            .collect()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn registered_listener_receives_posted_event() {
        let _serial = serial();
        let listener_id = bridge_create_listener();
        let registered = bridge_register_user_callback(listener_id);
        assert!(registered.ok, "{}", registered.message);
        let adapter_id = registered.adapter_id.expect("adapter id");

        let subject = unique_subject();
        let posted = bridge_post_validate_auth_ticket(subject, 0, subject);
        assert!(posted.ok, "{}", posted.message);
        bridge_run_callbacks();

        let events = events_for(listener_id, subject);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].response, "ok");
        assert_eq!(events[0].response_code, 0);

        assert!(bridge_destroy_adapter(adapter_id));
        assert!(!bridge_destroy_adapter(adapter_id));

        bridge_post_validate_auth_ticket(subject, 0, subject);
        bridge_run_callbacks();
        assert!(events_for(listener_id, subject).is_empty());
        assert!(bridge_release_listener(listener_id));
    }

    #[test]
    fn pinned_listener_cannot_be_released() {
        let listener_id = bridge_create_listener();
        let registered = bridge_register_user_callback(listener_id);
        let adapter_id = registered.adapter_id.expect("adapter id");

        assert!(!bridge_release_listener(listener_id));
        assert!(bridge_destroy_adapter(adapter_id));
        assert!(bridge_release_listener(listener_id));
        assert!(!bridge_release_listener(listener_id));
    }

    #[test]
    fn null_listener_is_reported_as_invalid_handle() {
        let response = bridge_register_user_callback(0);
        assert!(!response.ok);
        assert_eq!(response.error_code.as_deref(), Some("invalid_handle"));
        assert!(response.adapter_id.is_none());
    }

    #[test]
    fn unknown_response_code_is_dropped_not_delivered() {
        let _serial = serial();
        let listener_id = bridge_create_listener();
        let adapter_id = bridge_register_user_callback(listener_id)
            .adapter_id
            .expect("adapter id");

        let subject = unique_subject();
        bridge_post_validate_auth_ticket(subject, 77, subject);
        bridge_post_validate_auth_ticket(subject, 3, subject);
        bridge_run_callbacks();

        let events = events_for(listener_id, subject);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].response, "vac_banned");
        bridge_destroy_adapter(adapter_id);
    }

    #[test]
    fn rejected_post_reports_dispatch_error_code() {
        let full = post_failure(&DispatchError::QueueFull { capacity: 2 });
        assert!(!full.ok);
        assert_eq!(full.error_code.as_deref(), Some("queue_full"));
        assert!(full.message.contains("capacity 2"));

        let closed = post_failure(&DispatchError::ShutDown);
        assert_eq!(closed.error_code.as_deref(), Some("shut_down"));
        assert!(closed.adapter_id.is_none());
    }
}
