//! Registration seam between adapters and the delivery mechanism.

use crate::dispatch::event_kind::EventKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Handler invoked once per delivered payload of its registered kind.
pub type CallbackHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Identifier of one live registration. Never zero, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl Display for RegistrationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery-side failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    QueueFull { capacity: usize },
    ShutDown,
}

impl DispatchError {
    /// Stable machine-readable code for envelopes and log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::QueueFull { .. } => "queue_full",
            Self::ShutDown => "shut_down",
        }
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueueFull { capacity } => {
                write!(f, "callback queue is full (capacity {capacity})")
            }
            Self::ShutDown => write!(f, "callback dispatcher has been shut down"),
        }
    }
}

impl Error for DispatchError {}

/// External event-delivery mechanism an adapter subscribes to.
pub trait CallbackRegistry: Send + Sync {
    /// Subscribes `handler` to exactly one event kind.
    fn register(
        &self,
        kind: EventKind,
        handler: CallbackHandler,
    ) -> Result<RegistrationId, DispatchError>;

    /// Removes one registration. Returns `false` when it is not live.
    fn unregister(&self, registration: RegistrationId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::DispatchError;

    #[test]
    fn dispatch_error_codes_are_stable() {
        assert_eq!(DispatchError::QueueFull { capacity: 4 }.code(), "queue_full");
        assert_eq!(DispatchError::ShutDown.code(), "shut_down");
        assert!(DispatchError::QueueFull { capacity: 4 }
            .to_string()
            .contains("capacity 4"));
    }
}
