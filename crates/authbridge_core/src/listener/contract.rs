//! Listener capabilities the managed side implements.

use crate::logging::sanitize_message;
use crate::model::auth::AuthSessionResponse;
use crate::model::stats::SteamResult;
use crate::model::steam_id::SteamId;
use std::any::Any;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_LISTENER_MESSAGE_CHARS: usize = 160;

/// Failure raised by a listener while handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerError {
    message: String,
}

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: sanitize_message(&message.into(), MAX_LISTENER_MESSAGE_CHARS),
        }
    }

    /// Builds an error from a caught listener panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let text = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::new(format!("listener panicked: {text}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ListenerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ListenerError {}

/// Receives auth-ticket validation outcomes.
pub trait UserCallbackListener: Send + Sync {
    fn on_validate_auth_ticket(
        &self,
        steam_id: SteamId,
        response: AuthSessionResponse,
        owner_steam_id: SteamId,
    ) -> Result<(), ListenerError>;
}

/// Receives user-stats load/store completions.
pub trait UserStatsCallbackListener: Send + Sync {
    fn on_user_stats_received(
        &self,
        game_id: u64,
        steam_id: SteamId,
        result: SteamResult,
    ) -> Result<(), ListenerError>;

    fn on_user_stats_stored(&self, game_id: u64, result: SteamResult)
        -> Result<(), ListenerError>;
}
