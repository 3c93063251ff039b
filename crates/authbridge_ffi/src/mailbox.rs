//! Polling listener handed to the managed side.
//!
//! FRB sync calls cannot re-enter Dart from a native delivery thread, so the
//! managed listener is a mailbox: deliveries are queued here and drained by
//! `bridge_drain_auth_events`.

use authbridge_core::{AuthSessionResponse, ListenerError, SteamId, UserCallbackListener};
use log::warn;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

const MAILBOX_CAPACITY: usize = 256;

/// One queued auth validation outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTicketEvent {
    pub steam_id: SteamId,
    pub response: AuthSessionResponse,
    pub owner_steam_id: SteamId,
}

#[derive(Default)]
pub(crate) struct MailboxListener {
    events: Mutex<VecDeque<AuthTicketEvent>>,
}

impl MailboxListener {
    pub(crate) fn drain(&self) -> Vec<AuthTicketEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }
}

impl UserCallbackListener for MailboxListener {
    fn on_validate_auth_ticket(
        &self,
        steam_id: SteamId,
        response: AuthSessionResponse,
        owner_steam_id: SteamId,
    ) -> Result<(), ListenerError> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() >= MAILBOX_CAPACITY {
            events.pop_front();
            warn!(
                "event=mailbox_push module=ffi status=overflow capacity={} action=drop_oldest",
                MAILBOX_CAPACITY
            );
        }
        events.push_back(AuthTicketEvent {
            steam_id,
            response,
            owner_steam_id,
        });
        Ok(())
    }
}
