//! Event bindings: one `CallbackEvent` per native callback kind.

use crate::adapter::callback_adapter::{CallbackAdapter, CallbackEvent};
use crate::dispatch::event_kind::EventKind;
use crate::listener::contract::{ListenerError, UserCallbackListener, UserStatsCallbackListener};
use crate::model::auth::{ValidateAuthTicket, ValidateAuthTicketResponse};
use crate::model::marshal::MarshalError;
use crate::model::stats::{UserStatsReceived, UserStatsStored};

/// `ValidateAuthTicketResponse` -> `UserCallbackListener::on_validate_auth_ticket`.
pub struct ValidateAuthTicketEvent;

impl CallbackEvent for ValidateAuthTicketEvent {
    const KIND: EventKind = EventKind::ValidateAuthTicketResponse;
    type Listener = dyn UserCallbackListener;
    type Marshaled = ValidateAuthTicket;

    fn marshal(bytes: &[u8]) -> Result<ValidateAuthTicket, MarshalError> {
        ValidateAuthTicketResponse::decode(bytes)?.marshal()
    }

    fn invoke(
        listener: &dyn UserCallbackListener,
        event: ValidateAuthTicket,
    ) -> Result<(), ListenerError> {
        listener.on_validate_auth_ticket(event.steam_id, event.response, event.owner_steam_id)
    }
}

pub struct UserStatsReceivedEvent;

impl CallbackEvent for UserStatsReceivedEvent {
    const KIND: EventKind = EventKind::UserStatsReceived;
    type Listener = dyn UserStatsCallbackListener;
    type Marshaled = UserStatsReceived;

    fn marshal(bytes: &[u8]) -> Result<UserStatsReceived, MarshalError> {
        UserStatsReceived::decode(bytes)
    }

    fn invoke(
        listener: &dyn UserStatsCallbackListener,
        event: UserStatsReceived,
    ) -> Result<(), ListenerError> {
        listener.on_user_stats_received(event.game_id, event.steam_id, event.result)
    }
}

pub struct UserStatsStoredEvent;

impl CallbackEvent for UserStatsStoredEvent {
    const KIND: EventKind = EventKind::UserStatsStored;
    type Listener = dyn UserStatsCallbackListener;
    type Marshaled = UserStatsStored;

    fn marshal(bytes: &[u8]) -> Result<UserStatsStored, MarshalError> {
        UserStatsStored::decode(bytes)
    }

    fn invoke(
        listener: &dyn UserStatsCallbackListener,
        event: UserStatsStored,
    ) -> Result<(), ListenerError> {
        listener.on_user_stats_stored(event.game_id, event.result)
    }
}

pub type UserCallbackAdapter = CallbackAdapter<ValidateAuthTicketEvent>;
pub type UserStatsReceivedAdapter = CallbackAdapter<UserStatsReceivedEvent>;
pub type UserStatsStoredAdapter = CallbackAdapter<UserStatsStoredEvent>;
