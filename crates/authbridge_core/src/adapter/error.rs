//! Adapter error taxonomy.

use crate::dispatch::registry::DispatchError;
use crate::listener::contract::ListenerError;
use crate::listener::table::ListenerId;
use crate::model::marshal::MarshalError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Listener handle is null, unknown or already finalized.
    InvalidHandle(ListenerId),
    AlreadyDestroyed,
    Marshal(MarshalError),
    Registration(DispatchError),
    Listener(ListenerError),
}

impl AdapterError {
    /// Stable short code for logs and FFI envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidHandle(_) => "invalid_handle",
            Self::AlreadyDestroyed => "already_destroyed",
            Self::Marshal(_) => "marshal_error",
            Self::Registration(_) => "registration_failed",
            Self::Listener(_) => "listener_failed",
        }
    }
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidHandle(id) if id.is_null() => write!(f, "listener handle is null"),
            Self::InvalidHandle(id) => {
                write!(f, "listener handle {id} is unknown or already finalized")
            }
            Self::AlreadyDestroyed => write!(f, "callback adapter has already been destroyed"),
            Self::Marshal(err) => write!(f, "payload marshaling failed: {err}"),
            Self::Registration(err) => write!(f, "callback registration failed: {err}"),
            Self::Listener(err) => write!(f, "listener invocation failed: {err}"),
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Marshal(err) => Some(err),
            Self::Registration(err) => Some(err),
            Self::Listener(err) => Some(err),
            Self::InvalidHandle(_) | Self::AlreadyDestroyed => None,
        }
    }
}

impl From<MarshalError> for AdapterError {
    fn from(value: MarshalError) -> Self {
        Self::Marshal(value)
    }
}

impl From<ListenerError> for AdapterError {
    fn from(value: ListenerError) -> Self {
        Self::Listener(value)
    }
}

#[cfg(test)]
mod tests {
    use super::AdapterError;
    use crate::listener::table::ListenerId;
    use crate::model::marshal::MarshalError;
    use std::error::Error;

    #[test]
    fn null_handle_has_dedicated_message() {
        let err = AdapterError::InvalidHandle(ListenerId::NULL);
        assert_eq!(err.to_string(), "listener handle is null");
        assert_eq!(err.code(), "invalid_handle");
    }

    #[test]
    fn marshal_errors_chain_their_source() {
        let err = AdapterError::from(MarshalError::InvalidSteamId);
        assert_eq!(err.code(), "marshal_error");
        assert!(err.source().is_some());
    }
}
