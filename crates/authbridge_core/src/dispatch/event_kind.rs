//! Event kind identifiers and raw native events.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Native callback kind, keyed by the SDK's numeric callback id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ValidateAuthTicketResponse,
    UserStatsReceived,
    UserStatsStored,
}

impl EventKind {
    pub const fn callback_id(self) -> u32 {
        match self {
            Self::ValidateAuthTicketResponse => 143,
            Self::UserStatsReceived => 1101,
            Self::UserStatsStored => 1102,
        }
    }

    pub fn from_callback_id(id: u32) -> Option<Self> {
        match id {
            143 => Some(Self::ValidateAuthTicketResponse),
            1101 => Some(Self::UserStatsReceived),
            1102 => Some(Self::UserStatsStored),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidateAuthTicketResponse => "validate_auth_ticket_response",
            Self::UserStatsReceived => "user_stats_received",
            Self::UserStatsStored => "user_stats_stored",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One native occurrence: event kind plus its fixed-layout payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: EventKind,
    pub bytes: Vec<u8>,
}

impl RawEvent {
    pub fn new(kind: EventKind, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            bytes: bytes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EventKind;

    #[test]
    fn callback_ids_round_trip() {
        for kind in [
            EventKind::ValidateAuthTicketResponse,
            EventKind::UserStatsReceived,
            EventKind::UserStatsStored,
        ] {
            assert_eq!(EventKind::from_callback_id(kind.callback_id()), Some(kind));
        }
        assert_eq!(EventKind::from_callback_id(0), None);
    }
}
