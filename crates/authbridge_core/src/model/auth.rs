//! Auth-ticket validation payload.
//!
//! # Responsibility
//! - Decode the native `ValidateAuthTicketResponse` record.
//! - Marshal it into the typed `ValidateAuthTicket` handed to listeners.
//!
//! # Invariants
//! - Native record is exactly 20 bytes: `u64 steam_id | i32 response | u64 owner`.
//! - A marshaled event always carries a known response and a non-zero subject.

use crate::model::marshal::{MarshalError, PayloadReader, PayloadWriter};
use crate::model::steam_id::SteamId;
use serde::{Deserialize, Serialize};

/// Outcome of one auth-session check, with the SDK's stable numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthSessionResponse {
    /// Ticket is valid for this game and this steam id.
    Ok,
    UserNotConnectedToSteam,
    NoLicenseOrExpired,
    VacBanned,
    LoggedInElsewhere,
    VacCheckTimedOut,
    AuthTicketCanceled,
    AuthTicketInvalidAlreadyUsed,
    AuthTicketInvalid,
    PublisherIssuedBan,
}

impl AuthSessionResponse {
    pub fn from_code(code: i32) -> Result<Self, MarshalError> {
        let response = match code {
            0 => Self::Ok,
            1 => Self::UserNotConnectedToSteam,
            2 => Self::NoLicenseOrExpired,
            3 => Self::VacBanned,
            4 => Self::LoggedInElsewhere,
            5 => Self::VacCheckTimedOut,
            6 => Self::AuthTicketCanceled,
            7 => Self::AuthTicketInvalidAlreadyUsed,
            8 => Self::AuthTicketInvalid,
            9 => Self::PublisherIssuedBan,
            other => return Err(MarshalError::UnknownResponseCode(other)),
        };
        Ok(response)
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::UserNotConnectedToSteam => 1,
            Self::NoLicenseOrExpired => 2,
            Self::VacBanned => 3,
            Self::LoggedInElsewhere => 4,
            Self::VacCheckTimedOut => 5,
            Self::AuthTicketCanceled => 6,
            Self::AuthTicketInvalidAlreadyUsed => 7,
            Self::AuthTicketInvalid => 8,
            Self::PublisherIssuedBan => 9,
        }
    }

    /// Stable label used in logs and FFI envelopes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::UserNotConnectedToSteam => "user_not_connected_to_steam",
            Self::NoLicenseOrExpired => "no_license_or_expired",
            Self::VacBanned => "vac_banned",
            Self::LoggedInElsewhere => "logged_in_elsewhere",
            Self::VacCheckTimedOut => "vac_check_timed_out",
            Self::AuthTicketCanceled => "auth_ticket_canceled",
            Self::AuthTicketInvalidAlreadyUsed => "auth_ticket_invalid_already_used",
            Self::AuthTicketInvalid => "auth_ticket_invalid",
            Self::PublisherIssuedBan => "publisher_issued_ban",
        }
    }
}

/// Native record as produced by the SDK; codes are still raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateAuthTicketResponse {
    pub steam_id: SteamId,
    pub response_code: i32,
    /// Differs from `steam_id` when the game is borrowed through family sharing.
    pub owner_steam_id: SteamId,
}

impl ValidateAuthTicketResponse {
    pub const ENCODED_LEN: usize = 20;

    pub fn decode(bytes: &[u8]) -> Result<Self, MarshalError> {
        let mut reader = PayloadReader::exact(bytes, Self::ENCODED_LEN)?;
        let steam_id = SteamId::new(reader.read_u64());
        let response_code = reader.read_i32();
        let owner_steam_id = SteamId::new(reader.read_u64());
        Ok(Self {
            steam_id,
            response_code,
            owner_steam_id,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        PayloadWriter::with_capacity(Self::ENCODED_LEN)
            .u64(self.steam_id.raw())
            .i32(self.response_code)
            .u64(self.owner_steam_id.raw())
            .finish()
    }

    /// Translates the raw record into the listener-facing value.
    pub fn marshal(&self) -> Result<ValidateAuthTicket, MarshalError> {
        if !self.steam_id.is_valid() {
            return Err(MarshalError::InvalidSteamId);
        }
        Ok(ValidateAuthTicket {
            steam_id: self.steam_id,
            response: AuthSessionResponse::from_code(self.response_code)?,
            owner_steam_id: self.owner_steam_id,
        })
    }
}

/// Listener-facing auth validation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateAuthTicket {
    pub steam_id: SteamId,
    pub response: AuthSessionResponse,
    pub owner_steam_id: SteamId,
}

#[cfg(test)]
mod tests {
    use super::{AuthSessionResponse, ValidateAuthTicketResponse};
    use crate::model::marshal::MarshalError;
    use crate::model::steam_id::SteamId;

    #[test]
    fn response_codes_cover_sdk_range() {
        for code in 0..=9 {
            let response = AuthSessionResponse::from_code(code).expect("known code");
            assert_eq!(response.code(), code);
        }
        assert_eq!(
            AuthSessionResponse::from_code(10),
            Err(MarshalError::UnknownResponseCode(10))
        );
        assert_eq!(
            AuthSessionResponse::from_code(-1),
            Err(MarshalError::UnknownResponseCode(-1))
        );
    }

    #[test]
    fn decodes_native_record_layout() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&42u64.to_le_bytes());
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(&7u64.to_le_bytes());

        let native = ValidateAuthTicketResponse::decode(&bytes).expect("20-byte record");
        assert_eq!(native.steam_id, SteamId::new(42));
        assert_eq!(native.response_code, 3);
        assert_eq!(native.owner_steam_id, SteamId::new(7));

        let event = native.marshal().expect("known code marshals");
        assert_eq!(event.response, AuthSessionResponse::VacBanned);
    }

    #[test]
    fn marshal_rejects_zero_subject() {
        let native = ValidateAuthTicketResponse {
            steam_id: SteamId::INVALID,
            response_code: 0,
            owner_steam_id: SteamId::new(1),
        };
        assert_eq!(native.marshal(), Err(MarshalError::InvalidSteamId));
    }

    #[test]
    fn decode_rejects_truncated_record() {
        let err = ValidateAuthTicketResponse::decode(&[0u8; 12]).expect_err("short record");
        assert!(matches!(
            err,
            MarshalError::PayloadLength {
                expected: 20,
                actual: 12
            }
        ));
    }
}
