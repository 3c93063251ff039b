//! User-stats payloads delivered by the stats interface.
//!
//! `UserStatsReceived` is `u64 game_id | i32 result | u64 steam_id` (20 bytes);
//! `UserStatsStored` is `u64 game_id | i32 result` (12 bytes).

use crate::model::marshal::{MarshalError, PayloadReader, PayloadWriter};
use crate::model::steam_id::SteamId;
use serde::{Deserialize, Serialize};

/// General SDK result code. Only the subset stats callbacks report is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteamResult {
    Ok,
    Fail,
    NoConnection,
    InvalidPassword,
    LoggedInElsewhere,
    InvalidProtocolVer,
    InvalidParam,
    FileNotFound,
    Busy,
    InvalidState,
    AccessDenied,
    Timeout,
    Banned,
    AccountNotFound,
    ServiceUnavailable,
    LimitExceeded,
    Expired,
    RateLimitExceeded,
}

impl SteamResult {
    const TABLE: &'static [(i32, SteamResult)] = &[
        (1, Self::Ok),
        (2, Self::Fail),
        (3, Self::NoConnection),
        (5, Self::InvalidPassword),
        (6, Self::LoggedInElsewhere),
        (7, Self::InvalidProtocolVer),
        (8, Self::InvalidParam),
        (9, Self::FileNotFound),
        (10, Self::Busy),
        (11, Self::InvalidState),
        (15, Self::AccessDenied),
        (16, Self::Timeout),
        (17, Self::Banned),
        (18, Self::AccountNotFound),
        (20, Self::ServiceUnavailable),
        (25, Self::LimitExceeded),
        (27, Self::Expired),
        (84, Self::RateLimitExceeded),
    ];

    pub fn from_code(code: i32) -> Result<Self, MarshalError> {
        Self::TABLE
            .iter()
            .find(|(value, _)| *value == code)
            .map(|(_, result)| *result)
            .ok_or(MarshalError::UnknownResult(code))
    }

    pub fn code(self) -> i32 {
        Self::TABLE
            .iter()
            .find(|(_, result)| *result == self)
            .map(|(value, _)| *value)
            .unwrap_or_default()
    }
}

/// Stats for one user finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatsReceived {
    pub game_id: u64,
    pub steam_id: SteamId,
    pub result: SteamResult,
}

impl UserStatsReceived {
    pub const ENCODED_LEN: usize = 20;

    pub fn decode(bytes: &[u8]) -> Result<Self, MarshalError> {
        let mut reader = PayloadReader::exact(bytes, Self::ENCODED_LEN)?;
        let game_id = reader.read_u64();
        let result = SteamResult::from_code(reader.read_i32())?;
        let steam_id = SteamId::new(reader.read_u64());
        if !steam_id.is_valid() {
            return Err(MarshalError::InvalidSteamId);
        }
        Ok(Self {
            game_id,
            steam_id,
            result,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        PayloadWriter::with_capacity(Self::ENCODED_LEN)
            .u64(self.game_id)
            .i32(self.result.code())
            .u64(self.steam_id.raw())
            .finish()
    }
}

/// Local stats upload finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatsStored {
    pub game_id: u64,
    pub result: SteamResult,
}

impl UserStatsStored {
    pub const ENCODED_LEN: usize = 12;

    pub fn decode(bytes: &[u8]) -> Result<Self, MarshalError> {
        let mut reader = PayloadReader::exact(bytes, Self::ENCODED_LEN)?;
        let game_id = reader.read_u64();
        let result = SteamResult::from_code(reader.read_i32())?;
        Ok(Self { game_id, result })
    }

    pub fn encode(&self) -> Vec<u8> {
        PayloadWriter::with_capacity(Self::ENCODED_LEN)
            .u64(self.game_id)
            .i32(self.result.code())
            .finish()
    }
}
