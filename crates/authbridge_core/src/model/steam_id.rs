//! 64-bit platform account identity.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Platform account identity carried by every user-scoped payload.
///
/// Serialized as a plain integer so the managed side sees the same value the
/// native SDK reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SteamId(u64);

impl SteamId {
    /// Reserved "no account" value.
    pub const INVALID: SteamId = SteamId(0);

    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Low 32 bits; the per-universe account number.
    pub const fn account_id(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u64> for SteamId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for SteamId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
