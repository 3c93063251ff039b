//! Fixed-layout payload decoding helpers and marshaling errors.
//!
//! Native payloads are packed little-endian records. Readers here never
//! allocate and fail with `MarshalError` instead of panicking.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Payload could not be translated into the foreign representation.
///
/// Fatal to one delivery only; the adapter keeps running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarshalError {
    PayloadLength { expected: usize, actual: usize },
    UnknownResponseCode(i32),
    UnknownResult(i32),
    InvalidSteamId,
}

impl Display for MarshalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PayloadLength { expected, actual } => write!(
                f,
                "payload length mismatch: expected {expected} bytes, got {actual}"
            ),
            Self::UnknownResponseCode(code) => {
                write!(f, "unknown auth session response code: {code}")
            }
            Self::UnknownResult(code) => write!(f, "unknown result code: {code}"),
            Self::InvalidSteamId => write!(f, "payload carries the invalid (zero) steam id"),
        }
    }
}

impl Error for MarshalError {}

/// Sequential reader over one fixed-size native record.
pub(crate) struct PayloadReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    /// Starts reading after checking the exact record size.
    pub(crate) fn exact(bytes: &'a [u8], expected: usize) -> Result<Self, MarshalError> {
        if bytes.len() != expected {
            return Err(MarshalError::PayloadLength {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, offset: 0 })
    }

    pub(crate) fn read_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.bytes[self.offset..self.offset + 8]);
        self.offset += 8;
        u64::from_le_bytes(buf)
    }

    pub(crate) fn read_i32(&mut self) -> i32 {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.bytes[self.offset..self.offset + 4]);
        self.offset += 4;
        i32::from_le_bytes(buf)
    }
}

/// Builder mirroring `PayloadReader`, used by the native side to post events.
#[derive(Debug, Default)]
pub(crate) struct PayloadWriter {
    bytes: Vec<u8>,
}

impl PayloadWriter {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn u64(mut self, value: u64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn i32(mut self, value: i32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
