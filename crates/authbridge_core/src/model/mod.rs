//! Native payload model and marshaling rules.
//!
//! # Responsibility
//! - Define the fixed-layout payloads the native SDK delivers per event kind.
//! - Translate raw payload bytes into typed, foreign-facing values.
//!
//! # Invariants
//! - Payload records are immutable once decoded.
//! - Marshaling never panics; every malformed input maps to `MarshalError`.

pub mod auth;
pub mod marshal;
pub mod stats;
pub mod steam_id;
