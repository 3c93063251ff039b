//! Foreign-runtime listener handles and callback contracts.
//!
//! # Responsibility
//! - Issue opaque handles for listener objects owned by the managed side.
//! - Keep a listener alive while any adapter holds a pin on it.
//!
//! # Invariants
//! - Handle `0` is the null handle and never resolves.
//! - A pinned listener cannot be finalized.
//! - Each `PinnedListener` releases its pin exactly once.

pub mod contract;
pub mod table;
