//! Callback adapters.
//!
//! # Responsibility
//! - Own one native subscription per adapter and forward each delivery to a
//!   pinned managed-side listener.
//! - Bind event kinds to their payload marshaling and listener method.
//!
//! # Invariants
//! - Lifecycle is `Registered -> Destroyed`, one way.
//! - At most one live registration per adapter; it is unregistered exactly once.
//! - Once `destroy()` returns, no other thread is still using the listener.
//! - A failed delivery is dropped with a diagnostic and never unwinds into the
//!   delivery thread.

pub mod callback_adapter;
pub mod error;
pub mod events;
