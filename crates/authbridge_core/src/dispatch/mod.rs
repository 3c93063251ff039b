//! Native callback delivery.
//!
//! # Responsibility
//! - Key handler registrations by event kind.
//! - Queue raw payloads posted by the native side and pump them to handlers.
//!
//! # Invariants
//! - Events are delivered in posting order.
//! - Handlers run without any dispatcher lock held, so they may register,
//!   unregister or post from inside a callback.

pub mod dispatcher;
pub mod event_kind;
pub mod registry;
