//! Managed-runtime facing bridge crate.

pub mod api;
mod mailbox;
