//! Persistence adapter for the tracker aggregate.
//!
//! # Responsibility
//! - Define the key-value contract the service persists through.
//! - Keep SQLite and JSON details out of the service layer.
//!
//! # Invariants
//! - The whole `SystemState` is written on every save; there are no partial
//!   writes.
//! - A missing key loads as `None`; corrupt data is an error, never a default.

pub mod state_store;
