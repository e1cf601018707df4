//! Core use-case services.
//!
//! # Responsibility
//! - Turn pure state transitions into persisted, atomic operations.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod tracker_service;
