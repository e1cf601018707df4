//! Domain model for tasks, templates and daily quests.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep state transitions pure so the service can apply them atomically.
//!
//! # Invariants
//! - `SystemState` is the only mutable root; every entity lives in exactly one
//!   collection inside it.
//! - Ids come from one sequence and are never reused by the allocator.

pub mod daily_quest;
pub mod system;
pub mod task;
