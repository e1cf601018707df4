//! Core domain logic for LevelUp.
//! This crate is the single source of truth for XP and quest invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;
pub mod xp;

pub use config::{ConfigError, TrackerConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::daily_quest::{DailyQuest, QuestId};
pub use model::system::{QuestXpPolicy, StateError, SystemState};
pub use model::task::{
    RecentTask, Rating, Task, TaskDraft, TaskId, TaskStatus, TaskValidationError, ValidTaskDraft,
};
pub use service::tracker_service::{
    MissingIdPolicy, TrackerError, TrackerOptions, TrackerResult, TrackerService,
};
pub use store::state_store::{
    SqliteStateStore, StateStore, StoreError, StoreResult, DEFAULT_STATE_KEY,
};
pub use xp::{
    level_for_xp, level_progress, required_xp, task_xp, xp_needed_for_next_level,
    ProgressSnapshot,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
