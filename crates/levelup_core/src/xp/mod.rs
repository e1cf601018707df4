//! XP arithmetic: the level curve and the per-task reward formula.
//!
//! # Responsibility
//! - Map cumulative XP to level, remaining XP and in-level progress.
//! - Compute the XP reward of a rated task.
//!
//! # Invariants
//! - All functions are pure and total over their input types.
//! - `required_xp(level_for_xp(xp)) <= xp < required_xp(level_for_xp(xp) + 1)`.

pub mod level;
pub mod reward;

pub use level::{
    level_for_xp, level_progress, required_xp, xp_needed_for_next_level, ProgressSnapshot,
};
pub use reward::{task_xp, TASK_XP_MAX, TASK_XP_MIN};
