//! Task reward formula.

use crate::model::task::Rating;

/// Reward of a task rated `1/1/1`.
pub const TASK_XP_MIN: u32 = 2;
/// Reward of a task rated `5/5/5`.
pub const TASK_XP_MAX: u32 = 50;

/// XP awarded for completing a task: `(effort + impact) * difficulty`.
pub fn task_xp(effort: Rating, impact: Rating, difficulty: Rating) -> u32 {
    (u32::from(effort.get()) + u32::from(impact.get())) * u32::from(difficulty.get())
}
