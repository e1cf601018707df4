//! Daily quest domain model.
//!
//! # Responsibility
//! - Group recurring sub-tasks under one named quest.
//! - Derive completion ratio for progress display.
//!
//! # Invariants
//! - Sub-tasks are owned by exactly one quest and never shared with
//!   `current_tasks`.
//! - Completion of an empty quest is `0`.

use crate::model::task::{deserialize_id, Task, TaskId, TaskStatus};
use serde::{Deserialize, Serialize};

/// Identifier for daily quests. Drawn from the same sequence as task ids.
pub type QuestId = u64;

/// Named container of sub-tasks that resets on a daily cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuest {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: QuestId,
    pub title: String,
    pub tasks: Vec<Task>,
}

impl DailyQuest {
    /// Creates a quest with an empty task list.
    pub fn new(id: QuestId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            tasks: Vec::new(),
        }
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn done_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.is_done()).count()
    }

    /// Fraction of done sub-tasks in `[0, 1]`.
    pub fn completion_ratio(&self) -> f64 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        self.done_count() as f64 / self.tasks.len() as f64
    }

    /// Completion as a whole percentage, rounded to nearest.
    pub fn completion_percentage(&self) -> u8 {
        (self.completion_ratio() * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        !self.tasks.is_empty() && self.done_count() == self.tasks.len()
    }

    /// Puts every sub-task back to `todo`, keeping ids and order.
    pub fn reset(&mut self) {
        for task in &mut self.tasks {
            task.status = TaskStatus::Todo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DailyQuest;
    use crate::model::task::{Rating, Task, TaskStatus};

    fn sub_task(id: u64) -> Task {
        let one = Rating::new(1).unwrap();
        Task::new(id, format!("step {id}"), one, one, one)
    }

    #[test]
    fn empty_quest_has_zero_completion() {
        let quest = DailyQuest::new(1, "Morning Routine");
        assert_eq!(quest.completion_ratio(), 0.0);
        assert_eq!(quest.completion_percentage(), 0);
        assert!(!quest.is_complete());
    }

    #[test]
    fn completion_percentage_rounds_to_nearest() {
        let mut quest = DailyQuest::new(1, "Evening");
        quest.tasks = vec![sub_task(2), sub_task(3), sub_task(4)];
        quest.tasks[0].status = TaskStatus::Done;
        assert_eq!(quest.completion_percentage(), 33);
        quest.tasks[1].status = TaskStatus::Done;
        assert_eq!(quest.completion_percentage(), 67);
    }

    #[test]
    fn reset_keeps_identity_and_order() {
        let mut quest = DailyQuest::new(1, "Gym");
        quest.tasks = vec![sub_task(2), sub_task(3)];
        quest.tasks[1].status = TaskStatus::Done;

        quest.reset();

        assert_eq!(quest.tasks[0].id, 2);
        assert_eq!(quest.tasks[1].id, 3);
        assert!(quest.tasks.iter().all(|task| task.status == TaskStatus::Todo));
    }
}
