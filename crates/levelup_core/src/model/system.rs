//! Aggregate root for all tracker state.
//!
//! # Responsibility
//! - Own every task, template and quest in one persistable value.
//! - Provide pure transitions used by the service layer.
//! - Allocate ids from a persisted sequence counter.
//!
//! # Invariants
//! - `xp` never decreases.
//! - `xp_earned_today` only returns to zero through `end_day`.
//! - Failed transitions leave the state untouched.
//! - `next_id` is greater than every id present in the state.

use crate::model::daily_quest::{DailyQuest, QuestId};
use crate::model::task::{RecentTask, Task, TaskId, TaskStatus, ValidTaskDraft};
use crate::xp::ProgressSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

const FIRST_ID: u64 = 1;

/// Whether completing a daily-quest sub-task earns XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestXpPolicy {
    /// Quest sub-tasks only count toward quest completion.
    #[default]
    TrackOnly,
    /// Quest sub-tasks award `task_xp` like current tasks do.
    AwardXp,
}

/// Rejections from pure state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    TaskNotFound(TaskId),
    RecentTaskNotFound(TaskId),
    QuestNotFound(QuestId),
    QuestTaskNotFound { quest_id: QuestId, task_id: TaskId },
    AlreadyDone(TaskId),
}

impl StateError {
    /// Whether this rejection is a failed id lookup.
    pub fn is_not_found(&self) -> bool {
        !matches!(self, Self::AlreadyDone(_))
    }
}

impl Display for StateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::RecentTaskNotFound(id) => write!(f, "recent task not found: {id}"),
            Self::QuestNotFound(id) => write!(f, "daily quest not found: {id}"),
            Self::QuestTaskNotFound { quest_id, task_id } => {
                write!(f, "task {task_id} not found in daily quest {quest_id}")
            }
            Self::AlreadyDone(id) => write!(f, "task already done: {id}"),
        }
    }
}

impl Error for StateError {}

/// The whole tracker state; the unit of persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemState {
    pub xp: u64,
    pub xp_earned_today: u64,
    pub current_tasks: Vec<Task>,
    pub recent_tasks: Vec<RecentTask>,
    pub daily_quests: Vec<DailyQuest>,
    #[serde(default = "first_id")]
    pub next_id: u64,
}

impl Default for SystemState {
    fn default() -> Self {
        Self {
            xp: 0,
            xp_earned_today: 0,
            current_tasks: Vec::new(),
            recent_tasks: Vec::new(),
            daily_quests: Vec::new(),
            next_id: FIRST_ID,
        }
    }
}

fn first_id() -> u64 {
    FIRST_ID
}

impl SystemState {
    /// Level/progress view of the current XP totals.
    pub fn progress(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.xp, self.xp_earned_today)
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.current_tasks.iter().find(|task| task.id == task_id)
    }

    pub fn recent_task(&self, task_id: TaskId) -> Option<&RecentTask> {
        self.recent_tasks.iter().find(|task| task.id == task_id)
    }

    pub fn daily_quest(&self, quest_id: QuestId) -> Option<&DailyQuest> {
        self.daily_quests.iter().find(|quest| quest.id == quest_id)
    }

    /// Raises `next_id` above every id already present, then gives fresh ids
    /// to duplicates inside each collection (first occurrence keeps its id).
    ///
    /// Needed for blobs written before the counter existed.
    pub fn repair_id_sequence(&mut self) {
        let max_id = self
            .current_tasks
            .iter()
            .map(|task| task.id)
            .chain(self.recent_tasks.iter().map(|task| task.id))
            .chain(self.daily_quests.iter().flat_map(|quest| {
                std::iter::once(quest.id).chain(quest.tasks.iter().map(|task| task.id))
            }))
            .max();
        if let Some(max_id) = max_id {
            self.observe_id(max_id);
        }
        if self.next_id < FIRST_ID {
            self.next_id = FIRST_ID;
        }

        let mut next_id = self.next_id;
        let mut fresh = || {
            let id = next_id;
            next_id = next_id.saturating_add(1);
            id
        };
        dedupe_ids(self.current_tasks.iter_mut().map(|task| &mut task.id), &mut fresh);
        dedupe_ids(self.recent_tasks.iter_mut().map(|task| &mut task.id), &mut fresh);
        dedupe_ids(self.daily_quests.iter_mut().map(|quest| &mut quest.id), &mut fresh);
        for quest in &mut self.daily_quests {
            dedupe_ids(quest.tasks.iter_mut().map(|task| &mut task.id), &mut fresh);
        }
        self.next_id = next_id;
    }

    /// Hands out the next id from the sequence.
    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }

    fn observe_id(&mut self, id: u64) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    fn award_xp(&mut self, amount: u32) {
        self.xp = self.xp.saturating_add(u64::from(amount));
        self.xp_earned_today = self.xp_earned_today.saturating_add(u64::from(amount));
    }

    fn quest_mut(&mut self, quest_id: QuestId) -> Result<&mut DailyQuest, StateError> {
        self.daily_quests
            .iter_mut()
            .find(|quest| quest.id == quest_id)
            .ok_or(StateError::QuestNotFound(quest_id))
    }

    pub fn add_task(&mut self, task: Task) {
        self.observe_id(task.id);
        self.current_tasks.push(task);
    }

    pub fn add_tasks(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            self.add_task(task);
        }
    }

    pub fn add_recent_task(&mut self, task: RecentTask) {
        self.observe_id(task.id);
        self.recent_tasks.push(task);
    }

    /// Appends a validated draft as a new `todo` task.
    pub fn create_task(&mut self, draft: ValidTaskDraft) -> TaskId {
        let id = self.allocate_id();
        self.current_tasks.push(draft.into_task(id));
        id
    }

    pub fn create_recent_task(&mut self, draft: ValidTaskDraft) -> TaskId {
        let id = self.allocate_id();
        self.recent_tasks.push(draft.into_recent_task(id));
        id
    }

    /// Replaces name and ratings of the current task with the same id.
    ///
    /// The stored status is kept: completion only happens through
    /// `mark_task_done`, and a done task never returns to todo.
    pub fn update_task(&mut self, task: Task) -> Result<(), StateError> {
        let slot = self
            .current_tasks
            .iter_mut()
            .find(|existing| existing.id == task.id)
            .ok_or(StateError::TaskNotFound(task.id))?;
        *slot = Task {
            status: slot.status,
            ..task
        };
        Ok(())
    }

    /// Completes a current task and returns the XP it awarded.
    pub fn mark_task_done(&mut self, task_id: TaskId) -> Result<u32, StateError> {
        let task = self
            .current_tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or(StateError::TaskNotFound(task_id))?;
        if task.is_done() {
            return Err(StateError::AlreadyDone(task_id));
        }
        task.status = TaskStatus::Done;
        let reward = task.xp_reward();
        self.award_xp(reward);
        Ok(reward)
    }

    pub fn delete_task(&mut self, task_id: TaskId) -> Result<Task, StateError> {
        let index = self
            .current_tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(StateError::TaskNotFound(task_id))?;
        Ok(self.current_tasks.remove(index))
    }

    pub fn delete_recent_task(&mut self, task_id: TaskId) -> Result<RecentTask, StateError> {
        let index = self
            .recent_tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(StateError::RecentTaskNotFound(task_id))?;
        Ok(self.recent_tasks.remove(index))
    }

    /// Copies a current task into the templates list under a new id.
    pub fn save_task_as_recent(&mut self, task_id: TaskId) -> Result<TaskId, StateError> {
        let task = self
            .task(task_id)
            .cloned()
            .ok_or(StateError::TaskNotFound(task_id))?;
        let id = self.allocate_id();
        self.recent_tasks.push(RecentTask::from_task(id, &task));
        Ok(id)
    }

    /// Creates fresh `todo` tasks from templates, in the order given.
    ///
    /// All ids are checked before anything is appended.
    pub fn replay_recent_tasks(&mut self, recent_ids: &[TaskId]) -> Result<Vec<TaskId>, StateError> {
        let templates = recent_ids
            .iter()
            .map(|&id| {
                self.recent_task(id)
                    .cloned()
                    .ok_or(StateError::RecentTaskNotFound(id))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut created = Vec::with_capacity(templates.len());
        for template in templates {
            let id = self.allocate_id();
            self.current_tasks.push(template.to_task(id));
            created.push(id);
        }
        Ok(created)
    }

    /// "End day": drops current tasks and today's XP, keeps lifetime XP.
    pub fn end_day(&mut self) {
        self.current_tasks.clear();
        self.xp_earned_today = 0;
    }

    pub fn add_daily_quest(&mut self, title: impl Into<String>) -> QuestId {
        let id = self.allocate_id();
        self.daily_quests.push(DailyQuest::new(id, title));
        id
    }

    pub fn rename_daily_quest(
        &mut self,
        quest_id: QuestId,
        title: impl Into<String>,
    ) -> Result<(), StateError> {
        self.quest_mut(quest_id)?.title = title.into();
        Ok(())
    }

    pub fn delete_daily_quest(&mut self, quest_id: QuestId) -> Result<DailyQuest, StateError> {
        let index = self
            .daily_quests
            .iter()
            .position(|quest| quest.id == quest_id)
            .ok_or(StateError::QuestNotFound(quest_id))?;
        Ok(self.daily_quests.remove(index))
    }

    pub fn add_task_to_daily_quest(&mut self, quest_id: QuestId, task: Task) -> Result<(), StateError> {
        let task_id = task.id;
        self.quest_mut(quest_id)?.tasks.push(task);
        self.observe_id(task_id);
        Ok(())
    }

    pub fn create_daily_quest_task(
        &mut self,
        quest_id: QuestId,
        draft: ValidTaskDraft,
    ) -> Result<TaskId, StateError> {
        self.quest_mut(quest_id)?;
        let id = self.allocate_id();
        self.quest_mut(quest_id)?.tasks.push(draft.into_task(id));
        Ok(id)
    }

    /// Marks one quest sub-task done; returns XP awarded under `policy`.
    ///
    /// Marking an already done sub-task is accepted and awards nothing.
    pub fn mark_daily_quest_task_done(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
        policy: QuestXpPolicy,
    ) -> Result<u32, StateError> {
        let task = self
            .quest_mut(quest_id)?
            .task_mut(task_id)
            .ok_or(StateError::QuestTaskNotFound { quest_id, task_id })?;
        if task.is_done() {
            return Ok(0);
        }
        task.status = TaskStatus::Done;
        let reward = match policy {
            QuestXpPolicy::TrackOnly => 0,
            QuestXpPolicy::AwardXp => task.xp_reward(),
        };
        self.award_xp(reward);
        Ok(reward)
    }

    /// Marks every sub-task of one quest done; returns XP awarded.
    pub fn complete_daily_quest(
        &mut self,
        quest_id: QuestId,
        policy: QuestXpPolicy,
    ) -> Result<u32, StateError> {
        let quest = self.quest_mut(quest_id)?;
        let mut reward = 0u32;
        for task in quest.tasks.iter_mut().filter(|task| !task.is_done()) {
            task.status = TaskStatus::Done;
            if policy == QuestXpPolicy::AwardXp {
                reward = reward.saturating_add(task.xp_reward());
            }
        }
        self.award_xp(reward);
        Ok(reward)
    }

    pub fn delete_daily_quest_task(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> Result<Task, StateError> {
        let quest = self.quest_mut(quest_id)?;
        let index = quest
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or(StateError::QuestTaskNotFound { quest_id, task_id })?;
        Ok(quest.tasks.remove(index))
    }

    /// Daily reset: every quest sub-task back to `todo`.
    pub fn reset_daily_quests(&mut self) {
        for quest in &mut self.daily_quests {
            quest.reset();
        }
    }
}

fn dedupe_ids<'a>(ids: impl Iterator<Item = &'a mut u64>, fresh: &mut impl FnMut() -> u64) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(*id) {
            *id = fresh();
        }
    }
}
