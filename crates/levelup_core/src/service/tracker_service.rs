//! Tracker use-case service.
//!
//! # Responsibility
//! - Expose every task/template/quest mutation as one atomic operation.
//! - Persist the whole aggregate after each successful mutation.
//! - Apply the configured missing-id and quest XP policies.
//!
//! # Invariants
//! - Mutations run on a copy; the visible state changes only after the store
//!   accepted the new aggregate.
//! - `mark_as_done` always reports `NotFound` and `AlreadyDone`.
//! - Operations that hand back freshly allocated ids always report
//!   `NotFound`, regardless of policy.

use crate::model::daily_quest::{DailyQuest, QuestId};
use crate::model::system::{QuestXpPolicy, StateError, SystemState};
use crate::model::task::{RecentTask, Task, TaskDraft, TaskId, TaskValidationError};
use crate::store::state_store::{StateStore, StoreError, DEFAULT_STATE_KEY};
use crate::xp::ProgressSnapshot;
use log::{debug, error, info, warn};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How id-keyed operations treat ids that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingIdPolicy {
    /// Report `TrackerError::NotFound`.
    #[default]
    Reject,
    /// Treat the call as a no-op; nothing is written.
    Ignore,
}

/// Behavior knobs for one service instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerOptions {
    /// Store key holding the aggregate.
    pub state_key: String,
    pub quest_xp_policy: QuestXpPolicy,
    pub missing_id_policy: MissingIdPolicy,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            state_key: DEFAULT_STATE_KEY.to_string(),
            quest_xp_policy: QuestXpPolicy::default(),
            missing_id_policy: MissingIdPolicy::default(),
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors returned by tracker operations.
#[derive(Debug)]
pub enum TrackerError {
    /// Draft input failed validation; nothing was written.
    Validation(TaskValidationError),
    /// Referenced task, template or quest does not exist.
    NotFound(StateError),
    /// Task was already completed.
    AlreadyDone(TaskId),
    /// The store failed; in-memory state was left unchanged.
    Persistence(StoreError),
}

impl TrackerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(err) => write!(f, "{err}"),
            Self::AlreadyDone(id) => write!(f, "task already done: {id}"),
            Self::Persistence(err) => write!(f, "failed to persist state: {err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::NotFound(err) => Some(err),
            Self::AlreadyDone(_) => None,
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<StateError> for TrackerError {
    fn from(value: StateError) -> Self {
        match value {
            StateError::AlreadyDone(id) => Self::AlreadyDone(id),
            other => Self::NotFound(other),
        }
    }
}

impl From<TaskValidationError> for TrackerError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

/// Stateful facade over one stored tracker aggregate.
pub struct TrackerService<S: StateStore> {
    store: S,
    options: TrackerOptions,
    state: SystemState,
}

impl<S: StateStore> TrackerService<S> {
    /// Loads the aggregate from `store`, or starts from the zero state.
    pub fn open(store: S, options: TrackerOptions) -> TrackerResult<Self> {
        let loaded = store.load(&options.state_key).map_err(|err| {
            error!("event=tracker_open module=service status=error error_code=state_load_failed error={err}");
            err
        })?;
        let found = loaded.is_some();
        let state = loaded.unwrap_or_default();
        info!(
            "event=tracker_open module=service status=ok found={found} current_tasks={} quests={}",
            state.current_tasks.len(),
            state.daily_quests.len()
        );
        Ok(Self {
            store,
            options,
            state,
        })
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn progress(&self) -> ProgressSnapshot {
        self.state.progress()
    }

    /// Rounded completion percentage of one quest.
    pub fn daily_quest_completion(&self, quest_id: QuestId) -> Option<u8> {
        self.state
            .daily_quest(quest_id)
            .map(DailyQuest::completion_percentage)
    }

    pub fn add_task(&mut self, task: Task) -> TrackerResult<()> {
        self.commit("add_task", MissingIdPolicy::Reject, |state| {
            state.add_task(task);
            Ok(())
        })
    }

    /// Appends a batch with a single write.
    pub fn add_multiple_tasks(&mut self, tasks: Vec<Task>) -> TrackerResult<()> {
        self.commit("add_multiple_tasks", MissingIdPolicy::Reject, |state| {
            state.add_tasks(tasks);
            Ok(())
        })
    }

    pub fn add_recent_task(&mut self, task: RecentTask) -> TrackerResult<()> {
        self.commit("add_recent_task", MissingIdPolicy::Reject, |state| {
            state.add_recent_task(task);
            Ok(())
        })
    }

    /// Validates a draft and appends it as a new `todo` task.
    pub fn create_task(&mut self, draft: &TaskDraft) -> TrackerResult<TaskId> {
        let draft = draft.validate()?;
        self.commit("create_task", MissingIdPolicy::Reject, |state| {
            Ok(state.create_task(draft))
        })
    }

    /// Validates a draft and saves it as a template.
    pub fn create_recent_task(&mut self, draft: &TaskDraft) -> TrackerResult<TaskId> {
        let draft = draft.validate()?;
        self.commit("create_recent_task", MissingIdPolicy::Reject, |state| {
            Ok(state.create_recent_task(draft))
        })
    }

    pub fn update_task(&mut self, task: Task) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("update_task", policy, |state| state.update_task(task))
    }

    /// Completes a current task and returns the XP it awarded.
    pub fn mark_as_done(&mut self, task_id: TaskId) -> TrackerResult<u32> {
        self.commit("mark_as_done", MissingIdPolicy::Reject, |state| {
            state.mark_task_done(task_id)
        })
    }

    pub fn delete_task(&mut self, task_id: TaskId) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("delete_task", policy, |state| {
            state.delete_task(task_id).map(drop)
        })
    }

    pub fn delete_recent_task(&mut self, task_id: TaskId) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("delete_recent_task", policy, |state| {
            state.delete_recent_task(task_id).map(drop)
        })
    }

    /// Copies a current task into the templates list.
    pub fn save_task_as_recent(&mut self, task_id: TaskId) -> TrackerResult<TaskId> {
        self.commit("save_task_as_recent", MissingIdPolicy::Reject, |state| {
            state.save_task_as_recent(task_id)
        })
    }

    /// Replays templates into new current tasks with a single write.
    pub fn add_tasks_from_recent(&mut self, recent_ids: &[TaskId]) -> TrackerResult<Vec<TaskId>> {
        self.commit("add_tasks_from_recent", MissingIdPolicy::Reject, |state| {
            state.replay_recent_tasks(recent_ids)
        })
    }

    /// Ends the day: clears current tasks and today's XP.
    ///
    /// Lifetime XP, templates and quests are kept. There is no undo.
    pub fn clear_all_tasks(&mut self) -> TrackerResult<()> {
        self.commit("clear_all_tasks", MissingIdPolicy::Reject, |state| {
            state.end_day();
            Ok(())
        })
    }

    pub fn add_daily_quest(&mut self, title: impl Into<String>) -> TrackerResult<QuestId> {
        let title = title.into();
        self.commit("add_daily_quest", MissingIdPolicy::Reject, |state| {
            Ok(state.add_daily_quest(title))
        })
    }

    pub fn rename_daily_quest(
        &mut self,
        quest_id: QuestId,
        new_title: impl Into<String>,
    ) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        let new_title = new_title.into();
        self.commit("rename_daily_quest", policy, |state| {
            state.rename_daily_quest(quest_id, new_title)
        })
    }

    pub fn delete_daily_quest(&mut self, quest_id: QuestId) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("delete_daily_quest", policy, |state| {
            state.delete_daily_quest(quest_id).map(drop)
        })
    }

    pub fn add_task_to_daily_quest(&mut self, quest_id: QuestId, task: Task) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("add_task_to_daily_quest", policy, |state| {
            state.add_task_to_daily_quest(quest_id, task)
        })
    }

    /// Validates a draft and appends it to one quest.
    pub fn create_daily_quest_task(
        &mut self,
        quest_id: QuestId,
        draft: &TaskDraft,
    ) -> TrackerResult<TaskId> {
        let draft = draft.validate()?;
        self.commit("create_daily_quest_task", MissingIdPolicy::Reject, |state| {
            state.create_daily_quest_task(quest_id, draft)
        })
    }

    /// Marks a quest sub-task done; returns XP awarded under the quest policy.
    pub fn mark_daily_quest_task_as_done(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> TrackerResult<u32> {
        let policy = self.options.missing_id_policy;
        let xp_policy = self.options.quest_xp_policy;
        self.commit("mark_daily_quest_task_as_done", policy, |state| {
            state.mark_daily_quest_task_done(quest_id, task_id, xp_policy)
        })
    }

    /// Marks every sub-task of one quest done; returns XP awarded.
    pub fn complete_all_tasks_of_daily_quest(&mut self, quest_id: QuestId) -> TrackerResult<u32> {
        let policy = self.options.missing_id_policy;
        let xp_policy = self.options.quest_xp_policy;
        self.commit("complete_all_tasks_of_daily_quest", policy, |state| {
            state.complete_daily_quest(quest_id, xp_policy)
        })
    }

    pub fn delete_task_of_daily_quest(
        &mut self,
        quest_id: QuestId,
        task_id: TaskId,
    ) -> TrackerResult<()> {
        let policy = self.options.missing_id_policy;
        self.commit("delete_task_of_daily_quest", policy, |state| {
            state.delete_daily_quest_task(quest_id, task_id).map(drop)
        })
    }

    /// Daily reset of every quest sub-task back to `todo`.
    pub fn reset_all_tasks_of_all_daily_quests(&mut self) -> TrackerResult<()> {
        self.commit(
            "reset_all_tasks_of_all_daily_quests",
            MissingIdPolicy::Reject,
            |state| {
                state.reset_daily_quests();
                Ok(())
            },
        )
    }

    fn commit<T: Default>(
        &mut self,
        op: &'static str,
        missing_ids: MissingIdPolicy,
        mutate: impl FnOnce(&mut SystemState) -> Result<T, StateError>,
    ) -> TrackerResult<T> {
        let mut next = self.state.clone();
        let output = match mutate(&mut next) {
            Ok(output) => output,
            Err(err) if err.is_not_found() && missing_ids == MissingIdPolicy::Ignore => {
                warn!("event=tracker_mutation module=service status=ignored op={op} reason=not_found");
                return Ok(T::default());
            }
            Err(err) => {
                info!(
                    "event=tracker_mutation module=service status=rejected op={op} error_code={}",
                    rejection_code(&err)
                );
                return Err(err.into());
            }
        };

        if let Err(err) = self.store.save(&self.options.state_key, &next) {
            error!(
                "event=tracker_mutation module=service status=error op={op} error_code=state_save_failed error={err}"
            );
            return Err(TrackerError::Persistence(err));
        }

        self.state = next;
        debug!(
            "event=tracker_mutation module=service status=ok op={op} xp={} xp_today={}",
            self.state.xp, self.state.xp_earned_today
        );
        Ok(output)
    }
}

fn rejection_code(err: &StateError) -> &'static str {
    match err {
        StateError::AlreadyDone(_) => "already_done",
        _ => "not_found",
    }
}
