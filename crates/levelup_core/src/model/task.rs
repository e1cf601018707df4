//! Task domain model.
//!
//! # Responsibility
//! - Define the rated unit of work that earns XP on completion.
//! - Define the status-less template (`RecentTask`) used for replays.
//! - Validate user drafts before they become tasks.
//!
//! # Invariants
//! - Ratings are always within `1..=5`; zero is unrepresentable.
//! - `status` only moves `todo -> done` for current tasks.
//! - Task names are non-empty after normalization.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Identifier shared by tasks, recent tasks and quest sub-tasks.
pub type TaskId = u64;

/// Reads a stored id, accepting non-negative numbers with a fraction.
///
/// Older blobs carry ids like `1712345678901.42`; the fraction is dropped and
/// any resulting collision is fixed by `SystemState::repair_id_sequence`.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredId {
        Whole(u64),
        Fractional(f64),
    }

    match StoredId::deserialize(deserializer)? {
        StoredId::Whole(id) => Ok(id),
        StoredId::Fractional(id) if id.is_finite() && id >= 0.0 && id < u64::MAX as f64 => {
            Ok(id.floor() as u64)
        }
        StoredId::Fractional(id) => Err(serde::de::Error::custom(format!(
            "id must be a non-negative number, got {id}"
        ))),
    }
}

/// Lowest accepted rating value.
pub const RATING_MIN: u8 = 1;
/// Highest accepted rating value.
pub const RATING_MAX: u8 = 5;

/// One of the three task axes (effort, impact, difficulty).
///
/// Serialized as a bare integer; out-of-range values are rejected on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    /// Builds a rating, rejecting values outside `1..=5`.
    pub fn new(value: u8) -> Result<Self, TaskValidationError> {
        if (RATING_MIN..=RATING_MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(TaskValidationError::RatingOutOfRange {
                field: "rating",
                value: i64::from(value),
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = TaskValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

impl Display for Rating {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not completed yet.
    #[default]
    Todo,
    /// Completed. Terminal for current tasks.
    Done,
}

impl TaskStatus {
    pub fn is_done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Errors raised while validating task input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    /// Name is blank after trim.
    EmptyName,
    /// A rating is outside `1..=5`.
    RatingOutOfRange { field: &'static str, value: i64 },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "task name must not be blank"),
            Self::RatingOutOfRange { field, value } => write!(
                f,
                "{field} must be between {RATING_MIN} and {RATING_MAX}, got {value}"
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// Active task tracked in the current list or inside a daily quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TaskId,
    pub name: String,
    pub effort: Rating,
    pub impact: Rating,
    pub difficulty: Rating,
    pub status: TaskStatus,
}

impl Task {
    /// Creates a `todo` task from already validated parts.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        effort: Rating,
        impact: Rating,
        difficulty: Rating,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            effort,
            impact,
            difficulty,
            status: TaskStatus::Todo,
        }
    }

    /// XP this task is worth when completed.
    pub fn xp_reward(&self) -> u32 {
        crate::xp::task_xp(self.effort, self.impact, self.difficulty)
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }
}

/// Saved task template. Has no status and never changes state itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTask {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TaskId,
    pub name: String,
    pub effort: Rating,
    pub impact: Rating,
    pub difficulty: Rating,
}

impl RecentTask {
    /// Copies a task's content into a template under a new id.
    pub fn from_task(id: TaskId, task: &Task) -> Self {
        Self {
            id,
            name: task.name.clone(),
            effort: task.effort,
            impact: task.impact,
            difficulty: task.difficulty,
        }
    }

    /// Replays this template into a fresh `todo` task.
    pub fn to_task(&self, id: TaskId) -> Task {
        Task::new(id, self.name.clone(), self.effort, self.impact, self.difficulty)
    }

    pub fn xp_reward(&self) -> u32 {
        crate::xp::task_xp(self.effort, self.impact, self.difficulty)
    }
}

/// Raw user input for a task, prior to validation.
///
/// Ratings use `0` for "not selected yet", matching an untouched form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub name: String,
    pub effort: u8,
    pub impact: u8,
    pub difficulty: u8,
}

/// Draft fields after validation, ready to receive an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTaskDraft {
    pub name: String,
    pub effort: Rating,
    pub impact: Rating,
    pub difficulty: Rating,
}

impl ValidTaskDraft {
    pub fn into_task(self, id: TaskId) -> Task {
        Task::new(id, self.name, self.effort, self.impact, self.difficulty)
    }

    pub fn into_recent_task(self, id: TaskId) -> RecentTask {
        RecentTask {
            id,
            name: self.name,
            effort: self.effort,
            impact: self.impact,
            difficulty: self.difficulty,
        }
    }
}

impl TaskDraft {
    pub fn new(name: impl Into<String>, effort: u8, impact: u8, difficulty: u8) -> Self {
        Self {
            name: name.into(),
            effort,
            impact,
            difficulty,
        }
    }

    /// Checks name and ratings, returning normalized fields.
    ///
    /// The name is checked first so an empty form reports the name problem.
    pub fn validate(&self) -> Result<ValidTaskDraft, TaskValidationError> {
        let name = normalize_display_text(&self.name).ok_or(TaskValidationError::EmptyName)?;
        Ok(ValidTaskDraft {
            name,
            effort: rating_field("effort", self.effort)?,
            impact: rating_field("impact", self.impact)?,
            difficulty: rating_field("difficulty", self.difficulty)?,
        })
    }
}

/// Trims and collapses inner whitespace; `None` when nothing remains.
pub fn normalize_display_text(value: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

fn rating_field(field: &'static str, value: u8) -> Result<Rating, TaskValidationError> {
    Rating::new(value).map_err(|_| TaskValidationError::RatingOutOfRange {
        field,
        value: i64::from(value),
    })
}
