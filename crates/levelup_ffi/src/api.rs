//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose tracker use-cases to Dart via FRB.
//! - Translate core errors into short user-facing messages.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every mutating call opens the configured store, runs one operation and
//!   persists before returning.
//! - An invalid `LEVELUP_*` configuration fails every store-backed call; it is
//!   never replaced by defaults.

use levelup_core::db::open_db;
use levelup_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    ConfigError, DailyQuest, RecentTask, SqliteStateStore, StateError, SystemState, Task,
    TaskDraft, TrackerConfig, TrackerError, TrackerService,
};
use log::error;
use std::sync::OnceLock;

static TRACKER_CONFIG: OnceLock<Result<TrackerConfig, ConfigError>> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - UI-thread safe for current implementation.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Initializes logging from `LEVELUP_LOG_LEVEL` and `LEVELUP_LOG_DIR`.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Same idempotency and conflict rules as `init_logging`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging_from_config() -> String {
    match tracker_config() {
        Ok(config) => match config.init_logging() {
            Ok(()) => String::new(),
            Err(err) => err.to_string(),
        },
        Err(message) => message,
    }
}

/// Task row for list rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: u64,
    pub name: String,
    pub effort: u8,
    pub impact: u8,
    pub difficulty: u8,
    /// `todo|done`; empty for templates.
    pub status: String,
    /// XP the task is worth.
    pub xp: u32,
}

/// Daily quest card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestItem {
    pub id: u64,
    pub title: String,
    pub tasks: Vec<TaskItem>,
    /// Rounded completion percentage.
    pub completion_percentage: u8,
}

/// Full read model for the home screen.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSnapshot {
    pub ok: bool,
    pub message: String,
    pub level: u64,
    pub xp: u64,
    pub xp_earned_today: u64,
    pub xp_needed_for_next_level: u64,
    pub level_progress: f64,
    pub current_tasks: Vec<TaskItem>,
    pub recent_tasks: Vec<TaskItem>,
    pub daily_quests: Vec<QuestItem>,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerActionResponse {
    pub ok: bool,
    /// Created entity ids, when the action creates any.
    pub ids: Vec<u64>,
    /// XP awarded by the action.
    pub xp_awarded: u32,
    pub message: String,
}

impl TrackerActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            ids: Vec::new(),
            xp_awarded: 0,
            message: message.into(),
        }
    }

    fn created(message: impl Into<String>, ids: Vec<u64>) -> Self {
        Self {
            ids,
            ..Self::success(message)
        }
    }

    fn awarded(message: impl Into<String>, xp_awarded: u32) -> Self {
        Self {
            xp_awarded,
            ..Self::success(message)
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            ids: Vec::new(),
            xp_awarded: 0,
            message: message.into(),
        }
    }
}

/// Loads the stored state and returns the home-screen read model.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns `ok=false` with a zero-state body when the store is unusable.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_snapshot() -> TrackerSnapshot {
    match with_tracker(|service| Ok(to_snapshot(service.state()))) {
        Ok(snapshot) => snapshot,
        Err(message) => TrackerSnapshot {
            ok: false,
            message,
            ..to_snapshot(&SystemState::default())
        },
    }
}

/// Creates a current task from form input.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created task id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_create_task(
    name: String,
    effort: u8,
    impact: u8,
    difficulty: u8,
) -> TrackerActionResponse {
    let draft = TaskDraft::new(name, effort, impact, difficulty);
    respond(
        with_tracker(|service| service.create_task(&draft)),
        |id| TrackerActionResponse::created("Task created.", vec![id]),
    )
}

/// Completes a current task and reports the XP earned.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - A task already done is reported, not re-awarded.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_mark_task_done(task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.mark_as_done(task_id)),
        |xp| TrackerActionResponse::awarded(format!("+{xp} XP"), xp),
    )
}

/// Deletes a current task.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_delete_task(task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.delete_task(task_id)),
        |()| TrackerActionResponse::success("Task deleted."),
    )
}

/// "End day": clears current tasks and today's XP.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Lifetime XP, templates and daily quests are kept.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_end_day() -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.clear_all_tasks()),
        |()| TrackerActionResponse::success("Day ended."),
    )
}

/// Saves a template from form input.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created template id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_create_recent_task(
    name: String,
    effort: u8,
    impact: u8,
    difficulty: u8,
) -> TrackerActionResponse {
    let draft = TaskDraft::new(name, effort, impact, difficulty);
    respond(
        with_tracker(|service| service.create_recent_task(&draft)),
        |id| TrackerActionResponse::created("Template saved.", vec![id]),
    )
}

/// Copies a current task into the template list.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the new template id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_save_task_as_recent(task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.save_task_as_recent(task_id)),
        |id| TrackerActionResponse::created("Template saved.", vec![id]),
    )
}

/// Replays selected templates into current tasks.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - All-or-nothing: one unknown id rejects the whole batch.
/// - Returns the new task ids in input order.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_add_tasks_from_recent(recent_ids: Vec<u64>) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.add_tasks_from_recent(&recent_ids)),
        |ids| TrackerActionResponse::created(format!("Added {} task(s).", ids.len()), ids),
    )
}

/// Deletes a template.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_delete_recent_task(task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.delete_recent_task(task_id)),
        |()| TrackerActionResponse::success("Template deleted."),
    )
}

/// Creates an empty daily quest.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Title is trimmed; returns the quest id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_add_daily_quest(title: String) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.add_daily_quest(title.trim())),
        |id| TrackerActionResponse::created("Daily quest created.", vec![id]),
    )
}

/// Renames a daily quest.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_rename_daily_quest(quest_id: u64, title: String) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.rename_daily_quest(quest_id, title.trim())),
        |()| TrackerActionResponse::success("Daily quest renamed."),
    )
}

/// Deletes a daily quest and its sub-tasks.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_delete_daily_quest(quest_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.delete_daily_quest(quest_id)),
        |()| TrackerActionResponse::success("Daily quest deleted."),
    )
}

/// Adds a sub-task to a daily quest from form input.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Returns the created sub-task id on success.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_add_daily_quest_task(
    quest_id: u64,
    name: String,
    effort: u8,
    impact: u8,
    difficulty: u8,
) -> TrackerActionResponse {
    let draft = TaskDraft::new(name, effort, impact, difficulty);
    respond(
        with_tracker(|service| service.create_daily_quest_task(quest_id, &draft)),
        |id| TrackerActionResponse::created("Quest task added.", vec![id]),
    )
}

/// Marks one quest sub-task done.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - Idempotent; `xp_awarded` follows the configured quest XP policy.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_mark_daily_quest_task_done(quest_id: u64, task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.mark_daily_quest_task_as_done(quest_id, task_id)),
        |xp| TrackerActionResponse::awarded("Quest task done.", xp),
    )
}

/// Marks every sub-task of a quest done.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
/// - `xp_awarded` counts only sub-tasks that changed state.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_complete_daily_quest(quest_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.complete_all_tasks_of_daily_quest(quest_id)),
        |xp| TrackerActionResponse::awarded("Daily quest completed.", xp),
    )
}

/// Removes a sub-task from a daily quest.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_delete_daily_quest_task(quest_id: u64, task_id: u64) -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.delete_task_of_daily_quest(quest_id, task_id)),
        |()| TrackerActionResponse::success("Quest task deleted."),
    )
}

/// Daily reset of all quest sub-tasks.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_reset_daily_quests() -> TrackerActionResponse {
    respond(
        with_tracker(|service| service.reset_all_tasks_of_all_daily_quests()),
        |()| TrackerActionResponse::success("Daily quests reset."),
    )
}

fn respond<T>(
    result: Result<T, String>,
    on_ok: impl FnOnce(T) -> TrackerActionResponse,
) -> TrackerActionResponse {
    match result {
        Ok(value) => on_ok(value),
        Err(message) => TrackerActionResponse::failure(message),
    }
}

fn tracker_config() -> Result<&'static TrackerConfig, String> {
    usable_config(TRACKER_CONFIG.get_or_init(TrackerConfig::from_env))
}

fn usable_config(loaded: &Result<TrackerConfig, ConfigError>) -> Result<&TrackerConfig, String> {
    loaded.as_ref().map_err(|err| {
        error!("event=config_load module=ffi status=error error_code=config_invalid");
        format!("config invalid: {err}")
    })
}

fn with_tracker<T>(
    f: impl FnOnce(&mut TrackerService<SqliteStateStore<'_>>) -> Result<T, TrackerError>,
) -> Result<T, String> {
    let config = tracker_config()?;
    let conn = open_db(&config.db_path).map_err(|err| format!("store open failed: {err}"))?;
    let store =
        SqliteStateStore::try_new(&conn).map_err(|err| format!("store init failed: {err}"))?;
    let mut service = TrackerService::open(store, config.tracker_options())
        .map_err(|err| format!("state load failed: {err}"))?;
    f(&mut service).map_err(|err| user_message(&err))
}

fn user_message(err: &TrackerError) -> String {
    match err {
        TrackerError::Validation(inner) => format!("Please fix the form: {inner}."),
        TrackerError::NotFound(StateError::QuestNotFound(_)) => "Daily quest not found".to_string(),
        TrackerError::NotFound(StateError::RecentTaskNotFound(_)) => {
            "Recent task not found".to_string()
        }
        TrackerError::NotFound(_) => "Task not found".to_string(),
        TrackerError::AlreadyDone(_) => "Task already done".to_string(),
        TrackerError::Persistence(inner) => format!("Could not save progress: {inner}"),
    }
}

fn to_snapshot(state: &SystemState) -> TrackerSnapshot {
    let progress = state.progress();
    TrackerSnapshot {
        ok: true,
        message: String::new(),
        level: progress.level,
        xp: progress.xp,
        xp_earned_today: progress.xp_earned_today,
        xp_needed_for_next_level: progress.xp_needed_for_next_level,
        level_progress: progress.level_progress,
        current_tasks: state.current_tasks.iter().map(to_task_item).collect(),
        recent_tasks: state.recent_tasks.iter().map(to_template_item).collect(),
        daily_quests: state.daily_quests.iter().map(to_quest_item).collect(),
    }
}

fn to_task_item(task: &Task) -> TaskItem {
    TaskItem {
        id: task.id,
        name: task.name.clone(),
        effort: task.effort.get(),
        impact: task.impact.get(),
        difficulty: task.difficulty.get(),
        status: if task.is_done() { "done" } else { "todo" }.to_string(),
        xp: task.xp_reward(),
    }
}

fn to_template_item(task: &RecentTask) -> TaskItem {
    TaskItem {
        id: task.id,
        name: task.name.clone(),
        effort: task.effort.get(),
        impact: task.impact.get(),
        difficulty: task.difficulty.get(),
        status: String::new(),
        xp: task.xp_reward(),
    }
}

fn to_quest_item(quest: &DailyQuest) -> QuestItem {
    QuestItem {
        id: quest.id,
        title: quest.title.clone(),
        tasks: quest.tasks.iter().map(to_task_item).collect(),
        completion_percentage: quest.completion_percentage(),
    }
}
