use levelup_core::db::open_db_in_memory;
use levelup_core::{
    MissingIdPolicy, Rating, RecentTask, SqliteStateStore, StateError, StateStore, StoreError,
    StoreResult, SystemState, Task, TaskDraft, TaskStatus, TaskValidationError, TrackerError,
    TrackerOptions, TrackerService,
};
use rusqlite::Connection;
use std::cell::Cell;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn task(id: u64, name: &str, effort: u8, impact: u8, difficulty: u8) -> Task {
    Task::new(
        id,
        name,
        Rating::new(effort).unwrap(),
        Rating::new(impact).unwrap(),
        Rating::new(difficulty).unwrap(),
    )
}

fn lenient() -> TrackerOptions {
    TrackerOptions {
        missing_id_policy: MissingIdPolicy::Ignore,
        ..TrackerOptions::default()
    }
}

/// Store wrapper that fails every save once `fail` is set.
struct FlakyStore<'a> {
    inner: SqliteStateStore<'a>,
    fail: Cell<bool>,
    saves: Cell<u32>,
}

impl StateStore for FlakyStore<'_> {
    fn load(&self, key: &str) -> StoreResult<Option<SystemState>> {
        self.inner.load(key)
    }

    fn save(&self, key: &str, state: &SystemState) -> StoreResult<()> {
        if self.fail.get() {
            return Err(StoreError::InvalidData("disk unavailable".to_string()));
        }
        self.saves.set(self.saves.get() + 1);
        self.inner.save(key, state)
    }
}

#[test]
fn completing_a_task_awards_xp_and_progress() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    let id = service.create_task(&TaskDraft::new("Walk", 2, 2, 1)).unwrap();
    let awarded = service.mark_as_done(id).unwrap();

    assert_eq!(awarded, 4);
    assert_eq!(service.state().xp, 4);
    assert_eq!(service.state().xp_earned_today, 4);
    let progress = service.progress();
    assert_eq!(progress.level, 1);
    assert_eq!(progress.level_progress, 4.0);
    assert_eq!(service.state().task(id).unwrap().status, TaskStatus::Done);
}

#[test]
fn mark_as_done_twice_is_rejected_without_changing_xp() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();
    service.add_task(task(10, "Read", 3, 4, 2)).unwrap();

    assert_eq!(service.mark_as_done(10).unwrap(), 14);
    let err = service.mark_as_done(10).unwrap_err();

    assert!(matches!(err, TrackerError::AlreadyDone(10)));
    assert_eq!(service.state().xp, 14);
    assert_eq!(service.state().xp_earned_today, 14);
}

#[test]
fn mark_as_done_reports_not_found_even_when_lenient() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, lenient()).unwrap();

    let err = service.mark_as_done(404).unwrap_err();
    assert!(matches!(err, TrackerError::NotFound(StateError::TaskNotFound(404))));
}

#[test]
fn clear_all_tasks_ends_day_but_keeps_lifetime_xp_and_other_collections() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    let id = service.create_task(&TaskDraft::new("Ship", 5, 5, 5)).unwrap();
    service.mark_as_done(id).unwrap();
    service
        .create_recent_task(&TaskDraft::new("Ship", 5, 5, 5))
        .unwrap();
    service.add_daily_quest("Morning Routine").unwrap();

    service.clear_all_tasks().unwrap();

    let state = service.state();
    assert!(state.current_tasks.is_empty());
    assert_eq!(state.xp_earned_today, 0);
    assert_eq!(state.xp, 50);
    assert_eq!(state.recent_tasks.len(), 1);
    assert_eq!(state.daily_quests.len(), 1);
}

#[test]
fn batch_add_and_update_replace_by_id() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    service
        .add_multiple_tasks(vec![task(1, "a", 1, 1, 1), task(2, "b", 2, 2, 2)])
        .unwrap();
    service.update_task(task(2, "b2", 3, 3, 3)).unwrap();

    let names: Vec<_> = service
        .state()
        .current_tasks
        .iter()
        .map(|task| task.name.as_str())
        .collect();
    assert_eq!(names, ["a", "b2"]);
    assert_eq!(service.state().task(2).unwrap().xp_reward(), 18);
}

#[test]
fn update_cannot_reopen_a_completed_task() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    let id = service.create_task(&TaskDraft::new("Read", 3, 4, 2)).unwrap();
    assert_eq!(service.mark_as_done(id).unwrap(), 14);

    let mut reopened = service.state().task(id).unwrap().clone();
    reopened.status = TaskStatus::Todo;
    service.update_task(reopened).unwrap();

    assert_eq!(service.state().task(id).unwrap().status, TaskStatus::Done);
    assert!(matches!(
        service.mark_as_done(id).unwrap_err(),
        TrackerError::AlreadyDone(task_id) if task_id == id
    ));
    assert_eq!(service.state().xp, 14);
}

#[test]
fn update_cannot_complete_a_task_without_xp() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    let id = service.create_task(&TaskDraft::new("Read", 3, 4, 2)).unwrap();
    let mut finished = service.state().task(id).unwrap().clone();
    finished.status = TaskStatus::Done;
    service.update_task(finished).unwrap();

    assert_eq!(service.state().task(id).unwrap().status, TaskStatus::Todo);
    assert_eq!(service.mark_as_done(id).unwrap(), 14);
}

#[test]
fn batch_add_is_a_single_write() {
    let conn = setup();
    let store = FlakyStore {
        inner: SqliteStateStore::try_new(&conn).unwrap(),
        fail: Cell::new(false),
        saves: Cell::new(0),
    };
    let mut service = TrackerService::open(&store, TrackerOptions::default()).unwrap();

    service
        .add_multiple_tasks(vec![
            task(1, "a", 1, 1, 1),
            task(2, "b", 1, 1, 1),
            task(3, "c", 1, 1, 1),
        ])
        .unwrap();

    assert_eq!(store.saves.get(), 1);
}

#[test]
fn missing_ids_are_rejected_by_default() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    assert!(service.update_task(task(9, "ghost", 1, 1, 1)).unwrap_err().is_not_found());
    assert!(service.delete_task(9).unwrap_err().is_not_found());
    assert!(service.delete_recent_task(9).unwrap_err().is_not_found());
    assert!(service.rename_daily_quest(9, "x").unwrap_err().is_not_found());
    assert!(service
        .add_task_to_daily_quest(9, task(1, "a", 1, 1, 1))
        .unwrap_err()
        .is_not_found());
    assert!(service
        .mark_daily_quest_task_as_done(9, 1)
        .unwrap_err()
        .is_not_found());
    assert!(service
        .delete_task_of_daily_quest(9, 1)
        .unwrap_err()
        .is_not_found());
    assert_eq!(service.state(), &SystemState::default());
}

#[test]
fn lenient_policy_turns_missing_ids_into_no_ops_without_writing() {
    let conn = setup();
    let store = FlakyStore {
        inner: SqliteStateStore::try_new(&conn).unwrap(),
        fail: Cell::new(false),
        saves: Cell::new(0),
    };
    let mut service = TrackerService::open(&store, lenient()).unwrap();
    service.add_task(task(1, "keep", 1, 1, 1)).unwrap();

    service.update_task(task(9, "ghost", 1, 1, 1)).unwrap();
    service.delete_task(9).unwrap();
    service.delete_recent_task(9).unwrap();
    service.rename_daily_quest(9, "x").unwrap();
    service.delete_daily_quest(9).unwrap();
    service.delete_task_of_daily_quest(9, 1).unwrap();
    assert_eq!(service.mark_daily_quest_task_as_done(9, 1).unwrap(), 0);
    assert_eq!(service.complete_all_tasks_of_daily_quest(9).unwrap(), 0);

    assert_eq!(store.saves.get(), 1);
    assert_eq!(service.state().current_tasks.len(), 1);
    assert_eq!(service.state().current_tasks[0].name, "keep");
}

#[test]
fn persistence_failure_leaves_visible_state_unchanged() {
    let conn = setup();
    let store = FlakyStore {
        inner: SqliteStateStore::try_new(&conn).unwrap(),
        fail: Cell::new(false),
        saves: Cell::new(0),
    };
    let mut service = TrackerService::open(&store, TrackerOptions::default()).unwrap();
    service.add_task(task(1, "Write", 2, 3, 2)).unwrap();

    store.fail.set(true);
    let err = service.mark_as_done(1).unwrap_err();

    assert!(matches!(err, TrackerError::Persistence(_)));
    assert_eq!(service.state().xp, 0);
    assert_eq!(service.state().task(1).unwrap().status, TaskStatus::Todo);

    store.fail.set(false);
    assert_eq!(service.mark_as_done(1).unwrap(), 10);
}

#[test]
fn invalid_drafts_never_reach_the_store() {
    let conn = setup();
    let store = FlakyStore {
        inner: SqliteStateStore::try_new(&conn).unwrap(),
        fail: Cell::new(false),
        saves: Cell::new(0),
    };
    let mut service = TrackerService::open(&store, TrackerOptions::default()).unwrap();

    let err = service.create_task(&TaskDraft::new("", 1, 1, 1)).unwrap_err();
    assert!(matches!(
        err,
        TrackerError::Validation(TaskValidationError::EmptyName)
    ));
    let err = service
        .create_task(&TaskDraft::new("Plan", 1, 0, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        TrackerError::Validation(TaskValidationError::RatingOutOfRange { field: "impact", .. })
    ));
    assert_eq!(store.saves.get(), 0);
}

#[test]
fn recent_tasks_replay_into_fresh_current_tasks() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    let done_id = service
        .create_task(&TaskDraft::new("  Deep   work ", 4, 4, 3))
        .unwrap();
    service.mark_as_done(done_id).unwrap();
    let template_id = service.save_task_as_recent(done_id).unwrap();
    service.clear_all_tasks().unwrap();

    let created = service
        .add_tasks_from_recent(&[template_id, template_id])
        .unwrap();

    assert_eq!(created.len(), 2);
    assert_ne!(created[0], created[1]);
    assert!(!created.contains(&template_id));
    let state = service.state();
    assert_eq!(state.current_tasks.len(), 2);
    assert!(state
        .current_tasks
        .iter()
        .all(|task| task.status == TaskStatus::Todo && task.name == "Deep work"));
    assert_eq!(state.recent_task(template_id).unwrap().xp_reward(), 24);
}

#[test]
fn add_and_delete_recent_task() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();

    service
        .add_recent_task(RecentTask {
            id: 77,
            name: "Stretch".to_string(),
            effort: Rating::new(1).unwrap(),
            impact: Rating::new(2).unwrap(),
            difficulty: Rating::new(1).unwrap(),
        })
        .unwrap();
    let next = service.create_task(&TaskDraft::new("after", 1, 1, 1)).unwrap();
    assert!(next > 77);

    service.delete_recent_task(77).unwrap();
    assert!(service.state().recent_tasks.is_empty());
}

#[test]
fn state_survives_reopening_the_store() {
    let conn = setup();
    {
        let store = SqliteStateStore::try_new(&conn).unwrap();
        let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();
        let id = service.create_task(&TaskDraft::new("Run", 3, 3, 3)).unwrap();
        service.mark_as_done(id).unwrap();
        service.add_daily_quest("Evening").unwrap();
    }

    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();
    assert_eq!(service.state().xp, 18);
    assert_eq!(service.state().daily_quests[0].title, "Evening");

    let existing: Vec<u64> = service
        .state()
        .current_tasks
        .iter()
        .map(|task| task.id)
        .chain(service.state().daily_quests.iter().map(|quest| quest.id))
        .collect();
    let fresh = service.create_task(&TaskDraft::new("Swim", 1, 1, 1)).unwrap();
    assert!(!existing.contains(&fresh));
}

#[test]
fn separate_state_keys_do_not_share_state() {
    let conn = setup();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut work = TrackerService::open(
        &store,
        TrackerOptions {
            state_key: "work".to_string(),
            ..TrackerOptions::default()
        },
    )
    .unwrap();
    work.create_task(&TaskDraft::new("Review", 2, 2, 2)).unwrap();

    let home = TrackerService::open(&store, TrackerOptions::default()).unwrap();
    assert!(home.state().current_tasks.is_empty());
}
