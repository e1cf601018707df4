use levelup_core::db::migrations::latest_version;
use levelup_core::db::{open_db, open_db_in_memory};
use levelup_core::{
    SqliteStateStore, StateStore, StoreError, SystemState, TaskDraft, TaskStatus, TrackerOptions,
    TrackerService, DEFAULT_STATE_KEY,
};
use rusqlite::{params, Connection};
use serde_json::Value;

#[test]
fn missing_key_loads_as_none() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();

    assert!(store.load(DEFAULT_STATE_KEY).unwrap().is_none());
}

#[test]
fn saved_blob_uses_camel_case_field_names() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(&store, TrackerOptions::default()).unwrap();
    let id = service.create_task(&TaskDraft::new("Plan", 1, 2, 3)).unwrap();
    service.add_daily_quest("Morning").unwrap();

    let raw: String = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1;",
            [DEFAULT_STATE_KEY],
            |row| row.get(0),
        )
        .unwrap();
    let json: Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(json["xp"], 0);
    assert_eq!(json["xpEarnedToday"], 0);
    assert_eq!(json["recentTasks"], Value::Array(Vec::new()));
    let stored_task = &json["currentTasks"][0];
    assert_eq!(stored_task["id"], id);
    assert_eq!(stored_task["name"], "Plan");
    assert_eq!(stored_task["effort"], 1);
    assert_eq!(stored_task["impact"], 2);
    assert_eq!(stored_task["difficulty"], 3);
    assert_eq!(stored_task["status"], "todo");
    assert_eq!(json["dailyQuests"][0]["title"], "Morning");
    assert_eq!(json["dailyQuests"][0]["tasks"], Value::Array(Vec::new()));
}

#[test]
fn blob_without_sequence_counter_gets_repaired_on_load() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2);",
        params![
            DEFAULT_STATE_KEY,
            r#"{
                "xp": 120,
                "xpEarnedToday": 14,
                "currentTasks": [
                    {"id": 1712000000000, "name": "Read", "effort": 3, "impact": 4, "difficulty": 2, "status": "done"}
                ],
                "recentTasks": [],
                "dailyQuests": [
                    {"id": 1712000000500, "title": "Gym", "tasks": []}
                ]
            }"#
        ],
    )
    .unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();

    let state = store.load(DEFAULT_STATE_KEY).unwrap().unwrap();

    assert_eq!(state.xp, 120);
    assert_eq!(state.current_tasks[0].status, TaskStatus::Done);
    assert_eq!(state.next_id, 1_712_000_000_501);
}

#[test]
fn replayed_fractional_ids_load_as_distinct_tasks() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2);",
        params![
            DEFAULT_STATE_KEY,
            r#"{
                "xp": 0,
                "xpEarnedToday": 0,
                "currentTasks": [
                    {"id": 1712000000000.25, "name": "Read", "effort": 3, "impact": 4, "difficulty": 2, "status": "todo"},
                    {"id": 1712000000000.75, "name": "Walk", "effort": 1, "impact": 1, "difficulty": 1, "status": "todo"}
                ],
                "recentTasks": [],
                "dailyQuests": []
            }"#
        ],
    )
    .unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let mut service = TrackerService::open(&store, TrackerOptions::default()).unwrap();

    let ids: Vec<_> = service.state().current_tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids, [1_712_000_000_000, 1_712_000_000_001]);

    assert_eq!(service.mark_as_done(ids[1]).unwrap(), 2);
    assert_eq!(service.state().task(ids[0]).unwrap().status, TaskStatus::Todo);
}

#[test]
fn negative_id_is_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2);",
        params![
            DEFAULT_STATE_KEY,
            r#"{"xp": 0, "xpEarnedToday": 0, "currentTasks": [
                {"id": -4.5, "name": "Read", "effort": 3, "impact": 4, "difficulty": 2, "status": "todo"}
            ], "recentTasks": [], "dailyQuests": []}"#
        ],
    )
    .unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();

    assert!(matches!(
        store.load(DEFAULT_STATE_KEY),
        Err(StoreError::InvalidData(_))
    ));
}

#[test]
fn out_of_range_rating_is_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO kv_store (key, value) VALUES (?1, ?2);",
        params![
            DEFAULT_STATE_KEY,
            r#"{"xp":0,"xpEarnedToday":0,"currentTasks":[{"id":1,"name":"x","effort":0,"impact":1,"difficulty":1,"status":"todo"}],"recentTasks":[],"dailyQuests":[]}"#
        ],
    )
    .unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();

    let err = store.load(DEFAULT_STATE_KEY).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));

    let open_err = TrackerService::open(&store, TrackerOptions::default()).err().unwrap();
    assert!(open_err.to_string().contains("invalid persisted state"));
}

#[test]
fn save_overwrites_previous_value() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();

    let mut state = SystemState::default();
    store.save(DEFAULT_STATE_KEY, &state).unwrap();
    state.xp = 99;
    store.save(DEFAULT_STATE_KEY, &state).unwrap();

    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM kv_store;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(store.load(DEFAULT_STATE_KEY).unwrap().unwrap().xp, 99);
}

#[test]
fn state_persists_across_file_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("levelup.sqlite3");

    {
        let conn = open_db(&path).unwrap();
        let store = SqliteStateStore::try_new(&conn).unwrap();
        let mut service = TrackerService::open(store, TrackerOptions::default()).unwrap();
        let id = service.create_task(&TaskDraft::new("Ship", 5, 5, 5)).unwrap();
        service.mark_as_done(id).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let store = SqliteStateStore::try_new(&conn).unwrap();
    let service = TrackerService::open(store, TrackerOptions::default()).unwrap();
    assert_eq!(service.state().xp, 50);
    assert_eq!(service.progress().xp_needed_for_next_level, 50);
}

#[test]
fn store_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteStateStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn store_rejects_connection_without_kv_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteStateStore::try_new(&conn),
        Err(StoreError::MissingRequiredTable("kv_store"))
    ));
}
