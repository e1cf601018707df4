//! State store contract and SQLite implementation.
//!
//! The aggregate is stored as one JSON blob per key in `kv_store`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::system::SystemState;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Fixed key the tracker aggregate is stored under.
pub const DEFAULT_STATE_KEY: &str = "my-system";

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from loading or saving the aggregate.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "failed to serialize state: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted state: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind required {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable key-value storage for the tracker aggregate.
pub trait StateStore {
    /// Loads the aggregate stored under `key`, `None` when absent.
    fn load(&self, key: &str) -> StoreResult<Option<SystemState>>;
    /// Replaces the aggregate stored under `key`.
    fn save(&self, key: &str, state: &SystemState) -> StoreResult<()>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn load(&self, key: &str) -> StoreResult<Option<SystemState>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, state: &SystemState) -> StoreResult<()> {
        (**self).save(key, state)
    }
}

/// SQLite-backed state store.
pub struct SqliteStateStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStateStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    ///
    /// Rejects connections that skipped migrations.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version =
            conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
        let expected_version = latest_version();
        if actual_version < expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_table: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_store'
            );",
            [],
            |row| row.get(0),
        )?;
        if has_table == 0 {
            return Err(StoreError::MissingRequiredTable("kv_store"));
        }

        Ok(Self { conn })
    }
}

impl StateStore for SqliteStateStore<'_> {
    fn load(&self, key: &str) -> StoreResult<Option<SystemState>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = raw else {
            debug!("event=state_load module=store status=ok found=false");
            return Ok(None);
        };

        let mut state = serde_json::from_str::<SystemState>(&raw).map_err(|err| {
            error!(
                "event=state_load module=store status=error error_code=state_parse_failed line={} column={}",
                err.line(),
                err.column()
            );
            StoreError::InvalidData(err.to_string())
        })?;
        state.repair_id_sequence();

        debug!(
            "event=state_load module=store status=ok found=true bytes={}",
            raw.len()
        );
        Ok(Some(state))
    }

    fn save(&self, key: &str, state: &SystemState) -> StoreResult<()> {
        let started_at = Instant::now();
        let raw = serde_json::to_string(state).map_err(StoreError::Serialization)?;

        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, strftime('%s', 'now') * 1000)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, raw],
        )?;

        debug!(
            "event=state_save module=store status=ok bytes={} duration_ms={}",
            raw.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }
}
