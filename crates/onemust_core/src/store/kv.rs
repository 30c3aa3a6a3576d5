//! Key-value store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide raw get/put/remove over the `kv_entries` table.
//! - Serialize read-modify-write sequences with an immediate transaction.
//! - Offer typed JSON helpers whose reads never fail.
//!
//! # Invariants
//! - `try_new` rejects connections that have not been migrated.
//! - `transact` holds the SQLite write lock for its whole closure, so two
//!   processes updating the shared area cannot interleave.
//! - Decode failures are logged by key and error class, never by value.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::store::keys::StoreKey;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence error for key-value access.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Encode(serde_json::Error),
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
            Self::Encode(err) => write!(f, "failed to encode store value: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "store connection is not migrated: expected schema {expected_version}, found {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "store table missing: {table}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::UninitializedConnection { .. } | Self::MissingRequiredTable(_) => None,
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

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

/// Raw string key-value storage.
pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>>;
    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()>;
    /// Returns whether a value was present.
    fn remove(&self, key: &str) -> StoreResult<bool>;
    /// Runs `f` atomically; an `Err` from `f` discards every write it made.
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Self) -> Result<T, E>;
}

/// SQLite-backed key-value store over one migrated connection.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Wraps a connection after checking it carries the current schema.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version < expected_version {
            return Err(StoreError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }

        let has_table: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries'
            );",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Err(StoreError::MissingRequiredTable("kv_entries"));
        }

        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get_raw(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_raw(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }

    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        if !self.conn.is_autocommit() {
            // Already inside an outer transaction; join it.
            return f(self);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| E::from(StoreError::from(err)))?;
        let value = f(self)?;
        tx.commit().map_err(|err| E::from(StoreError::from(err)))?;
        Ok(value)
    }
}

/// Encodes `value` as JSON and writes it under `key`.
pub fn save<S, K, T>(store: &S, key: &K, value: &T) -> StoreResult<()>
where
    S: KeyValueStore,
    K: StoreKey,
    T: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    store.put_raw(&key.storage_key(), &encoded)
}

/// Loads and decodes the value under `key`, or `T::default()`.
///
/// Missing keys, undecodable JSON and store failures all read as "no data".
pub fn load<S, K, T>(store: &S, key: &K) -> T
where
    S: KeyValueStore,
    K: StoreKey,
    T: DeserializeOwned + Default,
{
    load_optional(store, key).unwrap_or_default()
}

/// Loads and decodes the value under `key`, or `None`.
pub fn load_optional<S, K, T>(store: &S, key: &K) -> Option<T>
where
    S: KeyValueStore,
    K: StoreKey,
    T: DeserializeOwned,
{
    let storage_key = key.storage_key();
    let raw = match store.get_raw(&storage_key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(err) => {
            warn!(
                "event=store_load module=store status=error key={} error_code=read_failed error={}",
                storage_key, err
            );
            return None;
        }
    };

    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                "event=store_load module=store status=error key={} error_code=decode_failed error_class={:?} line={} column={}",
                storage_key,
                err.classify(),
                err.line(),
                err.column()
            );
            None
        }
    }
}
