//! SQLite-backed key-value persistence layer.
//!
//! RULE: Only this module talks to the database.
//! Domain stores call read/write methods — they never execute SQL directly.
//!
//! Layout: a single `kv` table holding one JSON array per entity kind,
//! keyed "classbank:<entity>", plus scalar meta keys (schema version,
//! last interest-process month). Collections are read fully into memory
//! on load and rewritten fully on every flush — there are no partial
//! updates and no indexing.

use crate::error::{EconError, EconResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

/// Current persisted schema version. Bump when the key layout changes.
pub const SCHEMA_VERSION: i64 = 1;

const NAMESPACE: &str = "classbank";

pub struct KvStore {
    conn: Connection,
}

impl KvStore {
    pub fn open(path: &str) -> EconResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EconResult<Self> {
        let conn = Connection::open(":memory:")?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Create the kv table if needed and run the one-time schema-version
    /// gated migration. A database written by a newer version is refused.
    fn migrate(&self) -> EconResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        let found = self.schema_version()?;
        if found > SCHEMA_VERSION {
            return Err(EconError::SchemaTooNew {
                found,
                supported: SCHEMA_VERSION,
            });
        }
        if found < SCHEMA_VERSION {
            // v0 -> v1: nothing to rewrite yet; stamp the version so the
            // gate only runs once per database.
            self.write_meta("schema_version", &SCHEMA_VERSION.to_string())?;
            log::info!("migrated kv store schema {found} -> {SCHEMA_VERSION}");
        }
        Ok(())
    }

    pub fn schema_version(&self) -> EconResult<i64> {
        Ok(self
            .read_meta("schema_version")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0))
    }

    fn key(entity: &str) -> String {
        format!("{NAMESPACE}:{entity}")
    }

    // ── Collections ────────────────────────────────────────────

    /// Read one entity collection. Records that fail to deserialize are
    /// logged and dropped — a malformed row never aborts the load.
    pub fn read_collection<T: DeserializeOwned>(&self, entity: &str) -> EconResult<Vec<T>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![Self::key(entity)],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };
        let values: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<T>(value) {
                Ok(record) => out.push(record),
                Err(e) => log::warn!("dropping malformed '{entity}' record: {e}"),
            }
        }
        Ok(out)
    }

    /// Rewrite one entity collection in full.
    pub fn write_collection<T: Serialize>(&self, entity: &str, records: &[T]) -> EconResult<()> {
        let json = serde_json::to_string(records)?;
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![Self::key(entity), json],
        )?;
        log::debug!("flushed {} '{entity}' records", records.len());
        Ok(())
    }

    // ── Scalar meta keys ───────────────────────────────────────

    pub fn read_meta(&self, name: &str) -> EconResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![Self::key(name)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn write_meta(&self, name: &str, value: &str) -> EconResult<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![Self::key(name), value],
        )?;
        Ok(())
    }
}
