use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::StoreError;

const DB_FILE_NAME: &str = "bookshelf.db";
const MIGRATION_SLOTS_SQL: &str = include_str!("../migrations/0000_slots.sql");

/// Named text slots, each overwritten whole.
pub trait SlotBackend {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

pub struct SqliteSlots {
    conn: Connection,
}

impl SqliteSlots {
    /// Opens (or creates) `bookshelf.db` inside `data_dir`.
    pub fn open_in(data_dir: &Path) -> Result<Self, StoreError> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir)?;
        }
        let conn = Connection::open(data_dir.join(DB_FILE_NAME))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
              id TEXT PRIMARY KEY NOT NULL,
              applied_at INTEGER NOT NULL
            );",
        )?;
        apply_migration(&conn, "0000_slots", MIGRATION_SLOTS_SQL)?;
        Ok(Self { conn })
    }
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> Result<(), rusqlite::Error> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }
    conn.execute_batch(sql)?;
    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    log::info!("applied migration {}", id);
    Ok(())
}

impl SlotBackend for SqliteSlots {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}

/// Process-local slots for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: RefCell<HashMap<String, String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot(key: &str, value: &str) -> Self {
        let slots = Self::new();
        slots.slots.borrow_mut().insert(key.to_string(), value.to_string());
        slots
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }
}

impl SlotBackend for MemorySlots {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<T: SlotBackend + ?Sized> SlotBackend for &T {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}
