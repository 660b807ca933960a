#![forbid(unsafe_code)]

mod error;
mod operation_logs;
mod projects;
mod sequences;
mod support;
mod types;
mod users;
mod work_items;

pub use error::StoreError;
pub use support::sanitize_html;
pub use types::*;

use pm_core::worktime::WorkCalendar;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use support::migrate_sqlite_schema;

const DB_FILE_NAME: &str = "pm.db";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    calendar: WorkCalendar,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_calendar(storage_dir, WorkCalendar::default())
    }

    pub fn open_with_calendar(
        storage_dir: impl AsRef<Path>,
        calendar: WorkCalendar,
    ) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        std::fs::create_dir_all(storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;

        migrate_sqlite_schema(&conn)?;

        Ok(Self { conn, calendar })
    }

    /// Raw connection access for maintenance tooling and fault-injection tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Writes take the database write lock up front (`BEGIN IMMEDIATE`).
fn begin_write(conn: &mut Connection) -> Result<Transaction<'_>, StoreError> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}
