#![forbid(unsafe_code)]

use super::support::now_ms;
use super::{SqliteStore, StoreError, begin_write};
use pm_core::ids::CodePrefix;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::debug;

/// Issues the next code for `prefix` inside the caller's write transaction.
///
/// The increment and the read of the new value are one statement, and the row stays
/// locked until the caller commits; a rolled-back caller therefore leaves no gap.
pub(in crate::store) fn next_code_tx(
    tx: &Transaction<'_>,
    prefix: CodePrefix,
) -> Result<String, StoreError> {
    let value: i64 = tx.query_row(
        "INSERT INTO sequences(prefix, current_value, updated_at_ms) VALUES (?1, 1, ?2) \
         ON CONFLICT(prefix) DO UPDATE SET current_value = current_value + 1, \
           updated_at_ms = excluded.updated_at_ms \
         RETURNING current_value",
        params![prefix.as_str(), now_ms()],
        |row| row.get(0),
    )?;
    let code = prefix.format(value);
    debug!(prefix = prefix.as_str(), value, code = %code, "issued code");
    Ok(code)
}

fn current_value(conn: &Connection, prefix: CodePrefix) -> Result<i64, StoreError> {
    Ok(conn
        .query_row(
            "SELECT current_value FROM sequences WHERE prefix = ?1",
            params![prefix.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .unwrap_or(0))
}

impl SqliteStore {
    /// Issues and commits a standalone code (`PRO-0001`, `JOB-0042`, ...).
    pub fn next_code(&mut self, prefix: &str) -> Result<String, StoreError> {
        let prefix = CodePrefix::parse(prefix)?;
        let tx = begin_write(&mut self.conn)?;
        let code = next_code_tx(&tx, prefix)?;
        tx.commit()?;
        Ok(code)
    }

    /// The value the next issuance would use, without issuing it.
    pub fn peek_next_value(&self, prefix: &str) -> Result<i64, StoreError> {
        let prefix = CodePrefix::parse(prefix)?;
        Ok(current_value(&self.conn, prefix)? + 1)
    }

    /// Maintenance only: the next issued value becomes `start_value`.
    pub fn reset_sequence(&mut self, prefix: &str, start_value: i64) -> Result<(), StoreError> {
        let prefix = CodePrefix::parse(prefix)?;
        if start_value < 1 {
            return Err(StoreError::InvalidArgument(format!(
                "sequence start must be at least 1, got {start_value}"
            )));
        }
        let tx = begin_write(&mut self.conn)?;
        tx.execute(
            "INSERT INTO sequences(prefix, current_value, updated_at_ms) VALUES (?1, ?2, ?3) \
             ON CONFLICT(prefix) DO UPDATE SET current_value = excluded.current_value, \
               updated_at_ms = excluded.updated_at_ms",
            params![prefix.as_str(), start_value - 1, now_ms()],
        )?;
        tx.commit()?;
        Ok(())
    }
}
