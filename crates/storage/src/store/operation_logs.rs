#![forbid(unsafe_code)]

use super::support::{OPERATION_LOG_COLUMNS, now_ms, operation_log_from_row};
use super::{
    EntityType, OperationLogEntry, OperationLogPage, SqliteStore, StoreError, begin_write,
};
use rusqlite::{Transaction, params};

const MAX_LOG_PAGE_SIZE: u32 = 100;

fn append_tx(tx: &Transaction<'_>, entry: &OperationLogEntry, at_ms: i64) -> Result<i64, StoreError> {
    tx.execute(
        "INSERT INTO operation_logs(user_id, username, operation_type, entity_type, entity_id, \
           operation_content, field_name, old_value, new_value, result_status, failure_reason, \
           created_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            entry.user_id,
            entry.username,
            entry.operation_type.as_str(),
            entry.entity_type.as_str(),
            entry.entity_id,
            entry.content,
            entry.field_name,
            entry.old_value,
            entry.new_value,
            entry.result.as_str(),
            entry.failure_reason,
            at_ms,
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

impl SqliteStore {
    /// Appends audit entries. The log is append-only; rows are never updated or removed.
    pub fn append_operation_logs(&mut self, entries: &[OperationLogEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let tx = begin_write(&mut self.conn)?;
        let at_ms = now_ms();
        for entry in entries {
            append_tx(&tx, entry, at_ms)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Newest first.
    pub fn list_operation_logs(
        &self,
        entity_type: EntityType,
        entity_id: i64,
        page: u32,
        page_size: u32,
    ) -> Result<OperationLogPage, StoreError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_LOG_PAGE_SIZE);
        let offset = i64::from(page - 1) * i64::from(page_size);

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM operation_logs WHERE entity_type = ?1 AND entity_id = ?2",
            params![entity_type.as_str(), entity_id],
            |row| row.get(0),
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {OPERATION_LOG_COLUMNS} FROM operation_logs \
             WHERE entity_type = ?1 AND entity_id = ?2 \
             ORDER BY created_at_ms DESC, id DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt.query_map(
            params![entity_type.as_str(), entity_id, i64::from(page_size), offset],
            operation_log_from_row,
        )?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(OperationLogPage {
            items,
            total,
            page,
            page_size,
        })
    }
}
