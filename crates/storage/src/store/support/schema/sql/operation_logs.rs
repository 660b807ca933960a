#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS operation_logs (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          user_id INTEGER NOT NULL,
          username TEXT NOT NULL,
          operation_type TEXT NOT NULL,
          entity_type TEXT NOT NULL CHECK (entity_type IN ('project', 'work_item')),
          entity_id INTEGER NOT NULL,
          operation_content TEXT NOT NULL,
          field_name TEXT,
          old_value TEXT,
          new_value TEXT,
          result_status TEXT NOT NULL CHECK (result_status IN ('success', 'failed')),
          failure_reason TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TRIGGER IF NOT EXISTS operation_logs_no_update
        BEFORE UPDATE ON operation_logs
        BEGIN
          SELECT RAISE(ABORT, 'operation_logs is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS operation_logs_no_delete
        BEFORE DELETE ON operation_logs
        BEGIN
          SELECT RAISE(ABORT, 'operation_logs is append-only');
        END;
"#;
