#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS work_items (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          code TEXT NOT NULL UNIQUE,
          kind TEXT NOT NULL CHECK (kind IN ('JOB', 'TASK')),
          project_id INTEGER NOT NULL REFERENCES projects(id),
          parent_id INTEGER REFERENCES work_items(id),
          title TEXT NOT NULL,
          description TEXT,
          status TEXT NOT NULL DEFAULT 'todo'
            CHECK (status IN ('todo', 'doing', 'blocked', 'done', 'cancelled', 'deleted')),
          priority TEXT NOT NULL DEFAULT 'medium' CHECK (priority IN ('low', 'medium', 'high')),
          label_path TEXT,
          assignee_id INTEGER REFERENCES users(id),
          creator_id INTEGER NOT NULL REFERENCES users(id),
          -- Dates are YYYY-MM-DD text, so lexical order is calendar order.
          start_date TEXT,
          planned_start_date TEXT,
          planned_end_date TEXT,
          completed_at_ms INTEGER,
          actual_hours REAL,
          estimated_hours REAL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          deleted_at_ms INTEGER,
          CHECK ((kind = 'JOB' AND parent_id IS NULL) OR (kind = 'TASK' AND parent_id IS NOT NULL)),
          CHECK (planned_start_date IS NULL OR planned_end_date IS NULL
                 OR planned_start_date <= planned_end_date)
        );
"#;
