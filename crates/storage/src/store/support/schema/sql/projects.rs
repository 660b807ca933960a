#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS projects (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          code TEXT NOT NULL UNIQUE,
          name TEXT NOT NULL,
          description TEXT,
          creator_id INTEGER NOT NULL REFERENCES users(id),
          owner_id INTEGER NOT NULL REFERENCES users(id),
          priority TEXT NOT NULL DEFAULT 'medium' CHECK (priority IN ('low', 'medium', 'high')),
          status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'archived')),
          archived INTEGER NOT NULL DEFAULT 0,
          start_date TEXT,
          end_date TEXT,
          label_path TEXT,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          deleted_at_ms INTEGER,
          CHECK (start_date IS NULL OR end_date IS NULL OR start_date <= end_date)
        );
"#;
