#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS users (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          username TEXT NOT NULL UNIQUE,
          -- Local part of the email (or the username); the assignee lookup key.
          email_prefix TEXT NOT NULL UNIQUE,
          email TEXT,
          full_name TEXT,
          is_admin INTEGER NOT NULL DEFAULT 0,
          is_active INTEGER NOT NULL DEFAULT 1,
          created_at_ms INTEGER NOT NULL
        );

        -- Only the SHA-256 of a bearer token is stored.
        CREATE TABLE IF NOT EXISTS sessions (
          token_sha256 TEXT PRIMARY KEY,
          user_id INTEGER NOT NULL REFERENCES users(id),
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sequences (
          prefix TEXT PRIMARY KEY CHECK (prefix IN ('PRO', 'JOB', 'TASK')),
          current_value INTEGER NOT NULL DEFAULT 0 CHECK (current_value >= 0),
          updated_at_ms INTEGER NOT NULL
        );
"#;
