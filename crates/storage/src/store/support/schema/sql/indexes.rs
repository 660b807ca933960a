#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_projects_created ON projects(deleted_at_ms, created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_work_items_project ON work_items(project_id, kind, id);
        CREATE INDEX IF NOT EXISTS idx_work_items_parent ON work_items(parent_id, id);
        CREATE INDEX IF NOT EXISTS idx_work_items_job_title ON work_items(project_id, title) WHERE kind = 'JOB';
        CREATE INDEX IF NOT EXISTS idx_operation_logs_entity
          ON operation_logs(entity_type, entity_id, created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
"#;
