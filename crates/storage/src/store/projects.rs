#![forbid(unsafe_code)]

use super::sequences::next_code_tx;
use super::support::{
    PROJECT_COLUMNS, date_param, live_project, now_ms, project_by_id, project_from_row,
    resolve_user_ref, sanitize_html,
};
use super::{
    ProjectCreateRequest, ProjectListRequest, ProjectPage, ProjectPatch, ProjectRow,
    ProjectStatistics, ProjectUpdateOutcome, SqliteStore, StoreError, begin_write,
};
use pm_core::ids::{CodePrefix, parse_code};
use pm_core::model::{Actor, ProjectStatus};
use pm_core::schedule::PlannedWindow;
use rusqlite::{OptionalExtension, Transaction, params};

const MAX_PROJECT_NAME_CHARS: usize = 200;
const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

fn normalize_name(name: &str) -> Result<String, StoreError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::validation("project name must not be empty"));
    }
    if name.chars().count() > MAX_PROJECT_NAME_CHARS {
        return Err(StoreError::validation(format!(
            "project name must be at most {MAX_PROJECT_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn require_owner(project: &ProjectRow, actor: &Actor, action: &str) -> Result<(), StoreError> {
    if project.owner_id != actor.id {
        return Err(StoreError::forbidden(format!(
            "only the owner of {} may {action} it",
            project.code
        )));
    }
    Ok(())
}

/// Ownership rules for `PUT /projects/{id}`.
fn authorize_patch(project: &ProjectRow, actor: &Actor, patch: &ProjectPatch) -> Result<(), StoreError> {
    let is_owner = project.owner_id == actor.id;
    let is_creator = project.creator_id == actor.id;
    if patch.is_owner_transfer_only() {
        return Ok(());
    }
    let touches_core = patch.name.is_some()
        || patch.status.is_some()
        || patch.start_date.is_some()
        || patch.end_date.is_some()
        || patch.owner.is_some();
    let touches_basic =
        patch.description.is_some() || patch.priority.is_some() || patch.label_path.is_some();
    let touches_reporter = patch.creator.is_some();

    let allowed = if touches_core {
        is_owner
    } else if touches_reporter && !touches_basic {
        is_creator || actor.is_admin
    } else if touches_reporter {
        is_owner
    } else {
        is_creator || is_owner || actor.is_admin
    };
    if !allowed {
        return Err(StoreError::forbidden(format!(
            "not allowed to update project {}",
            project.code
        )));
    }
    Ok(())
}

fn reload_project_tx(tx: &Transaction<'_>, id: i64) -> Result<ProjectRow, StoreError> {
    project_by_id(tx, id)?.ok_or_else(|| StoreError::not_found(format!("project {id}")))
}

fn write_project_tx(tx: &Transaction<'_>, project: &ProjectRow) -> Result<(), StoreError> {
    tx.execute(
        "UPDATE projects SET name = ?2, description = ?3, creator_id = ?4, owner_id = ?5, \
           priority = ?6, status = ?7, archived = ?8, start_date = ?9, end_date = ?10, \
           label_path = ?11, updated_at_ms = ?12, deleted_at_ms = ?13 \
         WHERE id = ?1",
        params![
            project.id,
            project.name,
            project.description,
            project.creator_id,
            project.owner_id,
            project.priority.as_str(),
            project.status.as_str(),
            project.archived,
            date_param(project.start_date),
            date_param(project.end_date),
            project.label_path,
            project.updated_at_ms,
            project.deleted_at_ms,
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Creates a project with a fresh `PRO-NNNN` code; the actor becomes creator and owner.
    pub fn create_project(
        &mut self,
        actor: &Actor,
        request: ProjectCreateRequest,
    ) -> Result<ProjectRow, StoreError> {
        let name = normalize_name(&request.name)?;
        PlannedWindow::new(request.start_date, request.end_date).validate_order()?;
        let description = request.description.as_deref().map(sanitize_html);

        let tx = begin_write(&mut self.conn)?;
        let code = next_code_tx(&tx, CodePrefix::Pro)?;
        let now = now_ms();
        tx.execute(
            "INSERT INTO projects(code, name, description, creator_id, owner_id, priority, status, \
               archived, start_date, end_date, label_path, created_at_ms, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, 'active', 0, ?6, ?7, ?8, ?9, ?9)",
            params![
                code,
                name,
                description,
                actor.id,
                request.priority.as_str(),
                date_param(request.start_date),
                date_param(request.end_date),
                request.label_path,
                now,
            ],
        )?;
        let project = reload_project_tx(&tx, tx.last_insert_rowid())?;
        tx.commit()?;
        Ok(project)
    }

    pub fn get_project(&self, id: i64, include_deleted: bool) -> Result<Option<ProjectRow>, StoreError> {
        Ok(project_by_id(&self.conn, id)?.filter(|p| include_deleted || !p.is_deleted()))
    }

    pub fn get_project_by_code(
        &self,
        code: &str,
        include_deleted: bool,
    ) -> Result<Option<ProjectRow>, StoreError> {
        let code = code.trim();
        if !matches!(parse_code(code), Some((CodePrefix::Pro, _))) {
            return Ok(None);
        }
        let project = self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE code = ?1"),
                params![code],
                project_from_row,
            )
            .optional()?;
        Ok(project.filter(|p| include_deleted || !p.is_deleted()))
    }

    /// Newest first; `search` matches name or code case-insensitively.
    pub fn list_projects(&self, request: &ProjectListRequest) -> Result<ProjectPage, StoreError> {
        let size = match request.size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        };
        let page = request.page.max(1);
        let offset = i64::from(page - 1) * i64::from(size);
        let search = request
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let status = request.status.map(ProjectStatus::as_str);

        const FILTER: &str = "WHERE (?1 OR deleted_at_ms IS NULL) \
             AND (?2 IS NULL OR status = ?2) \
             AND (?3 IS NULL OR archived = ?3) \
             AND (?4 IS NULL OR instr(lower(name), lower(?4)) > 0 OR instr(lower(code), lower(?4)) > 0)";

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM projects {FILTER}"),
            params![request.include_deleted, status, request.archived, search],
            |row| row.get(0),
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects {FILTER} \
             ORDER BY created_at_ms DESC, id DESC LIMIT ?5 OFFSET ?6"
        ))?;
        let rows = stmt.query_map(
            params![
                request.include_deleted,
                status,
                request.archived,
                search,
                i64::from(size),
                offset
            ],
            project_from_row,
        )?;
        let items = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(ProjectPage {
            items,
            total,
            page,
            size,
        })
    }

    pub fn update_project(
        &mut self,
        id: i64,
        actor: &Actor,
        patch: ProjectPatch,
    ) -> Result<ProjectUpdateOutcome, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let before = live_project(&tx, id)?;
        if before.archived {
            return Err(StoreError::forbidden(format!(
                "project {} is archived",
                before.code
            )));
        }
        authorize_patch(&before, actor, &patch)?;

        let mut after = before.clone();
        if let Some(name) = patch.name.as_deref() {
            after.name = normalize_name(name)?;
        }
        if let Some(description) = patch.description {
            after.description = description.as_deref().map(sanitize_html);
        }
        if let Some(priority) = patch.priority {
            after.priority = priority;
        }
        if let Some(status) = patch.status {
            after.status = status;
            after.archived = status == ProjectStatus::Archived;
        }
        if let Some(start_date) = patch.start_date {
            after.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            after.end_date = end_date;
        }
        if let Some(label_path) = patch.label_path {
            after.label_path = label_path;
        }
        if let Some(creator) = patch.creator.as_ref()
            && let Some(creator_id) = resolve_user_ref(&tx, creator)?
        {
            after.creator_id = creator_id;
        }
        if let Some(owner) = patch.owner.as_ref()
            && let Some(owner_id) = resolve_user_ref(&tx, owner)?
        {
            after.owner_id = owner_id;
        }
        PlannedWindow::new(after.start_date, after.end_date).validate_order()?;

        after.updated_at_ms = now_ms();
        write_project_tx(&tx, &after)?;
        let after = reload_project_tx(&tx, id)?;
        tx.commit()?;
        Ok(ProjectUpdateOutcome { before, after })
    }

    pub fn archive_project(&mut self, id: i64, actor: &Actor) -> Result<ProjectRow, StoreError> {
        self.set_archived(id, actor, true)
    }

    pub fn unarchive_project(&mut self, id: i64, actor: &Actor) -> Result<ProjectRow, StoreError> {
        self.set_archived(id, actor, false)
    }

    fn set_archived(&mut self, id: i64, actor: &Actor, archived: bool) -> Result<ProjectRow, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let mut project = live_project(&tx, id)?;
        require_owner(&project, actor, if archived { "archive" } else { "unarchive" })?;
        if project.archived == archived {
            return Err(StoreError::validation(format!(
                "project {} is already {}",
                project.code,
                if archived { "archived" } else { "active" }
            )));
        }
        project.archived = archived;
        project.status = if archived {
            ProjectStatus::Archived
        } else {
            ProjectStatus::Active
        };
        project.updated_at_ms = now_ms();
        write_project_tx(&tx, &project)?;
        let project = reload_project_tx(&tx, id)?;
        tx.commit()?;
        Ok(project)
    }

    /// Marks the project deleted; its work items are left untouched.
    pub fn delete_project(&mut self, id: i64, actor: &Actor) -> Result<ProjectRow, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let mut project = live_project(&tx, id)?;
        require_owner(&project, actor, "delete")?;
        let now = now_ms();
        project.deleted_at_ms = Some(now);
        project.updated_at_ms = now;
        write_project_tx(&tx, &project)?;
        let project = reload_project_tx(&tx, id)?;
        tx.commit()?;
        Ok(project)
    }

    pub fn restore_project(&mut self, id: i64, actor: &Actor) -> Result<ProjectRow, StoreError> {
        let tx = begin_write(&mut self.conn)?;
        let mut project =
            project_by_id(&tx, id)?.ok_or_else(|| StoreError::not_found(format!("project {id}")))?;
        if !project.is_deleted() {
            return Err(StoreError::validation(format!(
                "project {} is not deleted",
                project.code
            )));
        }
        require_owner(&project, actor, "restore")?;
        project.deleted_at_ms = None;
        project.updated_at_ms = now_ms();
        write_project_tx(&tx, &project)?;
        let project = reload_project_tx(&tx, id)?;
        tx.commit()?;
        Ok(project)
    }

    /// Counts of live work items by kind and status.
    pub fn project_statistics(&self, id: i64) -> Result<ProjectStatistics, StoreError> {
        live_project(&self.conn, id)?;
        let mut stats = ProjectStatistics {
            project_id: id,
            ..ProjectStatistics::default()
        };
        let mut stmt = self.conn.prepare(
            "SELECT kind, status, COUNT(*) FROM work_items \
             WHERE project_id = ?1 AND deleted_at_ms IS NULL GROUP BY kind, status",
        )?;
        let mut rows = stmt.query(params![id])?;
        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let status: String = row.get(1)?;
            let count: i64 = row.get(2)?;
            match kind.as_str() {
                "JOB" => stats.jobs += count,
                _ => stats.tasks += count,
            }
            match status.as_str() {
                "todo" => stats.todo += count,
                "doing" => stats.doing += count,
                "blocked" => stats.blocked += count,
                "done" => stats.done += count,
                "cancelled" => stats.cancelled += count,
                _ => {}
            }
        }
        Ok(stats)
    }
}
