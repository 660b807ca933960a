#![forbid(unsafe_code)]

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationType {
    CreateProject,
    UpdateProject,
    ArchiveProject,
    UnarchiveProject,
    DeleteProject,
    RestoreProject,
    CreateWorkItem,
    UpdateWorkItem,
    DeleteWorkItem,
    StatusSync,
    StatusCascade,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::CreateProject => "create_project",
            OperationType::UpdateProject => "update_project",
            OperationType::ArchiveProject => "archive_project",
            OperationType::UnarchiveProject => "unarchive_project",
            OperationType::DeleteProject => "delete_project",
            OperationType::RestoreProject => "restore_project",
            OperationType::CreateWorkItem => "create_work_item",
            OperationType::UpdateWorkItem => "update_work_item",
            OperationType::DeleteWorkItem => "delete_work_item",
            OperationType::StatusSync => "status_sync",
            OperationType::StatusCascade => "status_cascade",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityType {
    Project,
    WorkItem,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Project => "project",
            EntityType::WorkItem => "work_item",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(EntityType::Project),
            "work_item" => Some(EntityType::WorkItem),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationResult {
    Success,
    Failed,
}

impl OperationResult {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationResult::Success => "success",
            OperationResult::Failed => "failed",
        }
    }
}

/// One audit record to append. `entity_id` is 0 when the entity was never created.
#[derive(Clone, Debug)]
pub struct OperationLogEntry {
    pub user_id: i64,
    pub username: String,
    pub operation_type: OperationType,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub content: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub result: OperationResult,
    pub failure_reason: Option<String>,
}

impl OperationLogEntry {
    pub fn success(
        user_id: i64,
        username: &str,
        operation_type: OperationType,
        entity_type: EntityType,
        entity_id: i64,
        content: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            operation_type,
            entity_type,
            entity_id,
            content: content.into(),
            field_name: None,
            old_value: None,
            new_value: None,
            result: OperationResult::Success,
            failure_reason: None,
        }
    }

    pub fn with_field(
        mut self,
        field_name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        self.field_name = Some(field_name.to_string());
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn failed(mut self, reason: impl Into<String>) -> Self {
        self.result = OperationResult::Failed;
        self.failure_reason = Some(reason.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationLogRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub operation_type: String,
    pub entity_type: String,
    pub entity_id: i64,
    pub content: String,
    pub field_name: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub result_status: String,
    pub failure_reason: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct OperationLogPage {
    pub items: Vec<OperationLogRow>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
}
