#![forbid(unsafe_code)]

pub(crate) mod identity;
pub(crate) mod operation_logs;
pub(crate) mod projects;
pub(crate) mod work_items;

use crate::audit::{self, AuditActor};
use crate::error::ApiError;
use pm_storage::{OperationLogEntry, SqliteStore, StoreError};

/// Records the audit entries for `result` and hands it back as an API result.
pub(super) fn audited<T>(
    store: &mut SqliteStore,
    who: &AuditActor,
    result: Result<T, StoreError>,
    on_success: impl FnOnce(&AuditActor, &T) -> Vec<OperationLogEntry>,
    on_failure: impl FnOnce(&AuditActor, &StoreError) -> Vec<OperationLogEntry>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            audit::record(store, &on_success(who, &value));
            Ok(value)
        }
        Err(err) => {
            audit::record(store, &on_failure(who, &err));
            Err(err.into())
        }
    }
}
