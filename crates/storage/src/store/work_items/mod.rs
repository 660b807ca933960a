#![forbid(unsafe_code)]

mod cascade;
mod create;
mod delete;
mod query;
mod update;

use super::StoreError;
use super::types::WorkItemRow;
use pm_core::dates::to_ms;
use pm_core::lifecycle::{TransitionContext, apply_status};
use pm_core::model::WorkItemStatus;

const MAX_TITLE_CHARS: usize = 500;

fn normalize_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(StoreError::validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title.to_string())
}

/// Applies a status change with its completion side effects and stamps `updated_at_ms`.
fn transition(item: &mut WorkItemRow, target: WorkItemStatus, ctx: &TransitionContext<'_>) {
    let mut fields = item.completion_fields();
    apply_status(&mut fields, target, ctx);
    item.set_completion_fields(fields);
    item.updated_at_ms = to_ms(ctx.now);
}
