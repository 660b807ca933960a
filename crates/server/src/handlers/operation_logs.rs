#![forbid(unsafe_code)]

use crate::dto::{LogPageQuery, OperationLogPageView};
use crate::error::ApiError;
use crate::{AppState, Authenticated, with_store};
use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use pm_storage::EntityType;
use serde_json::json;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// History of one entity, newest first.
pub(crate) async fn list(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    path: Result<Path<(String, i64)>, PathRejection>,
    query: Result<Query<LogPageQuery>, QueryRejection>,
) -> Result<Json<OperationLogPageView>, ApiError> {
    let Path((entity_type, entity_id)) = path?;
    let Query(query) = query?;
    let entity_type = EntityType::parse(&entity_type).ok_or_else(|| {
        ApiError::validation(format!("unknown entity type {entity_type:?}"))
            .with_details(json!({ "allowed": ["project", "work_item"] }))
    })?;
    let page = query.page.unwrap_or(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let view = with_store(&state, move |store| {
        let page = store.list_operation_logs(entity_type, entity_id, page, page_size)?;
        Ok(OperationLogPageView::from(&page))
    })
    .await?;
    Ok(Json(view))
}
