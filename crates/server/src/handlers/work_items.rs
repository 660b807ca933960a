#![forbid(unsafe_code)]

use super::audited;
use crate::audit::{self, AuditActor};
use crate::dto::{
    BatchUpdateBody, CascadeStatusBody, ItemsView, NameExistsQuery, NameExistsView, TreeQuery,
    UserDirectory, WorkItemCreateBody, WorkItemNodeView, WorkItemUpdateBody, WorkItemView,
    work_item_user_ids,
};
use crate::error::ApiError;
use crate::{AppState, Authenticated, with_store};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use pm_storage::{EntityType, OperationType, SqliteStore, WorkItemRow};

fn item_views(store: &SqliteStore, rows: &[WorkItemRow]) -> Result<Vec<WorkItemView>, ApiError> {
    let users = UserDirectory::load(store, work_item_user_ids(rows))?;
    Ok(rows.iter().map(|row| WorkItemView::new(row, &users)).collect())
}

fn item_view(store: &SqliteStore, row: &WorkItemRow) -> Result<WorkItemView, ApiError> {
    let users = UserDirectory::load(store, work_item_user_ids([row]))?;
    Ok(WorkItemView::new(row, &users))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<WorkItemCreateBody>, JsonRejection>,
) -> Result<Json<WorkItemView>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.create_work_item(&actor, request);
        let item = audited(store, &who, result, audit::work_item_created, |who, err| {
            audit::failed(who, OperationType::CreateWorkItem, EntityType::WorkItem, 0, err)
        })?;
        item_view(store, &item)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn get_by_id(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<WorkItemView>, ApiError> {
    let Path(id) = id?;
    let view = with_store(&state, move |store| {
        let item = store
            .get_work_item(id)?
            .ok_or_else(|| ApiError::not_found(format!("work item {id} not found")))?;
        item_view(store, &item)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn get_by_code(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<WorkItemView>, ApiError> {
    let Path(code) = code?;
    let view = with_store(&state, move |store| {
        let item = store
            .get_work_item_by_code(&code)?
            .ok_or_else(|| ApiError::not_found(format!("work item {code} not found")))?;
        item_view(store, &item)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn list_by_project(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    project_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> Result<Json<ItemsView<WorkItemNodeView>>, ApiError> {
    let Path(project_id) = project_id?;
    let Query(query) = query?;
    let items = with_store(&state, move |store| {
        let tree = store.list_project_tree(project_id, query.include_deleted)?;
        let users = UserDirectory::load(
            store,
            work_item_user_ids(tree.iter().flat_map(|node| {
                std::iter::once(&node.job).chain(node.subtasks.iter())
            })),
        )?;
        Ok(tree
            .iter()
            .map(|node| WorkItemNodeView::new(node, &users))
            .collect())
    })
    .await?;
    Ok(Json(ItemsView { items }))
}

pub(crate) async fn name_exists(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    query: Result<Query<NameExistsQuery>, QueryRejection>,
) -> Result<Json<NameExistsView>, ApiError> {
    let Query(query) = query?;
    let kind = query.kind()?;
    if query.title.trim().is_empty() {
        return Err(ApiError::validation("title must not be empty"));
    }
    let conflict_id = with_store(&state, move |store| {
        Ok(store.title_conflict(query.project_id, kind, &query.title)?)
    })
    .await?;
    Ok(Json(NameExistsView {
        exists: conflict_id.is_some(),
        conflict_id,
    }))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<WorkItemUpdateBody>, JsonRejection>,
) -> Result<Json<WorkItemView>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let patch = body.into_patch()?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.update_work_item(&actor, id, patch);
        let outcome = audited(store, &who, result, audit::work_item_updated, |who, err| {
            audit::failed(who, OperationType::UpdateWorkItem, EntityType::WorkItem, id, err)
        })?;
        item_view(store, &outcome.after)
    })
    .await?;
    Ok(Json(view))
}

/// All-or-nothing: one failing item rolls back the whole batch.
pub(crate) async fn batch_update(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<BatchUpdateBody>, JsonRejection>,
) -> Result<Json<ItemsView<WorkItemView>>, ApiError> {
    let Json(body) = payload?;
    let updates = body
        .items
        .into_iter()
        .map(|item| Ok((item.id, item.fields.into_patch()?)))
        .collect::<Result<Vec<_>, ApiError>>()?;
    let ids: Vec<i64> = updates.iter().map(|(id, _)| *id).collect();
    let items = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.update_work_items(&actor, updates);
        let outcomes = audited(
            store,
            &who,
            result,
            |who, outcomes| {
                outcomes
                    .iter()
                    .flat_map(|outcome| audit::work_item_updated(who, outcome))
                    .collect()
            },
            |who, err| {
                ids.iter()
                    .flat_map(|id| {
                        audit::failed(who, OperationType::UpdateWorkItem, EntityType::WorkItem, *id, err)
                    })
                    .collect()
            },
        )?;
        let rows: Vec<WorkItemRow> = outcomes.into_iter().map(|o| o.after).collect();
        item_views(store, &rows)
    })
    .await?;
    Ok(Json(ItemsView { items }))
}

pub(crate) async fn cascade_status(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CascadeStatusBody>, JsonRejection>,
) -> Result<Json<ItemsView<WorkItemView>>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let request = body.into_request(id)?;
    let items = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.cascade_status(&actor, request);
        let cascaded = audited(
            store,
            &who,
            result,
            |who, items| audit::work_items_cascaded(who, items),
            |who, err| audit::failed(who, OperationType::StatusCascade, EntityType::WorkItem, id, err),
        )?;
        let rows: Vec<WorkItemRow> = cascaded.into_iter().map(|c| c.item).collect();
        item_views(store, &rows)
    })
    .await?;
    Ok(Json(ItemsView { items }))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<WorkItemView>, ApiError> {
    let Path(id) = id?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.soft_delete_work_item(&actor, id);
        let item = audited(store, &who, result, audit::work_item_deleted, |who, err| {
            audit::failed(who, OperationType::DeleteWorkItem, EntityType::WorkItem, id, err)
        })?;
        item_view(store, &item)
    })
    .await?;
    Ok(Json(view))
}
