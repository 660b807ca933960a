#![forbid(unsafe_code)]

use super::audited;
use crate::audit::{self, AuditActor};
use crate::dto::{
    IncludeDeletedQuery, ProjectCreateBody, ProjectListQuery, ProjectPageView,
    ProjectStatisticsView, ProjectUpdateBody, ProjectView, UserDirectory, project_user_ids,
};
use crate::error::ApiError;
use crate::{AppState, Authenticated, with_store};
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use pm_core::model::Actor;
use pm_storage::{EntityType, OperationType, ProjectRow, SqliteStore, StoreError};

fn project_view(store: &SqliteStore, row: &ProjectRow) -> Result<ProjectView, ApiError> {
    let users = UserDirectory::load(store, project_user_ids([row]))?;
    Ok(ProjectView::new(row, &users))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<ProjectCreateBody>, JsonRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request()?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.create_project(&actor, request);
        let project = audited(
            store,
            &who,
            result,
            |who, project| audit::project_event(who, OperationType::CreateProject, project),
            |who, err| audit::failed(who, OperationType::CreateProject, EntityType::Project, 0, err),
        )?;
        project_view(store, &project)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    query: Result<Query<ProjectListQuery>, QueryRejection>,
) -> Result<Json<ProjectPageView>, ApiError> {
    let Query(query) = query?;
    let request = query.into_request()?;
    let view = with_store(&state, move |store| {
        let page = store.list_projects(&request)?;
        let users = UserDirectory::load(store, project_user_ids(&page.items))?;
        Ok(ProjectPageView::new(&page, &users))
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn get_by_id(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<IncludeDeletedQuery>, QueryRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let view = with_store(&state, move |store| {
        let project = store
            .get_project(id, query.include_deleted)?
            .ok_or_else(|| ApiError::not_found(format!("project {id} not found")))?;
        project_view(store, &project)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn get_by_code(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    code: Result<Path<String>, PathRejection>,
    query: Result<Query<IncludeDeletedQuery>, QueryRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    let Path(code) = code?;
    let Query(query) = query?;
    let view = with_store(&state, move |store| {
        let project = store
            .get_project_by_code(&code, query.include_deleted)?
            .ok_or_else(|| ApiError::not_found(format!("project {code} not found")))?;
        project_view(store, &project)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProjectUpdateBody>, JsonRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let patch = body.into_patch()?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = store.update_project(id, &actor, patch);
        let outcome = audited(store, &who, result, audit::project_updated, |who, err| {
            audit::failed(who, OperationType::UpdateProject, EntityType::Project, id, err)
        })?;
        project_view(store, &outcome.after)
    })
    .await?;
    Ok(Json(view))
}

type LifecycleOp = fn(&mut SqliteStore, i64, &Actor) -> Result<ProjectRow, StoreError>;

/// Archive, unarchive, delete and restore share one shape: owner-only, one audit entry.
async fn lifecycle(
    state: AppState,
    actor: Actor,
    id: Result<Path<i64>, PathRejection>,
    operation_type: OperationType,
    op: LifecycleOp,
) -> Result<Json<ProjectView>, ApiError> {
    let Path(id) = id?;
    let view = with_store(&state, move |store| {
        let who = AuditActor::resolve(store, &actor);
        let result = op(store, id, &actor);
        let project = audited(
            store,
            &who,
            result,
            |who, project| audit::project_event(who, operation_type, project),
            |who, err| audit::failed(who, operation_type, EntityType::Project, id, err),
        )?;
        project_view(store, &project)
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn archive(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    lifecycle(state, actor, id, OperationType::ArchiveProject, SqliteStore::archive_project).await
}

pub(crate) async fn unarchive(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    lifecycle(state, actor, id, OperationType::UnarchiveProject, SqliteStore::unarchive_project)
        .await
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    lifecycle(state, actor, id, OperationType::DeleteProject, SqliteStore::delete_project).await
}

pub(crate) async fn restore(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProjectView>, ApiError> {
    lifecycle(state, actor, id, OperationType::RestoreProject, SqliteStore::restore_project).await
}

pub(crate) async fn statistics(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ProjectStatisticsView>, ApiError> {
    let Path(id) = id?;
    let stats = with_store(&state, move |store| Ok(store.project_statistics(id)?)).await?;
    Ok(Json(stats.into()))
}
