#![forbid(unsafe_code)]

use crate::auth::bearer_token;
use crate::dto::{MeView, UserView};
use crate::error::ApiError;
use crate::{AppState, Authenticated, with_store};
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};
use tracing::info;

pub(crate) async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn me(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
) -> Result<Json<MeView>, ApiError> {
    let view = with_store(&state, move |store| {
        let user = store.get_user(actor.id)?;
        Ok(MeView::new(&actor, user.as_ref()))
    })
    .await?;
    Ok(Json(view))
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
    Authenticated(_actor): Authenticated,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = with_store(&state, |store| {
        Ok(store
            .list_active_users()?
            .iter()
            .map(UserView::from)
            .collect::<Vec<_>>())
    })
    .await?;
    Ok(Json(users))
}

/// Revokes the bearer token the request was made with.
pub(crate) async fn logout(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
        .to_string();
    let revoked = with_store(&state, move |store| Ok(store.revoke_session(&token)?)).await?;
    info!(user = %actor.username, revoked, "session revoked");
    Ok(Json(json!({ "message": "logged out" })))
}
