#![forbid(unsafe_code)]

use crate::error::ApiError;
use crate::{AppState, with_store};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use pm_core::model::Actor;

/// The caller resolved from `Authorization: Bearer <token>`.
#[derive(Clone, Debug)]
pub struct Authenticated(pub Actor);

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?
            .to_string();
        let actor = with_store(state, move |store| Ok(store.resolve_session(&token)?))
            .await?
            .ok_or_else(|| ApiError::unauthorized("invalid bearer token"))?;
        tracing::Span::current().record("user", actor.username.as_str());
        Ok(Authenticated(actor))
    }
}
