#![forbid(unsafe_code)]

mod audit;
mod auth;
pub mod config;
mod dto;
pub mod error;
mod handlers;
mod request_tracing;

pub use auth::Authenticated;
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiErrorCode};
pub use request_tracing::REQUEST_ID_HEADER;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use pm_core::worktime::WorkCalendar;
use pm_storage::{NewUser, SqliteStore, StoreError};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<SqliteStore>>,
    request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Runs `op` against the store on the blocking pool.
pub(crate) async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SqliteStore) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || {
        let mut guard = store
            .lock()
            .map_err(|_| ApiError::internal("store mutex poisoned"))?;
        op(&mut *guard)
    })
    .await
    .map_err(ApiError::internal)?
}

pub fn build_router(state: AppState) -> Router {
    use handlers::{identity, operation_logs, projects, work_items};

    Router::new()
        .route("/healthz", get(identity::healthz))
        .route("/api/auth/me", get(identity::me))
        .route("/api/auth/logout", post(identity::logout))
        .route("/api/users/", get(identity::list_users))
        .route("/api/work-items/", post(work_items::create))
        .route(
            "/api/work-items/by-project/:project_id",
            get(work_items::list_by_project),
        )
        .route("/api/work-items/by-code/:code", get(work_items::get_by_code))
        .route("/api/work-items/name-exists", get(work_items::name_exists))
        .route("/api/work-items/batch", patch(work_items::batch_update))
        .route(
            "/api/work-items/:id",
            get(work_items::get_by_id)
                .patch(work_items::update)
                .delete(work_items::delete),
        )
        .route(
            "/api/work-items/:id/cascade-status",
            post(work_items::cascade_status),
        )
        .route("/api/projects/", post(projects::create).get(projects::list))
        .route("/api/projects/by-code/:code", get(projects::get_by_code))
        .route(
            "/api/projects/:id",
            get(projects::get_by_id)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route("/api/projects/:id/archive", post(projects::archive))
        .route("/api/projects/:id/unarchive", post(projects::unarchive))
        .route("/api/projects/:id/restore", post(projects::restore))
        .route("/api/projects/:id/statistics", get(projects::statistics))
        .route(
            "/api/operation-logs/:entity_type/:entity_id",
            get(operation_logs::list),
        )
        .layer(from_fn_with_state(
            state.clone(),
            request_tracing::request_tracing_middleware,
        ))
        .with_state(state)
}

/// Opens the store with the configured calendar and provisions the seed users.
pub fn open_store(config: &ServerConfig) -> Result<SqliteStore, Box<dyn std::error::Error>> {
    let calendar: WorkCalendar = config.calendar.to_calendar()?;
    let mut store = SqliteStore::open_with_calendar(&config.storage_dir, calendar)?;
    seed_users(&mut store, config)?;
    Ok(store)
}

pub fn seed_users(store: &mut SqliteStore, config: &ServerConfig) -> Result<(), StoreError> {
    for seed in &config.seed_users {
        let user = store.upsert_user(NewUser {
            username: seed.username.clone(),
            email: seed.email.clone(),
            full_name: seed.full_name.clone(),
            is_admin: seed.is_admin || config.is_admin_username(&seed.username),
        })?;
        store.register_session(user.id, &seed.token)?;
        info!(user = %user.username, admin = user.is_admin, "seed user ready");
    }
    Ok(())
}
