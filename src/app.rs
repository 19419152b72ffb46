use crate::adapters::{HttpAssistant, SystemClock};
use crate::config;
use crate::ports::AssistantClient;
use crate::state;
use crate::storage::DirStore;
use crate::store::{Store, StoreError};

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use serde::Serialize;

use std::sync::Arc;
use tokio::sync::Mutex;

mod assistant;
mod auth;
mod chat;
mod homework;
mod notices;
mod notifications;
mod users;

pub fn app(config: config::AppConfig) -> Router {
    let kv = DirStore::open(&config.data_dir, config.storage_quota_bytes)
        .unwrap_or_else(|err| panic!("failed to open data directory: {err}"));
    let store = Store::open(kv, SystemClock, config.latency);
    let assistant = config
        .assistant_url
        .as_deref()
        .map(|url| Arc::new(HttpAssistant::new(url)) as Arc<dyn AssistantClient>);
    let state = state::AppState {
        config,
        store: Arc::new(Mutex::new(store)),
        assistant,
    };
    router(state)
}

pub(crate) fn router(state: state::AppState) -> Router {
    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/recover", post(auth::recover))
        .route("/api/session", get(auth::session))
        .route("/api/users", get(users::list_users).put(users::update_user))
        .route("/api/users/{id}", delete(users::delete_user))
        .route("/api/users/{id}/quota", get(users::quota))
        .route("/api/users/{id}/setup", post(users::complete_setup))
        .route(
            "/api/notices",
            get(notices::list_notices).post(notices::create_notice),
        )
        .route(
            "/api/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route(
            "/api/homework",
            get(homework::list_homework).post(homework::create_homework),
        )
        .route("/api/notifications", get(notifications::list_notifications))
        .route(
            "/api/notifications/read",
            post(notifications::mark_all_read),
        )
        .route("/api/assistant/chat", post(assistant::chat))
        .route(
            "/api/assistant/homework-ideas",
            post(assistant::homework_ideas),
        )
        .route("/api/meta", get(meta))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MetaResponse {
    pub(crate) app_name: String,
}

pub(crate) async fn meta(State(state): State<state::AppState>) -> Json<MetaResponse> {
    Json(MetaResponse {
        app_name: state.config.app_name.clone(),
    })
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn store_error(err: StoreError) -> ApiError {
    let status = match err {
        StoreError::EmailTaken | StoreError::RoleTaken(_) | StoreError::SetupAlreadyComplete => {
            StatusCode::CONFLICT
        }
        StoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
        StoreError::UnknownUser => StatusCode::NOT_FOUND,
        StoreError::UpdateQuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
        StoreError::NotATeacher => StatusCode::FORBIDDEN,
    };
    api_error(status, err.to_string())
}
