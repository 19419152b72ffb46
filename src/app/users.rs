use crate::state;
use crate::types::{TeacherSetup, User};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;

use super::{ApiError, api_error, store_error};

pub(crate) async fn list_users(State(state): State<state::AppState>) -> Json<Vec<User>> {
    let store = state.store.lock().await;
    Json(store.users().to_vec())
}

pub(crate) async fn update_user(
    State(state): State<state::AppState>,
    Json(user): Json<User>,
) -> Result<Json<User>, ApiError> {
    let mut store = state.store.lock().await;
    let updated = store.update_user(user).map_err(store_error)?;
    Ok(Json(updated))
}

/// Users can delete their own account; staff can delete any account.
pub(crate) async fn delete_user(
    State(state): State<state::AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.lock().await;
    let Some(session) = store.current_user() else {
        return Err(api_error(StatusCode::UNAUTHORIZED, "no user is signed in"));
    };
    if !session.is_staff() && session.id != id {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "only staff may delete other accounts",
        ));
    }
    store.delete_user(&id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub(crate) struct QuotaResponse {
    pub(crate) remaining: u32,
}

pub(crate) async fn quota(
    State(state): State<state::AppState>,
    Path(id): Path<String>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let store = state.store.lock().await;
    let remaining = store.remaining_updates(&id).map_err(store_error)?;
    Ok(Json(QuotaResponse { remaining }))
}

pub(crate) async fn complete_setup(
    State(state): State<state::AppState>,
    Path(id): Path<String>,
    Json(setup): Json<TeacherSetup>,
) -> Result<Json<User>, ApiError> {
    let mut store = state.store.lock().await;
    let user = store.complete_teacher_setup(&id, setup).map_err(store_error)?;
    Ok(Json(user))
}
