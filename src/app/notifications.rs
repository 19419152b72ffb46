use crate::state;
use crate::types::Notification;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::{ApiError, store_error};

pub(crate) async fn list_notifications(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let store = state.store.lock().await;
    let notifications = store.session_notifications().map_err(store_error)?;
    Ok(Json(notifications))
}

pub(crate) async fn mark_all_read(
    State(state): State<state::AppState>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.lock().await;
    store.mark_notifications_as_read().map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
