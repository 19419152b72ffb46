use crate::state;
use crate::types::{Notice, NoticeDraft};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::{ApiError, store_error};

pub(crate) async fn list_notices(State(state): State<state::AppState>) -> Json<Vec<Notice>> {
    let store = state.store.lock().await;
    Json(store.notices().to_vec())
}

pub(crate) async fn create_notice(
    State(state): State<state::AppState>,
    Json(draft): Json<NoticeDraft>,
) -> Result<(StatusCode, Json<Notice>), ApiError> {
    let mut store = state.store.lock().await;
    let notice = store.add_notice(draft).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(notice)))
}
