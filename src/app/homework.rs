use crate::state;
use crate::types::{Homework, HomeworkDraft};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::{ApiError, store_error};

pub(crate) async fn list_homework(State(state): State<state::AppState>) -> Json<Vec<Homework>> {
    let store = state.store.lock().await;
    Json(store.homework().to_vec())
}

pub(crate) async fn create_homework(
    State(state): State<state::AppState>,
    Json(draft): Json<HomeworkDraft>,
) -> Result<(StatusCode, Json<Homework>), ApiError> {
    let mut store = state.store.lock().await;
    let homework = store.add_homework(draft).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(homework)))
}
