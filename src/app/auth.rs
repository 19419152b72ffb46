use crate::state;
use crate::types::{SignupDetails, User};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use super::{ApiError, api_error, store_error};

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

pub(crate) async fn login(
    State(state): State<state::AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<User>, ApiError> {
    let mut store = state.store.lock().await;
    match store.login(&request.email, &request.password).await {
        Some(user) => Ok(Json(user)),
        None => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password.",
        )),
    }
}

pub(crate) async fn signup(
    State(state): State<state::AppState>,
    Json(details): Json<SignupDetails>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let mut store = state.store.lock().await;
    let user = store.signup(details).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> StatusCode {
    state.store.lock().await.logout();
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
pub(crate) struct RecoverRequest {
    pub(crate) email: String,
}

#[derive(Serialize)]
pub(crate) struct RecoverResponse {
    pub(crate) deleted: bool,
}

/// Account recovery deletes the matching account so the user can sign up
/// again from scratch.
pub(crate) async fn recover(
    State(state): State<state::AppState>,
    Json(request): Json<RecoverRequest>,
) -> Json<RecoverResponse> {
    let mut store = state.store.lock().await;
    let deleted = store.delete_account_by_email(&request.email).await;
    Json(RecoverResponse { deleted })
}

pub(crate) async fn session(
    State(state): State<state::AppState>,
) -> Result<Json<User>, ApiError> {
    let store = state.store.lock().await;
    match store.current_user() {
        Some(user) => Ok(Json(user.clone())),
        None => Err(api_error(StatusCode::UNAUTHORIZED, "no user is signed in")),
    }
}
