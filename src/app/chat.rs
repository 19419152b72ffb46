use crate::state;
use crate::types::{ChatMessage, MessageDraft};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

pub(crate) async fn list_messages(State(state): State<state::AppState>) -> Json<Vec<ChatMessage>> {
    let store = state.store.lock().await;
    Json(store.messages().to_vec())
}

pub(crate) async fn send_message(
    State(state): State<state::AppState>,
    Json(draft): Json<MessageDraft>,
) -> (StatusCode, Json<ChatMessage>) {
    let mut store = state.store.lock().await;
    let message = store.send_message(draft);
    (StatusCode::CREATED, Json(message))
}
