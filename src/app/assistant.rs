use crate::assistant::{ChatTurn, HomeworkIdea};
use crate::ports::AssistantClient;
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use std::sync::Arc;

use super::{ApiError, api_error};

fn configured(state: &state::AppState) -> Result<Arc<dyn AssistantClient>, ApiError> {
    state.assistant.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "The assistant is not configured.",
        )
    })
}

#[derive(Deserialize)]
pub(crate) struct ChatRequest {
    pub(crate) query: String,
    #[serde(default)]
    pub(crate) history: Vec<ChatTurn>,
}

#[derive(Serialize)]
pub(crate) struct ChatResponse {
    pub(crate) response: String,
}

pub(crate) async fn chat(
    State(state): State<state::AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let assistant = configured(&state)?;
    match assistant.chat(&request.query, &request.history).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(err) => {
            eprintln!("assistant chat failed: {err}");
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                "The assistant is unavailable right now. Please try again.",
            ))
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdeasRequest {
    pub(crate) topic: String,
    pub(crate) class_level: String,
}

#[derive(Serialize)]
pub(crate) struct IdeasResponse {
    pub(crate) suggestions: Vec<HomeworkIdea>,
}

pub(crate) async fn homework_ideas(
    State(state): State<state::AppState>,
    Json(request): Json<IdeasRequest>,
) -> Result<Json<IdeasResponse>, ApiError> {
    let assistant = configured(&state)?;
    let topic = request.topic.trim();
    if topic.is_empty() {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "topic must not be empty",
        ));
    }
    match assistant
        .suggest_homework(topic, request.class_level.trim())
        .await
    {
        Ok(suggestions) => Ok(Json(IdeasResponse { suggestions })),
        Err(err) => {
            eprintln!("homework idea generation failed: {err}");
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                "The assistant is unavailable right now. Please try again.",
            ))
        }
    }
}
