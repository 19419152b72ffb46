use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::assistant::{AssistantError, ChatTurn, HomeworkIdea};
use crate::ports;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ports::Clock for SystemClock {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// JSON client for the assistant service: POSTs to `<base>/chat` and
/// `<base>/homework-ideas`.
#[derive(Clone)]
pub struct HttpAssistant {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssistant {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_json<Req, Resp>(&self, path: &str, request: &Req) -> Result<Resp, AssistantError>
    where
        Req: Serialize,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(request)
            .send()
            .await
            .map_err(|err| AssistantError::Request(err.to_string()))?;
        if !response.status().is_success() {
            return Err(AssistantError::Status(response.status().as_u16()));
        }
        response
            .json::<Resp>()
            .await
            .map_err(|err| AssistantError::Request(err.to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
    history: &'a [ChatTurn],
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    topic: &'a str,
    class_level: &'a str,
}

#[derive(Deserialize)]
struct SuggestResponse {
    suggestions: Vec<HomeworkIdea>,
}

impl ports::AssistantClient for HttpAssistant {
    fn chat<'a>(
        &'a self,
        query: &'a str,
        history: &'a [ChatTurn],
    ) -> ports::BoxFuture<'a, Result<String, AssistantError>> {
        Box::pin(async move {
            let response: ChatResponse = self
                .post_json("/chat", &ChatRequest { query, history })
                .await?;
            Ok(response.response)
        })
    }

    fn suggest_homework<'a>(
        &'a self,
        topic: &'a str,
        class_level: &'a str,
    ) -> ports::BoxFuture<'a, Result<Vec<HomeworkIdea>, AssistantError>> {
        Box::pin(async move {
            let response: SuggestResponse = self
                .post_json("/homework-ideas", &SuggestRequest { topic, class_level })
                .await?;
            Ok(response.suggestions)
        })
    }
}
