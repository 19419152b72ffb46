use std::pin::Pin;
use std::time::Duration;

use time::OffsetDateTime;

use crate::assistant::{AssistantError, ChatTurn, HomeworkIdea};

/// Time source for the store: drives the simulated latency of the account
/// operations and the calendar-month profile-update window.
pub trait Clock: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The two delegated AI calls. Opaque request/response from the caller's
/// view; failures are surfaced to the caller and never mutate the store.
pub trait AssistantClient: Send + Sync + 'static {
    fn chat<'a>(
        &'a self,
        query: &'a str,
        history: &'a [ChatTurn],
    ) -> BoxFuture<'a, Result<String, AssistantError>>;

    fn suggest_homework<'a>(
        &'a self,
        topic: &'a str,
        class_level: &'a str,
    ) -> BoxFuture<'a, Result<Vec<HomeworkIdea>, AssistantError>>;
}
