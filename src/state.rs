use crate::adapters::SystemClock;
use crate::config::AppConfig;
use crate::ports::AssistantClient;
use crate::storage::DirStore;
use crate::store::Store;

use std::sync::Arc;
use tokio::sync::Mutex;

/// The store is guarded by an async mutex because login and signup sleep
/// for the configured latency while holding it.
pub type SharedStore = Arc<Mutex<Store<DirStore, SystemClock>>>;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: SharedStore,
    pub assistant: Option<Arc<dyn AssistantClient>>,
}
