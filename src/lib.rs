pub mod adapters;
pub mod app;
pub mod assistant;
pub mod attachments;
pub mod config;
pub mod ports;
pub mod state;
pub mod storage;
pub mod store;
pub mod types;

use std::net::SocketAddr;

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config))
        .await
        .expect("server error");
}
