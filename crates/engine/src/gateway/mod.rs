//! Session gateway: the streaming WebSocket plane and the
//! non-streaming HTTP interaction endpoint.

pub mod http;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;

use crate::app::SharedApp;

pub fn router(app: SharedApp) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(ws::ws_handler))
        .route("/experience/interact", post(http::interact))
        .with_state(app)
}

async fn health_check() -> &'static str {
    "OK"
}
