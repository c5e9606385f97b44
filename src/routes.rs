// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{chat::chat_handler, ws::chat_ws_handler},
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_route = Router::new()
        .merge(chat_handler().layer(middleware::from_fn(auth)))
        .layer(TraceLayer::new_for_http());

    // The websocket gateway authenticates its own handshake, so it sits
    // outside the HTTP auth middleware.
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", get(chat_ws_handler))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}
