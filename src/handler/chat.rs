use std::sync::Arc;

use axum::{
    extract::Path,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};

use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::chatdtos::SendMessageDto,
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn chat_handler() -> Router {
    Router::new()
        .route("/chats", get(get_user_chats))
        .route("/chats/messages", post(send_message))
        .route("/chats/:order_id/messages", get(get_order_messages))
        .route(
            "/chats/:order_id/messages/delivered",
            post(mark_messages_delivered),
        )
        .route("/chats/:order_id/messages/read", post(mark_messages_read))
}

pub async fn get_user_chats(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let chats = app_state
        .chat_service
        .list_chats(auth.user.id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": chats
    })))
}

pub async fn get_order_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let messages = app_state
        .chat_service
        .order_history(auth.user.id, order_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": messages
    })))
}

pub async fn send_message(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<SendMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let message = app_state
        .chat_service
        .send_message(auth.user.id, body.order_id, body.content, body.receiver_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": message
    })))
}

pub async fn mark_messages_delivered(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .chat_service
        .mark_delivered(auth.user.id, order_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "updated": updated }
    })))
}

pub async fn mark_messages_read(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let updated = app_state
        .chat_service
        .mark_read(auth.user.id, order_id)
        .await
        .map_err(HttpError::from)?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "updated": updated }
    })))
}
