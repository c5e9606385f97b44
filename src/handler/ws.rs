use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as WsFrame, WebSocket, WebSocketUpgrade},
        Query,
    },
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use uuid::Uuid;

use crate::{
    dtos::chatdtos::ChatParticipant,
    error::{ErrorMessage, HttpError},
    models::chatmodel::Message,
    service::{chat_service::JoinOutcome, error::ChatError, rooms::SubscriberId},
    utils::token,
    AppState,
};

/// Per-connection state: the authenticated identity plus the order rooms
/// this socket has joined. Created once at the handshake and handed by
/// reference into every event handler; dropped state unsubscribes on
/// disconnect.
#[derive(Debug)]
pub struct ChatSession {
    pub user_id: Uuid,
    pub roles: Vec<String>,
    rooms: HashMap<Uuid, SubscriberId>,
}

impl ChatSession {
    fn new(user_id: Uuid, roles: Vec<String>) -> Self {
        ChatSession {
            user_id,
            roles,
            rooms: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ClientEvent {
    JoinOrder {
        order_id: Uuid,
        #[serde(default)]
        freelancer_id: Option<Uuid>,
    },
    Message {
        order_id: Uuid,
        content: String,
        #[serde(default)]
        receiver_id: Option<Uuid>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum ServerEvent {
    Joined {
        messages: Vec<Message>,
    },
    SelectionRequired {
        applicants: Vec<ChatParticipant>,
        messages: Vec<Message>,
    },
    Message {
        message: Message,
    },
    Error {
        error: bool,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<&'static str>,
    },
}

impl ServerEvent {
    fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error {
            error: true,
            message: message.into(),
            reason: None,
        }
    }
}

impl From<ChatError> for ServerEvent {
    fn from(error: ChatError) -> Self {
        ServerEvent::Error {
            error: true,
            reason: error.reason(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WsConnectQuery {
    pub token: Option<String>,
}

/// Handshake for `GET /chat`. The credential arrives either as an explicit
/// `token` query field or in the `access_token` cookie; both are verified
/// the same way, once per physical connection. Every failure class gets
/// the same refusal so callers cannot probe which check tripped.
pub async fn chat_ws_handler(
    ws: WebSocketUpgrade,
    cookie_jar: CookieJar,
    Query(query): Query<WsConnectQuery>,
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let token = query.token.clone().or_else(|| {
        cookie_jar
            .get("access_token")
            .map(|cookie| cookie.value().to_string())
    });

    let Some(token) = token else {
        return Err(refuse_handshake("no credential on handshake"));
    };

    let claims = match token::decode_token(token, app_state.env.jwt_secret.as_bytes()) {
        Ok(claims) => claims,
        Err(_) => return Err(refuse_handshake("signature or expiry check failed")),
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(user_id) => user_id,
        Err(_) => return Err(refuse_handshake("malformed subject claim")),
    };

    let session = ChatSession::new(user_id, claims.roles);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, app_state, session)))
}

fn refuse_handshake(detail: &str) -> HttpError {
    tracing::debug!("websocket handshake refused: {}", detail);
    HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string())
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, mut session: ChatSession) {
    tracing::debug!(
        "websocket connection opened for user {} (roles: {:?})",
        session.user_id,
        session.roles
    );

    let (mut sink, mut stream) = socket.split();

    // Single outbound channel per connection: direct replies and room
    // broadcasts are funnelled through it so frames never interleave
    // mid-write.
    let (out_tx, mut out_rx) = unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if sink.send(WsFrame::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(frame)) = stream.next().await {
        let raw = match frame {
            WsFrame::Text(raw) => raw,
            WsFrame::Close(_) => break,
            _ => continue,
        };

        let reply = match serde_json::from_str::<ClientEvent>(&raw) {
            Ok(event) => dispatch(&app_state, &mut session, &out_tx, event).await,
            Err(_) => ServerEvent::error("Unrecognized event payload"),
        };

        let Ok(encoded) = serde_json::to_string(&reply) else {
            continue;
        };
        if out_tx.send(encoded).is_err() {
            break;
        }
    }

    // Connection gone: detach from every joined room.
    for (order_id, member_id) in session.rooms.drain() {
        app_state
            .chat_service
            .rooms()
            .unsubscribe(order_id, member_id)
            .await;
    }
    writer.abort();

    tracing::debug!("websocket connection for user {} closed", session.user_id);
}

/// Join and send are synchronous exchanges: the caller always gets either
/// the success payload or a structured error frame back, and the
/// connection survives everything but the handshake.
async fn dispatch(
    app_state: &Arc<AppState>,
    session: &mut ChatSession,
    out_tx: &UnboundedSender<String>,
    event: ClientEvent,
) -> ServerEvent {
    match event {
        ClientEvent::JoinOrder {
            order_id,
            freelancer_id,
        } => {
            let outcome = match app_state
                .chat_service
                .join_order(session.user_id, order_id, freelancer_id)
                .await
            {
                Ok(outcome) => outcome,
                Err(error) => return ServerEvent::from(error),
            };

            // Authorized joiners enter the order room whether or not a
            // counterpart is resolvable yet; an applicant selection made
            // later reuses the same subscription.
            if !session.rooms.contains_key(&order_id) {
                let member_id = app_state
                    .chat_service
                    .rooms()
                    .subscribe(order_id, session.user_id, out_tx.clone())
                    .await;
                session.rooms.insert(order_id, member_id);
            }

            match outcome {
                JoinOutcome::Joined { messages } => ServerEvent::Joined { messages },
                JoinOutcome::SelectionRequired { applicants } => ServerEvent::SelectionRequired {
                    applicants,
                    messages: Vec::new(),
                },
            }
        }
        ClientEvent::Message {
            order_id,
            content,
            receiver_id,
        } => {
            match app_state
                .chat_service
                .send_message(session.user_id, order_id, content, receiver_id)
                .await
            {
                Ok(message) => ServerEvent::Message { message },
                Err(error) => ServerEvent::from(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_order_event() {
        let order_id = Uuid::new_v4();
        let freelancer_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"event":"joinOrder","order_id":"{}","freelancer_id":"{}"}}"#,
            order_id, freelancer_id
        );

        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        match event {
            ClientEvent::JoinOrder {
                order_id: parsed,
                freelancer_id: explicit,
            } => {
                assert_eq!(parsed, order_id);
                assert_eq!(explicit, Some(freelancer_id));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn join_order_freelancer_field_is_optional() {
        let raw = format!(r#"{{"event":"joinOrder","order_id":"{}"}}"#, Uuid::new_v4());

        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert!(matches!(
            event,
            ClientEvent::JoinOrder {
                freelancer_id: None,
                ..
            }
        ));
    }

    #[test]
    fn error_frames_expose_the_policy_reason() {
        let event = ServerEvent::from(ChatError::SelectionRequired);
        let encoded = serde_json::to_value(&event).unwrap();

        assert_eq!(encoded["event"], "error");
        assert_eq!(encoded["error"], true);
        assert_eq!(encoded["reason"], "selection_required");
    }

    #[test]
    fn plain_errors_omit_the_reason_field() {
        let encoded = serde_json::to_value(ServerEvent::error("nope")).unwrap();
        assert!(encoded.get("reason").is_none());
    }
}
