//! Realtime endpoint: one WebSocket per client device.
//!
//! Each socket is registered with the identity registry on upgrade and its
//! outbound queue is drained into the socket until either side closes.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use hooki_shared::events::{ClientEvent, ServerEvent};
use hooki_shared::types::ConnectionId;
use hooki_shared::HookiError;
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::error::ServerError;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max = state.config.max_connections;
    if max > 0 && state.registry.connection_count().await >= max {
        warn!(max, "Rejecting realtime connection, limit reached");
        return ServerError::TooManyConnections(max).into_response();
    }

    ws.on_upgrade(|socket| ws_connection(socket, state))
        .into_response()
}

async fn ws_connection(mut socket: WebSocket, state: AppState) {
    let (conn, mut rx) = state.registry.register().await;
    info!(connection = %conn, "Realtime connection opened");

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                if !send_event(&mut socket, &event).await {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        if let Some(reply) = handle_client_text(&state, conn, &text).await {
                            if !send_event(&mut socket, &reply).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = socket.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(connection = %conn, error = %e, "Socket read failed");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    let user = state.registry.remove(conn).await;
    state.message_limiter.forget(&conn).await;
    info!(connection = %conn, user = ?user, "Realtime connection closed");
}

/// Returns `false` once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(WsMessage::Text(json)).await.is_ok(),
        Err(e) => {
            warn!(error = %e, event = event.name(), "Failed to encode event");
            true
        }
    }
}

/// Handle one text frame from a client. Returns the direct reply for the
/// originating connection, if any; fan-out to other connections happens
/// through the registry.
pub async fn handle_client_text(
    state: &AppState,
    conn: ConnectionId,
    text: &str,
) -> Option<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            debug!(connection = %conn, error = %e, "Malformed client frame");
            return Some(ServerEvent::Error {
                code: "invalid".to_string(),
                message: format!("malformed event: {e}"),
            });
        }
    };

    let result = match event {
        ClientEvent::Announce { user_id } => {
            if user_id.is_blank() {
                Err(HookiError::validation("userId is required"))
            } else {
                state.registry.announce(conn, user_id.clone()).await;
                Ok(Some(ServerEvent::Announced { user_id }))
            }
        }
        ClientEvent::SendMessage {
            conversation_id,
            sender_id,
            content,
            client_token,
        } => {
            if !state.message_limiter.check(conn).await {
                warn!(connection = %conn, "Realtime send rate limit exceeded");
                return Some(ServerEvent::Error {
                    code: "rate_limited".to_string(),
                    message: "too many messages, slow down".to_string(),
                });
            }
            match state.registry.user_of(conn).await {
                Some(bound) if bound != sender_id => Err(HookiError::Authorization {
                    user: sender_id,
                    conversation: conversation_id,
                }),
                // The sender receives its own message through the echo.
                _ => state
                    .router
                    .route(&conversation_id, &sender_id, &content, client_token)
                    .await
                    .map(|_| None),
            }
        }
        ClientEvent::MarkRead {
            conversation_id,
            reader_id,
        } => match state.registry.user_of(conn).await {
            Some(bound) if bound != reader_id => Err(HookiError::Authorization {
                user: reader_id,
                conversation: conversation_id,
            }),
            _ => state
                .router
                .mark_read(&conversation_id, &reader_id)
                .await
                .map(|_| None),
        },
        ClientEvent::Ping => Ok(Some(ServerEvent::Pong)),
    };

    match result {
        Ok(reply) => reply,
        Err(err) => {
            debug!(connection = %conn, error = %err, "Realtime request failed");
            Some(ServerEvent::from(&err))
        }
    }
}
