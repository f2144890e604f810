//! Live portal socket: one per guest device, grouped by public event code.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use chrono::Utc;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::models::{
    event::Event,
    message::{ClientMessage, PortalMessage},
};
use crate::domain::services::broadcaster::Subscriber;
use crate::error::AppError;
use crate::state::AppState;

const EVENT_NOT_FOUND_CLOSE: u16 = 4004;

pub async fn portal_socket(
    State(state): State<Arc<AppState>>,
    Path(public_code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let event = state.event_repo.find_by_public_code(&public_code).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, public_code, event)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, public_code: String, event: Option<Event>) {
    let (mut sink, mut stream) = socket.split();

    let Some(event) = event else {
        info!(event_code = %public_code, "socket rejected: unknown event");
        let frame = CloseFrame {
            code: EVENT_NOT_FOUND_CLOSE,
            reason: "Event not found".into(),
        };
        let _ = sink.send(Message::Close(Some(frame))).await;
        return;
    };

    let (subscriber, outbound) = Subscriber::channel();
    let subscriber_id = subscriber.id();
    let mut writer = tokio::spawn(forward_outbound(sink, outbound, subscriber.clone()));

    let connection_count = state.broadcaster.register(subscriber.clone(), &public_code);
    state.broadcaster.send_to(
        &subscriber,
        &PortalMessage::Connection {
            message: format!("Connected to event: {}", event.name),
            event_code: public_code.clone(),
            connection_count,
            timestamp: Utc::now(),
        },
    );

    loop {
        tokio::select! {
            _ = &mut writer => break,
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(msg) if msg.kind == "ping" => {
                        state.broadcaster.send_to(&subscriber, &PortalMessage::Pong { timestamp: msg.timestamp });
                    }
                    Ok(msg) => debug!(event_code = %public_code, kind = %msg.kind, "ignoring client message"),
                    Err(e) => warn!(event_code = %public_code, error = %e, "invalid JSON from portal socket"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(event_code = %public_code, error = %e, "portal socket error");
                    break;
                }
            },
        }
    }

    state.broadcaster.unregister(subscriber_id, &public_code);
    writer.abort();
    info!(event_code = %public_code, subscriber = %subscriber_id, "portal socket closed");
}

/// Drains the subscriber's queue into the socket until the peer goes away or
/// the registry evicts the subscriber, in which case the client is told to reconnect.
async fn forward_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<String>>,
    subscriber: Subscriber,
) {
    loop {
        tokio::select! {
            payload = outbound.recv() => {
                let Some(payload) = payload else { return };
                if sink.send(Message::Text(payload.as_str().into())).await.is_err() {
                    return;
                }
            }
            () = subscriber.evicted() => {
                warn!(subscriber = %subscriber.id(), "portal connection evicted, closing socket");
                let frame = CloseFrame {
                    code: close_code::AGAIN,
                    reason: "Connection dropped, please reconnect".into(),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                return;
            }
        }
    }
}
