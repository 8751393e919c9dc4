//! WebSocket subscription route
//!
//! Upgrades the connection, registers a mailbox with the hub, and runs the
//! transport pump: an inbound liveness loop and an outbound loop that
//! drains the mailbox and emits keepalive pings.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::Bytes;
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use quotefeed_core::PriceQuery;
use quotefeed_services::{mailbox, BroadcastEnd, CloseReason, MailboxId, MailboxReceiver};
use tokio::time::{interval_at, timeout, Instant};
use tracing::{debug, info, warn};

use crate::AppState;

/// Time allowed to write a message to the peer.
const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed to read the next message (pongs included) from the peer.
const PONG_WAIT: Duration = Duration::from_secs(60);

/// Send pings to the peer with this period. Must be less than `PONG_WAIT`.
const PING_PERIOD: Duration = Duration::from_secs(54);

/// Maximum message size allowed from the peer.
const MAX_MESSAGE_SIZE: usize = 512;

/// Outbound mailbox queue capacity.
const MAILBOX_CAPACITY: usize = 32;

/// Create WebSocket routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler
///
/// Missing `fsyms`/`tsyms` parameters are rejected before the upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<Vec<(String, String)>>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let Some(query) = super::prices::parse_query(&params) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    info!("WebSocket subscription request for {}", query);

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state, query))
        .into_response()
}

/// Drive one subscriber connection until it ends
async fn handle_socket(socket: WebSocket, state: AppState, query: PriceQuery) {
    let (sender, receiver) = socket.split();
    let (mailbox, rx) = mailbox::channel(MAILBOX_CAPACITY);
    let id = mailbox.id();

    state.hub.register(mailbox.clone()).await;
    info!("Subscriber {} connected for {}", id, query);

    // Outbound pump: mailbox -> socket, plus keepalive pings.
    let send_task = tokio::spawn(write_pump(sender, rx, id));

    // Broadcast loop: resolves quotes into the mailbox until it closes.
    let broadcast_task = {
        let manager = Arc::clone(&state.price_manager);
        let hub = state.hub.clone();
        let mailbox = mailbox.clone();
        tokio::spawn(async move {
            match manager.broadcast(mailbox.clone(), query).await {
                BroadcastEnd::Unavailable => {
                    // Tell the peer the resource is gone, then tear down.
                    mailbox.close(CloseReason::Unavailable);
                    hub.unregister(mailbox).await;
                }
                BroadcastEnd::SubscriberGone => {
                    // The pump already observed the close.
                }
            }
        })
    };

    // Inbound loop runs on this task; its end means the subscriber is gone.
    read_pump(receiver, id).await;

    state.hub.unregister(mailbox).await;

    let _ = tokio::join!(send_task, broadcast_task);
    info!("Subscriber {} disconnected", id);
}

/// Inbound loop
///
/// Sole purpose is liveness: a read deadline bounds how long the peer may
/// stay silent, and payload content from the peer is discarded.
async fn read_pump(mut receiver: SplitStream<WebSocket>, id: MailboxId) {
    loop {
        match timeout(PONG_WAIT, receiver.next()).await {
            Err(_) => {
                warn!("Subscriber {} read deadline lapsed", id);
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!("Subscriber {} read error: {}", id, e);
                break;
            }
            Ok(Some(Ok(Message::Close(_)))) => {
                debug!("Subscriber {} sent close", id);
                break;
            }
            Ok(Some(Ok(Message::Pong(_)))) => {
                debug!("Subscriber {} pong", id);
            }
            Ok(Some(Ok(_))) => {
                // Peer content is not part of the protocol.
            }
        }
    }
}

/// Outbound loop
///
/// Drains the mailbox, coalescing already-queued payloads into one frame,
/// and pings the peer on a timer so dead connections are detected before
/// the read deadline lapses. Every write is bounded by `WRITE_WAIT`.
async fn write_pump(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: MailboxReceiver,
    id: MailboxId,
) {
    let mut ticker = interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);

    loop {
        tokio::select! {
            maybe_payload = rx.recv() => {
                match maybe_payload {
                    Some(payload) => {
                        let mut frame = Vec::from(payload.as_ref());
                        while let Some(extra) = rx.try_recv() {
                            frame.push(b'\n');
                            frame.extend_from_slice(&extra);
                        }

                        let text = match String::from_utf8(frame) {
                            Ok(text) => text,
                            Err(e) => {
                                warn!("Subscriber {}: dropping non-UTF-8 payload: {}", id, e);
                                continue;
                            }
                        };

                        match timeout(WRITE_WAIT, sender.send(Message::Text(text.into()))).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => {
                                debug!("Subscriber {} write failed: {}", id, e);
                                return;
                            }
                            Err(_) => {
                                warn!("Subscriber {} write deadline lapsed", id);
                                return;
                            }
                        }
                    }
                    None => {
                        // Mailbox closed; tell the peer why and stop.
                        let frame = close_frame(rx.close_reason());
                        let _ = timeout(WRITE_WAIT, sender.send(Message::Close(frame))).await;
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                match timeout(WRITE_WAIT, sender.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    // Peer presumed gone.
                    _ => return,
                }
            }
        }
    }
}

/// Close frame for a mailbox close reason
fn close_frame(reason: CloseReason) -> Option<CloseFrame> {
    match reason {
        CloseReason::Normal => Some(CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static(""),
        }),
        CloseReason::Unavailable => Some(CloseFrame {
            code: close_code::NORMAL,
            reason: Utf8Bytes::from_static("resource not available"),
        }),
    }
}
