//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{MatchHandle, RoundEvent};
use crate::http::routes::AppError;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler for a match's event feed
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(match_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Response {
    match state.engine.get(&match_id) {
        Some(handle) => {
            info!(match_id = %match_id, "WebSocket upgrade for match feed");
            ws.on_upgrade(move |socket| handle_socket(socket, handle))
        }
        None => AppError::NotFound(format!("match {}", match_id)).into_response(),
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, handle: MatchHandle) {
    let match_id = handle.id();
    info!(match_id = %match_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before the first snapshot so no event falls in between
    let events_rx = handle.subscribe();

    let welcome = ServerMsg::Welcome {
        match_id,
        server_time: unix_millis(),
    };
    let snapshot = ServerMsg::Snapshot {
        snapshot: handle.snapshot(),
    };
    for msg in [welcome, snapshot] {
        if let Err(e) = send_msg(&mut ws_sink, &msg).await {
            error!(match_id = %match_id, error = %e, "Failed to send welcome");
            return;
        }
    }

    run_session(handle, ws_sink, ws_stream, events_rx).await;

    info!(match_id = %match_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    handle: MatchHandle,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut events_rx: broadcast::Receiver<RoundEvent>,
) {
    let match_id = handle.id();
    let rate_limiter = ConnectionRateLimiter::new();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerMsg>(16);

    // Writer task: match events and direct replies -> WebSocket
    let writer_handle = handle.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            let (outgoing, feed_done) = tokio::select! {
                event = events_rx.recv() => match event {
                    Ok(event) => event_messages(&writer_handle, event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(match_id = %match_id, lagged_count = n, "Client lagged, resyncing with snapshot");
                        (vec![ServerMsg::Snapshot { snapshot: writer_handle.snapshot() }], false)
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(match_id = %match_id, "Event channel closed");
                        break;
                    }
                },
                reply = reply_rx.recv() => match reply {
                    Some(msg) => (vec![msg], false),
                    None => break,
                },
            };

            for msg in outgoing {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(match_id = %match_id, error = %e, "WebSocket send failed");
                    return;
                }
            }

            if feed_done {
                info!(match_id = %match_id, "Match closed, ending feed");
                let _ = ws_sink.send(Message::Close(None)).await;
                return;
            }
        }
    });

    // Reader loop: WebSocket -> match, until the client leaves or the writer stops
    loop {
        let result = tokio::select! {
            next = ws_stream.next() => match next {
                Some(result) => result,
                None => break,
            },
            _ = &mut writer => {
                debug!(match_id = %match_id, "Writer finished, closing session");
                return;
            }
        };

        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_message() {
                    warn!(match_id = %match_id, "Rate limited client message");
                    let _ = reply_tx
                        .send(ServerMsg::Error {
                            code: "rate_limited".to_string(),
                            message: "Too many messages".to_string(),
                        })
                        .await;
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if let Some(reply) = apply_client_msg(&handle, msg) {
                            if reply_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(match_id = %match_id, error = %e, "Failed to parse client message");
                        let _ = reply_tx
                            .send(ServerMsg::Error {
                                code: "bad_message".to_string(),
                                message: e.to_string(),
                            })
                            .await;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(match_id = %match_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(match_id = %match_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(match_id = %match_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer.abort();
}

/// Messages forwarded for one match event, and whether the feed ends after them
fn event_messages(handle: &MatchHandle, event: RoundEvent) -> (Vec<ServerMsg>, bool) {
    if matches!(event, RoundEvent::MatchClosed { .. }) {
        return (vec![ServerMsg::Round(event)], true);
    }

    let snapshot = handle.snapshot();
    (vec![ServerMsg::Round(event), ServerMsg::Snapshot { snapshot }], false)
}

/// Apply a client message to the match, returning a direct reply if any
fn apply_client_msg(handle: &MatchHandle, msg: ClientMsg) -> Option<ServerMsg> {
    match msg {
        ClientMsg::Toss => {
            // Rejections are silent; readiness arrives as events
            handle.request_toss();
            None
        }
        ClientMsg::Reset => {
            handle.reset();
            None
        }
        ClientMsg::Snapshot => Some(ServerMsg::Snapshot {
            snapshot: handle.snapshot(),
        }),
        ClientMsg::Ping { t } => Some(ServerMsg::Pong { t }),
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
