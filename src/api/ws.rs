// =============================================================================
// WebSocket Handler — push-based chart updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate full ChartSnapshot on connect.
//   2. A fresh full snapshot whenever the snapshot version has changed since
//      the last push (checked every 500 ms).
//
// Incremental diffs are deliberately not offered — snapshots are small
// (bounded by trading history) and a full frame keeps renderers stateless.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::api::ApiContext;

/// How often the push loop checks the snapshot version.
const PUSH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<ApiContext>>,
) -> impl IntoResponse {
    info!("chart WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, ctx))
}

/// Manages a single WebSocket connection lifecycle.
///
/// Runs two concurrent arms via `tokio::select!`: the version-poll push loop
/// and the receive loop (Ping/Close handling, client text as heartbeat).
async fn handle_ws_connection(socket: WebSocket, ctx: Arc<ApiContext>) {
    let (mut sender, mut receiver) = socket.split();
    use futures_util::{SinkExt, StreamExt};

    // Send the initial full snapshot immediately.
    if let Err(e) = send_snapshot(&mut sender, &ctx).await {
        warn!(error = %e, "failed to send initial chart snapshot");
        return;
    }
    let mut last_sent_version = ctx.chart.current_version();

    let mut push_interval = interval(PUSH_POLL_INTERVAL);

    loop {
        tokio::select! {
            _ = push_interval.tick() => {
                let current_version = ctx.chart.current_version();
                if current_version != last_sent_version {
                    match send_snapshot(&mut sender, &ctx).await {
                        Ok(()) => last_sent_version = current_version,
                        Err(e) => {
                            debug!(error = %e, "chart WebSocket send failed — disconnecting");
                            break;
                        }
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        // Treat any client text as a heartbeat.
                        debug!(msg = %text, "chart WebSocket heartbeat");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "failed to send Pong — disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        debug!("chart WebSocket Pong received");
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("chart WebSocket Close frame received");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("chart WebSocket binary message ignored");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "chart WebSocket receive error");
                        break;
                    }
                    None => {
                        info!("chart WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    info!("chart WebSocket connection closed");
}

/// Serialize and send the current ChartSnapshot over the WebSocket.
async fn send_snapshot<S>(sender: &mut S, ctx: &Arc<ApiContext>) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    use futures_util::SinkExt;

    let snapshot = ctx.chart.snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(version = snapshot.version, "chart snapshot pushed");
            Ok(())
        }
        Err(e) => {
            // Serialisation errors are not network errors; don't disconnect.
            warn!(error = %e, "failed to serialize chart snapshot");
            Ok(())
        }
    }
}
