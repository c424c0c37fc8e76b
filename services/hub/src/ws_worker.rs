//! Hub-side websocket handler: accept the single worker uplink, perform the
//! shared-secret handshake, supersede any previous connection, then run the
//! inbound dispatch loop. Mirrors the teacher's `tokio::select!`-based
//! forwarder socket loop, minus the bearer/heartbeat machinery this domain
//! doesn't need.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use bus_protocol::Envelope;
use dispatch_core::{handle_inbound_frame, Bus, BusError, MalformedFrameCounter};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::auth::secret_matches;
use crate::state::AppState;

pub struct WsServerBus {
    write: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl Bus for WsServerBus {
    async fn send(&self, _topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError> {
        let json = envelope.to_json().map_err(|e| BusError::Publish(e.to_string()))?;
        self.write
            .lock()
            .await
            .send(Message::Text(json))
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.write.lock().await.close().await;
    }
}

pub async fn ws_worker_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_worker_socket(socket, state))
}

async fn handle_worker_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut write, mut read) = socket.split();

    let first = read.next().await;
    let handshake_ok = matches!(&first, Some(Ok(Message::Text(text))) if secret_matches(text, &state.shared_secret));

    if !handshake_ok {
        let rejection = Envelope::error_reply(None, "iot", "handshake rejected");
        if let Ok(json) = rejection.to_json() {
            let _ = write.send(Message::Text(json)).await;
        }
        let _ = write.close().await;
        warn!("worker handshake rejected");
        return;
    }

    info!("worker handshake accepted");
    let bus: Arc<dyn Bus> = Arc::new(WsServerBus { write: Mutex::new(write) });
    state.replace_bus(Arc::clone(&bus)).await;

    let malformed = MalformedFrameCounter::new();
    let providers = state.providers().await;
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => {
                let should_reset = handle_inbound_frame(&text, state.pending(), &providers, &malformed).await;
                if should_reset {
                    warn!("resetting worker connection after repeated malformed frames");
                    break;
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("worker connection closed");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                warn!(error = %err, "worker socket read error");
                break;
            }
        }
    }

    state.clear_bus_if_current(&bus).await;
}
