//! The websocket `Bus` variant, worker side: connect out to the hub, send
//! the shared secret verbatim as the first text frame, then hand back a
//! `Bus` handle plus the inbound half for the caller's read loop.

use async_trait::async_trait;
use dispatch_core::{Bus, BusError};
use bus_protocol::Envelope;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsReader = futures_util::stream::SplitStream<WsStream>;

pub struct WebSocketWorkerBus {
    write: Mutex<SplitSink<WsStream, Message>>,
}

/// Connect to the hub and perform the handshake. Returns the bus (for
/// sending) and the read half (for the caller's inbound loop) separately,
/// since `Bus::subscribe` is not part of the trait — each transport wires
/// its own inbound delivery the way the teacher's own websocket loops do.
pub async fn connect(url: &str, shared_secret: &str) -> Result<(WebSocketWorkerBus, WsReader), BusError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| BusError::HandshakeRejected(e.to_string()))?;
    let (mut write, read) = stream.split();

    write
        .send(Message::Text(shared_secret.to_owned().into()))
        .await
        .map_err(|e| BusError::Publish(e.to_string()))?;

    Ok((WebSocketWorkerBus { write: Mutex::new(write) }, read))
}

#[async_trait]
impl Bus for WebSocketWorkerBus {
    async fn send(&self, _topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError> {
        let json = envelope.to_json().map_err(|e| BusError::Publish(e.to_string()))?;
        self.write
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| BusError::Publish(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.write.lock().await.close().await;
    }
}
