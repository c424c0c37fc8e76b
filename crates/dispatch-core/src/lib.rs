//! dispatch-core: the request/response correlation fabric shared by the hub
//! and the worker.
//!
//! The bus abstraction, the pending-call table, the 10-second await deadline
//! and the 60-second ping round all live here so both sides of the wire
//! build on identical semantics regardless of which `Bus` implementation is
//! plugged in underneath.

use async_trait::async_trait;
use bus_protocol::{error_codes, Envelope};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, warn};

pub mod pubsub;

/// Hard deadline on an awaited `send_to_worker` call.
pub const DISPATCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Interval between worker ping rounds.
pub const PING_INTERVAL: Duration = Duration::from_secs(60);
/// Consecutive malformed frames before a connection is reset.
pub const MALFORMED_FRAME_THRESHOLD: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("connection closed")]
    Closed,
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("handshake rejected: {0}")]
    HandshakeRejected(String),
}

/// One transport hub<->worker, satisfied by an authenticated single-worker
/// websocket or by a pub/sub broker connection. The fabric above never
/// branches on which one it's holding.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Serialize and publish an envelope. `topic` is ignored by transports
    /// that only ever have one peer (the websocket variant).
    async fn send(&self, topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError>;

    /// Idempotent teardown.
    async fn close(&self);
}

/// Keyed by envelope id; each entry is a single-slot sink written at most
/// once, by at most one task.
#[derive(Default)]
pub struct PendingCallTable {
    sinks: Mutex<HashMap<String, oneshot::Sender<Envelope>>>,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending call before the request is sent. Must be called
    /// before `send` to avoid a race against an immediate reply.
    pub async fn insert(&self, id: String) -> oneshot::Receiver<Envelope> {
        let (tx, rx) = oneshot::channel();
        self.sinks.lock().await.insert(id, tx);
        rx
    }

    /// Deliver a reply to its sink, if one is outstanding. Non-blocking:
    /// a full or dropped receiver is treated as "no longer waiting".
    /// Returns whether a sink was present for this id.
    pub async fn deliver(&self, envelope: &Envelope) -> bool {
        let sender = self.sinks.lock().await.remove(&envelope.id);
        match sender {
            Some(tx) => {
                let _ = tx.send(envelope.clone());
                true
            }
            None => false,
        }
    }

    /// Remove an entry without delivering (used on send failure or timeout).
    /// Idempotent.
    pub async fn remove(&self, id: &str) {
        self.sinks.lock().await.remove(id);
    }

    /// Deliver a transport-error envelope to every outstanding sink and
    /// clear the table. Called when the underlying bus connection drops.
    pub async fn drain_with_transport_error(&self, source: &str) {
        let mut sinks = self.sinks.lock().await;
        for (_, tx) in sinks.drain() {
            let _ = tx.send(Envelope::error_reply(None, source, "connection lost"));
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.sinks.lock().await.is_empty()
    }
}

/// `SendToWorker`: build an envelope, optionally register a pending call,
/// publish it, and optionally await the reply under the 10-second deadline.
///
/// Returns `None` when `wait_output` is false and publish succeeded.
pub async fn send_to_worker(
    bus: &dyn Bus,
    pending: &PendingCallTable,
    topic: Option<&str>,
    root: Option<&str>,
    source: &str,
    action: &str,
    payload: impl Into<String>,
    wait_output: bool,
) -> Option<Envelope> {
    let mut envelope = Envelope::new_request(source, action, payload);
    if let Some(root) = root {
        envelope.root = root.to_owned();
    }

    let receiver = if wait_output {
        Some(pending.insert(envelope.id.clone()).await)
    } else {
        None
    };

    if let Err(err) = bus.send(topic, &envelope).await {
        if wait_output {
            pending.remove(&envelope.id).await;
        }
        return Some(Envelope::error_reply(Some(&envelope), source, err.to_string()));
    }

    let receiver = receiver?;
    match tokio::time::timeout(DISPATCH_TIMEOUT, receiver).await {
        Ok(Ok(reply)) => Some(reply),
        Ok(Err(_)) | Err(_) => {
            pending.remove(&envelope.id).await;
            Some(Envelope::error_reply(Some(&envelope), source, error_codes::TIMEOUT))
        }
    }
}

/// A hub-side handler for inbound frames tagged with a given `source`.
#[async_trait]
pub trait HubProvider: Send + Sync {
    fn source_prefix(&self) -> &str;
    async fn handle_worker_frame(&self, envelope: Envelope);
}

/// Tracks consecutive malformed frames on one connection; resets on any
/// successfully-dispatched frame.
#[derive(Default)]
pub struct MalformedFrameCounter {
    count: AtomicU32,
}

impl MalformedFrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the threshold is reached (connection should reset).
    pub fn increment(&self) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst) + 1 >= MALFORMED_FRAME_THRESHOLD
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}

/// On the hub: decode a raw text frame, deliver to a matching pending call,
/// log errors, and route to the provider whose source prefix matches.
///
/// Returns `true` if the connection should be force-reset (third
/// consecutive malformed frame).
pub async fn handle_inbound_frame(
    raw: &str,
    pending: &PendingCallTable,
    providers: &[Arc<dyn HubProvider>],
    malformed: &MalformedFrameCounter,
) -> bool {
    let envelope = match Envelope::from_json(raw) {
        Ok(e) => e,
        Err(err) => {
            warn!(error = %err, "malformed frame");
            return malformed.increment();
        }
    };

    pending.deliver(&envelope).await;

    if envelope.is_error() {
        error!(source = %envelope.source, action = %envelope.action, payload = %envelope.payload, "worker reported error");
    }

    let provider = providers.iter().find(|p| envelope.source.starts_with(p.source_prefix()));
    match provider {
        Some(provider) => {
            provider.handle_worker_frame(envelope).await;
            malformed.reset();
        }
        None => warn!(source = %envelope.source, "no provider registered for source"),
    }
    false
}

/// A worker-side capability: handles commands for one `source` and answers
/// the periodic ping.
#[async_trait]
pub trait WorkerCapability: Send + Sync {
    fn source(&self) -> &str;
    async fn handle(&self, envelope: &Envelope) -> Option<Envelope>;
    async fn ping(&self) -> Vec<Envelope>;
}

/// Worker-side mirror of `handle_inbound_frame`: decode, find the matching
/// capability by source prefix, and return its reply (if any) for the
/// caller to publish back onto the bus.
pub async fn dispatch_worker_frame(
    raw: &str,
    providers: &[Arc<dyn WorkerCapability>],
) -> Option<Envelope> {
    let envelope = match Envelope::from_json(raw) {
        Ok(e) => e,
        Err(err) => {
            warn!(error = %err, "worker received malformed frame");
            return None;
        }
    };
    let provider = providers.iter().find(|p| envelope.source.starts_with(p.source()));
    match provider {
        Some(provider) => provider.handle(&envelope).await,
        None => {
            warn!(source = %envelope.source, "no capability registered for source");
            None
        }
    }
}

/// Run one 60-second ping round: invoke `ping()` on every provider in
/// parallel and publish every resulting envelope to every configured topic.
/// A single provider's failure (panic-free; `ping` itself must not error)
/// does not abort the round.
pub async fn run_ping_round(
    bus: &dyn Bus,
    providers: &[Arc<dyn WorkerCapability>],
    publish_topics: &[String],
) {
    let results = futures_util::future::join_all(providers.iter().map(|p| {
        let p = Arc::clone(p);
        async move { p.ping().await }
    }))
    .await;

    for envelopes in results {
        for envelope in envelopes {
            for topic in publish_topics {
                if let Err(err) = bus.send(Some(topic), &envelope).await {
                    error!(topic = %topic, error = %err, "ping publish failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct MockBus {
        fail: AtomicBool,
        sent: Mutex<Vec<Envelope>>,
    }

    impl MockBus {
        fn new(fail: bool) -> Self {
            Self { fail: AtomicBool::new(fail), sent: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl Bus for MockBus {
        async fn send(&self, _topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BusError::Publish("boom".into()));
            }
            self.sent.lock().await.push(envelope.clone());
            Ok(())
        }
        async fn close(&self) {}
    }

    #[tokio::test]
    async fn send_to_worker_times_out_when_no_reply_arrives() {
        let bus = MockBus::new(false);
        let pending = PendingCallTable::new();
        let start = tokio::time::Instant::now();
        tokio::time::pause();

        let handle = tokio::spawn(async move {
            send_to_worker(&bus, &pending, None, None, "hue", "state", "G1|on", true).await
        });
        tokio::time::advance(DISPATCH_TIMEOUT + Duration::from_millis(50)).await;
        let reply = handle.await.unwrap().unwrap();

        assert!(reply.is_error());
        assert_eq!(reply.payload, error_codes::TIMEOUT);
        assert!(start.elapsed() >= Duration::ZERO);
    }

    #[tokio::test]
    async fn send_to_worker_returns_error_envelope_on_publish_failure() {
        let bus = MockBus::new(true);
        let pending = PendingCallTable::new();
        let reply = send_to_worker(&bus, &pending, None, None, "hue", "groups", "", true).await.unwrap();
        assert!(reply.is_error());
        assert!(pending.is_empty().await);
    }

    #[tokio::test]
    async fn send_to_worker_without_wait_output_returns_none_on_success() {
        let bus = MockBus::new(false);
        let pending = PendingCallTable::new();
        let reply = send_to_worker(&bus, &pending, None, None, "hue", "ping", "", false).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn pending_call_delivers_reply_and_removes_entry() {
        let pending = PendingCallTable::new();
        let mut request = Envelope::new_request("hue", "groups", "");
        let rx = pending.insert(request.id.clone()).await;
        let reply = Envelope::reply_to(Some(&request), "hue", "groups", "[]");
        assert!(pending.deliver(&reply).await);
        let received = rx.await.unwrap();
        assert_eq!(received.root, request.root);
        assert!(pending.is_empty().await);
        request.id.clear();
    }

    #[tokio::test]
    async fn malformed_frame_counter_trips_at_threshold() {
        let counter = MalformedFrameCounter::new();
        assert!(!counter.increment());
        assert!(!counter.increment());
        assert!(counter.increment());
    }

    #[tokio::test]
    async fn malformed_frame_counter_resets_on_success() {
        let counter = MalformedFrameCounter::new();
        counter.increment();
        counter.increment();
        counter.reset();
        assert!(!counter.increment());
    }

    #[tokio::test]
    async fn drain_with_transport_error_flushes_every_outstanding_sink() {
        let pending = PendingCallTable::new();
        let rx1 = pending.insert("a".into()).await;
        let rx2 = pending.insert("b".into()).await;
        pending.drain_with_transport_error("iot").await;
        assert!(rx1.await.unwrap().is_error());
        assert!(rx2.await.unwrap().is_error());
        assert!(pending.is_empty().await);
    }
}
