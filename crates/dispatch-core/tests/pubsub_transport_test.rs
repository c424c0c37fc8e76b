//! Exercises the pub/sub broker variant of the `Bus` contract (§4.A.2)
//! through the same dispatch fabric the websocket variant uses, proving
//! the two transports are interchangeable underneath `send_to_worker`,
//! `handle_inbound_frame`, `dispatch_worker_frame`, and `run_ping_round`.

use std::sync::Arc;

use async_trait::async_trait;
use bus_protocol::Envelope;
use dispatch_core::pubsub::{Broker, PubSubBus};
use dispatch_core::{
    dispatch_worker_frame, handle_inbound_frame, run_ping_round, Bus, HubProvider, MalformedFrameCounter,
    PendingCallTable,
};

struct RecordingHubProvider {
    received: tokio::sync::Mutex<Vec<Envelope>>,
}

#[async_trait]
impl HubProvider for RecordingHubProvider {
    fn source_prefix(&self) -> &str {
        "hue"
    }
    async fn handle_worker_frame(&self, envelope: Envelope) {
        self.received.lock().await.push(envelope);
    }
}

struct EchoWorkerCapability;

#[async_trait]
impl dispatch_core::WorkerCapability for EchoWorkerCapability {
    fn source(&self) -> &str {
        "hue"
    }
    async fn handle(&self, envelope: &Envelope) -> Option<Envelope> {
        Some(Envelope::reply_to(Some(envelope), "hue", &envelope.action, "[]"))
    }
    async fn ping(&self) -> Vec<Envelope> {
        vec![Envelope::new_request("hue", "groups", "[]")]
    }
}

/// A request sent from the hub over its broker connection reaches the
/// worker's subscribed command topic, is handled and replied to by a real
/// `WorkerCapability`, and the reply resolves the hub's pending call — the
/// same round trip the websocket transport drives, but over the broker.
#[tokio::test]
async fn request_reply_round_trip_over_the_broker() {
    let broker = Broker::new();
    let hub_bus = PubSubBus::new(Arc::clone(&broker), "result");
    let worker_bus = PubSubBus::new(Arc::clone(&broker), "worker");
    let pending = Arc::new(PendingCallTable::new());
    let hub_provider: Arc<dyn HubProvider> = Arc::new(RecordingHubProvider { received: tokio::sync::Mutex::new(Vec::new()) });
    let hub_providers = vec![hub_provider];

    // hub reader: observes its result topic, delivers replies to pending calls
    let mut result_topic = broker.subscribe("result").await;
    let hub_pending = Arc::clone(&pending);
    tokio::spawn(async move {
        let malformed = MalformedFrameCounter::new();
        while let Ok(envelope) = result_topic.recv().await {
            handle_inbound_frame(&envelope.to_json().unwrap(), &hub_pending, &hub_providers, &malformed).await;
        }
    });

    // worker reader: observes its command topic, dispatches and replies
    let mut command_topic = broker.subscribe("worker").await;
    tokio::spawn(async move {
        let providers: Vec<Arc<dyn dispatch_core::WorkerCapability>> = vec![Arc::new(EchoWorkerCapability)];
        while let Ok(envelope) = command_topic.recv().await {
            if let Some(reply) = dispatch_worker_frame(&envelope.to_json().unwrap(), &providers).await {
                worker_bus.send(Some("result"), &reply).await.unwrap();
            }
        }
    });

    let reply = dispatch_core::send_to_worker(&hub_bus, &pending, Some("worker"), None, "hue", "groups", "", true)
        .await
        .expect("awaited call always yields a reply or a timeout envelope");

    assert!(!reply.is_error(), "expected the worker's echoed reply, got {reply:?}");
    assert_eq!(reply.action, "groups");
}

/// The hub-side dispatch helper routes a broker-delivered frame to the
/// matching provider exactly as it would for a websocket frame.
#[tokio::test]
async fn hub_side_dispatch_routes_broker_frames_to_the_matching_provider() {
    let pending = PendingCallTable::new();
    let malformed = MalformedFrameCounter::new();
    let provider = Arc::new(RecordingHubProvider { received: tokio::sync::Mutex::new(Vec::new()) });
    let providers: Vec<Arc<dyn HubProvider>> = vec![provider.clone()];

    let envelope = Envelope::new_request("hue", "sensors", "[]");
    let reset = handle_inbound_frame(&envelope.to_json().unwrap(), &pending, &providers, &malformed).await;

    assert!(!reset);
    assert_eq!(provider.received.lock().await.len(), 1);
}

/// A ping round publishes to every configured topic over the broker, the
/// same contract `run_ping_round` guarantees for the websocket transport.
#[tokio::test]
async fn ping_round_publishes_to_every_topic_over_the_broker() {
    let broker = Broker::new();
    let bus = PubSubBus::new(Arc::clone(&broker), "local");
    let mut local_sub = broker.subscribe("local").await;
    let mut remote_sub = broker.subscribe("remote").await;

    let providers: Vec<Arc<dyn dispatch_core::WorkerCapability>> = vec![Arc::new(EchoWorkerCapability)];
    let topics = vec!["local".to_owned(), "remote".to_owned()];
    run_ping_round(&bus, &providers, &topics).await;

    assert_eq!(local_sub.recv().await.unwrap().action, "groups");
    assert_eq!(remote_sub.recv().await.unwrap().action, "groups");
}
