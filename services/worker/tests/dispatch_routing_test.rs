use std::sync::Arc;

use async_trait::async_trait;
use bus_protocol::Envelope;
use dispatch_core::{dispatch_worker_frame, run_ping_round, Bus, BusError, WorkerCapability};
use hue_domain::HueError;
use tokio::sync::Mutex;
use worker::providers::hue::HueWorkerProvider;
use worker::providers::stub::StubProvider;

struct EmptyBridge;

#[async_trait]
impl hue_domain::HueClient for EmptyBridge {
    async fn get<T: serde::de::DeserializeOwned>(&self, _path: &str) -> Result<T, HueError> {
        serde_json::from_value(serde_json::json!({})).map_err(|e| HueError::Decode(e.to_string()))
    }
    async fn create(&self, _path: &str, _body: serde_json::Value) -> Result<String, HueError> {
        Ok("1".to_owned())
    }
    async fn update(&self, _path: &str, _body: serde_json::Value) -> Result<(), HueError> {
        Ok(())
    }
    async fn delete(&self, _path: &str) -> Result<(), HueError> {
        Ok(())
    }
}

fn providers() -> Vec<Arc<dyn WorkerCapability>> {
    vec![
        Arc::new(HueWorkerProvider::new(EmptyBridge)),
        Arc::new(StubProvider::netatmo()),
        Arc::new(StubProvider::sonos()),
        Arc::new(StubProvider::dyson()),
    ]
}

#[tokio::test]
async fn frame_is_routed_by_source_prefix_to_the_matching_capability() {
    let providers = providers();

    let hue_request = Envelope::new_request("hue", "groups", "");
    let reply = dispatch_worker_frame(&hue_request.to_json().unwrap(), &providers).await.unwrap();
    assert_eq!(reply.source, "hue");

    let netatmo_request = Envelope::new_request("netatmo", "status", "");
    let reply = dispatch_worker_frame(&netatmo_request.to_json().unwrap(), &providers).await.unwrap();
    assert_eq!(reply.source, "netatmo");
}

#[tokio::test]
async fn unmatched_source_prefix_produces_no_reply() {
    let providers = providers();
    let request = Envelope::new_request("unknown-device", "status", "");
    let reply = dispatch_worker_frame(&request.to_json().unwrap(), &providers).await;
    assert!(reply.is_none());
}

struct RecordingBus {
    sent: Mutex<Vec<(Option<String>, Envelope)>>,
}

#[async_trait]
impl Bus for RecordingBus {
    async fn send(&self, topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError> {
        self.sent.lock().await.push((topic.map(str::to_owned), envelope.clone()));
        Ok(())
    }
    async fn close(&self) {}
}

#[tokio::test]
async fn ping_round_with_four_providers_publishes_each_envelope_to_every_topic() {
    let providers = providers();
    let bus = RecordingBus { sent: Mutex::new(Vec::new()) };
    let topics = vec!["local".to_owned(), "remote".to_owned()];

    run_ping_round(&bus, &providers, &topics).await;

    let sent = bus.sent.lock().await;
    // hue's ping() returns 4 envelopes (groups/scenes/schedules/sensors), the
    // three stubs return 1 each: 7 envelopes total, published to 2 topics.
    assert_eq!(sent.len(), 14);
    assert_eq!(sent.iter().filter(|(topic, _)| topic.as_deref() == Some("local")).count(), 7);
    assert_eq!(sent.iter().filter(|(topic, _)| topic.as_deref() == Some("remote")).count(), 7);
}
