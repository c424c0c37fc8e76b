//! The pub/sub `Bus` variant (§4.A.2, §9 "two repo revisions coexist").
//!
//! Hub and worker both connect as clients of a shared broker and address
//! each other by topic; `responseTo` on an envelope carries the reply
//! topic. This in-memory broker is the seam a real broker client (NATS,
//! MQTT, ...) plugs into; the dispatch fabric above is identical either way.

use crate::{Bus, BusError};
use async_trait::async_trait;
use bus_protocol::Envelope;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

const TOPIC_CAPACITY: usize = 256;

#[derive(Default)]
pub struct Broker {
    topics: RwLock<HashMap<String, broadcast::Sender<Envelope>>>,
}

impl Broker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn sender_for(&self, topic: &str) -> broadcast::Sender<Envelope> {
        if let Some(tx) = self.topics.read().await.get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Envelope> {
        self.sender_for(topic).await.subscribe()
    }

    pub async fn publish(&self, topic: &str, envelope: Envelope) {
        let _ = self.sender_for(topic).await.send(envelope);
    }
}

/// A `Bus` that publishes to a named topic on a shared broker. `close` is a
/// no-op — the broker outlives any single bus handle.
pub struct PubSubBus {
    broker: Arc<Broker>,
    default_topic: String,
}

impl PubSubBus {
    pub fn new(broker: Arc<Broker>, default_topic: impl Into<String>) -> Self {
        Self { broker, default_topic: default_topic.into() }
    }
}

#[async_trait]
impl Bus for PubSubBus {
    async fn send(&self, topic: Option<&str>, envelope: &Envelope) -> Result<(), BusError> {
        let topic = topic.unwrap_or(&self.default_topic);
        self.broker.publish(topic, envelope.clone()).await;
        Ok(())
    }

    async fn close(&self) {}
}
