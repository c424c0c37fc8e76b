//! Shared hub state: the active worker bus, the pending-call table, and the
//! Hue provider's cached snapshots — mirrors the `AppState`-with-RwLock-maps
//! convention this codebase uses for concurrent handler state.

use std::sync::Arc;

use async_trait::async_trait;
use bus_protocol::Envelope;
use dispatch_core::{send_to_worker, Bus, HubProvider, PendingCallTable};
use hue_domain::prometheus_gauges::HueGauges;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::hue_provider::HueSnapshots;

/// Narrow handle each provider is constructed with, rather than a mutable
/// setter back onto the hub (§9 "cyclic hub↔provider registration").
#[async_trait]
pub trait HubHandle: Send + Sync {
    async fn send_to_worker(&self, source: &str, action: &str, payload: String, wait_output: bool) -> Option<Envelope>;
}

pub struct AppState {
    pub shared_secret: String,
    pending: Arc<PendingCallTable>,
    bus: RwLock<Option<Arc<dyn Bus>>>,
    /// Owned by the Hue provider; shared here by handle so dashboard
    /// handlers can read it without a back-reference to the provider.
    pub hue: Arc<RwLock<HueSnapshots>>,
    /// Likewise shared by handle with the Hue provider, so the `/metrics`
    /// route can render it without needing to reach back through the
    /// installed `dyn HubProvider` list.
    pub hue_gauges: Arc<Mutex<HueGauges>>,
    /// Set once at startup via `install_providers`; read by the websocket
    /// loop on every inbound frame.
    providers: RwLock<Vec<Arc<dyn HubProvider>>>,
}

impl AppState {
    pub fn new(shared_secret: String) -> Self {
        Self {
            shared_secret,
            pending: Arc::new(PendingCallTable::new()),
            bus: RwLock::new(None),
            hue: Arc::new(RwLock::new(HueSnapshots::default())),
            hue_gauges: Arc::new(Mutex::new(HueGauges::new())),
            providers: RwLock::new(Vec::new()),
        }
    }

    pub async fn install_providers(&self, providers: Vec<Arc<dyn HubProvider>>) {
        *self.providers.write().await = providers;
    }

    pub async fn providers(&self) -> Vec<Arc<dyn HubProvider>> {
        self.providers.read().await.clone()
    }

    pub fn pending(&self) -> &Arc<PendingCallTable> {
        &self.pending
    }

    /// Install a freshly handshaked worker connection, closing out whichever
    /// connection was previously active (a new handshake supersedes the old).
    pub async fn replace_bus(&self, new_bus: Arc<dyn Bus>) {
        let old = self.bus.write().await.replace(new_bus);
        if let Some(old) = old {
            info!("superseding previous worker connection");
            old.close().await;
        }
    }

    /// Clear the active bus, but only if it is still the one passed in — a
    /// connection whose read loop just ended may already have been
    /// superseded by a newer handshake, which must not be torn down here.
    pub async fn clear_bus_if_current(&self, bus: &Arc<dyn Bus>) {
        let mut slot = self.bus.write().await;
        let is_current = matches!(slot.as_ref(), Some(current) if Arc::ptr_eq(current, bus));
        if is_current {
            slot.take();
            drop(slot);
            self.pending.drain_with_transport_error("iot").await;
        }
    }

    pub async fn has_bus(&self) -> bool {
        self.bus.read().await.is_some()
    }

    async fn current_bus(&self) -> Option<Arc<dyn Bus>> {
        self.bus.read().await.clone()
    }
}

#[async_trait]
impl HubHandle for AppState {
    async fn send_to_worker(&self, source: &str, action: &str, payload: String, wait_output: bool) -> Option<Envelope> {
        let Some(bus) = self.current_bus().await else {
            return Some(Envelope::error_reply(None, "iot", "no worker connected"));
        };
        send_to_worker(bus.as_ref(), &self.pending, None, None, source, action, payload, wait_output).await
    }
}
