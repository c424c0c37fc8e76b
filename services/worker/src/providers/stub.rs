//! Thin `WorkerCapability` stand-ins proving the trait out for device
//! families beyond Hue, without implementing their wire protocols (§2,
//! "out of scope ... thin Provider trait stand-in").

use async_trait::async_trait;
use bus_protocol::{error_codes, Envelope};
use dispatch_core::WorkerCapability;

/// A provider whose only supported action is `status`, replying with a
/// fixed payload. Used for `netatmo`, `sonos`, `dyson`.
pub struct StubProvider {
    source: &'static str,
    status_payload: &'static str,
}

impl StubProvider {
    pub fn netatmo() -> Self {
        Self { source: "netatmo", status_payload: "{\"connected\":false}" }
    }

    pub fn sonos() -> Self {
        Self { source: "sonos", status_payload: "{\"connected\":false}" }
    }

    pub fn dyson() -> Self {
        Self { source: "dyson", status_payload: "{\"connected\":false}" }
    }
}

#[async_trait]
impl WorkerCapability for StubProvider {
    fn source(&self) -> &str {
        self.source
    }

    async fn handle(&self, envelope: &Envelope) -> Option<Envelope> {
        let reply = if envelope.action == "status" {
            Envelope::reply_to(Some(envelope), self.source, "status", self.status_payload)
        } else {
            Envelope::error_reply(Some(envelope), self.source, error_codes::UNKNOWN_REQUEST)
        };
        Some(reply)
    }

    async fn ping(&self) -> Vec<Envelope> {
        vec![Envelope::reply_to(None, self.source, "status", self.status_payload)]
    }
}
