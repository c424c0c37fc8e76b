//! Hub-side Hue provider: exclusively owns the cached group/scene/schedule/
//! sensor snapshots and keeps the Prometheus gauges current. The snapshot
//! lock is shared with `AppState` by handle, not by a back-reference — the
//! provider never needs to call back into the hub to push a worker command,
//! only the HTTP handlers do that directly via `HubHandle`.

use std::sync::Arc;

use async_trait::async_trait;
use bus_protocol::Envelope;
use dispatch_core::HubProvider;
use hue_domain::prometheus_gauges::HueGauges;
use hue_domain::{Group, Scene, Schedule, Sensor};
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct HueSnapshots {
    pub groups: Vec<Group>,
    pub scenes: Vec<Scene>,
    pub schedules: Vec<Schedule>,
    pub sensors: Vec<Sensor>,
}

pub struct HueHubProvider {
    snapshots: Arc<RwLock<HueSnapshots>>,
    gauges: Arc<Mutex<HueGauges>>,
}

impl HueHubProvider {
    pub fn new(snapshots: Arc<RwLock<HueSnapshots>>, gauges: Arc<Mutex<HueGauges>>) -> Self {
        Self { snapshots, gauges }
    }
}

#[async_trait]
impl HubProvider for HueHubProvider {
    fn source_prefix(&self) -> &str {
        "hue"
    }

    async fn handle_worker_frame(&self, envelope: Envelope) {
        if envelope.is_error() {
            return;
        }
        match envelope.action.as_str() {
            "groups" => match serde_json::from_str::<Vec<Group>>(&envelope.payload) {
                Ok(groups) => self.snapshots.write().await.groups = groups,
                Err(err) => warn!(error = %err, "failed to decode groups snapshot"),
            },
            "scenes" => match serde_json::from_str::<Vec<Scene>>(&envelope.payload) {
                Ok(scenes) => self.snapshots.write().await.scenes = scenes,
                Err(err) => warn!(error = %err, "failed to decode scenes snapshot"),
            },
            "schedules" => match serde_json::from_str::<Vec<Schedule>>(&envelope.payload) {
                Ok(schedules) => self.snapshots.write().await.schedules = schedules,
                Err(err) => warn!(error = %err, "failed to decode schedules snapshot"),
            },
            "sensors" => match serde_json::from_str::<Vec<Sensor>>(&envelope.payload) {
                Ok(sensors) => {
                    self.gauges.lock().await.update(&sensors);
                    self.snapshots.write().await.sensors = sensors;
                }
                Err(err) => warn!(error = %err, "failed to decode sensors snapshot"),
            },
            other => warn!(action = %other, "unrecognized hue reply action"),
        }
    }
}
