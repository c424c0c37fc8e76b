//! Worker-side Hue provider (§4.D.2): translates envelopes into bridge REST
//! calls and answers the periodic ping with the four list actions.

use async_trait::async_trait;
use bus_protocol::{error_codes, Envelope};
use dispatch_core::WorkerCapability;
use hue_domain::client::{list, HueClient};
use hue_domain::types::{DeclarativeConfig, Schedule};
use hue_domain::{config_algorithm, sensor_merge, states, Group, Scene, Sensor};
use tracing::warn;

pub const SOURCE: &str = "hue";

pub struct HueWorkerProvider<C: HueClient> {
    client: C,
}

impl<C: HueClient> HueWorkerProvider<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Run the declarative-config startup sequence (§4.D.4) if a config was
    /// provided. Bridge unreachability during cleanup aborts the caller.
    pub async fn configure_from_file(&self, config: &DeclarativeConfig) -> Result<(), config_algorithm::ConfigAlgorithmError> {
        config_algorithm::run(&self.client, config).await
    }

    async fn list_groups_json(&self) -> Result<String, hue_domain::HueError> {
        let groups = list::<C, Group>(&self.client, "/groups").await?;
        Ok(serde_json::to_string(&groups).unwrap_or_default())
    }

    async fn list_scenes_json(&self) -> Result<String, hue_domain::HueError> {
        let scenes = list::<C, Scene>(&self.client, "/scenes").await?;
        Ok(serde_json::to_string(&scenes).unwrap_or_default())
    }

    async fn list_schedules_json(&self) -> Result<String, hue_domain::HueError> {
        let schedules = list::<C, Schedule>(&self.client, "/schedules").await?;
        Ok(serde_json::to_string(&schedules).unwrap_or_default())
    }

    async fn list_sensors_json(&self) -> Result<String, hue_domain::HueError> {
        let sensors = list::<C, Sensor>(&self.client, "/sensors").await?;
        let merged = sensor_merge::merge_sensors(sensors);
        Ok(serde_json::to_string(&merged).unwrap_or_default())
    }

    async fn handle_state(&self, envelope: &Envelope) -> Envelope {
        let Some((group_id, state_name)) = envelope.payload.split_once('|') else {
            return Envelope::error_reply(Some(envelope), SOURCE, "malformed state payload");
        };
        let action = match states::lookup(state_name) {
            Ok(action) => action,
            Err(err) => return Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        };
        let body = serde_json::to_value(&action).unwrap();
        if let Err(err) = self.client.update(&format!("/groups/{group_id}/action"), body).await {
            return Envelope::error_reply(Some(envelope), SOURCE, err.to_string());
        }
        match self.list_groups_json().await {
            Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "groups", payload),
            Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        }
    }

    async fn handle_schedules_create(&self, envelope: &Envelope) -> Envelope {
        let entry: hue_domain::types::ScheduleEntry = match serde_json::from_str(&envelope.payload) {
            Ok(e) => e,
            Err(err) => return Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        };
        let config = DeclarativeConfig { schedules: vec![entry], taps: vec![], sensors: vec![] };
        if let Err(err) = config_algorithm::run(&self.client, &config).await {
            warn!(error = %err, "schedules/create failed");
        }
        match self.list_schedules_json().await {
            Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "schedules", payload),
            Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        }
    }

    async fn handle_schedules_update(&self, envelope: &Envelope) -> Envelope {
        let schedule: Schedule = match serde_json::from_str(&envelope.payload) {
            Ok(s) => s,
            Err(err) => return Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        };
        if schedule.id.is_empty() {
            return Envelope::error_reply(Some(envelope), SOURCE, "schedule id is required");
        }
        let body = serde_json::json!({"status": schedule.status});
        if let Err(err) = self.client.update(&format!("/schedules/{}", schedule.id), body).await {
            return Envelope::error_reply(Some(envelope), SOURCE, err.to_string());
        }
        match self.list_schedules_json().await {
            Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "schedules", payload),
            Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        }
    }

    async fn handle_schedules_delete(&self, envelope: &Envelope) -> Envelope {
        let schedule_id = envelope.payload.clone();
        let schedule: Schedule = match self.client.get(&format!("/schedules/{schedule_id}")).await {
            Ok(s) => s,
            Err(err) => return Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        };
        if let Err(err) = self.client.delete(&format!("/schedules/{schedule_id}")).await {
            return Envelope::error_reply(Some(envelope), SOURCE, err.to_string());
        }
        if let Some(scene_id) = schedule.command.body.get("scene").and_then(|v| v.as_str()) {
            if let Err(err) = self.client.delete(&format!("/scenes/{scene_id}")).await {
                warn!(scene = %scene_id, error = %err, "failed to delete scene referenced by deleted schedule");
            }
        }
        match self.list_schedules_json().await {
            Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "schedules", payload),
            Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
        }
    }
}

#[async_trait]
impl<C: HueClient + Send + Sync + 'static> WorkerCapability for HueWorkerProvider<C> {
    fn source(&self) -> &str {
        SOURCE
    }

    async fn handle(&self, envelope: &Envelope) -> Option<Envelope> {
        let reply = if envelope.action == "groups" {
            match self.list_groups_json().await {
                Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "groups", payload),
                Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
            }
        } else if envelope.action == "scenes" {
            match self.list_scenes_json().await {
                Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "scenes", payload),
                Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
            }
        } else if envelope.action == "sensors" {
            match self.list_sensors_json().await {
                Ok(payload) => Envelope::reply_to(Some(envelope), SOURCE, "sensors", payload),
                Err(err) => Envelope::error_reply(Some(envelope), SOURCE, err.to_string()),
            }
        } else if envelope.action == "schedules/create" {
            self.handle_schedules_create(envelope).await
        } else if envelope.action == "schedules/update" {
            self.handle_schedules_update(envelope).await
        } else if envelope.action == "schedules/delete" {
            self.handle_schedules_delete(envelope).await
        } else if envelope.action == "state" {
            self.handle_state(envelope).await
        } else {
            Envelope::error_reply(Some(envelope), SOURCE, error_codes::UNKNOWN_REQUEST)
        };
        Some(reply)
    }

    async fn ping(&self) -> Vec<Envelope> {
        let mut envelopes = Vec::with_capacity(4);
        envelopes.push(match self.list_groups_json().await {
            Ok(payload) => Envelope::reply_to(None, SOURCE, "groups", payload),
            Err(err) => Envelope::error_reply(None, SOURCE, err.to_string()),
        });
        envelopes.push(match self.list_scenes_json().await {
            Ok(payload) => Envelope::reply_to(None, SOURCE, "scenes", payload),
            Err(err) => Envelope::error_reply(None, SOURCE, err.to_string()),
        });
        envelopes.push(match self.list_schedules_json().await {
            Ok(payload) => Envelope::reply_to(None, SOURCE, "schedules", payload),
            Err(err) => Envelope::error_reply(None, SOURCE, err.to_string()),
        });
        envelopes.push(match self.list_sensors_json().await {
            Ok(payload) => Envelope::reply_to(None, SOURCE, "sensors", payload),
            Err(err) => Envelope::error_reply(None, SOURCE, err.to_string()),
        });
        envelopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hue_domain::HueError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBridge {
        groups: HashMap<String, Group>,
        puts: Mutex<Vec<(String, serde_json::Value)>>,
    }

    struct FakeClient(FakeBridge);

    #[async_trait]
    impl HueClient for FakeClient {
        async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, HueError> {
            let value = match path {
                "/groups" => serde_json::to_value(&self.0.groups).unwrap(),
                _ => serde_json::json!({}),
            };
            serde_json::from_value(value).map_err(|e| HueError::Decode(e.to_string()))
        }
        async fn create(&self, _path: &str, _body: serde_json::Value) -> Result<String, HueError> {
            Ok("1".to_owned())
        }
        async fn update(&self, path: &str, body: serde_json::Value) -> Result<(), HueError> {
            self.0.puts.lock().unwrap().push((path.to_owned(), body));
            Ok(())
        }
        async fn delete(&self, _path: &str) -> Result<(), HueError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unknown_state_rejects_without_issuing_a_put() {
        let provider = HueWorkerProvider::new(FakeClient(FakeBridge::default()));
        let envelope = Envelope::new_request("hue", "state", "G1|chartreuse");
        let reply = provider.handle(&envelope).await.unwrap();
        assert!(reply.is_error());
        assert!(provider.client.0.puts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn known_state_issues_put_and_replies_with_groups() {
        let provider = HueWorkerProvider::new(FakeClient(FakeBridge::default()));
        let envelope = Envelope::new_request("hue", "state", "G1|on");
        let reply = provider.handle(&envelope).await.unwrap();
        assert!(!reply.is_error());
        assert_eq!(reply.action, "groups");
        assert_eq!(provider.client.0.puts.lock().unwrap().len(), 1);
        assert_eq!(provider.client.0.puts.lock().unwrap()[0].0, "/groups/G1/action");
    }

    #[tokio::test]
    async fn unknown_action_returns_unknown_request_error() {
        let provider = HueWorkerProvider::new(FakeClient(FakeBridge::default()));
        let envelope = Envelope::new_request("hue", "bogus", "");
        let reply = provider.handle(&envelope).await.unwrap();
        assert!(reply.is_error());
        assert_eq!(reply.payload, error_codes::UNKNOWN_REQUEST);
    }

    #[tokio::test]
    async fn ping_returns_four_envelopes_in_groups_scenes_schedules_sensors_order() {
        let provider = HueWorkerProvider::new(FakeClient(FakeBridge::default()));
        let pings = provider.ping().await;
        assert_eq!(pings.len(), 4);
        assert_eq!(pings[0].action, "groups");
        assert_eq!(pings[1].action, "scenes");
        assert_eq!(pings[2].action, "schedules");
        assert_eq!(pings[3].action, "sensors");
    }
}
