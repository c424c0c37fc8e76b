//! Types mirroring the Hue bridge's own REST representation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub any_on: bool,
    pub all_on: bool,
}

/// The body pushed to `/groups/{id}/action` or stored in a scene's
/// lightstate. Optional fields are omitted from the wire body for states
/// that don't set them (e.g. `off` carries no `sat`/`bri`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightAction {
    pub on: bool,
    pub transitiontime: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub lights: Vec<String>,
    pub state: GroupState,
    pub action: LightAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub lights: Vec<String>,
    pub recycle: bool,
    #[serde(default)]
    pub lightstates: HashMap<String, LightAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleStatus {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleCommand {
    pub address: String,
    pub method: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub localtime: String,
    pub status: ScheduleStatus,
    pub command: ScheduleCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorType {
    ZLLPresence,
    ZLLTemperature,
    ZGPSwitch,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<bool>,
    /// Raw bridge units (hundredths of a degree); `0` once merged when no
    /// companion temperature sensor exists.
    #[serde(default)]
    pub temperature: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttonevent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dark: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SensorType,
    #[serde(default)]
    pub state: SensorState,
    #[serde(default)]
    pub config: SensorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOperator {
    Eq,
    Dx,
    Ddx,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub address: String,
    pub operator: RuleOperator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    pub address: String,
    pub method: String,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
}

// ---------------------------------------------------------------------------
// Declarative config file (§3 "Declarative config")
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleEntry {
    pub name: String,
    pub group: String,
    pub localtime: String,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonMapping {
    pub button: u32,
    pub groups: Vec<String>,
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TapConfig {
    pub id: String,
    pub buttons: Vec<ButtonMapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionSensorConfig {
    pub id: String,
    #[serde(rename = "lightSensorId")]
    pub light_sensor_id: String,
    pub groups: Vec<String>,
    pub state: String,
    #[serde(rename = "offDelay")]
    pub off_delay: String,
    #[serde(rename = "evenIfNotDark", default)]
    pub even_if_not_dark: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclarativeConfig {
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub taps: Vec<TapConfig>,
    #[serde(default)]
    pub sensors: Vec<MotionSensorConfig>,
}

/// Implemented by every entity the bridge returns keyed by id (bridge
/// responses are `{"<id>": {...fields, no id...}}` maps, not arrays).
pub trait WithId {
    fn set_id(&mut self, id: String);
}

impl WithId for Group {
    fn set_id(&mut self, id: String) { self.id = id; }
}
impl WithId for Scene {
    fn set_id(&mut self, id: String) { self.id = id; }
}
impl WithId for Schedule {
    fn set_id(&mut self, id: String) { self.id = id; }
}
impl WithId for Sensor {
    fn set_id(&mut self, id: String) { self.id = id; }
}
impl WithId for Rule {
    fn set_id(&mut self, id: String) { self.id = id; }
}
