//! ZLL sensor merge (§4.D.3): presence and temperature are reported as two
//! separate bridge sensors sharing a name. The exposed snapshot contains
//! only `ZLLPresence` entries, each carrying its companion's temperature.

use crate::types::{Sensor, SensorType};
use std::collections::HashMap;

pub fn merge_sensors(sensors: Vec<Sensor>) -> Vec<Sensor> {
    let mut presence: HashMap<String, Sensor> = HashMap::new();
    for sensor in &sensors {
        if sensor.kind == SensorType::ZLLPresence {
            presence.insert(sensor.name.clone(), sensor.clone());
        }
    }
    for sensor in &sensors {
        if sensor.kind == SensorType::ZLLTemperature {
            if let Some(companion) = presence.get_mut(&sensor.name) {
                companion.state.temperature = sensor.state.temperature / 100;
            }
        }
    }
    presence.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorState;

    fn presence(name: &str) -> Sensor {
        Sensor {
            id: format!("p-{name}"),
            name: name.to_owned(),
            kind: SensorType::ZLLPresence,
            state: SensorState { presence: Some(true), ..Default::default() },
            config: Default::default(),
        }
    }

    fn temperature(name: &str, raw: i64) -> Sensor {
        Sensor {
            id: format!("t-{name}"),
            name: name.to_owned(),
            kind: SensorType::ZLLTemperature,
            state: SensorState { temperature: raw, ..Default::default() },
            config: Default::default(),
        }
    }

    #[test]
    fn merges_temperature_into_matching_presence_sensor_by_name() {
        let merged = merge_sensors(vec![presence("Hallway"), temperature("Hallway", 2150)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].state.temperature, 21);
    }

    #[test]
    fn presence_sensor_without_companion_keeps_zero_temperature() {
        let merged = merge_sensors(vec![presence("Kitchen")]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].state.temperature, 0);
    }

    #[test]
    fn non_presence_sensors_are_discarded_from_snapshot() {
        let tap = Sensor {
            id: "tap-1".into(),
            name: "Entry Tap".into(),
            kind: SensorType::ZGPSwitch,
            state: SensorState::default(),
            config: Default::default(),
        };
        let merged = merge_sensors(vec![presence("Hallway"), tap]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Hallway");
    }

    #[test]
    fn temperature_sensor_with_no_matching_name_is_ignored() {
        let merged = merge_sensors(vec![presence("Hallway"), temperature("Garage", 1800)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].state.temperature, 0);
    }
}
