//! The one Prometheus exposition explicitly in scope (§4.D.6): two gauges
//! per presence sensor, registered lazily and updated on each snapshot.

use prometheus::{Gauge, Opts, Registry};
use std::collections::HashMap;

use crate::types::Sensor;

pub struct HueGauges {
    registry: Registry,
    temperature: HashMap<String, Gauge>,
    battery: HashMap<String, Gauge>,
}

impl Default for HueGauges {
    fn default() -> Self {
        Self::new()
    }
}

impl HueGauges {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            temperature: HashMap::new(),
            battery: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registration is idempotent by gauge name; a sensor renamed on the
    /// bridge gets a second, independent gauge pair rather than reusing one.
    fn gauge_for(map: &mut HashMap<String, Gauge>, registry: &Registry, name: &str) -> Gauge {
        if let Some(existing) = map.get(name) {
            return existing.clone();
        }
        let gauge = Gauge::with_opts(Opts::new(name, name).namespace("hue")).expect("valid gauge opts");
        registry.register(Box::new(gauge.clone())).ok();
        map.insert(name.to_owned(), gauge.clone());
        gauge
    }

    /// Update (creating if needed) the temperature/battery gauges for every
    /// presence sensor in the snapshot.
    pub fn update(&mut self, sensors: &[Sensor]) {
        for sensor in sensors {
            let key = sensor.name.to_lowercase();
            let temperature_gauge = Self::gauge_for(&mut self.temperature, &self.registry, &format!("{key}_temperature"));
            temperature_gauge.set(sensor.state.temperature as f64);

            if let Some(battery) = sensor.config.battery {
                let battery_gauge = Self::gauge_for(&mut self.battery, &self.registry, &format!("{key}_battery"));
                battery_gauge.set(f64::from(battery));
            }
        }
    }
}
