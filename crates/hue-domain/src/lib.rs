//! hue-domain: the Hue bridge's domain types, REST client, sensor merge and
//! declarative configuration algorithm. Shared by the worker (talks to the
//! bridge) and the hub (caches snapshots, renders the dashboard).

pub mod client;
pub mod config_algorithm;
pub mod prometheus_gauges;
pub mod sensor_merge;
pub mod states;
pub mod types;

pub use client::{has_success, HueClient, HueError, ReqwestHueClient};
pub use states::{lookup as lookup_state, UnknownState};
pub use types::*;
