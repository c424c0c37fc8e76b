//! Worker configuration, loaded from the environment (`WORKER_*`), in the
//! same `env::var(...).unwrap_or_else(...)` idiom the hub binary uses.

use std::env;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub bridge_ip: String,
    pub bridge_username: String,
    /// Declarative config JSON file; absent means no startup reprojection.
    pub hue_config_path: Option<String>,
    pub bus_url: String,
    pub shared_secret: String,
    pub publish_topics: Vec<String>,
    pub subscribe_topic: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bridge_ip = env::var("WORKER_HUE_BRIDGE_IP").map_err(|_| ConfigError::MissingVar("WORKER_HUE_BRIDGE_IP"))?;
        let bridge_username = env::var("WORKER_HUE_BRIDGE_USERNAME").map_err(|_| ConfigError::MissingVar("WORKER_HUE_BRIDGE_USERNAME"))?;
        let shared_secret = env::var("WORKER_SHARED_SECRET").map_err(|_| ConfigError::MissingVar("WORKER_SHARED_SECRET"))?;
        let bus_url = env::var("WORKER_BUS_URL").unwrap_or_else(|_| "ws://127.0.0.1:8080/ws".to_owned());
        let hue_config_path = env::var("WORKER_HUE_CONFIG_PATH").ok();
        let publish_topics = env::var("WORKER_PING_PUBLISH_TOPICS")
            .unwrap_or_else(|_| "local,remote".to_owned())
            .split(',')
            .map(str::to_owned)
            .collect();
        let subscribe_topic = env::var("WORKER_SUBSCRIBE_TOPIC").unwrap_or_else(|_| "worker".to_owned());

        Ok(Self {
            bridge_ip,
            bridge_username,
            hue_config_path,
            bus_url,
            shared_secret,
            publish_topics,
            subscribe_topic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn default_publish_topics_are_local_and_remote() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::set_var("WORKER_HUE_BRIDGE_IP", "10.0.0.5");
            env::set_var("WORKER_HUE_BRIDGE_USERNAME", "abc");
            env::set_var("WORKER_SHARED_SECRET", "s3cr3t");
            env::remove_var("WORKER_PING_PUBLISH_TOPICS");
        }
        let cfg = WorkerConfig::from_env().unwrap();
        assert_eq!(cfg.publish_topics, vec!["local".to_owned(), "remote".to_owned()]);
        assert_eq!(cfg.subscribe_topic, "worker");
    }

    #[test]
    fn missing_bridge_ip_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            env::remove_var("WORKER_HUE_BRIDGE_IP");
            env::set_var("WORKER_HUE_BRIDGE_USERNAME", "abc");
            env::set_var("WORKER_SHARED_SECRET", "s3cr3t");
        }
        assert!(WorkerConfig::from_env().is_err());
    }
}
