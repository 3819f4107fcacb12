use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::protocol::messages::FLOW_PRIORITY;

/// Tunables of the forwarding controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Period of the topology re-discovery loop.
    #[serde(default = "default_discovery_interval_ms")]
    pub discovery_interval_ms: u64,
    /// Priority of path rules installed along computed routes.
    #[serde(default = "default_flow_priority")]
    pub flow_priority: u16,
    /// Idle timeout carried in every installed rule; 0 means no expiry.
    #[serde(default)]
    pub flow_idle_timeout: u16,
    /// Hard timeout carried in every installed rule; 0 means no expiry.
    #[serde(default)]
    pub flow_hard_timeout: u16,
}

fn default_discovery_interval_ms() -> u64 {
    1000
}

fn default_flow_priority() -> u16 {
    FLOW_PRIORITY
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            discovery_interval_ms: default_discovery_interval_ms(),
            flow_priority: default_flow_priority(),
            flow_idle_timeout: 0,
            flow_hard_timeout: 0,
        }
    }
}

impl ControllerConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ControllerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
