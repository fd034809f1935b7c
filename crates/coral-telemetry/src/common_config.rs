//! The small, separate config document the metrics exporter reads: organization/gateway
//! identifiers used to build its topic prefix, plus the MQTT broker connection details an
//! external collaborator (the MQTT client, out of scope here) would use.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the common-config file. Defaults to
/// `<mount_dir>/common-config.json`.
pub const ENV_COMMON_CONFIG_PATH: &str = "CORAL_COMMON_CONFIG_PATH";

/// MQTT broker connection details. The MQTT client itself is an external collaborator; this
/// struct only carries the fields the exporter's topic and connection setup need.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MqttConfig {
    /// Broker hostname.
    #[serde(default)]
    pub broker: String,
    /// Broker port.
    #[serde(default)]
    pub port: u16,
    /// Optional username.
    #[serde(default)]
    pub username: Option<String>,
    /// Optional password.
    #[serde(default)]
    pub password: Option<String>,
}

/// The exporter-wide config shared across every node on a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Organization identifier used in the metrics topic prefix.
    #[serde(default = "default_organization_id")]
    pub organization_id: String,
    /// Gateway identifier used in the metrics topic prefix.
    #[serde(default = "default_gateway_id")]
    pub gateway_id: String,
    /// MQTT broker connection details.
    #[serde(default)]
    pub mqtt: MqttConfig,
}

fn default_organization_id() -> String {
    "coral-user".to_owned()
}

fn default_gateway_id() -> String {
    "coral-gateway".to_owned()
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            organization_id: default_organization_id(),
            gateway_id: default_gateway_id(),
            mqtt: MqttConfig::default(),
        }
    }
}

impl CommonConfig {
    /// Loads the common config from `path`, or returns the default if the file is absent.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Resolves the common-config path from the environment, falling back to
    /// `<mount_dir>/common-config.json`.
    #[must_use]
    pub fn resolve_path(mount_dir: &Path) -> PathBuf {
        std::env::var(ENV_COMMON_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| mount_dir.join("common-config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_absent() {
        let config = CommonConfig::load(Path::new("/nonexistent/common-config.json")).unwrap();
        assert_eq!(config.organization_id, "coral-user");
        assert_eq!(config.gateway_id, "coral-gateway");
    }

    #[test]
    fn loads_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("common-config.json");
        std::fs::write(
            &path,
            r#"{"organization_id": "acme", "gateway_id": "gw1", "mqtt": {"broker": "localhost", "port": 1883}}"#,
        )
        .unwrap();
        let config = CommonConfig::load(&path).unwrap();
        assert_eq!(config.organization_id, "acme");
        assert_eq!(config.mqtt.broker, "localhost");
    }
}
