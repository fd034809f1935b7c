//! Loads a [`ConfigModel`] from the environment: base64-encoded inline data takes priority over
//! an on-disk file, and the file's extension (`.json` or `.xml`) selects the format.

use crate::error::ConfigError;
use crate::model::ConfigModel;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::Path;

/// Environment variable naming a base64-encoded config document; highest priority.
pub const ENV_BASE64_DATA: &str = "CORAL_NODE_BASE64_DATA";
/// Environment variable naming a config file path.
pub const ENV_CONFIG_PATH: &str = "CORAL_NODE_CONFIG_PATH";

/// Parses `text` as JSON into a [`ConfigModel`].
pub fn parse_json(text: &str) -> Result<ConfigModel, ConfigError> {
    serde_json::from_str(text).map_err(ConfigError::from)
}

/// Parses `text` as XML into a [`ConfigModel`].
pub fn parse_xml(text: &str) -> Result<ConfigModel, ConfigError> {
    quick_xml::de::from_str(text).map_err(ConfigError::from)
}

/// Parses `text` using the format implied by `path`'s extension (`.json` or `.xml`).
pub fn parse_by_extension(path: &Path, text: &str) -> Result<ConfigModel, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(text),
        Some("xml") => parse_xml(text),
        other => Err(ConfigError::UnsupportedExtension(
            other.unwrap_or_default().to_owned(),
        )),
    }
}

/// Loads the config document the environment points to.
///
/// Priority: `CORAL_NODE_BASE64_DATA` (decoded, then parsed as JSON) beats
/// `CORAL_NODE_CONFIG_PATH` (read from disk, format chosen by extension). If neither is set,
/// returns [`ConfigError::NoSource`].
pub fn load_from_env() -> Result<ConfigModel, ConfigError> {
    if let Ok(encoded) = std::env::var(ENV_BASE64_DATA) {
        let decoded = BASE64.decode(encoded.trim())?;
        let text = String::from_utf8_lossy(&decoded);
        return parse_json(&text);
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return load_from_path(Path::new(&path));
    }

    Err(ConfigError::NoSource)
}

/// Reads and parses the config document at `path`, selecting the format from its extension.
pub fn load_from_path(path: &Path) -> Result<ConfigModel, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_by_extension(path, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_JSON: &str = r#"{
        "node_id": "node1",
        "meta": {
            "mode": "pubsub",
            "receivers": [],
            "sender": {
                "node_id": "node1",
                "raw_type": "RawImage"
            }
        }
    }"#;

    #[test]
    fn parses_minimal_json_document() {
        let config = parse_json(SAMPLE_JSON).unwrap();
        assert_eq!(config.node_id, "node1");
        assert_eq!(config.gateway_id, "default_gateway");
        assert_eq!(config.process.max_qsize, 30);
        assert!(config.meta.sender.is_some());
    }

    #[test]
    fn base64_env_beats_path_env() {
        let encoded = BASE64.encode(SAMPLE_JSON);
        // Safety net for test isolation: set both, confirm base64 wins.
        std::env::set_var(ENV_BASE64_DATA, &encoded);
        std::env::set_var(ENV_CONFIG_PATH, "/nonexistent/path.json");
        let config = load_from_env().unwrap();
        assert_eq!(config.node_id, "node1");
        std::env::remove_var(ENV_BASE64_DATA);
        std::env::remove_var(ENV_CONFIG_PATH);
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = parse_by_extension(Path::new("config.yaml"), "").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedExtension(_)));
    }
}
