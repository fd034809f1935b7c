//! The "register" run mode: instead of entering the runtime loop, derive this node's schema and
//! POST it to a registry so the gateway knows the node's shape before any pipeline references it.

use crate::error::NodeError;
use coral_config::ConfigModel;
use coral_types::TypeRegistry;

const ENV_NODE_NAME: &str = "CORAL_NODE_NAME";
const ENV_NODE_VERSION: &str = "CORAL_NODE_VERSION";
const ENV_DOCKER_IMAGE: &str = "CORAL_NODE_DOCKER_IMAGE";
const ENV_REGISTER_URL: &str = "CORAL_NODE_REGISTER_URL";

fn require_env(name: &'static str) -> Result<String, NodeError> {
    std::env::var(name).map_err(|_| NodeError::MissingEnv(name))
}

/// Builds this node's schema and registers it with the configured registry endpoint.
///
/// Posts to `{register_url}/api/v1/node/{name}/{version}`. A non-2xx response or a transport
/// failure is surfaced as [`NodeError::Registration`]; the caller is expected to exit non-zero.
pub async fn register(config: &ConfigModel, registry: &TypeRegistry) -> Result<(), NodeError> {
    let name = require_env(ENV_NODE_NAME)?;
    let version = require_env(ENV_NODE_VERSION)?;
    let image = require_env(ENV_DOCKER_IMAGE)?;
    let register_url = require_env(ENV_REGISTER_URL)?;

    let schema = coral_config::schema::build_schema(&name, config, registry);
    let body = coral_config::schema::with_image(schema, &image);

    let url = format!("{register_url}/api/v1/node/{name}/{version}");
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|err| NodeError::Registration(err.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(NodeError::Registration(format!(
            "registry responded {status}: {text}"
        )));
    }

    tracing::info!(node = %name, version = %version, url = %url, "node registered");
    Ok(())
}
