//! Default node binary: wires config, the type registries, an in-process transport, and a
//! pass-through [`NodeLogic`] into a runnable process.
//!
//! Real nodes ship their own binary with their own `NodeLogic` impl built against this crate's
//! library half; this one exists so the runtime can be started and registered without any
//! business logic of its own, the same role `node2`/`node3` play for the framework it mirrors.

use async_trait::async_trait;
use coral_envelope::{Envelope, SenderResult};
use coral_node::{NodeError, NodeLogic, NodeRuntime, SenderOutcome};
use coral_telemetry::{CommonConfig, Metrics, MetricsExporter, MetricsIdentity};
use coral_transport::InProcessTransport;
use coral_types::TypeRegistry;
use std::sync::Arc;

const ENV_RUN_TYPE: &str = "CORAL_NODE_RUN_TYPE";

struct PassThroughLogic;

#[async_trait(?Send)]
impl NodeLogic for PassThroughLogic {
    type Context = ();

    async fn init(&self) -> anyhow::Result<Self::Context> {
        Ok(())
    }

    async fn sender(&self, envelope: &Envelope, _context: &mut Self::Context) -> SenderOutcome {
        let result = if envelope.has_raw() {
            SenderResult::Meta {
                record: serde_json::json!({"seen": true}),
            }
        } else {
            SenderResult::First {
                raw: coral_envelope::RawValue::Native(serde_json::Value::Null),
            }
        };
        SenderOutcome::Result(result)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = TypeRegistry::new();
    let config = coral_config::load(&registry)?;

    let run_type = std::env::var(ENV_RUN_TYPE).unwrap_or_else(|_| "run".to_owned());
    if run_type == "register" {
        if let Err(err) = coral_node::register::register(&config, &registry).await {
            tracing::error!(error = %err, "node registration failed");
            std::process::exit(1);
        }
        return Ok(());
    }

    let transport = Arc::new(InProcessTransport::new());
    let metrics = Arc::new(Metrics::new());
    let enable_metrics = config.generic.enable_metrics;
    let common_config_path = CommonConfig::resolve_path(&coral_config::mount_dir());
    let common_config = CommonConfig::load(&common_config_path).unwrap_or_else(|err| {
        tracing::warn!(path = %common_config_path.display(), error = %err, "failed to load common config, using defaults");
        CommonConfig::default()
    });
    let metrics_identity = MetricsIdentity {
        organization_id: common_config.organization_id,
        gateway_id: config.gateway_id.clone(),
        pipeline_id: config.pipeline_id.clone(),
        node_id: config.node_id.clone(),
    };
    let metrics_interval = std::time::Duration::from_secs(config.generic.metrics_interval);

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            if enable_metrics {
                let exporter = MetricsExporter::enabled(
                    metrics_identity,
                    Arc::clone(&metrics),
                    Arc::clone(&transport),
                    metrics_interval,
                );
                tokio::task::spawn_local(exporter.run());
            }
            let runtime =
                NodeRuntime::new(config, transport, Arc::new(PassThroughLogic), metrics).await?;
            runtime.run().await
        })
        .await
        .map_err(|err: NodeError| anyhow::anyhow!(err))
}
