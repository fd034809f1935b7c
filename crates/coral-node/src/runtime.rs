//! The node runtime: builds receivers/sender from config, then drives the
//! receive → frame-skip → dispatch → sender → merge → publish loop.

use crate::error::NodeError;
use crate::frame_skip::FrameSkipFilter;
use crate::logic::{NodeLogic, SenderOutcome};
use crate::queue::DroppingQueue;
use coral_config::{ConfigModel, EndpointModel, Mode};
use coral_envelope::{merge_into, Envelope};
use coral_telemetry::{DropAction, Metrics};
use coral_transport::{ActivationMode, EndpointSpec, PublisherHandle, SubscriberHandle, TransportAdapter};
use std::sync::Arc;
use std::time::Instant;

fn endpoint_spec(endpoint: &EndpointModel) -> EndpointSpec {
    EndpointSpec {
        wire_type: coral_types::WireType::NativeObject,
        mware: endpoint.mware.clone(),
        class_name: endpoint.raw_type.clone(),
        topic: endpoint
            .topic
            .clone()
            .unwrap_or_else(|| endpoint.default_topic()),
        carrier: endpoint.carrier.clone(),
        blocking: endpoint.blocking,
        socket_sub_port: endpoint.socket_sub_port,
        socket_pub_port: endpoint.socket_pub_port,
        params: endpoint
            .params
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or_default()))
            .collect(),
    }
}

/// One of this node's configured input streams, or the synthetic always-idle receiver a node
/// with no receivers gets so it can still drive its main loop (this is how a head node produces
/// frames: it has nothing to subscribe to, so every iteration synthesizes an empty envelope).
enum ReceiverSlot {
    Transport(SubscriberHandle),
    Synthetic,
}

/// Everything the runtime needs that doesn't change after startup, shared between the dispatch
/// loop and every worker task.
struct Shared<L: NodeLogic, T: TransportAdapter> {
    node_id: String,
    mode: Mode,
    logic: Arc<L>,
    transport: Arc<T>,
    metrics: Arc<Metrics>,
    sender_endpoint: Option<EndpointModel>,
}

/// A configured node, ready to run.
pub struct NodeRuntime<L: NodeLogic, T: TransportAdapter> {
    config: ConfigModel,
    shared: Arc<Shared<L, T>>,
    frame_skip: Arc<FrameSkipFilter>,
    receivers: Vec<ReceiverSlot>,
}

impl<L: NodeLogic, T: TransportAdapter> NodeRuntime<L, T> {
    /// Registers and activates every configured receiver (or the synthetic fallback when there
    /// are none), per §4.5.
    pub async fn new(
        config: ConfigModel,
        transport: Arc<T>,
        logic: Arc<L>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, NodeError> {
        let verbs = config.meta.mode.verbs();
        let mut receivers = Vec::with_capacity(config.meta.receivers.len().max(1));
        for endpoint in &config.meta.receivers {
            let handle = transport.register_subscriber(endpoint_spec(endpoint)).await?;
            let activation = if verbs.receiver == "listen" {
                ActivationMode::Listen
            } else {
                ActivationMode::Request
            };
            transport.activate_subscriber(handle, activation).await?;
            receivers.push(ReceiverSlot::Transport(handle));
        }
        if receivers.is_empty() {
            tracing::warn!(node_id = %config.node_id, "no receivers configured, using synthetic idle receiver");
            receivers.push(ReceiverSlot::Synthetic);
        }

        let shared = Arc::new(Shared {
            node_id: config.node_id.clone(),
            mode: config.meta.mode,
            logic,
            transport,
            metrics,
            sender_endpoint: config.meta.sender.clone(),
        });

        let frame_skip = Arc::new(FrameSkipFilter::new(config.generic.skip_frame));

        Ok(Self {
            config,
            shared,
            frame_skip,
            receivers,
        })
    }

    /// Runs the node forever: inline on this task if `process.enable_parallel` is false,
    /// otherwise spawning `process.count` worker tasks fed by a bounded drop-oldest queue.
    pub async fn run(self) -> Result<(), NodeError> {
        if self.config.process.enable_parallel {
            self.run_parallel().await
        } else {
            self.run_inline().await
        }
    }

    async fn run_inline(self) -> Result<(), NodeError> {
        let publisher = match &self.shared.sender_endpoint {
            Some(endpoint) => Some(register_and_activate_publisher(&self.shared, endpoint).await?),
            None => None,
        };
        let mut context = self
            .shared
            .logic
            .init()
            .await
            .map_err(NodeError::WorkerInit)?;

        loop {
            for slot in &self.receivers {
                let Some(envelope) = receive_envelope(&self.shared, slot).await else {
                    tokio::task::yield_now().await;
                    continue;
                };
                if !self.admit(&envelope) {
                    tokio::task::yield_now().await;
                    continue;
                }
                process_envelope(&self.shared, envelope, &mut context, publisher).await;
                tokio::task::yield_now().await;
            }
        }
    }

    async fn run_parallel(self) -> Result<(), NodeError> {
        let queue = DroppingQueue::new(self.config.process.max_qsize);

        for worker_index in 0..self.config.process.count {
            let shared = Arc::clone(&self.shared);
            let queue = Arc::clone(&queue);
            let _handle = tokio::task::spawn_local(async move {
                if let Err(err) = worker_loop(shared, queue, worker_index).await {
                    tracing::error!(worker_index, error = %err, "worker exited with an error");
                }
            });
        }

        loop {
            for slot in &self.receivers {
                let Some(envelope) = receive_envelope(&self.shared, slot).await else {
                    tokio::task::yield_now().await;
                    continue;
                };
                if !self.admit(&envelope) {
                    tokio::task::yield_now().await;
                    continue;
                }
                if let Some(_evicted) = queue.push(envelope) {
                    self.shared.metrics.record_drop(DropAction::Full);
                }
                // `DroppingQueue::push` never yields; on a `current_thread` runtime the
                // spawn_local workers draining this queue only get scheduled if we give
                // the executor a chance between enqueues.
                tokio::task::yield_now().await;
            }
        }
    }

    fn admit(&self, envelope: &Envelope) -> bool {
        let pending = (coral_envelope::now_secs() - envelope.timestamp).max(0.0);
        self.shared
            .metrics
            .record_pending_cost(std::time::Duration::from_secs_f64(pending));
        if self.frame_skip.admit(&envelope.source_id) {
            true
        } else {
            self.shared.metrics.record_drop(DropAction::Pass);
            false
        }
    }
}

async fn register_and_activate_publisher<L: NodeLogic, T: TransportAdapter>(
    shared: &Shared<L, T>,
    endpoint: &EndpointModel,
) -> Result<PublisherHandle, NodeError> {
    let handle = shared.transport.register_publisher(endpoint_spec(endpoint)).await?;
    let verbs = shared.mode.verbs();
    let activation = if verbs.sender == "publish" {
        ActivationMode::Publish
    } else {
        ActivationMode::Reply
    };
    shared.transport.activate_publisher(handle, activation).await?;
    Ok(handle)
}

async fn receive_envelope<L: NodeLogic, T: TransportAdapter>(
    shared: &Shared<L, T>,
    slot: &ReceiverSlot,
) -> Option<Envelope> {
    match slot {
        ReceiverSlot::Synthetic => Some(Envelope::synthesize_idle(shared.node_id.clone())),
        ReceiverSlot::Transport(handle) => match shared.transport.receive(*handle).await {
            Ok(Some(value)) => match serde_json::from_value::<Envelope>(value) {
                Ok(envelope) => Some(envelope),
                Err(err) => {
                    tracing::warn!(error = %err, "received payload did not decode as an envelope");
                    None
                }
            },
            Ok(None) => Some(Envelope::synthesize_idle(shared.node_id.clone())),
            Err(err) => {
                tracing::warn!(error = %err, "receive failed, skipping this iteration");
                None
            }
        },
    }
}

async fn worker_loop<L: NodeLogic, T: TransportAdapter>(
    shared: Arc<Shared<L, T>>,
    queue: Arc<DroppingQueue<Envelope>>,
    worker_index: usize,
) -> Result<(), NodeError> {
    let mut context = shared.logic.init().await.map_err(NodeError::WorkerInit)?;
    let publisher = match &shared.sender_endpoint {
        Some(endpoint) => Some(register_and_activate_publisher(&shared, endpoint).await?),
        None => None,
    };
    tracing::debug!(worker_index, "worker started");
    loop {
        let envelope = queue.pop().await;
        process_envelope(&shared, envelope, &mut context, publisher).await;
    }
}

async fn process_envelope<L: NodeLogic, T: TransportAdapter>(
    shared: &Shared<L, T>,
    mut envelope: Envelope,
    context: &mut L::Context,
    publisher: Option<PublisherHandle>,
) {
    let started = Instant::now();
    let outcome = shared.logic.sender(&envelope, context).await;

    let result = match outcome {
        SenderOutcome::Ignore => return,
        SenderOutcome::Failed(err) => {
            tracing::error!(error = %err, "sender failed, dropping frame");
            return;
        }
        SenderOutcome::Result(result) => result,
    };

    if let Err(err) = merge_into(&mut envelope, &shared.node_id, result) {
        tracing::error!(error = %err, "envelope merge failed, dropping frame");
        return;
    }

    shared.metrics.record_process_cost(started.elapsed());
    shared.metrics.record_processed();

    let Some(publisher) = publisher else {
        return;
    };
    let payload = match serde_json::to_value(&envelope) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize envelope");
            return;
        }
    };
    if let Err(err) = shared.transport.send(publisher, payload).await {
        tracing::warn!(error = %err, "send failed, frame was processed but not delivered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coral_config::{GenericParamsModel, MetaModel, ProcessModel};
    use coral_envelope::{RawValue, SenderResult};
    use coral_transport::{ActivationMode, EndpointSpec, InProcessTransport};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn endpoint(node_id: &str, topic: &str) -> EndpointModel {
        EndpointModel {
            node_id: node_id.to_owned(),
            raw_type: "RawImage".to_owned(),
            mware: "inprocess".to_owned(),
            carrier: "memory".to_owned(),
            blocking: false,
            topic: Some(topic.to_owned()),
            socket_sub_port: 0,
            socket_pub_port: 0,
            params: HashMap::new(),
        }
    }

    fn endpoint_spec(topic: &str) -> EndpointSpec {
        EndpointSpec {
            wire_type: coral_types::WireType::NativeObject,
            mware: "inprocess".to_owned(),
            class_name: "RawImage".to_owned(),
            topic: topic.to_owned(),
            carrier: "memory".to_owned(),
            blocking: false,
            socket_sub_port: 0,
            socket_pub_port: 0,
            params: HashMap::new(),
        }
    }

    fn base_config(node_id: &str, meta: MetaModel) -> ConfigModel {
        ConfigModel {
            gateway_id: "gw".to_owned(),
            pipeline_id: "pl".to_owned(),
            node_id: node_id.to_owned(),
            process: ProcessModel::default(),
            meta,
            generic: GenericParamsModel {
                enable_metrics: false,
                ..GenericParamsModel::default()
            },
            params: None,
        }
    }

    /// Polls a non-blocking subscriber until a value shows up or the attempt budget runs out.
    async fn poll_receive<T: TransportAdapter>(
        transport: &T,
        handle: SubscriberHandle,
        attempts: usize,
    ) -> Option<serde_json::Value> {
        for _ in 0..attempts {
            if let Ok(Some(value)) = transport.receive(handle).await {
                return Some(value);
            }
            tokio::task::yield_now().await;
        }
        None
    }

    struct HeadLogic;

    #[async_trait(?Send)]
    impl NodeLogic for HeadLogic {
        type Context = ();

        async fn init(&self) -> anyhow::Result<Self::Context> {
            Ok(())
        }

        async fn sender(&self, _envelope: &Envelope, _context: &mut Self::Context) -> SenderOutcome {
            SenderOutcome::Result(SenderResult::First {
                raw: RawValue::Image {
                    width: 64,
                    height: 64,
                    channels: 3,
                    data: vec![0u8; 64 * 64 * 3],
                },
            })
        }
    }

    // S1: a headless node (no configured receivers) still drives its loop via the synthetic
    // receiver and publishes a well-formed first frame.
    #[tokio::test]
    async fn s1_head_node_produces_a_well_formed_first_frame() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(InProcessTransport::new());
                let metrics = Arc::new(Metrics::new());
                let config = base_config(
                    "cam0",
                    MetaModel {
                        mode: Mode::PubSub,
                        receivers: vec![],
                        sender: Some(endpoint("cam0", "/s1")),
                    },
                );

                let subscriber = transport
                    .register_subscriber(endpoint_spec("/s1"))
                    .await
                    .unwrap();
                transport
                    .activate_subscriber(subscriber, ActivationMode::Listen)
                    .await
                    .unwrap();

                let runtime =
                    NodeRuntime::new(config, Arc::clone(&transport), Arc::new(HeadLogic), metrics)
                        .await
                        .unwrap();
                let handle = tokio::task::spawn_local(async move { runtime.run().await });

                let value = poll_receive(transport.as_ref(), subscriber, 10_000)
                    .await
                    .expect("head node never published a frame");
                handle.abort();

                let envelope: Envelope = serde_json::from_value(value).unwrap();
                assert_eq!(envelope.source_id, "cam0");
                assert!(envelope.objects.is_none());
                assert!(envelope.metas.is_none());
                assert!(envelope.nodes_cost < 1.0);
                match envelope.raw {
                    Some(RawValue::Image {
                        width,
                        height,
                        channels,
                        ..
                    }) => assert_eq!((width, height, channels), (64, 64, 3)),
                    other => panic!("expected an image raw value, got {other:?}"),
                }
            })
            .await;
    }

    struct MetaLogic;

    #[async_trait(?Send)]
    impl NodeLogic for MetaLogic {
        type Context = ();

        async fn init(&self) -> anyhow::Result<Self::Context> {
            Ok(())
        }

        async fn sender(&self, _envelope: &Envelope, _context: &mut Self::Context) -> SenderOutcome {
            SenderOutcome::Result(SenderResult::Meta {
                record: serde_json::json!({"value": 7}),
            })
        }
    }

    // S4: a meta node receives an envelope that already has `raw` set, contributes a `metas`
    // entry under its own node id, and forwards the result.
    #[tokio::test]
    async fn s4_meta_node_writes_its_record_under_its_own_key() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(InProcessTransport::new());
                let metrics = Arc::new(Metrics::new());
                let config = base_config(
                    "yolo",
                    MetaModel {
                        mode: Mode::PubSub,
                        receivers: vec![endpoint("yolo", "/in")],
                        sender: Some(endpoint("yolo", "/out")),
                    },
                );

                let in_publisher = transport.register_publisher(endpoint_spec("/in")).await.unwrap();
                transport
                    .activate_publisher(in_publisher, ActivationMode::Publish)
                    .await
                    .unwrap();
                let out_subscriber = transport
                    .register_subscriber(endpoint_spec("/out"))
                    .await
                    .unwrap();
                transport
                    .activate_subscriber(out_subscriber, ActivationMode::Listen)
                    .await
                    .unwrap();

                let mut input = Envelope::head("cam0");
                input.raw = Some(RawValue::Native(serde_json::Value::Null));
                transport
                    .send(in_publisher, serde_json::to_value(&input).unwrap())
                    .await
                    .unwrap();

                let runtime =
                    NodeRuntime::new(config, Arc::clone(&transport), Arc::new(MetaLogic), metrics)
                        .await
                        .unwrap();
                let handle = tokio::task::spawn_local(async move { runtime.run().await });

                let value = poll_receive(transport.as_ref(), out_subscriber, 10_000)
                    .await
                    .expect("meta node never published a frame");
                handle.abort();

                let envelope: Envelope = serde_json::from_value(value).unwrap();
                let metas = envelope.metas.expect("expected a metas map");
                assert_eq!(
                    metas.get("node.yolo").unwrap(),
                    &serde_json::json!({"value": 7})
                );
            })
            .await;
    }

    struct SlowLogic {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait(?Send)]
    impl NodeLogic for SlowLogic {
        type Context = ();

        async fn init(&self) -> anyhow::Result<Self::Context> {
            Ok(())
        }

        async fn sender(&self, _envelope: &Envelope, _context: &mut Self::Context) -> SenderOutcome {
            self.calls.fetch_add(1, Ordering::Relaxed);
            tokio::time::sleep(self.delay).await;
            SenderOutcome::Result(SenderResult::First {
                raw: RawValue::Native(serde_json::Value::Null),
            })
        }
    }

    // S6: a headless, parallel-mode node with a tiny queue and a slow worker evicts the oldest
    // queued frame on overflow rather than blocking the dispatch loop or rejecting the newest one.
    #[tokio::test]
    async fn s6_overflow_evicts_oldest_and_counts_a_full_drop() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(InProcessTransport::new());
                let metrics = Arc::new(Metrics::new());
                let mut config = base_config(
                    "cam0",
                    MetaModel {
                        mode: Mode::PubSub,
                        receivers: vec![],
                        sender: None,
                    },
                );
                config.process = ProcessModel {
                    max_qsize: 1,
                    count: 1,
                    enable_parallel: true,
                };

                let calls = Arc::new(AtomicUsize::new(0));
                let logic = Arc::new(SlowLogic {
                    delay: Duration::from_millis(20),
                    calls: Arc::clone(&calls),
                });

                let runtime = NodeRuntime::new(config, Arc::clone(&transport), logic, metrics.clone())
                    .await
                    .unwrap();
                let handle = tokio::task::spawn_local(async move { runtime.run().await });

                tokio::time::sleep(Duration::from_millis(200)).await;
                handle.abort();

                let snapshot = metrics.snapshot_and_reset_counters();
                assert!(
                    snapshot.drop_frames_full > 0,
                    "expected at least one full-queue eviction, got {snapshot:?}"
                );
                assert!(calls.load(Ordering::Relaxed) >= 1, "worker never ran");
            })
            .await;
    }

    // S7: a node with zero configured receivers is given the synthetic always-idle receiver, so
    // its dispatch loop keeps driving `sender` forward without ever touching the transport.
    #[tokio::test]
    async fn s7_headless_node_drives_its_loop_via_the_synthetic_receiver() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let transport = Arc::new(InProcessTransport::new());
                let metrics = Arc::new(Metrics::new());
                let config = base_config(
                    "cam0",
                    MetaModel {
                        mode: Mode::PubSub,
                        receivers: vec![],
                        sender: None,
                    },
                );

                let calls = Arc::new(AtomicUsize::new(0));
                let logic = Arc::new(SlowLogic {
                    delay: Duration::from_millis(0),
                    calls: Arc::clone(&calls),
                });

                let runtime = NodeRuntime::new(config, transport, logic, metrics)
                    .await
                    .unwrap();
                let handle = tokio::task::spawn_local(async move { runtime.run().await });

                tokio::time::sleep(Duration::from_millis(50)).await;
                handle.abort();

                assert!(
                    calls.load(Ordering::Relaxed) > 1,
                    "expected the headless dispatch loop to invoke sender repeatedly"
                );
            })
            .await;
    }
}
