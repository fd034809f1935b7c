//! The [`TransportAdapter`] trait: the only surface the node runtime depends on to talk to the
//! underlying pub/sub middleware (ZeroMQ, ROS, or anything else an adapter wraps).

use crate::error::TransportError;
use async_trait::async_trait;
use coral_types::WireType;
use serde_json::Value;
use std::collections::HashMap;

/// Sentinel `receive` returns for a non-blocking handle with nothing waiting.
///
/// Spelling preserved from the original implementation this runtime is compatible with.
pub const NO_RECEIVER_SENTINEL: &str = "#no_recevier#";

/// The activation verb a registered handle is driven with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// Fire-and-forget publish side of pubsub mode.
    Publish,
    /// Fire-and-forget subscribe side of pubsub mode.
    Listen,
    /// Reply side of request/reply mode.
    Reply,
    /// Request side of request/reply mode.
    Request,
}

/// Opaque handle to a registered publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherHandle(pub u64);

/// Opaque handle to a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberHandle(pub u64);

/// Parameters shared by `register_publisher` and `register_subscriber`.
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    /// Transport-level wire type this endpoint carries.
    pub wire_type: WireType,
    /// Middleware backend name (e.g. `"zeromq"`).
    pub mware: String,
    /// Name of the registered data/payload class, used by adapters that need it for framing.
    pub class_name: String,
    /// Topic name.
    pub topic: String,
    /// Transport carrier (e.g. `"tcp"`).
    pub carrier: String,
    /// Whether this endpoint blocks on receive.
    pub blocking: bool,
    /// Subscribe-side ephemeral port.
    pub socket_sub_port: u16,
    /// Publish-side ephemeral port.
    pub socket_pub_port: u16,
    /// Adapter-specific extra parameters.
    pub params: HashMap<String, Value>,
}

/// Abstracts the pub/sub middleware a node runs over.
///
/// The runtime never constructs wire bytes itself: it registers publisher/subscriber handles
/// against an `EndpointSpec`, activates them for a [`ActivationMode`], and exchanges payloads as
/// plain JSON values. An implementation owns whatever socket, thread, or client state the real
/// middleware needs; this crate only ships the trait plus an in-process adapter for tests.
#[async_trait(?Send)]
pub trait TransportAdapter {
    /// Registers a publisher for `spec`, returning a handle to drive it with `send`.
    async fn register_publisher(
        &self,
        spec: EndpointSpec,
    ) -> Result<PublisherHandle, TransportError>;

    /// Registers a subscriber for `spec`, returning a handle to drive it with `receive`.
    async fn register_subscriber(
        &self,
        spec: EndpointSpec,
    ) -> Result<SubscriberHandle, TransportError>;

    /// Activates a previously registered publisher handle for `mode`.
    async fn activate_publisher(
        &self,
        handle: PublisherHandle,
        mode: ActivationMode,
    ) -> Result<(), TransportError>;

    /// Activates a previously registered subscriber handle for `mode`.
    async fn activate_subscriber(
        &self,
        handle: SubscriberHandle,
        mode: ActivationMode,
    ) -> Result<(), TransportError>;

    /// Sends `payload` over an activated publisher handle.
    async fn send(&self, handle: PublisherHandle, payload: Value) -> Result<(), TransportError>;

    /// Receives the next payload on an activated subscriber handle.
    ///
    /// Returns `Ok(None)` when the handle is non-blocking and nothing is waiting (the transport's
    /// [`NO_RECEIVER_SENTINEL`] condition) — callers never see the sentinel string itself.
    async fn receive(&self, handle: SubscriberHandle) -> Result<Option<Value>, TransportError>;
}
