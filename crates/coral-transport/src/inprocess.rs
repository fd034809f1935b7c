//! An in-process transport adapter: topics are `flume` channels keyed by topic name, shared by
//! every handle registered against them. Useful for tests and for running a whole pipeline inside
//! one process without a real middleware.

use crate::adapter::{
    ActivationMode, EndpointSpec, PublisherHandle, SubscriberHandle, TransportAdapter,
    NO_RECEIVER_SENTINEL,
};
use crate::error::TransportError;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

struct Topic {
    sender: flume::Sender<Value>,
    receiver: flume::Receiver<Value>,
}

/// An in-process, channel-backed [`TransportAdapter`].
///
/// Every publisher and subscriber registered against the same topic name shares one unbounded
/// `flume` channel; `blocking` on the spec controls whether `receive` awaits the channel or polls
/// it once and returns `Ok(None)` when empty.
#[derive(Default)]
pub struct InProcessTransport {
    topics: DashMap<String, Topic>,
    publishers: DashMap<u64, (String, RwLock<bool>)>,
    subscribers: DashMap<u64, (String, bool, RwLock<bool>)>,
    next_handle: AtomicU64,
}

impl InProcessTransport {
    /// Creates an adapter with no registered topics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn topic_channel(&self, name: &str) -> (flume::Sender<Value>, flume::Receiver<Value>) {
        let entry = self.topics.entry(name.to_owned()).or_insert_with(|| {
            let (sender, receiver) = flume::unbounded();
            Topic { sender, receiver }
        });
        (entry.sender.clone(), entry.receiver.clone())
    }

    fn next_id(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait::async_trait(?Send)]
impl TransportAdapter for InProcessTransport {
    async fn register_publisher(
        &self,
        spec: EndpointSpec,
    ) -> Result<PublisherHandle, TransportError> {
        let _ = self.topic_channel(&spec.topic);
        let id = self.next_id();
        let _ = self
            .publishers
            .insert(id, (spec.topic, RwLock::new(false)));
        Ok(PublisherHandle(id))
    }

    async fn register_subscriber(
        &self,
        spec: EndpointSpec,
    ) -> Result<SubscriberHandle, TransportError> {
        let _ = self.topic_channel(&spec.topic);
        let id = self.next_id();
        let _ = self.subscribers.insert(
            id,
            (spec.topic, spec.blocking, RwLock::new(false)),
        );
        Ok(SubscriberHandle(id))
    }

    async fn activate_publisher(
        &self,
        handle: PublisherHandle,
        mode: ActivationMode,
    ) -> Result<(), TransportError> {
        if !matches!(mode, ActivationMode::Publish | ActivationMode::Reply) {
            return Err(TransportError::UnsupportedMode { mode });
        }
        let entry = self
            .publishers
            .get(&handle.0)
            .ok_or(TransportError::NotActive)?;
        *entry.1.write().expect("lock poisoned") = true;
        Ok(())
    }

    async fn activate_subscriber(
        &self,
        handle: SubscriberHandle,
        mode: ActivationMode,
    ) -> Result<(), TransportError> {
        if !matches!(mode, ActivationMode::Listen | ActivationMode::Request) {
            return Err(TransportError::UnsupportedMode { mode });
        }
        let entry = self
            .subscribers
            .get(&handle.0)
            .ok_or(TransportError::NotActive)?;
        *entry.2.write().expect("lock poisoned") = true;
        Ok(())
    }

    async fn send(&self, handle: PublisherHandle, payload: Value) -> Result<(), TransportError> {
        let entry = self
            .publishers
            .get(&handle.0)
            .ok_or(TransportError::NotActive)?;
        if !*entry.1.read().expect("lock poisoned") {
            return Err(TransportError::NotActive);
        }
        let (sender, _) = self.topic_channel(&entry.0);
        sender
            .send(payload)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn receive(&self, handle: SubscriberHandle) -> Result<Option<Value>, TransportError> {
        let entry = self
            .subscribers
            .get(&handle.0)
            .ok_or(TransportError::NotActive)?;
        if !*entry.2.read().expect("lock poisoned") {
            return Err(TransportError::NotActive);
        }
        let (_, receiver) = self.topic_channel(&entry.0);
        if entry.1 {
            receiver
                .recv_async()
                .await
                .map(Some)
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        } else {
            match receiver.try_recv() {
                Ok(value) => Ok(Some(value)),
                Err(flume::TryRecvError::Empty) => {
                    tracing::trace!(sentinel = NO_RECEIVER_SENTINEL, "no message waiting");
                    Ok(None)
                }
                Err(flume::TryRecvError::Disconnected) => {
                    tracing::trace!(sentinel = NO_RECEIVER_SENTINEL, "topic disconnected");
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn spec(topic: &str, blocking: bool) -> EndpointSpec {
        EndpointSpec {
            wire_type: coral_types::WireType::NativeObject,
            mware: "inprocess".to_owned(),
            class_name: "Test".to_owned(),
            topic: topic.to_owned(),
            carrier: "memory".to_owned(),
            blocking,
            socket_sub_port: 0,
            socket_pub_port: 0,
            params: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn publish_then_receive_round_trips() {
        let transport = InProcessTransport::new();
        let publisher = transport.register_publisher(spec("/t", false)).await.unwrap();
        let subscriber = transport
            .register_subscriber(spec("/t", false))
            .await
            .unwrap();
        transport
            .activate_publisher(publisher, ActivationMode::Publish)
            .await
            .unwrap();
        transport
            .activate_subscriber(subscriber, ActivationMode::Listen)
            .await
            .unwrap();

        transport
            .send(publisher, serde_json::json!({"x": 1}))
            .await
            .unwrap();
        let received = transport.receive(subscriber).await.unwrap();
        assert_eq!(received, Some(serde_json::json!({"x": 1})));
    }

    #[tokio::test]
    async fn non_blocking_receive_returns_none_when_empty() {
        let transport = InProcessTransport::new();
        let subscriber = transport
            .register_subscriber(spec("/empty", false))
            .await
            .unwrap();
        transport
            .activate_subscriber(subscriber, ActivationMode::Listen)
            .await
            .unwrap();
        assert_eq!(transport.receive(subscriber).await.unwrap(), None);
    }

    #[tokio::test]
    async fn send_before_activation_fails() {
        let transport = InProcessTransport::new();
        let publisher = transport.register_publisher(spec("/t", false)).await.unwrap();
        let err = transport
            .send(publisher, serde_json::json!(null))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotActive));
    }
}
