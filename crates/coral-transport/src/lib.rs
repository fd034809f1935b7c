//! The transport adapter boundary: the node runtime depends only on [`TransportAdapter`], never
//! on a concrete pub/sub middleware.

pub mod adapter;
pub mod error;
pub mod inprocess;

pub use adapter::{
    ActivationMode, EndpointSpec, PublisherHandle, SubscriberHandle, TransportAdapter,
    NO_RECEIVER_SENTINEL,
};
pub use error::TransportError;
pub use inprocess::InProcessTransport;
