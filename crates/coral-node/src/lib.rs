//! The node runtime binary's library half: the receive/process/send loop, its worker pool, and
//! the schema-registration run mode. A concrete node is built by implementing [`NodeLogic`] and
//! handing it, together with a [`coral_config::ConfigModel`] and a [`coral_transport::TransportAdapter`],
//! to [`NodeRuntime::new`].

pub mod error;
pub mod frame_skip;
pub mod logic;
pub mod queue;
pub mod register;
pub mod runtime;

pub use error::NodeError;
pub use frame_skip::FrameSkipFilter;
pub use logic::{NodeLogic, SenderOutcome};
pub use queue::DroppingQueue;
pub use runtime::NodeRuntime;
