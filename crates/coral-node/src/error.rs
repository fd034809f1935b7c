//! Errors the node runtime itself can raise. Per-frame failures from user code never reach this
//! type — they're isolated inside the sender step (see [`crate::runtime`]).

/// Fatal errors that abort a node before (or instead of) entering its runtime loop.
#[derive(thiserror::Error, Debug)]
pub enum NodeError {
    /// Config loading, deriving, or validation failed.
    #[error(transparent)]
    Config(#[from] coral_config::ConfigError),

    /// The transport adapter rejected a registration or activation.
    #[error(transparent)]
    Transport(#[from] coral_transport::TransportError),

    /// A worker's `init()` callback failed.
    #[error("worker init failed: {0}")]
    WorkerInit(#[source] anyhow::Error),

    /// Schema registration failed.
    #[error("schema registration failed: {0}")]
    Registration(String),

    /// An environment variable required for the selected run mode was missing.
    #[error("missing required environment variable {0}")]
    MissingEnv(&'static str),
}
