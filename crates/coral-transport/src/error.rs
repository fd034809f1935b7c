//! Errors the transport adapter surfaces to the node runtime.

/// Failures a [`crate::TransportAdapter`] implementation can raise.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// `activate` was called with a mode the adapter or this handle doesn't support.
    #[error("activation mode {mode:?} is not supported for this handle")]
    UnsupportedMode {
        /// The mode that was rejected.
        mode: crate::ActivationMode,
    },

    /// A handle was used after it was never activated, or after activation failed.
    #[error("handle is not active")]
    NotActive,

    /// The underlying middleware rejected the send.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The underlying middleware rejected the subscribe/publish registration.
    #[error("registration failed: {0}")]
    RegistrationFailed(String),
}
