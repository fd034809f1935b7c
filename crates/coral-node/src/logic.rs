//! The user-written half of a node: `init` and `sender`, the two callbacks the runtime drives.

use async_trait::async_trait;
use coral_envelope::{Envelope, SenderResult};

/// What a `sender` callback can report back to the runtime.
pub enum SenderOutcome {
    /// A typed result ready to merge into the envelope and publish.
    Result(SenderResult),
    /// The callback asked the runtime to silently drop this frame. Distinct from any error
    /// outcome: the runtime counts neither a processed frame nor a drop-metric increment, it
    /// simply moves on.
    Ignore,
    /// The callback failed; the runtime logs and drops the frame without propagating further.
    Failed(anyhow::Error),
}

/// User-provided node behavior: how to build a worker's context, and how to turn a received
/// envelope into a contribution to merge back into it.
///
/// Implementations are expected to be cheap to clone or otherwise shareable across worker tasks;
/// `init` runs once per worker at startup, `sender` runs once per envelope that worker dequeues.
#[async_trait(?Send)]
pub trait NodeLogic {
    /// Per-worker state produced once, before the worker's first `sender` call.
    type Context;

    /// Builds this worker's context. Called exactly once per worker task.
    async fn init(&self) -> anyhow::Result<Self::Context>;

    /// Processes one envelope, producing the typed contribution the runtime merges and
    /// publishes, or one of the non-fatal outcomes in [`SenderOutcome`].
    async fn sender(&self, envelope: &Envelope, context: &mut Self::Context) -> SenderOutcome;
}
