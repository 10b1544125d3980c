//! Audio collaborator hooks.
//!
//! The session informs -- but does not drive -- the audio subsystem:
//! receive audio is started/stopped around session connect/disconnect,
//! and transmit audio around PTT transitions. Device enumeration, stream
//! formats, and buffering all live behind this trait; the session never
//! sees them.
//!
//! Hook failures are logged by the session and never propagated to the
//! caller of the operation that triggered them.

use async_trait::async_trait;
use flexctl_core::Result;

/// Callbacks into the audio subsystem around session lifecycle and PTT
/// transitions.
///
/// Implementations must be cheap to call from the session's operation
/// paths; anything slow (device opening, resampling setup) should be
/// deferred to a background task inside the implementation.
#[async_trait]
pub trait AudioHooks: Send + Sync {
    /// Receive audio path should start playing. Called after the session
    /// connects.
    async fn start_rx(&self) -> Result<()>;

    /// Receive audio path should stop. Called during session teardown.
    async fn stop_rx(&self) -> Result<()>;

    /// Transmit audio path should start capturing. Called after the radio
    /// confirms the transmitter is keyed.
    async fn start_tx(&self) -> Result<()>;

    /// Transmit audio path should stop capturing. Called before the
    /// unkey command is sent, so no samples flow while unkeyed.
    async fn stop_tx(&self) -> Result<()>;
}
