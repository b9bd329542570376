//! Core environment context trait for tracecast sessions.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// The host environment a playback session runs in.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and `tokio::spawn`
/// - **Simulation**: `SimContext` (in `tracecast_sim`) - a manually advanced
///   virtual clock with a seeded RNG
#[async_trait]
pub trait PlaybackContext: Send + Sync + 'static {
    /// Returns the monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    async fn sleep(&self, duration: Duration);

    /// Spawns a fire-and-forget background task.
    ///
    /// Asset loads are started through this. The session never awaits the
    /// returned work directly; results come back over a channel.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    fn seed(&self) -> u64;
}
