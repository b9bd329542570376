//! Production implementation of PlaybackContext using Tokio.

use crate::PlaybackContext;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Wall-clock context that runs asset loads on a Tokio runtime.
///
/// A host render loop usually lives on its own thread, outside the runtime.
/// Give such hosts a context built with [`TokioContext::with_handle`] so that
/// spawning does not depend on the calling thread.
pub struct TokioContext {
    created: Instant,
    handle: Option<Handle>,
}

impl TokioContext {
    /// Context that spawns onto the runtime of the calling thread.
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
            handle: None,
        }
    }

    /// Context that always spawns onto `handle`.
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            created: Instant::now(),
            handle: Some(handle),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlaybackContext for TokioContext {
    fn now(&self) -> Duration {
        self.created.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, _name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match &self.handle {
            Some(handle) => drop(handle.spawn(future)),
            None => drop(tokio::spawn(future)),
        }
    }

    fn seed(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_now_follows_wall_clock() {
        let ctx = TokioContext::new();
        let before = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;

        assert!(ctx.now() - before >= Duration::from_millis(10));
        assert_eq!(ctx.seed(), 0);
    }

    #[tokio::test]
    async fn test_spawn_on_current_runtime() {
        let ctx = TokioContext::new();
        let (tx, rx) = oneshot::channel();
        ctx.spawn("answer", async move {
            let _ = tx.send(42u32);
        });

        assert_eq!(rx.await.unwrap(), 42);
    }

    #[test]
    fn test_spawn_from_outside_the_runtime() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let ctx = TokioContext::with_handle(runtime.handle().clone());

        // This thread is not a runtime thread, like a host render loop
        let (tx, rx) = oneshot::channel();
        ctx.spawn("answer", async move {
            let _ = tx.send(7u32);
        });

        assert_eq!(runtime.block_on(rx).unwrap(), 7);
    }
}
