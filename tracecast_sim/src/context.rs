//! Virtual host environment for deterministic playback runs.
//!
//! The harness owns the clock: it advances one frame period at a time, and
//! asset loads spawned by a session only wake once that clock has caught up
//! with their latency.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracecast_env::PlaybackContext;
use tracing::debug;

/// Mixes the master seed before combining it with a stream id
const STREAM_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// A `PlaybackContext` whose time only moves when the harness says so.
///
/// Clones share the clock and the spawn counter.
#[derive(Clone)]
pub struct SimContext {
    seed: u64,
    now_ns: Arc<AtomicU64>,
    spawned: Arc<AtomicU64>,
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            now_ns: Arc::new(AtomicU64::new(0)),
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Moves the virtual clock forward. Sleeping loads wake on their next poll.
    pub fn advance_time(&self, step: Duration) {
        let step_ns = u64::try_from(step.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .now_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |ns| Some(ns.saturating_add(step_ns)));
    }

    pub fn time_ns(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }

    /// Number of background tasks (asset loads) spawned so far.
    pub fn tasks_spawned(&self) -> u64 {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Seeded RNG for one consumer. Each stream is independent, so the loader
    /// drawing more numbers never shifts the generated traces.
    pub fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(STREAM_MIX) ^ stream)
    }
}

#[async_trait]
impl PlaybackContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        // Never advance the clock from here; wait for the harness
        let wake_at = self.now() + duration;
        while self.now() < wake_at {
            tokio::task::yield_now().await;
        }
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let n = self.spawned.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("spawn #{} at {}ms: {}", n, self.time_ns() / 1_000_000, name);
        tokio::spawn(future);
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::atomic::AtomicBool;

    async fn yield_a_few() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_clock_only_moves_when_advanced() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_millis(33));
        ctx.advance_time(Duration::from_millis(34));
        assert_eq!(ctx.now(), Duration::from_millis(67));
        assert_eq!(ctx.time_ns(), 67_000_000);
    }

    #[test]
    fn test_clones_share_the_clock() {
        let ctx = SimContext::new(42);
        let view = ctx.clone();

        ctx.advance_time(Duration::from_secs(5));
        assert_eq!(view.now(), Duration::from_secs(5));
        assert_eq!(view.seed(), 42);
    }

    #[test]
    fn test_rng_streams() {
        let a: u64 = SimContext::new(42).derive_rng(1).gen();
        let b: u64 = SimContext::new(42).derive_rng(1).gen();
        let c: u64 = SimContext::new(42).derive_rng(2).gen();
        let d: u64 = SimContext::new(43).derive_rng(1).gen();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[tokio::test]
    async fn test_sleep_waits_for_virtual_time() {
        let ctx = SimContext::shared(7);
        let woke = Arc::new(AtomicBool::new(false));

        let task_ctx = ctx.clone();
        let task_woke = woke.clone();
        ctx.spawn("sleeper", async move {
            task_ctx.sleep(Duration::from_millis(100)).await;
            task_woke.store(true, Ordering::SeqCst);
        });
        assert_eq!(ctx.tasks_spawned(), 1);

        yield_a_few().await;
        assert!(!woke.load(Ordering::SeqCst));

        ctx.advance_time(Duration::from_millis(99));
        yield_a_few().await;
        assert!(!woke.load(Ordering::SeqCst));

        ctx.advance_time(Duration::from_millis(1));
        yield_a_few().await;
        assert!(woke.load(Ordering::SeqCst));
    }
}
