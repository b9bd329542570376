//! Simulated asset loader with virtual latency and failure injection.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracecast_env::{AssetLoader, AssetRequest, EnvError, PlaybackContext};
use tracing::debug;

use crate::context::SimContext;

/// RNG stream reserved for asset loading decisions
const LOADER_STREAM: u64 = 0xA55E7;

/// Stand-in for a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimAsset {
    pub model: String,
    pub animation: Option<usize>,

    /// Virtual time the load finished at
    pub loaded_at: Duration,
}

/// Loader behaviour.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Minimum virtual time a load takes
    pub latency: Duration,

    /// Extra latency drawn uniformly from `[0, jitter]`
    pub jitter: Duration,

    /// Fraction of loads that fail, in `[0, 1]`
    pub failure_rate: f64,

    /// Models that do not exist
    pub missing_models: HashSet<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(200),
            jitter: Duration::from_millis(300),
            failure_rate: 0.0,
            missing_models: HashSet::new(),
        }
    }
}

impl LoaderConfig {
    /// Loads that finish on the next frame and never fail.
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            jitter: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Loads fake assets on the simulation clock.
///
/// Latency and failure are drawn when the load starts, from a stream derived
/// from the context seed, so the same seed always fails the same loads.
pub struct SimAssetLoader {
    ctx: Arc<SimContext>,
    config: LoaderConfig,
    rng: Mutex<ChaCha8Rng>,
}

impl SimAssetLoader {
    pub fn new(ctx: Arc<SimContext>, config: LoaderConfig) -> Self {
        let rng = Mutex::new(ctx.derive_rng(LOADER_STREAM));
        Self { ctx, config, rng }
    }

    /// Draws (latency, fails) for one load.
    fn plan(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap();
        let jitter = self.config.jitter.mul_f64(rng.gen::<f64>());
        let fails = rng.gen::<f64>() < self.config.failure_rate;
        (self.config.latency + jitter, fails)
    }
}

#[async_trait]
impl AssetLoader for SimAssetLoader {
    type Asset = SimAsset;

    async fn load(&self, request: AssetRequest) -> Result<SimAsset, EnvError> {
        let (latency, fails) = self.plan();
        self.ctx.sleep(latency).await;

        if self.config.missing_models.contains(&request.model) {
            return Err(EnvError::not_found(&request.model));
        }
        if fails {
            debug!("Injected failure loading {}", request);
            return Err(EnvError::asset_load(format!("injected failure for {}", request)));
        }

        Ok(SimAsset {
            model: request.model,
            animation: request.animation,
            loaded_at: self.ctx.now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AssetRequest {
        AssetRequest::new("person.glb", Some(3))
    }

    #[tokio::test]
    async fn test_load_completes_after_latency() {
        let ctx = SimContext::shared(1);
        let config = LoaderConfig {
            latency: Duration::from_millis(50),
            jitter: Duration::ZERO,
            ..LoaderConfig::default()
        };
        let loader = Arc::new(SimAssetLoader::new(ctx.clone(), config));

        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let task_loader = loader.clone();
        ctx.spawn("load", async move {
            let _ = tx.send(task_loader.load(request()).await);
        });

        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(rx.try_recv().is_err());

        ctx.advance_time(Duration::from_millis(50));
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        let asset = rx.try_recv().unwrap().unwrap();
        assert_eq!(asset.model, "person.glb");
        assert_eq!(asset.animation, Some(3));
        assert_eq!(asset.loaded_at, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_missing_model_fails() {
        let ctx = SimContext::shared(1);
        let mut config = LoaderConfig::instant();
        config.missing_models.insert("pin.gltf".to_string());
        let loader = SimAssetLoader::new(ctx, config);

        let err = loader.load(AssetRequest::new("pin.gltf", None)).await.unwrap_err();
        assert!(matches!(err, EnvError::AssetNotFound(_)));
        assert!(loader.load(request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_injection_is_seeded() {
        let outcomes = |seed: u64| async move {
            let config = LoaderConfig {
                failure_rate: 0.5,
                ..LoaderConfig::instant()
            };
            let loader = SimAssetLoader::new(SimContext::shared(seed), config);
            let mut failed = Vec::new();
            for _ in 0..32 {
                failed.push(loader.load(request()).await.is_err());
            }
            failed
        };

        let first = outcomes(9).await;
        assert_eq!(first, outcomes(9).await);
        assert!(first.iter().any(|f| *f));
        assert!(first.iter().any(|f| !*f));
    }
}
