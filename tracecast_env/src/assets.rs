//! Asset loading abstraction.

use async_trait::async_trait;

use crate::error::EnvError;
use crate::types::AssetRequest;

/// Loads renderable assets (a model plus an optional animation clip).
///
/// The engine treats `Asset` as opaque. It only cares whether a load finished,
/// failed, or is still in flight, and hands the finished value back to the
/// rendering collaborator alongside every pose of that entity.
///
/// # Implementations
///
/// - **Production**: wraps the renderer's glTF loader
/// - **Simulation**: `SimAssetLoader` with virtual latency and failure injection
///
/// ```text
/// Session                      Loader                     Renderer
///   |-- spawn(load(req)) ------->|                           |
///   |   (entity slot: Pending)   |-- fetch/decode ---------->|
///   |<--- Ok(asset) / Err -------|                           |
///   |   (slot: Ready / Failed)   |                           |
/// ```
#[async_trait]
pub trait AssetLoader: Send + Sync + 'static {
    /// Handle to a loaded asset, owned by the session once ready.
    type Asset: Send + 'static;

    /// Loads the model named in `request`, starting its animation clip if one
    /// is requested.
    ///
    /// # Returns
    /// * `Ok(asset)` - The asset is ready to be placed in the scene
    /// * `Err(EnvError::AssetNotFound)` - No model with that name exists
    /// * `Err(EnvError::AssetLoadFailed)` - Fetching or decoding failed
    async fn load(&self, request: AssetRequest) -> Result<Self::Asset, EnvError>;
}
