//! tracecast Environment Abstraction Layer
//!
//! The playback engine is single-threaded and frame-driven, but it sits between
//! two asynchronous collaborators: the host that spawns work and keeps time, and
//! the asset pipeline that fetches models. This crate abstracts both so the same
//! engine runs in production (tokio) and in the deterministic harness
//! (`tracecast_sim`).
//!
//! # Example
//!
//! ```ignore
//! use tracecast_env::{AssetLoader, AssetRequest, PlaybackContext};
//!
//! fn start_loads<Ctx: PlaybackContext, L: AssetLoader>(ctx: &Ctx, loader: Arc<L>) {
//!     let request = AssetRequest::new("person.glb", Some(3));
//!     ctx.spawn("load person.glb", async move {
//!         let _ = loader.load(request).await;
//!     });
//! }
//! ```

mod assets;
mod context;
mod error;
mod tokio_impl;
mod types;

pub use assets::AssetLoader;
pub use context::PlaybackContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
pub use types::{AssetRequest, SessionId};
