//! Playback Driver - the entry point the host talks to.
//!
//! Holds at most one [`PlaybackSession`]. Selecting a dataset replaces the
//! session wholesale; the host's render loop calls [`PlaybackDriver::on_tick`]
//! once per frame.

use std::sync::Arc;

use tracecast_env::{AssetLoader, PlaybackContext, SessionId};
use tracing::{info, warn};

use crate::clock::PlaybackSpeed;
use crate::dataset::{Dataset, DatasetError};
use crate::keyframe::{GeoPosition, Keyframe};
use crate::projection::{AnchoredProjection, GeoProjection};
use crate::session::{PlaybackConfig, PlaybackSession, RenderSink, TickReport};
use crate::trace_index::TraceIndex;

/// Runs playback for the host: one session at a time, replaced on every
/// dataset selection.
///
/// The host calls [`PlaybackDriver::on_tick`] from its render loop. Starting
/// a new session drops the previous one, which cancels its pending asset
/// loads and discards its trace index and poses.
pub struct PlaybackDriver<Ctx, L: AssetLoader, P> {
    ctx: Arc<Ctx>,
    loader: Arc<L>,
    config: PlaybackConfig,
    last_session: SessionId,
    session: Option<PlaybackSession<L::Asset, P>>,
}

impl<Ctx, L, P> PlaybackDriver<Ctx, L, P>
where
    Ctx: PlaybackContext,
    L: AssetLoader,
    P: GeoProjection,
{
    pub fn new(ctx: Arc<Ctx>, loader: Arc<L>, config: PlaybackConfig) -> Self {
        Self {
            ctx,
            loader,
            config,
            last_session: SessionId::default(),
            session: None,
        }
    }

    /// Starts a session over `samples` with an explicit projection.
    ///
    /// Any running session is dropped first, together with its trace index,
    /// playback state and in-flight loads.
    pub fn start_with_projection(&mut self, samples: &[Keyframe], projection: P) -> SessionId {
        let index = TraceIndex::build(samples);
        self.start_index(index, projection)
    }

    fn start_index(&mut self, index: TraceIndex, projection: P) -> SessionId {
        self.stop();

        let id = self.last_session.next();
        self.last_session = id;
        self.session = Some(PlaybackSession::start(
            id,
            index,
            self.config.clone(),
            projection,
            &*self.ctx,
            self.loader.clone(),
        ));
        id
    }

    /// Drops the running session, if any.
    pub fn stop(&mut self) -> Option<SessionId> {
        let session = self.session.take()?;
        info!("Stopped {} after {} ticks", session.id(), session.ticks());
        Some(session.id())
    }

    /// Advances the running session by one host frame. `None` when idle.
    pub fn on_tick<S>(&mut self, real_delta_secs: f64, sink: &mut S) -> Option<TickReport>
    where
        S: RenderSink<L::Asset>,
    {
        let session = self.session.as_mut()?;
        Some(session.tick(real_delta_secs, sink))
    }

    pub fn session(&self) -> Option<&PlaybackSession<L::Asset, P>> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Changes the speed of the running session and of every later one.
    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.config.speed = speed;
        if let Some(session) = self.session.as_mut() {
            session.set_speed(speed);
        }
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.config.looping = looping;
    }
}

impl<Ctx, L, P> PlaybackDriver<Ctx, L, P>
where
    Ctx: PlaybackContext,
    L: AssetLoader,
    P: AnchoredProjection,
{
    /// Starts a session with the projection anchored at the samples' centroid.
    pub fn start(&mut self, samples: &[Keyframe]) -> SessionId {
        let index = TraceIndex::build(samples);
        let origin = index.centroid().unwrap_or_default();
        self.start_index(index, P::anchored_at(origin))
    }

    /// Selects dataset `key` and starts playing it.
    pub fn start_dataset(&mut self, dataset: &Dataset, key: &str) -> Result<SessionId, DatasetError> {
        let samples = dataset.get(key).map_err(|e| {
            warn!("{}", e);
            e
        })?;
        info!("Selected dataset '{}' ({} samples)", key, samples.len());
        Ok(self.start(samples))
    }

    /// Map center of the running session.
    pub fn centroid(&self) -> Option<GeoPosition> {
        self.session.as_ref()?.index().centroid()
    }
}
