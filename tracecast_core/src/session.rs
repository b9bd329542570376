//! Playback session - one dataset selection, from start until it is replaced.
//!
//! A session owns everything derived from the selected samples: the trace
//! index, a fresh virtual clock, the per-entity asset slots and the last
//! resolved poses. Dropping the session drops the receiving end of its asset
//! channel, which cancels every load still in flight.

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracecast_env::{AssetLoader, PlaybackContext, SessionId};
use tracing::{debug, info};

use crate::appearance::AppearanceTable;
use crate::assets::{AssetResult, AssetSlots, SlotCounts};
use crate::clock::{PlaybackSpeed, VirtualClock};
use crate::interpolator::{interpolate, TracePhase};
use crate::keyframe::Activity;
use crate::pose::{PoseResolver, ResolvedPose};
use crate::projection::GeoProjection;
use crate::trace_index::TraceIndex;

/// Which sample timestamp virtual time 0 corresponds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOrigin {
    /// Virtual time is compared with timestamps directly
    #[default]
    Absolute,
    /// Virtual time 0 is the earliest sample in the dataset
    DatasetStart,
}

/// Playback configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Virtual ms per real second
    pub speed: PlaybackSpeed,

    pub time_origin: TimeOrigin,

    /// Wrap the query time over `[origin, last sample)`. The clock itself
    /// keeps counting up.
    pub looping: bool,

    pub appearance: AppearanceTable,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: PlaybackSpeed::default(),
            time_origin: TimeOrigin::default(),
            looping: false,
            appearance: AppearanceTable::default(),
        }
    }
}

/// Per-frame timing handed to the renderer before any pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameInfo {
    pub session: SessionId,

    /// 1 for the first tick of a session
    pub tick: u64,

    /// Wall-clock seconds since the previous frame, as reported by the host
    pub real_delta_secs: f64,

    /// Clock reading after this tick
    pub virtual_time_ms: f64,

    /// Time the traces were sampled at (origin and looping applied)
    pub playback_time_ms: f64,
}

/// The rendering collaborator.
///
/// The engine never owns scene state; it pushes one pose per ready entity per
/// frame and the sink places `asset` accordingly.
pub trait RenderSink<A> {
    /// Called once per tick before any `apply`. Advance animation mixers here.
    fn begin_frame(&mut self, _frame: &FrameInfo) {}

    fn apply(&mut self, asset: &A, pose: &ResolvedPose);
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub virtual_time_ms: f64,
    pub playback_time_ms: f64,

    /// Entities a pose was emitted for
    pub rendered: usize,

    /// Entities without a ready asset
    pub skipped: usize,

    /// Asset slots that left `Pending` during this tick
    pub assets_resolved: usize,
}

#[derive(Debug, Clone)]
struct EntityState {
    /// Activity of the first-seen sample; fixes the appearance for the session
    appearance: Activity,
    last_pose: Option<ResolvedPose>,
    phase: Option<TracePhase>,
}

/// Current virtual time plus the last pose of every entity. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    virtual_time_ms: f64,
    playback_time_ms: f64,
    entities: BTreeMap<String, EntityState>,
}

impl PlaybackState {
    pub fn virtual_time_ms(&self) -> f64 {
        self.virtual_time_ms
    }

    pub fn playback_time_ms(&self) -> f64 {
        self.playback_time_ms
    }

    pub fn last_pose(&self, entity_id: &str) -> Option<&ResolvedPose> {
        self.entities.get(entity_id)?.last_pose.as_ref()
    }

    pub fn phase(&self, entity_id: &str) -> Option<TracePhase> {
        self.entities.get(entity_id)?.phase
    }

    /// Activity the entity's appearance was chosen for.
    pub fn appearance_activity(&self, entity_id: &str) -> Option<Activity> {
        self.entities.get(entity_id).map(|e| e.appearance)
    }

    /// Last known poses, in entity id order.
    pub fn poses(&self) -> impl Iterator<Item = &ResolvedPose> {
        self.entities.values().filter_map(|e| e.last_pose.as_ref())
    }
}

/// One playback of one set of samples.
pub struct PlaybackSession<A, P> {
    id: SessionId,
    index: TraceIndex,
    time_origin: TimeOrigin,
    looping: bool,
    clock: VirtualClock,
    resolver: PoseResolver<P>,
    slots: AssetSlots<A>,
    results: mpsc::UnboundedReceiver<AssetResult<A>>,
    state: PlaybackState,
    ticks: u64,
}

impl<A, P> PlaybackSession<A, P>
where
    A: Send + 'static,
    P: GeoProjection,
{
    /// Starts a session and fires one asset load per entity.
    ///
    /// Each entity's appearance comes from the activity of its first-seen
    /// sample. Loads run on `ctx` and report back over a channel owned by the
    /// session.
    pub fn start<Ctx, L>(
        id: SessionId,
        index: TraceIndex,
        config: PlaybackConfig,
        projection: P,
        ctx: &Ctx,
        loader: Arc<L>,
    ) -> Self
    where
        Ctx: PlaybackContext,
        L: AssetLoader<Asset = A>,
    {
        let (tx, results) = mpsc::unbounded_channel();
        let mut slots = AssetSlots::new();
        let mut entities = BTreeMap::new();

        for trace in index.iter() {
            let entity_id = trace.entity_id();
            let activity = trace.first_seen().activity;
            let slot = slots.register(entity_id);
            let request = config.appearance.get(activity).asset_request();

            debug!("{}: loading {} for {}", id, request, entity_id);

            let tx = tx.clone();
            let loader = loader.clone();
            let entity = entity_id.to_string();
            ctx.spawn(&format!("load {} ({})", request, entity_id), async move {
                // Dropping the session closes the channel and cancels the load
                tokio::select! {
                    result = loader.load(request) => {
                        let _ = tx.send(AssetResult { slot, result });
                    }
                    _ = tx.closed() => {
                        debug!("{}: cancelled asset load for {}", id, entity);
                    }
                }
            });

            entities.insert(
                entity_id.to_string(),
                EntityState {
                    appearance: activity,
                    last_pose: None,
                    phase: None,
                },
            );
        }

        info!(
            "Started {}: {} entities, {} samples",
            id,
            index.len(),
            index.sample_count()
        );

        Self {
            id,
            index,
            time_origin: config.time_origin,
            looping: config.looping,
            clock: VirtualClock::new(config.speed),
            resolver: PoseResolver::new(config.appearance, projection),
            slots,
            results,
            state: PlaybackState {
                entities,
                ..PlaybackState::default()
            },
            ticks: 0,
        }
    }

    /// Advances playback by one host frame and emits poses to `sink`.
    ///
    /// Entities whose asset is not ready are skipped for this frame.
    pub fn tick<S: RenderSink<A>>(&mut self, real_delta_secs: f64, sink: &mut S) -> TickReport {
        let assets_resolved = self.drain_asset_results();

        let virtual_time_ms = self.clock.tick(real_delta_secs);
        let playback_time_ms = self.playback_time(virtual_time_ms);
        self.ticks += 1;

        sink.begin_frame(&FrameInfo {
            session: self.id,
            tick: self.ticks,
            real_delta_secs,
            virtual_time_ms,
            playback_time_ms,
        });

        let mut rendered = 0;
        let mut skipped = 0;

        for trace in self.index.iter() {
            let entity_id = trace.entity_id();
            let Some(asset) = self.slots.ready(entity_id) else {
                skipped += 1;
                continue;
            };
            let Some(entity) = self.state.entities.get_mut(entity_id) else {
                continue;
            };

            let interpolated = interpolate(trace, playback_time_ms);
            let held = entity
                .last_pose
                .as_ref()
                .map(|pose| pose.orientation)
                .unwrap_or_else(UnitQuaternion::identity);

            let pose = self.resolver.resolve(
                entity_id,
                entity.appearance,
                &interpolated.sample,
                interpolated.next,
                held,
            );
            sink.apply(asset, &pose);

            entity.phase = Some(interpolated.phase);
            entity.last_pose = Some(pose);
            rendered += 1;
        }

        self.state.virtual_time_ms = virtual_time_ms;
        self.state.playback_time_ms = playback_time_ms;

        TickReport {
            tick: self.ticks,
            virtual_time_ms,
            playback_time_ms,
            rendered,
            skipped,
            assets_resolved,
        }
    }

    /// Maps a clock reading to the time the traces are sampled at.
    pub fn playback_time(&self, virtual_time_ms: f64) -> f64 {
        let Some((start, end)) = self.index.time_span() else {
            return virtual_time_ms;
        };

        let origin = match self.time_origin {
            TimeOrigin::Absolute => 0.0,
            TimeOrigin::DatasetStart => start,
        };

        let span = end - origin;
        if self.looping && span > 0.0 {
            origin + virtual_time_ms.rem_euclid(span)
        } else {
            origin + virtual_time_ms
        }
    }

    fn drain_asset_results(&mut self) -> usize {
        let mut resolved = 0;
        while let Ok(AssetResult { slot, result }) = self.results.try_recv() {
            if self.slots.resolve(slot, result) {
                resolved += 1;
            }
        }
        resolved
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn index(&self) -> &TraceIndex {
        &self.index
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn slots(&self) -> &AssetSlots<A> {
        &self.slots
    }

    pub fn asset_counts(&self) -> SlotCounts {
        self.slots.counts()
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn resolver(&self) -> &PoseResolver<P> {
        &self.resolver
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.clock.set_speed(speed);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
