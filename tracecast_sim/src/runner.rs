//! Scenario runner - plays datasets through the engine on a simulated host.
//!
//! The host is a fixed-rate render loop: every frame the virtual clock of the
//! `SimContext` moves by one frame period, pending asset loads get a chance to
//! run, and the driver ticks once. Everything runs on a current-thread Tokio
//! runtime, so a seed fully determines the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracecast_core::{
    AssetSlot, Dataset, EquirectangularProjection, PlaybackConfig, PlaybackDriver, PlaybackSpeed,
    TickReport, TimeOrigin,
};
use tracecast_env::SessionId;
use tracing::{debug, info, warn};

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{FrameExporter, SimExport};
use crate::loader::{LoaderConfig, SimAssetLoader};
use crate::scenarios::{ScenarioId, ScenarioSetup};

/// Yields per frame so that spawned loads can observe the new time
const SETTLE_YIELDS: usize = 8;

type SimDriver = PlaybackDriver<SimContext, SimAssetLoader, EquirectangularProjection>;

/// Harness configuration, filled from the CLI.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Host frame rate
    pub fps: u32,

    /// Real seconds to simulate
    pub duration_secs: f64,

    pub speed: PlaybackSpeed,
    pub looping: bool,

    /// Keep every n-th frame in the export
    pub export_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            fps: 30,
            duration_secs: 10.0,
            speed: PlaybackSpeed::Replay,
            looping: false,
            export_interval: 10,
        }
    }
}

/// Counters collected while playing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    pub sessions_started: u64,

    /// Asset loads spawned across all sessions
    pub loads_spawned: u64,

    pub poses_emitted: u64,

    /// Entity-frames skipped for lack of a ready asset
    pub skipped_entity_frames: u64,

    pub assets_ready: usize,
    pub assets_failed: usize,
    pub assets_pending: usize,
}

impl RunMetrics {
    fn record(&mut self, report: &TickReport) {
        self.poses_emitted += report.rendered as u64;
        self.skipped_entity_frames += report.skipped as u64;
    }
}

/// Results from one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name, or the dataset key for file runs
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether the run passed all checks
    pub passed: bool,

    /// Total frames executed
    pub total_ticks: u64,

    /// Virtual clock at the end, ms
    pub final_virtual_ms: f64,

    pub metrics: RunMetrics,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// A result plus the frames recorded while producing it.
pub struct RunOutcome {
    pub result: ScenarioResult,
    pub export: SimExport,
}

/// Runs scenarios and datasets.
pub struct ScenarioRunner {
    config: SimConfig,
}

impl ScenarioRunner {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs a built-in scenario.
    pub fn run(&self, scenario: ScenarioId) -> Result<RunOutcome, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.config.seed);
        self.play(scenario.name(), scenario.setup(self.config.seed))
    }

    /// Plays dataset `key` with instant asset loads.
    pub fn run_dataset(&self, dataset: &Dataset, key: &str) -> Result<RunOutcome, SimError> {
        info!("Playing dataset '{}' (seed={})", key, self.config.seed);
        let setup = ScenarioSetup {
            dataset: dataset.clone(),
            playlist: vec![key.to_string()],
            switch_every: None,
            loader: LoaderConfig::instant(),
        };
        self.play(key, setup)
    }

    fn play(&self, name: &str, setup: ScenarioSetup) -> Result<RunOutcome, SimError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        runtime.block_on(self.play_async(name, setup))
    }

    fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            speed: self.config.speed,
            time_origin: TimeOrigin::DatasetStart,
            looping: self.config.looping,
            ..PlaybackConfig::default()
        }
    }

    async fn play_async(&self, name: &str, setup: ScenarioSetup) -> Result<RunOutcome, SimError> {
        let ctx = SimContext::shared(self.config.seed);
        let loader = Arc::new(SimAssetLoader::new(ctx.clone(), setup.loader.clone()));
        let mut driver: SimDriver = PlaybackDriver::new(ctx.clone(), loader, self.playback_config());
        let mut exporter = FrameExporter::new(self.config.export_interval);
        let mut metrics = RunMetrics::default();

        let mut playlist = setup.playlist.iter();
        let first = playlist.next().ok_or(SimError::EmptyPlaylist)?;
        let mut sessions = vec![(driver.start_dataset(&setup.dataset, first)?, first.clone())];

        let fps = self.config.fps.max(1);
        let dt = 1.0 / fps as f64;
        let target_ticks = (self.config.duration_secs.max(0.0) * fps as f64).round() as u64;
        let switch_ticks = setup
            .switch_every
            .map(|every| ((every.as_secs_f64() * fps as f64).round() as u64).max(1));

        for tick in 1..=target_ticks {
            if switch_ticks.map_or(false, |every| tick % every == 0) {
                if let Some(key) = playlist.next() {
                    sessions.push((driver.start_dataset(&setup.dataset, key)?, key.clone()));
                }
            }

            ctx.advance_time(Duration::from_secs_f64(dt));
            settle().await;

            if let Some(report) = driver.on_tick(dt, &mut exporter) {
                metrics.record(&report);
            }

            if tick % fps as u64 == 0 {
                if let Some(session) = driver.session() {
                    let counts = session.asset_counts();
                    debug!(
                        "  t={:.1}s | {} | virtual={:.0}ms | ready={} pending={} failed={}",
                        tick as f64 * dt,
                        session.id(),
                        session.state().virtual_time_ms(),
                        counts.ready,
                        counts.pending,
                        counts.failed
                    );
                }
            }
        }

        metrics.sessions_started = sessions.len() as u64;
        metrics.loads_spawned = ctx.tasks_spawned();
        let (final_virtual_ms, failure_reason) = match driver.session() {
            Some(session) => {
                let counts = session.asset_counts();
                metrics.assets_ready = counts.ready;
                metrics.assets_failed = counts.failed;
                metrics.assets_pending = counts.pending;
                (
                    session.clock().now_ms(),
                    check_run(&driver, &exporter, &sessions, &setup.dataset),
                )
            }
            None => (0.0, Some("No session running at the end of the run".to_string())),
        };

        let passed = failure_reason.is_none();
        if let Some(reason) = &failure_reason {
            warn!("{} failed: {}", name, reason);
        }

        let result = ScenarioResult {
            scenario: name.to_string(),
            seed: self.config.seed,
            passed,
            total_ticks: target_ticks,
            final_virtual_ms,
            metrics,
            failure_reason,
        };

        let mut export = SimExport::new(name, self.config.seed);
        export.finalize(exporter.into_frames(), target_ticks as f64 * dt, passed);

        Ok(RunOutcome { result, export })
    }
}

/// Lets spawned loads run against the current virtual time.
async fn settle() {
    for _ in 0..SETTLE_YIELDS {
        tokio::task::yield_now().await;
    }
}

/// Checks the invariants every run must hold. Returns the first violation.
fn check_run(
    driver: &SimDriver,
    exporter: &FrameExporter,
    sessions: &[(SessionId, String)],
    dataset: &Dataset,
) -> Option<String> {
    if exporter.non_finite_poses() > 0 {
        return Some(format!("{} poses had non-finite components", exporter.non_finite_poses()));
    }

    // No entity of one dataset is ever drawn during another's session
    for (session, key) in sessions {
        let ids: HashSet<&str> = match dataset.get(key) {
            Ok(samples) => samples.iter().map(|s| s.entity_id.as_str()).collect(),
            Err(e) => return Some(e.to_string()),
        };
        if let Some(stray) = exporter.rendered_in(*session).find(|id| !ids.contains(id)) {
            return Some(format!("{} drew '{}' from another dataset", session, stray));
        }
    }

    let session = driver.session()?;
    for entity_id in session.index().entity_ids() {
        let drawn = exporter.was_rendered(session.id(), entity_id);
        match session.slots().get(entity_id) {
            Some(AssetSlot::Failed(_)) if drawn => {
                return Some(format!("'{}' was drawn without an asset", entity_id));
            }
            Some(AssetSlot::Ready(_)) if !drawn => {
                return Some(format!("'{}' had an asset but was never drawn", entity_id));
            }
            _ => {}
        }
    }
    None
}
