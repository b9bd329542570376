//! JSON frame exporter.
//!
//! A `RenderSink` that records what a renderer would have drawn, so runs can
//! be inspected offline or diffed across seeds.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracecast_core::{Activity, FrameInfo, RenderSink, ResolvedPose};
use tracecast_env::SessionId;

use crate::loader::SimAsset;

/// A single exported frame.
#[derive(Debug, Clone, Serialize)]
pub struct SimFrame {
    pub session: SessionId,
    pub tick: u64,

    /// Playback time the traces were sampled at, ms
    pub playback_time_ms: f64,

    pub entities: Vec<EntityPose>,
}

/// One entity as placed in the scene.
#[derive(Debug, Clone, Serialize)]
pub struct EntityPose {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,

    /// Heading about the up axis, degrees
    pub yaw_deg: f64,

    pub label: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<usize>,
    pub uncertainty: [f64; 3],
    pub activity: Activity,
}

impl EntityPose {
    pub fn new(pose: &ResolvedPose) -> Self {
        let (_, _, yaw) = pose.orientation.euler_angles();
        Self {
            id: pose.entity_id.clone(),
            x: pose.position.x,
            y: pose.position.y,
            z: pose.position.z,
            yaw_deg: yaw.to_degrees(),
            label: pose.label.clone(),
            model: pose.model.clone(),
            animation: pose.animation,
            uncertainty: [
                pose.uncertainty_scale.x,
                pose.uncertainty_scale.y,
                pose.uncertainty_scale.z,
            ],
            activity: pose.activity,
        }
    }

    fn is_finite(&self) -> bool {
        [self.x, self.y, self.z, self.yaw_deg]
            .iter()
            .chain(self.uncertainty.iter())
            .all(|v| v.is_finite())
    }
}

/// Collects frames from the playback driver.
///
/// Every pose is checked; only every `interval`-th frame is kept.
#[derive(Debug)]
pub struct FrameExporter {
    interval: u64,
    frames: Vec<SimFrame>,
    recording: bool,
    current: Option<FrameInfo>,

    /// (session, entity) pairs that received a pose
    rendered: BTreeSet<(SessionId, String)>,

    poses_seen: u64,
    non_finite_poses: u64,
}

impl FrameExporter {
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            frames: Vec::new(),
            recording: false,
            current: None,
            rendered: BTreeSet::new(),
            poses_seen: 0,
            non_finite_poses: 0,
        }
    }

    pub fn frames(&self) -> &[SimFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<SimFrame> {
        self.frames
    }

    /// Whether `entity_id` was ever drawn during `session`.
    pub fn was_rendered(&self, session: SessionId, entity_id: &str) -> bool {
        self.rendered.contains(&(session, entity_id.to_string()))
    }

    /// Entities drawn during `session`.
    pub fn rendered_in(&self, session: SessionId) -> impl Iterator<Item = &str> {
        self.rendered
            .iter()
            .filter(move |(s, _)| *s == session)
            .map(|(_, id)| id.as_str())
    }

    pub fn poses_seen(&self) -> u64 {
        self.poses_seen
    }

    pub fn non_finite_poses(&self) -> u64 {
        self.non_finite_poses
    }
}

impl RenderSink<SimAsset> for FrameExporter {
    fn begin_frame(&mut self, frame: &FrameInfo) {
        self.current = Some(*frame);
        self.recording = frame.tick.saturating_sub(1) % self.interval == 0;
        if self.recording {
            self.frames.push(SimFrame {
                session: frame.session,
                tick: frame.tick,
                playback_time_ms: frame.playback_time_ms,
                entities: Vec::new(),
            });
        }
    }

    fn apply(&mut self, _asset: &SimAsset, pose: &ResolvedPose) {
        let entity = EntityPose::new(pose);
        self.poses_seen += 1;
        if !entity.is_finite() {
            self.non_finite_poses += 1;
        }
        if let Some(frame) = self.current {
            self.rendered.insert((frame.session, pose.entity_id.clone()));
        }
        if self.recording {
            if let Some(frame) = self.frames.last_mut() {
                frame.entities.push(entity);
            }
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Scenario name, or the dataset key for file runs
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Real duration simulated, seconds
    pub duration_sec: f64,

    /// All kept frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
        }
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, frames: Vec<SimFrame>, duration_sec: f64, passed: bool) {
        self.frames = frames;
        self.duration_sec = duration_sec;
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
