//! tracecast Simulation Harness
//!
//! Plays keyframe datasets through the engine on a simulated host, with no
//! renderer and no wall clock involved.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: the host frame clock and asset latency run on one virtual clock
//! - **Assets**: loads finish after a seeded latency and fail at a seeded rate
//! - **Traces**: synthetic datasets come from seeded ground-truth movers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ScenarioRunner                         │
//! │                                                             │
//! │  TraceGenerator ──► Dataset ──► PlaybackDriver ──► FrameExporter
//! │                                     │  ▲                    │
//! │                          spawn load │  │ AssetResult        │
//! │                                     ▼  │                    │
//! │                  SimContext ◄── SimAssetLoader              │
//! │               (virtual clock)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use tracecast_sim::{ScenarioRunner, SimConfig};
//! use tracecast_sim::scenarios::ScenarioId;
//!
//! let runner = ScenarioRunner::new(SimConfig { seed: 7, ..Default::default() });
//! let outcome = runner.run(ScenarioId::Crowd)?;
//! assert!(outcome.result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod generator;
mod loader;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{EntityPose, FrameExporter, SimExport, SimFrame};
pub use generator::{activity_speed, offset, Mover, TraceGenerator};
pub use loader::{LoaderConfig, SimAsset, SimAssetLoader};
pub use runner::{RunMetrics, RunOutcome, ScenarioResult, ScenarioRunner, SimConfig};
