//! Playback scenarios for the simulation harness.

use std::time::Duration;

use tracecast_core::keyframe::{Activity, GeoPosition, ANONYMOUS_ID};
use tracecast_core::Dataset;

use crate::generator::TraceGenerator;
use crate::loader::LoaderConfig;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// One walker, instant assets
    SingleWalker,

    /// Many entities with overlapping timestamps
    Crowd,

    /// Entities that change activity mid-trace, plus an anonymous one
    MixedActivities,

    /// Slow loads and a share of failures
    FlakyAssets,

    /// Switches datasets while loads are still in flight
    DatasetSwitch,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleWalker,
            ScenarioId::Crowd,
            ScenarioId::MixedActivities,
            ScenarioId::FlakyAssets,
            ScenarioId::DatasetSwitch,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleWalker => "single_walker",
            ScenarioId::Crowd => "crowd",
            ScenarioId::MixedActivities => "mixed_activities",
            ScenarioId::FlakyAssets => "flaky_assets",
            ScenarioId::DatasetSwitch => "dataset_switch",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleWalker => "One walking entity, assets load on the first frame",
            ScenarioId::Crowd => "40 entities of every activity sampled over the same minutes",
            ScenarioId::MixedActivities => "Activities change mid-trace; appearance stays first-seen",
            ScenarioId::FlakyAssets => "Slow asset loads, 30% injected failures and a missing model",
            ScenarioId::DatasetSwitch => "Switch to a second dataset before the first finished loading",
        }
    }

    /// One line per scenario: name and description, for CLI help.
    pub fn catalog() -> String {
        ScenarioId::all()
            .iter()
            .map(|s| format!("  {:<18} {}", s.name(), s.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Builds the dataset and loader setup for this scenario.
    pub fn setup(&self, seed: u64) -> ScenarioSetup {
        let origin = GeoPosition::new(43.238, 76.945, 0.0);
        // Recordings carry epoch milliseconds
        let start_ms = 1_700_000_000_000.0;
        let generator = TraceGenerator::new(seed, origin, start_ms);

        match self {
            ScenarioId::SingleWalker => {
                let mut generator = generator;
                generator.spawn("A1", Activity::Walking, 20.0).floor = Some(2);
                ScenarioSetup::single(generator.generate(120_000.0), LoaderConfig::instant())
            }
            ScenarioId::Crowd => {
                let mut generator = generator;
                for i in 0..40 {
                    let activity = Activity::ALL[i % Activity::ALL.len()];
                    generator.spawn(&format!("dev{}", i), activity, 300.0);
                }
                ScenarioSetup::single(generator.generate(180_000.0), LoaderConfig::default())
            }
            ScenarioId::MixedActivities => {
                let mut generator = generator.with_sample_interval(400.0, 6_000.0);
                for (i, activity) in Activity::ALL.into_iter().enumerate() {
                    generator.spawn(&format!("m{}", i), activity, 100.0).changes_activity = true;
                }
                generator.spawn(ANONYMOUS_ID, Activity::Unknown, 100.0).floor = Some(3);
                ScenarioSetup::single(generator.generate(120_000.0), LoaderConfig::default())
            }
            ScenarioId::FlakyAssets => {
                let mut generator = generator;
                for i in 0..12 {
                    let activity = Activity::ALL[i % Activity::ALL.len()];
                    generator.spawn(&format!("f{}", i), activity, 150.0);
                }
                let mut loader = LoaderConfig {
                    latency: Duration::from_millis(500),
                    jitter: Duration::from_secs(2),
                    failure_rate: 0.3,
                    ..LoaderConfig::default()
                };
                loader.missing_models.insert("pin.gltf".to_string());
                ScenarioSetup::single(generator.generate(120_000.0), loader)
            }
            ScenarioId::DatasetSwitch => {
                let mut first = generator;
                for i in 0..5 {
                    first.spawn(&format!("a{}", i), Activity::Walking, 100.0);
                }
                let mut second = TraceGenerator::new(seed ^ 0x5EED, origin, start_ms);
                for i in 0..5 {
                    second.spawn(&format!("b{}", i), Activity::Driving, 400.0);
                }

                let mut dataset = Dataset::new();
                dataset.insert("morning", first.generate(120_000.0));
                dataset.insert("evening", second.generate(120_000.0));

                ScenarioSetup {
                    dataset,
                    playlist: vec!["morning".to_string(), "evening".to_string()],
                    switch_every: Some(Duration::from_millis(300)),
                    loader: LoaderConfig {
                        latency: Duration::from_millis(400),
                        jitter: Duration::ZERO,
                        ..LoaderConfig::default()
                    },
                }
            }
        }
    }
}

/// Everything a scenario run needs.
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub dataset: Dataset,

    /// Dataset keys to play, in order
    pub playlist: Vec<String>,

    /// Real time after which the next playlist entry starts
    pub switch_every: Option<Duration>,

    pub loader: LoaderConfig,
}

impl ScenarioSetup {
    fn single(samples: Vec<tracecast_core::Keyframe>, loader: LoaderConfig) -> Self {
        let mut dataset = Dataset::new();
        dataset.insert(tracecast_core::dataset::DEFAULT_KEY, samples);
        Self {
            dataset,
            playlist: vec![tracecast_core::dataset::DEFAULT_KEY.to_string()],
            switch_every: None,
            loader,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_walker" | "singlewalker" | "walker" => Ok(ScenarioId::SingleWalker),
            "crowd" => Ok(ScenarioId::Crowd),
            "mixed_activities" | "mixedactivities" | "mixed" => Ok(ScenarioId::MixedActivities),
            "flaky_assets" | "flakyassets" | "flaky" => Ok(ScenarioId::FlakyAssets),
            "dataset_switch" | "datasetswitch" | "switch" => Ok(ScenarioId::DatasetSwitch),
            _ => {
                let names: Vec<&str> = ScenarioId::all().iter().map(ScenarioId::name).collect();
                Err(format!("Unknown scenario: {} (available: {}, all)", s, names.join(", ")))
            }
        }
    }
}
