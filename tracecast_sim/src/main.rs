//! tracecast Simulator CLI
//!
//! Play a recorded dataset or a built-in scenario headlessly.

use std::path::PathBuf;

use clap::Parser;
use tracecast_core::{Dataset, PlaybackSpeed};
use tracecast_sim::scenarios::ScenarioId;
use tracecast_sim::{RunOutcome, ScenarioResult, ScenarioRunner, SimConfig, SimError};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// tracecast headless playback CLI
#[derive(Parser, Debug)]
#[command(name = "tracecast-sim")]
#[command(about = "Play keyframe datasets through the tracecast engine", long_about = None)]
struct Args {
    /// JSON dataset file to play instead of a scenario
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Dataset key to play (defaults to the first key in the file)
    #[arg(short, long)]
    key: Option<String>,

    /// Scenario to run, or "all" (see --list-scenarios)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Print the available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Host frame rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Real seconds to simulate
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Playback speed: realtime, fast, faster, fastest, replay, or virtual ms per second
    #[arg(long, default_value = "replay")]
    speed: PlaybackSpeed,

    /// Loop playback over the dataset
    #[arg(long = "loop")]
    looping: bool,

    /// Export recorded frames to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    if args.list_scenarios {
        println!("{}", ScenarioId::catalog());
        return;
    }

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    let runner = ScenarioRunner::new(SimConfig {
        seed,
        fps: args.fps,
        duration_secs: args.duration,
        speed: args.speed,
        looping: args.looping,
        ..SimConfig::default()
    });

    if !args.json {
        info!("tracecast simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("speed={} fps={} duration={}s", args.speed, args.fps, args.duration);
    }

    let outcomes = match run(&args, &runner) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Some(path) = &args.export {
        if outcomes.len() > 1 {
            error!("--export needs a single scenario or dataset, not 'all'");
            std::process::exit(2);
        }
        match outcomes[0].export.write_to_file(path) {
            Ok(()) => info!(
                "Exported {} frames to {}",
                outcomes[0].export.frames.len(),
                path.display()
            ),
            Err(e) => error!("Failed to write export: {}", e),
        }
    }

    let results: Vec<&ScenarioResult> = outcomes.iter().map(|o| &o.result).collect();
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed,
            "failed": failed,
            "results": results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        for result in &results {
            let m = &result.metrics;
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED | poses={} skipped={} assets ready={} failed={} pending={}",
                    result.scenario,
                    result.seed,
                    m.poses_emitted,
                    m.skipped_entity_frames,
                    m.assets_ready,
                    m.assets_failed,
                    m.assets_pending
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed > 0 {
        std::process::exit(1);
    }
}

fn run(args: &Args, runner: &ScenarioRunner) -> Result<Vec<RunOutcome>, SimError> {
    if let Some(path) = &args.dataset {
        let dataset = Dataset::load(path)?;
        let key = match &args.key {
            Some(key) => key.clone(),
            None => dataset.keys().next().ok_or(SimError::EmptyPlaylist)?.to_string(),
        };
        return Ok(vec![runner.run_dataset(&dataset, &key)?]);
    }

    let scenarios = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse::<ScenarioId>() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("{}", ScenarioId::catalog());
                std::process::exit(1);
            }
        }
    };

    scenarios.into_iter().map(|scenario| runner.run(scenario)).collect()
}
