//! Pathgraph Seek Binary
//!
//! Loads a collection blob, resolves a query between two world points and
//! drives the search to completion.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PATHGRAPH_*`: control overrides, see `ControlConfig::with_env_overrides`
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin pathgraph_seek --features cli -- level.pathgraph.json \
//!     --from 0,0,0 --to 10,0,0 --clearance 0.5 --require road
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use glam::Vec3;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pathgraph_kernel::{Control, ControlConfig, SeekFilter, SeekRequest, SeekerState};

/// Find a path through a stored collection.
#[derive(Debug, Parser)]
#[command(name = "pathgraph_seek", version)]
struct Args {
    /// Collection blob to load.
    blob: PathBuf,

    /// Start point as `x,y,z`.
    #[arg(long, value_parser = parse_vec3)]
    from: Vec3,

    /// End point as `x,y,z`.
    #[arg(long, value_parser = parse_vec3)]
    to: Vec3,

    /// Agent radius.
    #[arg(long, default_value_t = 0.0)]
    clearance: f32,

    /// Tags every traversed connection and node must carry.
    #[arg(long = "require")]
    required: Vec<String>,

    /// Tags no traversed connection or node may carry.
    #[arg(long = "exclude")]
    excluded: Vec<String>,

    /// Apply the tag filter to networks as well.
    #[arg(long)]
    validate_networks: bool,

    /// Per-tick search budget in milliseconds, fractions allowed.
    #[arg(long, env = "PATHGRAPH_FRAME_BUDGET_MS", default_value_t = 5.0)]
    budget_ms: f64,

    /// Give up after this many ticks.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u32,
}

fn parse_vec3(raw: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z, got '{raw}'"));
    };
    let component = |s: &str| s.parse::<f32>().map_err(|e| format!("'{s}': {e}"));
    Ok(Vec3::new(component(*x)?, component(*y)?, component(*z)?))
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pathgraph_seek=info,pathgraph_kernel=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(&args.blob)?;

    let mut control = Control::new(ControlConfig::from_env());
    control.load_collection(&bytes)?;
    control.init();

    let mut filter = SeekFilter::any();
    for tag in args.required {
        filter = filter.require(tag);
    }
    for tag in args.excluded {
        filter = filter.exclude(tag);
    }
    if args.validate_networks {
        filter = filter.validating_networks();
    }

    let budget = Duration::try_from_secs_f64(args.budget_ms.max(0.0) / 1_000.0)?;
    let request = SeekRequest::new(args.from, args.to)
        .with_filter(filter)
        .with_clearance(args.clearance)
        .with_frame_budget(budget);
    let id = control.create_seeker(request);

    let mut state = control.start_seeker(id)?;
    let mut ticks = 0;
    while state == SeekerState::Seeking && ticks < args.max_ticks {
        control.tick()?;
        ticks += 1;
        state = control.seeker(id)?.state();
    }

    let seeker = control.seeker(id)?;
    info!(seeker = %id, ?state, ticks, stats = ?seeker.stats(), "Search finished");

    if state != SeekerState::Completed {
        println!("no path ({state:?})");
        return Ok(false);
    }

    let collection = control.collection();
    for connection_id in seeker.solution() {
        let connection = collection.connection(*connection_id)?;
        let from = &collection.node(connection.from)?.name;
        let to = &collection.node(connection.to)?.name;
        println!("{connection_id}\t{from} -> {to}\t{:.3}", collection.connection_cost(*connection_id)?);
    }
    println!("total cost {:.3}", seeker.solution_cost(collection));
    Ok(true)
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!(error = %e, "pathgraph_seek failed");
            ExitCode::FAILURE
        }
    }
}
