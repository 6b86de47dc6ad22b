use anyhow::{Context, Result};
use clap::Parser;
use cosmogenesis_core::sensory::FrequencySweep;
use cosmogenesis_core::{init_logging, AppConfig};
use cosmogenesis_data::Vec3;
use cosmogenesis_lib::Simulation;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of ticks to run (default: run until interrupted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// World seed override
    #[arg(short, long)]
    seed: Option<u64>,

    /// Fixed tick rate in Hz
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Observer drift speed along +x, world units per second
    #[arg(long, default_value_t = 0.0)]
    drift: f64,
}

fn load_config(path: &str) -> Result<AppConfig> {
    match std::fs::read_to_string(path) {
        Ok(text) => AppConfig::from_toml(&text).with_context(|| format!("parsing {path}")),
        Err(_) => {
            tracing::info!(path, "config file not found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();
    anyhow::ensure!(
        args.tick_rate.is_finite() && args.tick_rate > 0.0,
        "tick rate must be positive"
    );

    let mut config = load_config(&args.config)?;
    if let Some(seed) = args.seed {
        config.world.seed = Some(seed);
    }

    let mut sim = Simulation::new(config)?;
    let mut source = FrequencySweep::default();
    let dt = 1.0 / args.tick_rate;
    let limit = args.ticks.unwrap_or(u64::MAX);

    while sim.tick_count() < limit {
        if args.drift != 0.0 {
            let x = sim.observer().x + args.drift * dt;
            sim.set_observer(Vec3::new(x, 0.0, 0.0));
        }
        sim.tick(dt, &mut source);
    }

    let state = sim.brain_state();
    let metrics = sim.metrics();
    tracing::info!(
        ticks = metrics.tick_count(),
        particles = metrics.particle_count(),
        bodies = metrics.body_count(),
        critical_events = metrics.critical_events(),
        total_energy = state.total_energy,
        elapsed_ms = metrics.elapsed().as_millis() as u64,
        "simulation finished"
    );
    Ok(())
}
