use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use uav_mimo_link::io::{load_scenario_from_json, Scenario};
use uav_mimo_link::render::{ascii_heat_map, save_capacity_csv};
use uav_mimo_link::sweep::{mean_capacity_at, run_sweep};

/// Achievable BS -> UAV rate of a hybrid-beamforming mmWave link.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Scenario JSON (base_station, uav, link, sweep); defaults otherwise
    #[arg(long)]
    scenario: Option<String>,

    /// Grid steps per axis
    #[arg(long)]
    steps: Option<usize>,

    /// Monte-Carlo trials per position
    #[arg(long)]
    trials: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the capacity map
    #[arg(long, default_value = "capacity_map.csv")]
    output: PathBuf,

    /// Only evaluate the configured UAV position
    #[arg(long)]
    single: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut scenario = match &args.scenario {
        Some(path) => load_scenario_from_json(path)?,
        None => Scenario::default(),
    };
    if let Some(steps) = args.steps {
        scenario.sweep.n_steps = steps;
    }
    if let Some(trials) = args.trials {
        scenario.link.trials = trials;
    }
    if let Some(seed) = args.seed {
        scenario.sweep.seed = seed;
    }

    let (bs, uav) = scenario.build()?;
    info!(
        "BS N_T={} N_s={} at {:?}, UAV N_r={} at {:?}, {} trials",
        bs.n_t(),
        bs.n_s(),
        bs.location(),
        uav.n_r(),
        uav.location(),
        scenario.link.trials
    );

    if args.single {
        let rate = mean_capacity_at(&bs, &uav, scenario.link, scenario.sweep.seed)?;
        println!("Mean capacity at {:?}: {:.4} bps/Hz", uav.location(), rate);
        return Ok(());
    }

    let (map, metrics) = run_sweep(&bs, &uav, scenario.link, scenario.sweep)?;
    save_capacity_csv(&map, &args.output)?;

    println!("{}", ascii_heat_map(&map, scenario.sweep.n_levels));
    println!(
        "Rate min {:.3} / mean {:.3} / max {:.3} bps/Hz over {} cells ({} ms)",
        map.min(),
        map.mean(),
        map.max(),
        metrics.cells_computed,
        metrics.elapsed_ms
    );
    if let Some((x, y, rate)) = map.argmax() {
        println!("Best position: ({:.1}, {:.1}) -> {:.3} bps/Hz", x, y, rate);
    }
    println!("Contour levels: {:?}", map.contour_levels(scenario.sweep.n_levels));
    println!("Capacity map written to {:?}", args.output);
    Ok(())
}
