use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tessera::{
    systems::{self, ArenaStats, Health, Name},
    Config, World,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "tessera arena runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/arena.yaml")]
    config: PathBuf,

    /// Override tick count (uses scenario default when omitted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the arena seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_yaml(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(seed) = cli.seed {
        config.arena.seed = seed;
    }
    let ticks = cli.ticks.unwrap_or(config.arena.ticks);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut world = World::with_config(&config.world);
    systems::populate(&mut world, &config.arena);
    info!(fighters = world.count(), ticks, seed = config.arena.seed, "arena ready");

    let mut failures = 0;
    for _ in 0..ticks {
        let report = world.update();
        failures += report.systems_failed;
        if world.count() <= 1 {
            break;
        }
    }

    let stats = world.resource::<ArenaStats>();
    println!(
        "Arena finished after {} ticks: {} hits, {} damage, {} knockouts, {} system failures",
        world.tick(),
        stats.hits,
        stats.damage_dealt,
        stats.knockouts,
        failures
    );
    for (_, (name, health)) in world.query_with_values::<(Name, Health)>() {
        println!("  {:<12} {:>4} hp", name.0, health.0);
    }
    Ok(())
}
