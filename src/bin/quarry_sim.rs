//! Headless Quarry Runner
//!
//! Puts a crew of workers on one quarry and mines it until it depletes or
//! the tick limit runs out, then prints a summary.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use quarry_sim::core::types::{Cell, WorkerId};
use quarry_sim::materials::Catalog;
use quarry_sim::mining::FixedStorage;
use quarry_sim::quarry::TerrainSource;
use quarry_sim::{QuarryConfig, QuarryVariant, Result, SimulationContext};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Standard,
    Mini,
}

impl From<VariantArg> for QuarryVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::Standard => QuarryVariant::Standard,
            VariantArg::Mini => QuarryVariant::Mini,
        }
    }
}

/// Headless Quarry Runner - mine one quarry to depletion
#[derive(Parser, Debug)]
#[command(name = "quarry_sim")]
#[command(about = "Run workers against a quarry and report yields, hazards and depletion")]
struct Args {
    /// Quarry config TOML (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Material catalog TOML (built-in catalog when omitted)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Weight override TOML with [[weights]] entries
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Random seed for deterministic runs (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of workers
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// Difficulty scalar, 50 makes every hazard check fire
    #[arg(long, default_value_t = 10.0)]
    difficulty: f32,

    /// Quarry max health (overrides the config)
    #[arg(long)]
    max_health: Option<u32>,

    /// Quarry variant
    #[arg(long, value_enum, default_value = "standard")]
    variant: VariantArg,

    /// Rock family under the quarry
    #[arg(long, default_value = "Granite")]
    rock: String,

    /// Worker mining skill (0-20)
    #[arg(long, default_value_t = 10.0)]
    skill: f32,

    /// Give the quarry a general storage destination
    #[arg(long)]
    storage: bool,

    /// Maximum ticks to simulate
    #[arg(long, default_value_t = 10_000_000)]
    max_ticks: u64,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

struct UniformRock(String);

impl TerrainSource for UniformRock {
    fn rock_family_at(&self, _cell: Cell) -> Option<String> {
        Some(self.0.clone())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quarry_sim=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => QuarryConfig::load(path)?,
        None => QuarryConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(max_health) = args.max_health {
        config.max_health = max_health;
    }

    let catalog = match &args.catalog {
        Some(path) => Catalog::load_from_toml(path)?,
        None => Catalog::with_defaults(),
    };

    let mut sim = SimulationContext::new(config, catalog)?;
    sim.difficulty = args.difficulty;
    sim.workers.skill = args.skill;
    if args.storage {
        sim.storage = FixedStorage { connected: None, general: Some(Cell::new(-20, -20)) };
    }
    if let Some(path) = &args.weights {
        let content = std::fs::read_to_string(path)?;
        let applied = sim.merge_weight_overrides(&content)?;
        tracing::info!(applied, "Merged weight overrides");
    }

    let quarry = sim.spawn_quarry(args.variant.into(), Cell::new(0, 0), &UniformRock(args.rock.clone()))?;
    let workers: Vec<WorkerId> = (0..args.workers).map(|_| WorkerId::new()).collect();

    let summary = sim.run(quarry, &workers, args.max_ticks);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("=== QUARRY RUN ===");
        println!("Ticks:           {}", summary.ticks);
        println!("Jobs completed:  {}", summary.jobs_completed);
        println!("Health:          {:.1}%", summary.health_percent);
        println!("Depleted:        {}", summary.depleted);
        println!("Chunks mined:    {}", summary.yields.chunks_mined);
        println!("Resources mined: {}", summary.yields.resources_mined);
        println!("Blocks mined:    {}", summary.yields.blocks_mined);
        println!("Hazards:         {}", summary.hazards);
        println!("Large veins:     {}", summary.large_veins);
        println!("Hauled:          {}", summary.hauls);
        println!("Left on ground:  {}", summary.left_on_ground);
        println!("Discarded:       {}", summary.discarded);
        println!("Failed:          {}", summary.failed);
    }

    Ok(())
}
