//! # ecs_app: frame driver
//!
//! Builds a demo world, populates it, registers the demo systems and runs
//! them at a fixed rate.
//!
//! ## Startup Sequence
//!
//! 1. Load the optional JSON config and apply command-line overrides.
//! 2. Register the demo components and spawn the initial population.
//! 3. Register systems: steering, movement, attrition, census.
//! 4. Enter the fixed-timestep tick loop.

mod config;
mod spawn;
mod tick;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use glam::Vec2;
use tracing::info;
use tracing_subscriber::EnvFilter;

use components::{Health, Position, Renderable, Velocity};
use config::AppConfig;
use ecs_world::{System, World};
use systems::{Attrition, Census, Movement, Steering};
use tick::TickLoop;

#[derive(Parser)]
#[command(name = "ecs_app", about = "Runs the archetype ECS demo world")]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of entities spawned at startup
    #[arg(short = 'n', long)]
    entities: Option<usize>,

    /// Number of ticks to run (0 = until interrupted)
    #[arg(long)]
    ticks: Option<u64>,

    /// Target ticks per second
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Seed for spawning and steering
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };
        if let Some(entities) = self.entities {
            config.entities = entities;
        }
        if let Some(ticks) = self.ticks {
            config.tick.max_ticks = ticks;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick.tick_rate = tick_rate;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ecs_app=info".parse()?))
        .init();

    let config = Args::parse().into_config()?;
    info!(?config, "ecs_app starting");

    let world = World::with_config(config.world.clone());
    world.register::<Position>()?;
    world.register::<Velocity>()?;
    world.register::<Renderable>()?;
    world.register::<Health>()?;

    let bounds = Vec2::from_array(config.bounds);
    spawn::populate(&world, config.entities, bounds, config.seed)?;

    let systems: Vec<Box<dyn System>> = vec![
        Box::new(Steering::new(bounds, config.seed.wrapping_add(1))),
        Box::new(Movement::new(bounds)),
        Box::new(Attrition::new(5.0)),
        Box::new(Census::new(config.tick.tick_rate.max(1.0) as u64)),
    ];
    world.register_systems(systems);

    let mut tick_loop = TickLoop::new(config.tick, world);
    tick_loop.run();

    info!(
        ticks = tick_loop.tick_id(),
        stats = ?tick_loop.world().stats(),
        "ecs_app shut down"
    );
    Ok(())
}
