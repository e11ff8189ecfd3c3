//! Driver configuration.
//!
//! Loaded from an optional JSON file, then overridden by command-line flags.

use std::path::Path;

use anyhow::{Context, Result};
use ecs_world::WorldConfig;
use serde::{Deserialize, Serialize};

use crate::tick::TickConfig;

/// Everything the driver needs to build and run a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Storage and cache settings for the world.
    pub world: WorldConfig,
    /// Frame pacing.
    pub tick: TickConfig,
    /// Entities spawned at startup.
    pub entities: usize,
    /// Width and height of the area entities move in.
    pub bounds: [f32; 2],
    /// Seed for spawning and steering.
    pub seed: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            tick: TickConfig::default(),
            entities: 1_000,
            bounds: [200.0, 200.0],
            seed: 0,
        }
    }
}

impl AppConfig {
    /// Reads a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "entities": 5, "tick": { "max_ticks": 3 } }"#).unwrap();
        assert_eq!(config.entities, 5);
        assert_eq!(config.tick.max_ticks, 3);
        assert_eq!(config.tick.tick_rate, 60.0);
        assert_eq!(config.world, WorldConfig::default());
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/ecs_app.json")).unwrap_err();
        assert!(err.to_string().contains("reading config file"));
    }
}
