//! Fixed-rate frame loop.
//!
//! Each tick advances the counter and runs one [`World::update`]. `dt` is the
//! measured time since the previous tick started; the first tick gets the
//! nominal frame time. Deferred commands are applied by the world at the end
//! of every update.

use std::time::{Duration, Instant};

use ecs_world::World;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Drives a [`World`] at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    config: TickConfig,
    world: World,
}

impl TickLoop {
    /// Create a tick loop owning `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            tick_id: 0,
            config,
            world,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Run one tick of the simulation.
    pub fn tick(&mut self, dt: f64) {
        self.tick_id += 1;
        debug!(tick_id = self.tick_id, dt, "tick start");
        self.world.update(dt);
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    pub fn run(&mut self) {
        let tick_duration = Duration::from_secs_f64(1.0 / self.config.tick_rate.max(f64::EPSILON));
        let mut tick_count = 0u64;
        let mut previous: Option<Instant> = None;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            let dt = previous.map_or(tick_duration, |previous| start.duration_since(previous));
            previous = Some(start);

            self.tick(dt.as_secs_f64());

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(
                    ticks = tick_count,
                    entities = self.world.entity_count(),
                    "tick loop complete"
                );
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use ecs_world::FnSystem;

    use super::*;

    #[test]
    fn test_tick_advances_counter() {
        let mut tick_loop = TickLoop::new(TickConfig::default(), World::new());
        assert_eq!(tick_loop.tick_id(), 0);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 1);
        tick_loop.tick(1.0 / 60.0);
        assert_eq!(tick_loop.tick_id(), 2);
    }

    #[test]
    fn test_run_limited_ticks() {
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks: 5,
        };
        let frames = Arc::new(AtomicU64::new(0));
        let world = World::new();
        let counter = Arc::clone(&frames);
        world.add_system(FnSystem::new("count", move |_: &World, dt: f64| {
            assert!(dt > 0.0);
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        let mut tick_loop = TickLoop::new(config, world);
        tick_loop.run();
        assert_eq!(tick_loop.tick_id(), 5);
        assert_eq!(frames.load(Ordering::Relaxed), 5);
        assert_eq!(tick_loop.world().stats().frames, 5);
    }

    #[test]
    fn test_run_passes_measured_frame_time() {
        let config = TickConfig {
            tick_rate: 1000.0,
            max_ticks: 3,
        };
        let seen = Arc::new(Mutex::new(Vec::new()));
        let world = World::new();
        let log = Arc::clone(&seen);
        world.add_system(FnSystem::new("slow", move |_: &World, dt: f64| {
            log.lock().unwrap().push(dt);
            std::thread::sleep(Duration::from_millis(5));
        }));

        let mut tick_loop = TickLoop::new(config, world);
        tick_loop.run();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!((seen[0] - 0.001).abs() < 1e-9);
        // Over-budget frames report the time they actually took.
        assert!(seen[1..].iter().all(|dt| *dt >= 0.005));
    }
}
