//! Periodic population report.

use components::{Health, Position, Renderable, Velocity};
use ecs_world::{System, World};
use tracing::info;

/// Logs entity and archetype counts every `interval` frames.
#[derive(Debug, Clone)]
pub struct Census {
    interval: u64,
    frame: u64,
    last: Option<Report>,
}

/// What the census saw on its last report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub entities: usize,
    pub moving: usize,
    pub static_drawn: usize,
    pub with_health: usize,
    pub archetypes: usize,
}

impl Census {
    /// Report every `interval` frames. An interval of 0 is treated as 1.
    #[must_use]
    pub fn new(interval: u64) -> Self {
        Self {
            interval: interval.max(1),
            frame: 0,
            last: None,
        }
    }

    /// The most recent report.
    #[must_use]
    pub fn last(&self) -> Option<Report> {
        self.last
    }

    /// Counts the population of `world`.
    #[must_use]
    pub fn take(world: &World) -> Report {
        Report {
            entities: world.entity_count(),
            moving: world.query::<(Position, Velocity)>().count(),
            static_drawn: world
                .query::<(Position, Renderable)>()
                .without::<Velocity>()
                .count(),
            with_health: world.query::<(Health,)>().count(),
            archetypes: world.archetype_count(),
        }
    }
}

impl System for Census {
    fn name(&self) -> &str {
        "census"
    }

    fn update(&mut self, world: &World, _dt: f64) {
        self.frame += 1;
        if self.frame % self.interval != 0 {
            return;
        }
        let report = Self::take(world);
        info!(
            frame = self.frame,
            entities = report.entities,
            moving = report.moving,
            static_drawn = report.static_drawn,
            with_health = report.with_health,
            archetypes = report.archetypes,
            "census"
        );
        self.last = Some(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_population() {
        let world = World::new();
        world
            .create_entity((Position::new(0.0, 0.0), Velocity::ZERO, Renderable::rgb(1, 1, 1)))
            .unwrap();
        world
            .create_entity((Position::new(0.0, 0.0), Renderable::rgb(1, 1, 1)))
            .unwrap();
        world
            .create_entity((Position::new(0.0, 0.0), Velocity::ZERO, Health::full(5.0)))
            .unwrap();

        let mut census = Census::new(2);
        census.update(&world, 0.1);
        assert_eq!(census.last(), None);
        census.update(&world, 0.1);
        assert_eq!(
            census.last(),
            Some(Report {
                entities: 3,
                moving: 2,
                static_drawn: 1,
                with_health: 1,
                archetypes: 3,
            })
        );
    }
}
