//! Drains health and removes entities that run out.

use components::Health;
use ecs_world::{Command, System, World};
use tracing::debug;

/// Applies constant damage per second to every entity with [`Health`] and
/// despawns those that reach zero.
///
/// Despawns are deferred, so they take effect once all systems of the frame
/// have run.
#[derive(Debug, Clone)]
pub struct Attrition {
    damage_per_second: f32,
}

impl Attrition {
    /// Create an attrition system.
    #[must_use]
    pub fn new(damage_per_second: f32) -> Self {
        Self { damage_per_second }
    }
}

impl System for Attrition {
    fn name(&self) -> &str {
        "attrition"
    }

    fn update(&mut self, world: &World, dt: f64) {
        let damage = self.damage_per_second * dt as f32;
        let mut fallen = 0usize;
        for mut batch in world.query::<(Health,)>() {
            for (entity, (health,)) in batch.iter_mut() {
                let was_alive = health.is_alive();
                health.damage(damage);
                if was_alive && !health.is_alive() {
                    world.defer(Command::despawn(entity));
                    fallen += 1;
                }
            }
        }
        if fallen > 0 {
            debug!(fallen, "entities ran out of health");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use components::Position;

    #[test]
    fn test_despawns_after_frame() {
        let world = World::new();
        let weak = world
            .create_entity((Position::new(0.0, 0.0), Health::full(1.0)))
            .unwrap();
        let strong = world
            .create_entity((Position::new(0.0, 0.0), Health::full(10.0)))
            .unwrap();
        let bystander = world.create_entity((Position::new(0.0, 0.0),)).unwrap();

        world.add_system(Attrition::new(2.0));
        world.update(1.0);

        assert!(!world.contains(weak));
        assert!(world.contains(bystander));
        assert_eq!(world.get_component::<Health>(strong).unwrap().current, 8.0);
    }
}
