//! Integrates velocity into position and bounces off the world edges.

use components::{Position, Velocity};
use ecs_world::{System, World};
use glam::Vec2;

/// Moves every entity with a `Position` and a `Velocity`, reflecting the
/// velocity at the edges of `[0, bounds]`.
#[derive(Debug, Clone)]
pub struct Movement {
    bounds: Vec2,
}

impl Movement {
    /// Create a movement system confined to `[0, bounds]` on both axes.
    #[must_use]
    pub fn new(bounds: Vec2) -> Self {
        Self { bounds }
    }
}

fn bounce(pos: &mut f32, vel: &mut f32, max: f32) {
    if *pos < 0.0 {
        *pos = -*pos;
        *vel = vel.abs();
    } else if *pos > max {
        *pos = 2.0 * max - *pos;
        *vel = -vel.abs();
    }
    *pos = pos.clamp(0.0, max);
}

impl System for Movement {
    fn name(&self) -> &str {
        "movement"
    }

    fn update(&mut self, world: &World, dt: f64) {
        let dt = dt as f32;
        for mut batch in world.query::<(Position, Velocity)>() {
            for (_entity, (pos, vel)) in batch.iter_mut() {
                pos.0 += vel.0 * dt;
                bounce(&mut pos.0.x, &mut vel.0.x, self.bounds.x);
                bounce(&mut pos.0.y, &mut vel.0.y, self.bounds.y);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moves_by_velocity() {
        let world = World::new();
        let e = world
            .create_entity((Position::new(1.0, 1.0), Velocity::new(2.0, 0.0)))
            .unwrap();
        Movement::new(Vec2::splat(100.0)).update(&world, 0.5);
        assert_eq!(world.get_component::<Position>(e).unwrap(), Position::new(2.0, 1.0));
    }

    #[test]
    fn test_bounces_off_edges() {
        let world = World::new();
        let e = world
            .create_entity((Position::new(9.0, 0.5), Velocity::new(4.0, -1.0)))
            .unwrap();
        Movement::new(Vec2::splat(10.0)).update(&world, 1.0);

        let pos = world.get_component::<Position>(e).unwrap();
        let vel = world.get_component::<Velocity>(e).unwrap();
        assert_eq!(pos, Position::new(7.0, 0.5));
        assert_eq!(vel, Velocity::new(-4.0, 1.0));
    }
}
