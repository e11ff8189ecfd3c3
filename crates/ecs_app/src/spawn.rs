//! Initial population of the demo world.

use components::{Health, Position, Renderable, Velocity};
use ecs_world::{Bundle, EcsResult, World};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Spawns `count` entities at random positions inside `bounds`.
///
/// Three in four move; about one in three carries [`Health`], so the world
/// starts with several archetypes.
pub fn populate(world: &World, count: usize, bounds: Vec2, seed: u64) -> EcsResult<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..count {
        let position = Position(Vec2::new(
            rng.gen_range(0.0..=bounds.x),
            rng.gen_range(0.0..=bounds.y),
        ));
        let color = Renderable::rgb(rng.r#gen(), rng.r#gen(), rng.r#gen());

        let mut bundle = Bundle::new().with(position).with(color);
        if i % 4 != 0 {
            bundle.push(Velocity::new(
                rng.gen_range(-10.0..=10.0),
                rng.gen_range(-10.0..=10.0),
            ));
        }
        if rng.gen_bool(1.0 / 3.0) {
            bundle.push(Health::full(rng.gen_range(50.0..=150.0)));
        }
        world.create_entity(bundle)?;
    }
    info!(
        entities = world.entity_count(),
        archetypes = world.archetype_count(),
        "world populated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populate_is_deterministic() {
        let a = World::new();
        let b = World::new();
        populate(&a, 64, Vec2::splat(10.0), 7).unwrap();
        populate(&b, 64, Vec2::splat(10.0), 7).unwrap();

        assert_eq!(a.entity_count(), 64);
        assert_eq!(a.query::<(Position, Velocity)>().count(), 48);
        let first = a.entities().into_iter().min().unwrap();
        assert_eq!(
            a.get_component::<Position>(first).unwrap(),
            b.get_component::<Position>(first).unwrap()
        );
    }
}
