//! Steers entities toward a wandering attractor.

use components::{Position, Velocity};
use ecs_world::{System, World};
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Pulls every moving entity toward an attractor that drifts randomly
/// inside the world bounds.
#[derive(Debug, Clone)]
pub struct Steering {
    attractor: Vec2,
    bounds: Vec2,
    strength: f32,
    max_speed: f32,
    rng: StdRng,
}

impl Steering {
    /// Create a steering system with the attractor at the centre of `bounds`.
    #[must_use]
    pub fn new(bounds: Vec2, seed: u64) -> Self {
        Self {
            attractor: bounds * 0.5,
            bounds,
            strength: 5.0,
            max_speed: 20.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Acceleration toward the attractor, in units per second squared.
    #[must_use]
    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    /// Speed limit applied after steering.
    #[must_use]
    pub fn with_max_speed(mut self, max_speed: f32) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Current attractor position.
    #[must_use]
    pub fn attractor(&self) -> Vec2 {
        self.attractor
    }

    fn wander(&mut self, dt: f32) {
        let step = Vec2::new(self.rng.gen_range(-1.0..=1.0), self.rng.gen_range(-1.0..=1.0));
        self.attractor = (self.attractor + step * self.max_speed * dt).clamp(Vec2::ZERO, self.bounds);
    }
}

impl System for Steering {
    fn name(&self) -> &str {
        "steering"
    }

    fn update(&mut self, world: &World, dt: f64) {
        let dt = dt as f32;
        self.wander(dt);
        let attractor = self.attractor;
        let pull = self.strength * dt;
        let max_speed = self.max_speed;
        for mut batch in world.query::<(Position, Velocity)>() {
            batch.for_each(|_entity, (pos, vel)| {
                let toward = (attractor - pos.0).normalize_or_zero();
                *vel = Velocity(vel.0 + toward * pull).clamped(max_speed);
            });
        }
        trace!(x = attractor.x, y = attractor.y, "attractor moved");
    }
}
