//! Demo component definitions for the archetype ECS.
//!
//! Plain data only: every type here is `Send + Sync + 'static` and
//! serialisable, which is all the [`Component`] trait asks for.

use ecs_component::Component;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// A 2D position in world units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position(pub Vec2);

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// A 2D velocity in world units per second.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Velocity(pub Vec2);

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self(Vec2::ZERO);

    /// Create a new velocity.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    /// Scales the velocity down so its length is at most `max`.
    #[must_use]
    pub fn clamped(self, max: f32) -> Self {
        Self(self.0.clamp_length_max(max))
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Display colour of an entity, RGBA.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Renderable {
    pub color: [u8; 4],
}

impl Renderable {
    /// An opaque colour.
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            color: [r, g, b, 255],
        }
    }
}

impl Component for Renderable {
    fn type_name() -> &'static str {
        "Renderable"
    }
}

/// Current and maximum hit points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Health {
    /// Current hit points.
    pub current: f32,
    /// Maximum hit points.
    pub max: f32,
}

impl Health {
    /// Create a new health component at full HP.
    #[must_use]
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Returns `true` while HP is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Apply damage, clamping to zero.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    /// Heal, clamping to max.
    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_serialization() {
        let p = Position::new(1.0, -2.5);
        let json = serde_json::to_string(&p).unwrap();
        let restored: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(p, restored);
    }

    #[test]
    fn test_velocity_clamped() {
        let v = Velocity::new(3.0, 4.0).clamped(1.0);
        assert!((v.0.length() - 1.0).abs() < 1e-6);
        assert_eq!(Velocity::new(0.3, 0.4).clamped(1.0), Velocity::new(0.3, 0.4));
    }

    #[test]
    fn test_health_damage_and_heal() {
        let mut h = Health::full(100.0);
        assert!(h.is_alive());
        h.damage(60.0);
        assert_eq!(h.current, 40.0);
        h.heal(30.0);
        assert_eq!(h.current, 70.0);
        h.damage(200.0);
        assert_eq!(h.current, 0.0);
        assert!(!h.is_alive());
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Renderable::type_name(), "Renderable");
        assert_eq!(Renderable::rgb(1, 2, 3).color, [1, 2, 3, 255]);
    }
}
