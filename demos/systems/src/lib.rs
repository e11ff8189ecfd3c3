//! Demo systems for the archetype ECS.
//!
//! Each system is a plain struct implementing [`System`](ecs_world::System);
//! the driver registers them in the order they should run.

mod attrition;
mod census;
mod movement;
mod steering;

pub use attrition::Attrition;
pub use census::{Census, Report};
pub use movement::Movement;
pub use steering::Steering;
