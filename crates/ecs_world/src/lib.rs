//! # ecs_world
//!
//! The runtime half of the archetype ECS: a thread-safe [`World`] that stores
//! entities grouped by component set, answers structural queries, and drives
//! systems once per frame.
//!
//! This crate provides:
//!
//! - [`World`]: entity creation, component access, migration, and despawn.
//! - [`Filter`]: include/exclude queries yielding locked [`Batch`]es.
//! - [`World::query`]: typed queries over tuples of components.
//! - [`System`] / [`FnSystem`]: per-frame callbacks run by [`World::update`].
//! - [`Command`]: structural changes deferred to the end of a frame.
//! - [`WorldConfig`]: cache and storage tuning.
//!
//! ```rust
//! use ecs_world::{Component, Filter, World};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Position(f32, f32);
//! impl Component for Position {}
//!
//! let world = World::new();
//! let e = world.create_entity((Position(0.0, 0.0),)).unwrap();
//! assert_eq!(world.get_component::<Position>(e).unwrap(), Position(0.0, 0.0));
//!
//! let position = world.component_id::<Position>().unwrap();
//! assert_eq!(Filter::new().include(position).count(&world), 1);
//! ```

pub mod cache;
pub mod commands;
pub mod config;
pub mod filter;
mod index;
pub mod query;
pub mod system;
mod visit;
pub mod world;

pub use cache::CacheStats;
pub use commands::Command;
pub use config::WorldConfig;
pub use filter::{Batch, Filter, QueryIter, Row, Rows};
pub use query::{QueryData, TypedBatch, TypedBatches, TypedQuery, TypedRows};
pub use system::{FnSystem, System};
pub use world::{ArchetypeSummary, EntityLocation, World, WorldStats};

pub use ecs_component::{
    ArchetypeId, Bundle, Component, ComponentId, EcsError, EcsResult, Entity, Signature,
};
