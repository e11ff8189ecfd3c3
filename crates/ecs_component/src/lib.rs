//! # ecs_component
//!
//! The storage layer of the archetype ECS: what a component is, how component
//! types are identified, and how values are laid out in memory.
//!
//! This crate provides:
//!
//! - [`Component`] trait and the [`ComponentRegistry`] that binds each type to
//!   a dense [`ComponentId`].
//! - [`Signature`]: fixed-width bitset over component ids.
//! - [`Entity`] / [`EntityAllocator`]: `u64` ids, never reused.
//! - [`ArchetypeTable`]: columnar storage for one component set.
//! - [`Bundle`]: the component values handed to entity creation.
//! - [`EcsError`]: every failure the engine reports.

pub mod archetype;
pub mod bundle;
pub mod column;
pub mod component;
pub mod entity;
pub mod error;
pub mod signature;

pub use archetype::{ArchetypeId, ArchetypeTable, RemovedRow};
pub use bundle::{Bundle, BundleEntry, ResolvedBundle};
pub use column::{BoxedComponent, Column, ColumnPool, ErasedColumn};
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
pub use entity::{Entity, EntityAllocator};
pub use error::{EcsError, EcsResult};
pub use signature::{Indices, SIGNATURE_WIDTH, SIGNATURE_WORDS, Signature};
