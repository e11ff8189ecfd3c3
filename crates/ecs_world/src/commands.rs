//! Deferred structural changes.
//!
//! While a query batch is alive its archetype is locked, so systems cannot
//! create, despawn, or reshape entities directly from inside a visit. They
//! queue a [`Command`] with [`World::defer`](crate::World::defer) instead;
//! the queue is drained in order at the end of
//! [`World::update`](crate::World::update) or by
//! [`World::apply_commands`](crate::World::apply_commands).

use std::fmt;

use ecs_component::{Bundle, Component, EcsResult, Entity};

use crate::world::World;

type InsertFn = Box<dyn FnOnce(&World, Entity) -> EcsResult<()> + Send>;
type RemoveFn = fn(&World, Entity) -> EcsResult<()>;

/// A queued structural change.
pub enum Command {
    /// Create an entity from a bundle.
    Spawn(Bundle),
    /// Destroy an entity.
    Despawn(Entity),
    /// Add or overwrite one component.
    Insert {
        /// Target entity.
        entity: Entity,
        /// Component type name, for logging.
        component: &'static str,
        /// Performs the typed insert.
        apply: InsertFn,
    },
    /// Remove one component, dropping its value.
    Remove {
        /// Target entity.
        entity: Entity,
        /// Component type name, for logging.
        component: &'static str,
        /// Performs the typed removal.
        apply: RemoveFn,
    },
}

impl Command {
    /// Queue entity creation.
    #[must_use]
    pub fn spawn(bundle: impl Into<Bundle>) -> Self {
        Self::Spawn(bundle.into())
    }

    /// Queue entity destruction.
    #[must_use]
    pub fn despawn(entity: Entity) -> Self {
        Self::Despawn(entity)
    }

    /// Queue [`World::insert_component`].
    #[must_use]
    pub fn insert<T: Component>(entity: Entity, value: T) -> Self {
        Self::Insert {
            entity,
            component: T::type_name(),
            apply: Box::new(move |world: &World, entity: Entity| {
                world.insert_component(entity, value)
            }),
        }
    }

    /// Queue [`World::remove_component`], discarding the removed value.
    #[must_use]
    pub fn remove<T: Component>(entity: Entity) -> Self {
        Self::Remove {
            entity,
            component: T::type_name(),
            apply: |world: &World, entity: Entity| world.remove_component::<T>(entity).map(drop),
        }
    }

    /// Performs the change.
    pub(crate) fn apply(self, world: &World) -> EcsResult<()> {
        match self {
            Self::Spawn(bundle) => world.create_entity(bundle).map(drop),
            Self::Despawn(entity) => world.despawn(entity),
            Self::Insert { entity, apply, .. } => apply(world, entity),
            Self::Remove { entity, apply, .. } => apply(world, entity),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(bundle) => f.debug_tuple("Spawn").field(bundle).finish(),
            Self::Despawn(entity) => f.debug_tuple("Despawn").field(entity).finish(),
            Self::Insert {
                entity, component, ..
            } => f
                .debug_struct("Insert")
                .field("entity", entity)
                .field("component", component)
                .finish(),
            Self::Remove {
                entity, component, ..
            } => f
                .debug_struct("Remove")
                .field("entity", entity)
                .field("component", component)
                .finish(),
        }
    }
}
