//! World state storage.
//!
//! The [`World`] owns every archetype, the entity → location map, the
//! component registry, and the list of systems. All methods take `&self`, so
//! a world can be shared across threads (for example in an `Arc`) while one
//! driver thread runs [`World::update`].
//!
//! ## Locking
//!
//! - The index lock guards the registry and the archetype arena. It is held
//!   only for lookups and inserts, never while waiting on another lock.
//! - Each archetype has its own lock. Rows are appended, removed, or read
//!   while holding it, and an entity's recorded location only changes while
//!   the lock of the archetype it lives in is held.
//! - Moving an entity between archetypes locks both, lower id first.
//! - Counts, entity lists and archetype summaries read a per-archetype row
//!   counter and the location map, never an archetype lock.
//!
//! Query batches keep their archetype write-locked while alive. An accessor
//! or structural change that needs an archetype the calling thread is
//! visiting fails with [`EcsError::ArchetypeInUse`] instead of waiting. So
//! does one that another thread holds, if its id is not above every
//! archetype the caller is visiting. Changes to the visited archetype itself can be queued with
//! [`World::defer`].

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use ecs_component::{
    ArchetypeId, ArchetypeTable, BoxedComponent, Bundle, Component, ComponentId, EcsError,
    EcsResult, Entity, EntityAllocator, ResolvedBundle, Signature,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace, warn};

use crate::cache::{CacheStats, QueryCache};
use crate::commands::Command;
use crate::config::WorldConfig;
use crate::filter::Filter;
use crate::index::{ArchetypeIndex, SharedTable};
use crate::query::{QueryData, TypedQuery};
use crate::system::System;

/// Where an entity's row lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityLocation {
    /// The archetype holding the row.
    pub archetype: ArchetypeId,
    /// Row index inside that archetype.
    pub row: usize,
}

/// Snapshot of one archetype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchetypeSummary {
    /// Arena id.
    pub id: ArchetypeId,
    /// Exact component set.
    pub signature: Signature,
    /// Rows at snapshot time.
    pub len: usize,
}

/// Counters describing a world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorldStats {
    /// Live entities.
    pub entities: usize,
    /// Archetypes ever created.
    pub archetypes: usize,
    /// Registered component types.
    pub component_types: usize,
    /// Column buffers waiting in the pool.
    pub pooled_columns: usize,
    /// Registered systems.
    pub systems: usize,
    /// Completed `update` calls.
    pub frames: u64,
    /// Query cache counters.
    pub query_cache: CacheStats,
}

/// The container for all entities, archetypes, and systems.
pub struct World {
    config: WorldConfig,
    allocator: EntityAllocator,
    index: RwLock<ArchetypeIndex>,
    locations: DashMap<Entity, EntityLocation>,
    systems: Mutex<Vec<Box<dyn System>>>,
    commands: Mutex<Vec<Command>>,
    cache: QueryCache,
    frames: AtomicU64,
}

impl World {
    /// Create a new empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a new empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            allocator: EntityAllocator::new(),
            index: RwLock::new(ArchetypeIndex::default()),
            locations: DashMap::new(),
            systems: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            cache: QueryCache::default(),
            frames: AtomicU64::new(0),
        }
    }

    /// The configuration this world was built with.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Component types
    // ---------------------------------------------------------------------

    /// Registers `T`, returning its id. Idempotent.
    ///
    /// # Errors
    ///
    /// [`EcsError::TooManyComponentTypes`] once the signature width is used up.
    pub fn register<T: Component>(&self) -> EcsResult<ComponentId> {
        if let Some(id) = self.component_id::<T>() {
            return Ok(id);
        }
        self.index.write().registry.register::<T>()
    }

    /// Registers `T` under a fixed id.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentIdInUse`] if the id or the type is already bound
    /// differently.
    pub fn register_as<T: Component>(&self, id: ComponentId) -> EcsResult<ComponentId> {
        self.index.write().registry.register_as::<T>(id)
    }

    /// The id of `T`, if registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.index.read().registry.id_of::<T>()
    }

    // ---------------------------------------------------------------------
    // Entity creation
    // ---------------------------------------------------------------------

    /// Creates an entity carrying `components`.
    ///
    /// Unregistered component types are registered on the way.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if a type appears twice.
    /// - [`EcsError::TooManyComponentTypes`] if registration runs out of ids.
    /// - [`EcsError::ArchetypeInUse`] if a live query batch holds the target
    ///   archetype.
    pub fn create_entity(&self, components: impl Into<Bundle>) -> EcsResult<Entity> {
        let ResolvedBundle { signature, values } = self.resolve(components.into())?;
        let (archetype, table) = self.archetype_for(&signature)?;

        let mut table = table.write()?;
        let entity = self.allocator.allocate();
        let row = table.push_row(entity, values)?;
        self.locations
            .insert(entity, EntityLocation { archetype, row });
        drop(table);

        trace!(%entity, %archetype, row, "created entity");
        Ok(entity)
    }

    /// Maps every bundle value to its component id, registering new types.
    fn resolve(&self, bundle: Bundle) -> EcsResult<ResolvedBundle> {
        {
            let index = self.index.read();
            if bundle.is_registered(&index.registry) {
                return bundle.resolve(|entry| {
                    index
                        .registry
                        .id_by_type(entry.type_id())
                        .ok_or(EcsError::UnregisteredComponent { name: entry.name() })
                });
            }
        }
        let mut index = self.index.write();
        bundle.resolve(|entry| entry.register(&mut index.registry))
    }

    /// The archetype for exactly `signature`, created on first use.
    fn archetype_for(&self, signature: &Signature) -> EcsResult<(ArchetypeId, SharedTable)> {
        {
            let index = self.index.read();
            if let Some(id) = index.find(signature) {
                return Ok((id, index.table(id)));
            }
        }
        let mut index = self.index.write();
        let id = index.get_or_create(*signature, &self.config)?;
        Ok((id, index.table(id)))
    }

    fn table(&self, id: ArchetypeId) -> SharedTable {
        self.index.read().table(id)
    }

    // ---------------------------------------------------------------------
    // Locations
    // ---------------------------------------------------------------------

    /// Where `entity` currently lives.
    #[must_use]
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.locations.get(&entity).map(|entry| *entry.value())
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.locations.contains_key(&entity)
    }

    /// Component set of `entity`.
    #[must_use]
    pub fn signature_of(&self, entity: Entity) -> Option<Signature> {
        let location = self.location(entity)?;
        Some(self.index.read().signature(location.archetype))
    }

    /// Returns `true` if `entity` is alive and carries `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match (self.component_id::<T>(), self.signature_of(entity)) {
            (Some(id), Some(signature)) => signature.has(id),
            _ => false,
        }
    }

    /// Runs `f` on the locked table and current row of `entity`.
    ///
    /// The location is re-read after locking; if the entity moved in the
    /// meantime the lookup starts over. Fails with
    /// [`EcsError::ArchetypeInUse`] rather than wait on a batch.
    fn with_row<R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&ArchetypeTable, usize) -> R,
    ) -> EcsResult<R> {
        loop {
            let seen = self
                .location(entity)
                .ok_or(EcsError::EntityNotFound(entity))?;
            let table = self.table(seen.archetype);
            let table = table.read()?;
            match self.location(entity) {
                None => return Err(EcsError::EntityNotFound(entity)),
                Some(current) if current.archetype == seen.archetype => {
                    return Ok(f(&table, current.row));
                }
                Some(_) => continue,
            }
        }
    }

    /// Like [`with_row`](Self::with_row) with the table write-locked.
    fn with_row_mut<R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut ArchetypeTable, usize) -> R,
    ) -> EcsResult<R> {
        loop {
            let seen = self
                .location(entity)
                .ok_or(EcsError::EntityNotFound(entity))?;
            let table = self.table(seen.archetype);
            let mut table = table.write()?;
            match self.location(entity) {
                None => return Err(EcsError::EntityNotFound(entity)),
                Some(current) if current.archetype == seen.archetype => {
                    return Ok(f(&mut table, current.row));
                }
                Some(_) => continue,
            }
        }
    }

    // ---------------------------------------------------------------------
    // Component access
    // ---------------------------------------------------------------------

    /// A copy of `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotPresent`], and
    /// [`EcsError::ArchetypeInUse`] while a query batch on this thread holds
    /// the entity's archetype.
    pub fn get_component<T: Component + Clone>(&self, entity: Entity) -> EcsResult<T> {
        self.with_component(entity, T::clone)
    }

    /// Runs `f` on a reference to `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotPresent`].
    pub fn with_component<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> EcsResult<R> {
        let id = self.component_id::<T>();
        self.with_row(entity, |table, row| {
            id.and_then(|id| table.column(id)?.get::<T>(row))
                .map(f)
                .ok_or(EcsError::ComponentNotPresent {
                    entity,
                    component: T::type_name(),
                })
        })?
    }

    /// Runs `f` on a mutable reference to `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotPresent`].
    pub fn with_component_mut<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> EcsResult<R> {
        let id = self.component_id::<T>();
        self.with_row_mut(entity, |table, row| {
            id.and_then(|id| table.column_mut(id)?.get_mut::<T>(row))
                .map(f)
                .ok_or(EcsError::ComponentNotPresent {
                    entity,
                    component: T::type_name(),
                })
        })?
    }

    // ---------------------------------------------------------------------
    // Structural changes
    // ---------------------------------------------------------------------

    /// Adds `value` to `entity`, or overwrites it if `T` is already present.
    ///
    /// Adding moves the entity to the archetype with `T` added.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`], or a registration error for `T`.
    pub fn insert_component<T: Component>(&self, entity: Entity, value: T) -> EcsResult<()> {
        let id = self.register::<T>()?;
        let mut value = Some(value);
        loop {
            let replaced = self.with_row_mut(entity, |table, row| {
                match table.column_mut(id).and_then(|column| column.get_mut::<T>(row)) {
                    Some(slot) => {
                        if let Some(value) = value.take() {
                            *slot = value;
                        }
                        true
                    }
                    None => false,
                }
            })?;
            if replaced {
                return Ok(());
            }

            let location = self
                .location(entity)
                .ok_or(EcsError::EntityNotFound(entity))?;
            let target = self.index.read().signature(location.archetype).with(id);
            let mut add = |values: &mut Vec<(ComponentId, BoxedComponent)>| {
                if let Some(value) = value.take() {
                    values.push((id, Box::new(value)));
                }
            };
            if self
                .relocate(entity, location.archetype, &target, &mut add)?
                .is_some()
            {
                return Ok(());
            }
        }
    }

    /// Removes `T` from `entity` and returns it.
    ///
    /// The entity moves to the archetype with `T` removed; removing the last
    /// component leaves it alive with no components.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::ComponentNotPresent`].
    pub fn remove_component<T: Component>(&self, entity: Entity) -> EcsResult<T> {
        let not_present = || EcsError::ComponentNotPresent {
            entity,
            component: T::type_name(),
        };
        loop {
            let location = self
                .location(entity)
                .ok_or(EcsError::EntityNotFound(entity))?;
            let id = self.component_id::<T>().ok_or_else(not_present)?;
            let source = self.index.read().signature(location.archetype);
            if !source.has(id) {
                return Err(not_present());
            }

            let mut removed = None;
            let mut take = |values: &mut Vec<(ComponentId, BoxedComponent)>| {
                if let Some(position) = values.iter().position(|(component, _)| *component == id) {
                    removed = Some(values.remove(position).1);
                }
            };
            if self
                .relocate(entity, location.archetype, &source.without(id), &mut take)?
                .is_some()
            {
                return removed
                    .and_then(|value| value.downcast::<T>().ok())
                    .map(|value| *value)
                    .ok_or_else(not_present);
            }
        }
    }

    /// Moves `entity` from archetype `from` to the archetype for `target`.
    ///
    /// `edit` sees the row's values in between and may add or take values;
    /// values whose component is not in `target` are then dropped. Returns
    /// `Ok(None)` if the entity left `from` before the locks were taken.
    fn relocate(
        &self,
        entity: Entity,
        from: ArchetypeId,
        target: &Signature,
        edit: &mut dyn FnMut(&mut Vec<(ComponentId, BoxedComponent)>),
    ) -> EcsResult<Option<EntityLocation>> {
        let (to, to_table) = self.archetype_for(target)?;
        if from == to {
            // The entity changed shape concurrently; the caller re-evaluates.
            return Ok(None);
        }
        let from_table = self.table(from);

        let (mut source, mut dest) = if from < to {
            let source = from_table.write()?;
            (source, to_table.write()?)
        } else {
            let dest = to_table.write()?;
            (from_table.write()?, dest)
        };

        let Some(current) = self.location(entity) else {
            return Err(EcsError::EntityNotFound(entity));
        };
        if current.archetype != from {
            return Ok(None);
        }

        let Some((removed, mut values)) = source.take_row(current.row) else {
            return Err(EcsError::EntityNotFound(entity));
        };
        if let Some(moved) = removed.moved {
            self.locations.insert(
                moved,
                EntityLocation {
                    archetype: from,
                    row: current.row,
                },
            );
        }

        edit(&mut values);
        values.retain(|(component, _)| target.has(*component));
        values.sort_unstable_by_key(|(component, _)| *component);

        match dest.push_row(entity, values) {
            Ok(row) => {
                let location = EntityLocation { archetype: to, row };
                self.locations.insert(entity, location);
                debug!(%entity, %from, %to, "moved entity");
                Ok(Some(location))
            }
            Err(err) => {
                self.locations.remove(&entity);
                warn!(%entity, %from, %to, error = %err, "entity dropped during move");
                Err(err)
            }
        }
    }

    /// Destroys `entity`. Its id is never handed out again.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] if it is not alive.
    pub fn despawn(&self, entity: Entity) -> EcsResult<()> {
        self.with_row_mut(entity, |table, row| {
            if let Some(removed) = table.remove_row(row) {
                self.locations.remove(&removed.entity);
                if let Some(moved) = removed.moved {
                    self.locations.insert(
                        moved,
                        EntityLocation {
                            archetype: table.id(),
                            row,
                        },
                    );
                }
            }
        })?;
        trace!(%entity, "despawned entity");
        Ok(())
    }

    /// Queues a structural change for the end of the current frame.
    pub fn defer(&self, command: Command) {
        self.commands.lock().push(command);
    }

    /// Applies queued commands in order, returning how many succeeded.
    ///
    /// A failing command is logged and skipped.
    pub fn apply_commands(&self) -> usize {
        let commands = std::mem::take(&mut *self.commands.lock());
        let mut applied = 0;
        for command in commands {
            let description = format!("{command:?}");
            match command.apply(self) {
                Ok(()) => applied += 1,
                Err(err) => warn!(command = %description, error = %err, "deferred command failed"),
            }
        }
        applied
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Starts a typed query over the components in `Q`.
    ///
    /// If any type in `Q` is unregistered the query matches nothing.
    #[must_use]
    pub fn query<Q: QueryData>(&self) -> TypedQuery<'_, Q> {
        let ids = Q::component_ids(&self.index.read().registry);
        TypedQuery::new(self, ids)
    }

    /// Ids of the entities living in `archetypes` (sorted ascending), by
    /// archetype and then by row.
    ///
    /// Read from the location map, so it never waits on an archetype lock.
    pub(crate) fn entities_in(&self, archetypes: &[ArchetypeId]) -> Vec<Entity> {
        let mut found: Vec<(EntityLocation, Entity)> = self
            .locations
            .iter()
            .filter(|entry| archetypes.binary_search(&entry.value().archetype).is_ok())
            .map(|entry| (*entry.value(), *entry.key()))
            .collect();
        found.sort_unstable_by_key(|(location, _)| (location.archetype, location.row));
        found.into_iter().map(|(_, entity)| entity).collect()
    }

    /// Tables matching `filter`, in ascending archetype id order.
    ///
    /// Only the index lock is taken; tables are locked later by the caller.
    pub(crate) fn matching_tables(&self, filter: &Filter) -> Vec<SharedTable> {
        let index = self.index.read();
        let ids = if self.config.query_cache {
            self.cache
                .get_or_plan(filter, index.generation(), || index.plan(filter))
        } else {
            index.plan(filter)
        };
        ids.into_iter().map(|id| index.table(id)).collect()
    }

    /// Forgets every cached query plan, returning how many there were.
    pub fn clear_query_cache(&self) -> usize {
        self.cache.clear()
    }

    // ---------------------------------------------------------------------
    // Systems
    // ---------------------------------------------------------------------

    /// Appends a system. It runs after every system registered before it.
    pub fn add_system(&self, system: impl System + 'static) {
        self.systems.lock().push(Box::new(system));
    }

    /// Appends several systems, in iteration order.
    pub fn register_systems(&self, systems: impl IntoIterator<Item = Box<dyn System>>) {
        self.systems.lock().extend(systems);
    }

    /// Runs every system once, in registration order, then applies deferred
    /// commands. `dt` is handed to the systems unmodified.
    ///
    /// Systems registered during the call first run on the next call.
    pub fn update(&self, dt: f64) {
        let mut systems = std::mem::take(&mut *self.systems.lock());
        for system in &mut systems {
            let _span = debug_span!("system", name = system.name()).entered();
            system.update(self, dt);
        }
        {
            let mut registered = self.systems.lock();
            let added = std::mem::replace(&mut *registered, systems);
            registered.extend(added);
        }
        self.apply_commands();
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    // ---------------------------------------------------------------------
    // Storage maintenance and introspection
    // ---------------------------------------------------------------------

    /// Returns the column buffers of every empty archetype to the pool.
    ///
    /// Archetypes stay in the arena with fresh, unallocated columns.
    /// Archetypes held by a query batch are left alone. Returns the number
    /// of buffers released.
    pub fn reclaim_empty_archetypes(&self) -> usize {
        let tables = self.index.read().tables().to_vec();
        let mut released = 0;
        for table in tables {
            if table.rows() > 0 {
                continue;
            }
            let Ok(mut table) = table.write() else {
                continue;
            };
            if !table.is_empty() {
                continue;
            }
            let mut index = self.index.write();
            let ArchetypeIndex { registry, pool, .. } = &mut *index;
            released += table.release_buffers(pool, registry);
        }
        if released > 0 {
            debug!(released, "reclaimed column buffers");
        }
        released
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.locations.len()
    }

    /// Number of archetypes ever created.
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.index.read().len()
    }

    /// Ids of all live entities, in no particular order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.locations.iter().map(|entry| *entry.key()).collect()
    }

    /// A snapshot of every archetype.
    #[must_use]
    pub fn archetypes(&self) -> Vec<ArchetypeSummary> {
        let index = self.index.read();
        index
            .tables()
            .iter()
            .map(|table| ArchetypeSummary {
                id: table.id(),
                signature: index.signature(table.id()),
                len: table.rows(),
            })
            .collect()
    }

    /// Counters describing the world.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let (archetypes, component_types, pooled_columns) = {
            let index = self.index.read();
            (index.len(), index.registry.len(), index.pool.len())
        };
        WorldStats {
            entities: self.entity_count(),
            archetypes,
            component_types,
            pooled_columns,
            systems: self.systems.lock().len(),
            frames: self.frames.load(Ordering::Relaxed),
            query_cache: self.cache.stats(),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("entities", &self.entity_count())
            .field("archetypes", &self.archetype_count())
            .finish_non_exhaustive()
    }
}
