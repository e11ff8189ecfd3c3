//! Typed queries over tuples of components.
//!
//! `world.query::<(Position, Velocity)>()` matches every entity carrying both
//! components and yields one [`TypedBatch`] per matching archetype. Items are
//! tuples of `&mut` references in the order the tuple names them:
//!
//! ```rust,ignore
//! for mut batch in world.query::<(Position, Velocity)>().without::<Frozen>() {
//!     for (_entity, (pos, vel)) in batch.iter_mut() {
//!         pos.0 += vel.0 * dt;
//!     }
//! }
//! ```
//!
//! Tuples of one to five distinct components are supported. A tuple naming
//! the same type twice matches nothing.

use std::marker::PhantomData;
use std::slice;

use ecs_component::{ArchetypeId, Column, Component, ComponentId, ComponentRegistry, Entity};

use crate::filter::Filter;
use crate::index::{SharedTable, VisitGuard};
use crate::visit::VisitMarker;
use crate::world::World;

/// A tuple of component types that can be fetched together.
pub trait QueryData {
    /// What one row yields.
    type Item<'a>;
    /// Per-column iterators for one archetype.
    type Iter<'a>;

    /// Ids of the tuple's components in tuple order, or `None` if any is
    /// unregistered or named twice.
    fn component_ids(registry: &ComponentRegistry) -> Option<Vec<ComponentId>>;

    /// Builds iterators from columns given in tuple order.
    fn iter<'a>(columns: Vec<&'a mut Column>) -> Option<Self::Iter<'a>>;

    /// Advances every column iterator by one row.
    fn next<'a>(iter: &mut Self::Iter<'a>) -> Option<Self::Item<'a>>;
}

macro_rules! impl_query_data {
    ($(($name:ident, $var:ident)),+) => {
        impl<$($name: Component),+> QueryData for ($($name,)+) {
            type Item<'a> = ($(&'a mut $name,)+);
            type Iter<'a> = ($(slice::IterMut<'a, $name>,)+);

            fn component_ids(registry: &ComponentRegistry) -> Option<Vec<ComponentId>> {
                let ids = vec![$(registry.id_of::<$name>()?),+];
                let distinct = ids
                    .iter()
                    .enumerate()
                    .all(|(i, id)| !ids[..i].contains(id));
                distinct.then_some(ids)
            }

            fn iter<'a>(columns: Vec<&'a mut Column>) -> Option<Self::Iter<'a>> {
                let mut columns = columns.into_iter();
                $( let $var = columns.next()?.values_mut::<$name>()?.iter_mut(); )+
                Some(($($var,)+))
            }

            fn next<'a>(iter: &mut Self::Iter<'a>) -> Option<Self::Item<'a>> {
                let ($($var,)+) = iter;
                Some(($($var.next()?,)+))
            }
        }
    };
}

impl_query_data!((A, a));
impl_query_data!((A, a), (B, b));
impl_query_data!((A, a), (B, b), (C, c));
impl_query_data!((A, a), (B, b), (C, c), (D, d));
impl_query_data!((A, a), (B, b), (C, c), (D, d), (E, e));

/// Picks the columns for `ids` out of a table, in `ids` order.
///
/// Fails if an id is missing or repeated.
fn pick_columns<'a>(columns: &'a mut [Column], ids: &[ComponentId]) -> Option<Vec<&'a mut Column>> {
    let mut slots: Vec<Option<&'a mut Column>> = ids.iter().map(|_| None).collect();
    for column in columns.iter_mut() {
        if let Some(position) = ids.iter().position(|id| *id == column.id()) {
            slots[position] = Some(column);
        }
    }
    slots.into_iter().collect()
}

/// A typed query, built by [`World::query`].
pub struct TypedQuery<'w, Q: QueryData> {
    world: &'w World,
    ids: Option<Vec<ComponentId>>,
    filter: Filter,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: QueryData> TypedQuery<'w, Q> {
    pub(crate) fn new(world: &'w World, ids: Option<Vec<ComponentId>>) -> Self {
        let filter = ids
            .iter()
            .flatten()
            .fold(Filter::new(), |filter, id| filter.include(*id));
        Self {
            world,
            ids,
            filter,
            _marker: PhantomData,
        }
    }

    /// Skips entities carrying `T`. An unregistered `T` excludes nothing.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        if let Some(id) = self.world.component_id::<T>() {
            self.filter = self.filter.exclude(id);
        }
        self
    }

    /// Only visits entities also carrying `T`, without fetching it.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        match self.world.component_id::<T>() {
            Some(id) => self.filter = self.filter.include(id),
            None => self.ids = None,
        }
        self
    }

    /// The structural filter this query runs.
    #[must_use]
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Number of entities currently matching.
    #[must_use]
    pub fn count(&self) -> usize {
        if self.ids.is_none() {
            return 0;
        }
        self.filter.count(self.world)
    }

    /// Ids of the entities currently matching.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        if self.ids.is_none() {
            return Vec::new();
        }
        self.filter.entities(self.world)
    }
}

impl<Q: QueryData> IntoIterator for TypedQuery<'_, Q> {
    type Item = TypedBatch<Q>;
    type IntoIter = TypedBatches<Q>;

    fn into_iter(self) -> TypedBatches<Q> {
        let (ids, tables) = match self.ids {
            Some(ids) => (ids, self.world.matching_tables(&self.filter)),
            None => (Vec::new(), Vec::new()),
        };
        TypedBatches {
            ids,
            tables: tables.into_iter(),
            _marker: PhantomData,
        }
    }
}

/// Lazily locks each matching archetype in turn.
pub struct TypedBatches<Q: QueryData> {
    ids: Vec<ComponentId>,
    tables: std::vec::IntoIter<SharedTable>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: QueryData> Iterator for TypedBatches<Q> {
    type Item = TypedBatch<Q>;

    fn next(&mut self) -> Option<TypedBatch<Q>> {
        let (guard, visit) = self.tables.find_map(|table| table.visit())?;
        Some(TypedBatch {
            guard,
            _visit: visit,
            ids: self.ids.clone(),
            _marker: PhantomData,
        })
    }
}

/// Exclusive, typed access to one matching archetype.
pub struct TypedBatch<Q: QueryData> {
    guard: VisitGuard,
    _visit: VisitMarker,
    ids: Vec<ComponentId>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: QueryData> TypedBatch<Q> {
    /// The archetype being visited.
    #[must_use]
    pub fn archetype(&self) -> ArchetypeId {
        self.guard.id()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guard.len()
    }

    /// Returns `true` if the archetype currently has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// Entity ids by row.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.guard.entities()
    }

    /// Iterates `(entity, components)` for every row.
    pub fn iter_mut(&mut self) -> TypedRows<'_, Q> {
        let ids = &self.ids;
        let (entities, columns) = self.guard.split_mut();
        let iter = pick_columns(columns, ids).and_then(Q::iter);
        TypedRows {
            entities: entities.iter(),
            iter,
        }
    }

    /// Calls `f` for every row.
    pub fn for_each<'b>(&'b mut self, mut f: impl FnMut(Entity, Q::Item<'b>)) {
        for (entity, item) in self.iter_mut() {
            f(entity, item);
        }
    }
}

/// Row iterator of a [`TypedBatch`].
pub struct TypedRows<'a, Q: QueryData> {
    entities: slice::Iter<'a, Entity>,
    iter: Option<Q::Iter<'a>>,
}

impl<'a, Q: QueryData> Iterator for TypedRows<'a, Q> {
    type Item = (Entity, Q::Item<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let iter = self.iter.as_mut()?;
        let entity = *self.entities.next()?;
        Some((entity, Q::next(iter)?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.iter {
            Some(_) => self.entities.size_hint(),
            None => (0, Some(0)),
        }
    }
}
