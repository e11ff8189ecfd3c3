//! Structural filters and row iteration.
//!
//! A [`Filter`] is a pair of signatures: components an entity must have and
//! components it must not have. Running it against a [`World`] yields one
//! [`Batch`] per matching archetype; each batch write-locks its archetype
//! for as long as it is alive and hands out [`Row`]s of live references.
//!
//! ```rust,ignore
//! let filter = Filter::new().include(position).include(velocity);
//! for mut batch in filter.query(&world) {
//!     for mut row in batch.rows() {
//!         let dx = row.get::<Velocity>(1).unwrap().x;
//!         row.get_mut::<Position>(0).unwrap().x += dx;
//!     }
//! }
//! ```
//!
//! While a batch is alive, world calls from the same thread that need its
//! archetype return [`EcsError::ArchetypeInUse`](crate::EcsError::ArchetypeInUse)
//! rather than block, and a nested query skips it. Queue structural changes
//! with [`World::defer`](crate::World::defer) instead.

use std::any::Any;

use ecs_component::{ArchetypeId, ArchetypeTable, Column, Component, ComponentId, Entity, Signature};
use serde::{Deserialize, Serialize};

use crate::index::{SharedTable, VisitGuard};
use crate::visit::VisitMarker;
use crate::world::World;

/// Required and forbidden component sets.
///
/// A filter with no required component matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    include: Signature,
    exclude: Signature,
}

impl Filter {
    /// An empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a filter from prepared signatures.
    #[must_use]
    pub fn from_signatures(include: Signature, exclude: Signature) -> Self {
        Self { include, exclude }
    }

    /// Requires component `id`.
    #[must_use]
    pub fn include(mut self, id: ComponentId) -> Self {
        self.include.set(id);
        self
    }

    /// Forbids component `id`.
    #[must_use]
    pub fn exclude(mut self, id: ComponentId) -> Self {
        self.exclude.set(id);
        self
    }

    /// The required set.
    #[must_use]
    pub fn include_signature(&self) -> &Signature {
        &self.include
    }

    /// The forbidden set.
    #[must_use]
    pub fn exclude_signature(&self) -> &Signature {
        &self.exclude
    }

    /// Returns `true` if an entity with `signature` satisfies the filter.
    #[must_use]
    pub fn matches(&self, signature: &Signature) -> bool {
        !self.include.is_empty()
            && signature.contains_all(&self.include)
            && !signature.intersects(&self.exclude)
    }

    /// Lazily visits every matching archetype.
    ///
    /// The set of archetypes is fixed when this is called; rows are read as
    /// each batch is reached.
    #[must_use]
    pub fn query(&self, world: &World) -> QueryIter {
        QueryIter {
            include: self.include,
            tables: world.matching_tables(self).into_iter(),
        }
    }

    /// Number of entities currently matching.
    ///
    /// Never waits on an archetype lock, so it is safe inside a batch.
    #[must_use]
    pub fn count(&self, world: &World) -> usize {
        world.matching_tables(self).iter().map(SharedTable::rows).sum()
    }

    /// Ids of the entities currently matching, archetype by archetype.
    #[must_use]
    pub fn entities(&self, world: &World) -> Vec<Entity> {
        let archetypes: Vec<ArchetypeId> = world
            .matching_tables(self)
            .iter()
            .map(SharedTable::id)
            .collect();
        world.entities_in(&archetypes)
    }
}

/// Iterator over the matching archetypes of a [`Filter`].
pub struct QueryIter {
    include: Signature,
    tables: std::vec::IntoIter<SharedTable>,
}

impl QueryIter {
    /// Calls `f` with every matching row.
    pub fn for_each_row(self, mut f: impl FnMut(Row<'_>)) {
        for mut batch in self {
            for row in batch.rows() {
                f(row);
            }
        }
    }
}

impl Iterator for QueryIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        self.tables.find_map(|table| table.visit()).map(|(guard, visit)| Batch {
            guard,
            _visit: visit,
            include: self.include,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        // Archetypes this thread already visits are skipped.
        (0, self.tables.size_hint().1)
    }
}

/// Exclusive access to one matching archetype.
pub struct Batch {
    guard: VisitGuard,
    _visit: VisitMarker,
    include: Signature,
}

impl Batch {
    /// The archetype being visited.
    #[must_use]
    pub fn archetype(&self) -> ArchetypeId {
        self.guard.id()
    }

    /// Full component set of the archetype (may exceed the filter's).
    #[must_use]
    pub fn signature(&self) -> &Signature {
        self.guard.signature()
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

    /// Typed slice of one column.
    #[must_use]
    pub fn column<T: Component>(&self, id: ComponentId) -> Option<&[T]> {
        self.guard.column(id)?.values::<T>()
    }

    /// Mutable typed slice of one column.
    #[must_use]
    pub fn column_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut [T]> {
        self.guard.column_mut(id)?.values_mut::<T>()
    }

    /// Read access to the locked table.
    #[must_use]
    pub fn table(&self) -> &ArchetypeTable {
        &self.guard
    }

    /// Row-wise iteration over the included components.
    pub fn rows(&mut self) -> Rows<'_> {
        let include = self.include;
        let (entities, columns) = self.guard.split_mut();
        let columns = columns
            .iter_mut()
            .filter(|column| include.has(column.id()))
            .map(Column::iter_any_mut)
            .collect();
        Rows {
            entities: entities.iter(),
            columns,
        }
    }
}

/// Iterator over the rows of a [`Batch`].
pub struct Rows<'a> {
    entities: std::slice::Iter<'a, Entity>,
    columns: Vec<Box<dyn Iterator<Item = &'a mut dyn Any> + 'a>>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = Row<'a>;

    fn next(&mut self) -> Option<Row<'a>> {
        let entity = *self.entities.next()?;
        let values = self
            .columns
            .iter_mut()
            .map(Iterator::next)
            .collect::<Option<Vec<_>>>()?;
        Some(Row { entity, values })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}

/// One entity's included components, in ascending component id order.
pub struct Row<'a> {
    entity: Entity,
    values: Vec<&'a mut dyn Any>,
}

impl<'a> Row<'a> {
    /// The entity this row belongs to.
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Number of values, equal to the number of included components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a row without values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `position`, if it is a `T`.
    #[must_use]
    pub fn get<T: Any>(&self, position: usize) -> Option<&T> {
        self.values.get(position)?.downcast_ref::<T>()
    }

    /// Mutable access to the value at `position`, if it is a `T`.
    #[must_use]
    pub fn get_mut<T: Any>(&mut self, position: usize) -> Option<&mut T> {
        self.values.get_mut(position)?.downcast_mut::<T>()
    }

    /// All values, untyped.
    pub fn values_mut(&mut self) -> &mut [&'a mut dyn Any] {
        &mut self.values
    }

    /// Consumes the row, returning its references.
    #[must_use]
    pub fn into_values(self) -> Vec<&'a mut dyn Any> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: usize) -> ComponentId {
        ComponentId::new(raw).unwrap()
    }

    #[test]
    fn test_empty_include_matches_nothing() {
        let filter = Filter::new().exclude(id(3));
        assert!(!filter.matches(&Signature::EMPTY));
        assert!(!filter.matches(&Signature::from_ids([id(1), id(2)])));
    }

    #[test]
    fn test_include_and_exclude() {
        let filter = Filter::new().include(id(1)).exclude(id(3));
        assert!(filter.matches(&Signature::from_ids([id(1)])));
        assert!(filter.matches(&Signature::from_ids([id(1), id(2)])));
        assert!(!filter.matches(&Signature::from_ids([id(1), id(3)])));
        assert!(!filter.matches(&Signature::from_ids([id(2)])));
    }

    #[test]
    fn test_filters_built_in_any_order_are_equal() {
        let a = Filter::new().include(id(2)).include(id(1));
        let b = Filter::new().include(id(1)).include(id(2));
        assert_eq!(a, b);
        assert_eq!(
            a,
            Filter::from_signatures(Signature::from_ids([id(1), id(2)]), Signature::EMPTY)
        );
    }
}
