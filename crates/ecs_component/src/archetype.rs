//! Archetype definitions and storage.
//!
//! An archetype is a unique combination of component types. Entities sharing
//! the same set of components are grouped into the same table, one [`Column`]
//! per component plus a parallel entity list, so iteration touches
//! contiguous memory.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::{BoxedComponent, Column, ColumnPool};
use crate::component::{ComponentId, ComponentRegistry};
use crate::entity::Entity;
use crate::error::{EcsError, EcsResult};
use crate::signature::Signature;

/// Index of an archetype in the world's arena.
///
/// Archetypes are never destroyed, so an id stays valid for the lifetime of
/// the world that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArchetypeId(pub u32);

impl ArchetypeId {
    /// The arena slot this id refers to.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Archetype({})", self.0)
    }
}

/// Result of removing a row from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedRow {
    /// The entity whose row was removed.
    pub entity: Entity,
    /// The entity that was moved from the last row into the vacated one.
    pub moved: Option<Entity>,
}

/// A table of entities sharing the same archetype (set of component types).
///
/// Data is stored in struct-of-arrays layout: one [`Column`] per component
/// id in ascending order, with entity ids in a parallel vector. Every column
/// always has exactly `len()` values.
pub struct ArchetypeTable {
    id: ArchetypeId,
    signature: Signature,
    entities: Vec<Entity>,
    columns: Vec<Column>,
    column_index: HashMap<ComponentId, usize>,
}

impl ArchetypeTable {
    /// Create a new, empty archetype table from one empty column per
    /// component in `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentTypeMismatch`] if the columns do not cover
    /// the signature exactly.
    pub fn new(id: ArchetypeId, signature: Signature, mut columns: Vec<Column>) -> EcsResult<Self> {
        columns.sort_by_key(Column::id);
        let covered = columns.len() == signature.len()
            && columns
                .iter()
                .zip(signature.indices())
                .all(|(column, id)| column.id() == id && column.is_empty());
        if !covered {
            let column = columns
                .iter()
                .find(|c| !signature.has(c.id()) || !c.is_empty())
                .or_else(|| columns.first());
            return Err(match column {
                Some(column) => EcsError::ComponentTypeMismatch {
                    id: column.id(),
                    expected: column.name(),
                },
                None => EcsError::ComponentTypeMismatch {
                    id: signature.indices().next().unwrap_or(ComponentId::from_index(0)),
                    expected: "<missing column>",
                },
            });
        }
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.id(), i))
            .collect();
        Ok(Self {
            id,
            signature,
            entities: Vec::new(),
            columns,
            column_index,
        })
    }

    /// The arena id of this table.
    #[must_use]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    /// The component set defining this table.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Returns the number of entities in this archetype table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if this table has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids by row.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Returns `true` if this archetype contains the given component.
    #[must_use]
    pub fn has_component(&self, id: ComponentId) -> bool {
        self.signature.has(id)
    }

    /// Returns the column position for the given component, if present.
    #[must_use]
    pub fn column_index(&self, id: ComponentId) -> Option<usize> {
        self.column_index.get(&id).copied()
    }

    /// The column holding component `id`.
    #[must_use]
    pub fn column(&self, id: ComponentId) -> Option<&Column> {
        self.column_index(id).map(|i| &self.columns[i])
    }

    /// Mutable access to the column holding component `id`.
    #[must_use]
    pub fn column_mut(&mut self, id: ComponentId) -> Option<&mut Column> {
        let i = self.column_index(id)?;
        Some(&mut self.columns[i])
    }

    /// All columns in ascending component id order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Entity ids alongside mutable columns, for batch iteration.
    pub fn split_mut(&mut self) -> (&[Entity], &mut [Column]) {
        (&self.entities, &mut self.columns)
    }

    /// Find the row index for a given entity by linear scan.
    #[must_use]
    pub fn entity_row(&self, entity: Entity) -> Option<usize> {
        self.entities.iter().position(|&e| e == entity)
    }

    /// Reserves room for `additional` rows in every column.
    pub fn reserve(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for column in &mut self.columns {
            column.reserve(additional);
        }
    }

    /// Appends a row and returns its index.
    ///
    /// `values` must hold exactly one value per component of the signature,
    /// sorted by ascending id. On error the table is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentTypeMismatch`] if a value is missing,
    /// extra, or of the wrong type.
    pub fn push_row(
        &mut self,
        entity: Entity,
        values: Vec<(ComponentId, BoxedComponent)>,
    ) -> EcsResult<usize> {
        if values.len() != self.columns.len() {
            let column = self.columns.iter().find(|c| !values.iter().any(|(id, _)| *id == c.id()));
            return Err(self.mismatch(column.map(Column::id).or(values.first().map(|(id, _)| *id))));
        }
        if let Some((id, _)) = values
            .iter()
            .zip(&self.columns)
            .map(|((id, _), column)| (*id, column.id()))
            .find(|(id, expected)| id != expected)
        {
            return Err(self.mismatch(Some(id)));
        }

        let row = self.entities.len();
        for (i, (_, value)) in values.into_iter().enumerate() {
            if let Err(err) = self.columns[i].push_boxed(value) {
                for column in &mut self.columns[..i] {
                    column.truncate(row);
                }
                return Err(err);
            }
        }
        self.entities.push(entity);
        Ok(row)
    }

    fn mismatch(&self, id: Option<ComponentId>) -> EcsError {
        let id = id.unwrap_or(ComponentId::from_index(0));
        EcsError::ComponentTypeMismatch {
            id,
            expected: self.column(id).map_or("<not in archetype>", Column::name),
        }
    }

    /// Removes `row`, dropping its values. The last row moves into its place.
    ///
    /// Returns `None` if `row` is out of bounds.
    pub fn remove_row(&mut self, row: usize) -> Option<RemovedRow> {
        if row >= self.entities.len() {
            return None;
        }
        for column in &mut self.columns {
            column.swap_remove_drop(row);
        }
        Some(self.finish_removal(row))
    }

    /// Removes `row` and returns its values in ascending id order.
    ///
    /// Used to migrate an entity into another table.
    pub fn take_row(&mut self, row: usize) -> Option<(RemovedRow, Vec<(ComponentId, BoxedComponent)>)> {
        if row >= self.entities.len() {
            return None;
        }
        let values = self
            .columns
            .iter_mut()
            .map(|column| (column.id(), column.swap_remove_boxed(row)))
            .collect();
        Some((self.finish_removal(row), values))
    }

    fn finish_removal(&mut self, row: usize) -> RemovedRow {
        let entity = self.entities.swap_remove(row);
        RemovedRow {
            entity,
            moved: self.entities.get(row).copied(),
        }
    }

    /// Moves the column buffers of an empty table into `pool`.
    ///
    /// The table keeps fresh, unallocated columns and stays usable. Returns
    /// the number of buffers released, zero if the table is not empty.
    pub fn release_buffers(&mut self, pool: &mut ColumnPool, registry: &ComponentRegistry) -> usize {
        if !self.is_empty() {
            return 0;
        }
        let mut released = 0;
        for column in &mut self.columns {
            if column.capacity() == 0 {
                continue;
            }
            let Some(info) = registry.info(column.id()) else {
                continue;
            };
            let old = std::mem::replace(column, info.new_column());
            pool.release(old);
            released += 1;
        }
        self.entities.shrink_to_fit();
        released
    }
}

impl fmt::Debug for ArchetypeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchetypeTable")
            .field("id", &self.id)
            .field("signature", &self.signature)
            .field("len", &self.len())
            .field("columns", &self.columns)
            .finish()
    }
}
