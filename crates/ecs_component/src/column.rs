//! Type-erased component columns.
//!
//! A [`Column`] stores every value of one component type inside one
//! archetype, contiguously, as a `Vec<T>` hidden behind the [`ErasedColumn`]
//! trait. Typed access goes through a checked downcast, so a wrong type
//! yields `None` instead of undefined behaviour.
//!
//! Methods that change a column's length are crate-private: rows are only
//! added or removed through [`ArchetypeTable`](crate::ArchetypeTable), which
//! keeps every column the same length as its entity list.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::component::{Component, ComponentId};
use crate::error::{EcsError, EcsResult};

/// A boxed component value of some registered type.
pub type BoxedComponent = Box<dyn Any + Send + Sync>;

/// Object-safe view over a `Vec<T>` of component values.
pub trait ErasedColumn: Send + Sync {
    /// Number of values stored.
    fn len(&self) -> usize;

    /// Allocated capacity in values.
    fn capacity(&self) -> usize;

    /// Reserves room for `additional` more values.
    fn reserve(&mut self, additional: usize);

    /// Appends a boxed value, handing it back if the type does not match.
    fn push_boxed(&mut self, value: BoxedComponent) -> Result<(), BoxedComponent>;

    /// Removes the value at `row`, moving the last value into its place.
    fn swap_remove_boxed(&mut self, row: usize) -> BoxedComponent;

    /// Like [`swap_remove_boxed`](Self::swap_remove_boxed), dropping the value.
    fn swap_remove_drop(&mut self, row: usize);

    /// Shortens the column to `len` values.
    fn truncate(&mut self, len: usize);

    /// The value at `row` as `&dyn Any`.
    fn get_any(&self, row: usize) -> Option<&dyn Any>;

    /// The value at `row` as `&mut dyn Any`.
    fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any>;

    /// Mutable iteration over every value, in row order.
    fn iter_any_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn Any> + '_>;

    /// The backing `Vec<T>` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// The backing `Vec<T>` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedColumn for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn reserve(&mut self, additional: usize) {
        Vec::reserve(self, additional);
    }

    fn push_boxed(&mut self, value: BoxedComponent) -> Result<(), BoxedComponent> {
        let value = value.downcast::<T>()?;
        self.push(*value);
        Ok(())
    }

    fn swap_remove_boxed(&mut self, row: usize) -> BoxedComponent {
        Box::new(self.swap_remove(row))
    }

    fn swap_remove_drop(&mut self, row: usize) {
        self.swap_remove(row);
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len);
    }

    fn get_any(&self, row: usize) -> Option<&dyn Any> {
        self.get(row).map(|value| value as &dyn Any)
    }

    fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any> {
        self.get_mut(row).map(|value| value as &mut dyn Any)
    }

    fn iter_any_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn Any> + '_> {
        Box::new(self.iter_mut().map(|value| value as &mut dyn Any))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A column in an archetype table, storing components of a single type.
pub struct Column {
    id: ComponentId,
    name: &'static str,
    data: Box<dyn ErasedColumn>,
}

impl Column {
    /// Wraps a backing buffer for component `id`.
    #[must_use]
    pub fn new(id: ComponentId, name: &'static str, data: Box<dyn ErasedColumn>) -> Self {
        Self { id, name, data }
    }

    /// The component stored in this column.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Name of the component type stored.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the number of component instances stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if this column contains no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Allocated capacity in values.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Typed view of every value, or `None` if `T` is not the stored type.
    #[must_use]
    pub fn values<T: Component>(&self) -> Option<&[T]> {
        self.data
            .as_any()
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
    }

    /// Mutable typed view of every value. The slice cannot change length.
    #[must_use]
    pub fn values_mut<T: Component>(&mut self) -> Option<&mut [T]> {
        self.data
            .as_any_mut()
            .downcast_mut::<Vec<T>>()
            .map(Vec::as_mut_slice)
    }

    /// Typed reference to the value at `row`.
    #[must_use]
    pub fn get<T: Component>(&self, row: usize) -> Option<&T> {
        self.values::<T>()?.get(row)
    }

    /// Typed mutable reference to the value at `row`.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self, row: usize) -> Option<&mut T> {
        self.values_mut::<T>()?.get_mut(row)
    }

    /// Untyped reference to the value at `row`.
    #[must_use]
    pub fn get_any(&self, row: usize) -> Option<&dyn Any> {
        self.data.get_any(row)
    }

    /// Untyped mutable reference to the value at `row`.
    #[must_use]
    pub fn get_any_mut(&mut self, row: usize) -> Option<&mut dyn Any> {
        self.data.get_any_mut(row)
    }

    /// Untyped mutable iteration over every value, in row order.
    pub fn iter_any_mut(&mut self) -> Box<dyn Iterator<Item = &mut dyn Any> + '_> {
        self.data.iter_any_mut()
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.data.reserve(additional);
    }

    pub(crate) fn push_boxed(&mut self, value: BoxedComponent) -> EcsResult<()> {
        self.data
            .push_boxed(value)
            .map_err(|_| EcsError::ComponentTypeMismatch {
                id: self.id,
                expected: self.name,
            })
    }

    pub(crate) fn swap_remove_boxed(&mut self, row: usize) -> BoxedComponent {
        self.data.swap_remove_boxed(row)
    }

    pub(crate) fn swap_remove_drop(&mut self, row: usize) {
        self.data.swap_remove_drop(row);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Detaches the (emptied) backing buffer, keeping its allocation.
    pub(crate) fn into_buffer(mut self) -> Box<dyn ErasedColumn> {
        self.data.truncate(0);
        self.data
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}

/// Free list of empty column buffers keyed by component id.
///
/// Buffers keep their capacity, so an archetype created later can start with
/// storage that an emptied archetype already grew.
#[derive(Default)]
pub struct ColumnPool {
    free: HashMap<ComponentId, Vec<Box<dyn ErasedColumn>>>,
}

impl ColumnPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a column's buffer to the pool.
    pub fn release(&mut self, column: Column) {
        let id = column.id();
        self.free.entry(id).or_default().push(column.into_buffer());
    }

    /// Takes a pooled buffer for `id`, if one is free.
    pub fn acquire(&mut self, id: ComponentId) -> Option<Box<dyn ErasedColumn>> {
        self.free.get_mut(&id)?.pop()
    }

    /// Number of pooled buffers across all component ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    /// Returns `true` if no buffer is pooled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ColumnPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnPool")
            .field("buffers", &self.len())
            .finish()
    }
}
