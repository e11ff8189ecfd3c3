//! Core [`Component`] trait and the component type registry.
//!
//! Every piece of data stored in the ECS implements [`Component`]. The trait
//! requires `Send + Sync + 'static` so component columns can be shared between
//! threads behind the world's locks.
//!
//! ## Type Identity
//!
//! Each component type is bound to a small dense [`ComponentId`] that doubles
//! as its bit position in a [`Signature`](crate::Signature). Binding happens
//! through an explicit call on a [`ComponentRegistry`], either on first use
//! ([`ComponentRegistry::register`]) or with a statically declared id
//! ([`ComponentRegistry::register_as`]). The registry is an owned value (the
//! world holds one); there is no process-wide table.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ErasedColumn};
use crate::error::{EcsError, EcsResult};
use crate::signature::SIGNATURE_WIDTH;

/// Identifier of a registered component type, and its bit in a signature.
///
/// Always `< SIGNATURE_WIDTH`; the only public constructor checks the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(u16);

impl ComponentId {
    /// Validates `index` against the signature width.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidComponentId`] if `index >= SIGNATURE_WIDTH`.
    pub fn new(index: usize) -> EcsResult<Self> {
        if index >= SIGNATURE_WIDTH {
            return Err(EcsError::InvalidComponentId {
                id: index,
                width: SIGNATURE_WIDTH,
            });
        }
        Ok(Self::from_index(index))
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    /// The bit position of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The core component trait.
///
/// Components are plain data. The engine never inspects field values.
///
/// # Examples
///
/// ```rust
/// use ecs_component::{Component, ComponentRegistry};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
///
/// let mut registry = ComponentRegistry::new();
/// let id = registry.register::<Health>().unwrap();
/// assert_eq!(registry.register::<Health>().unwrap(), id);
/// ```
pub trait Component: Send + Sync + 'static {
    /// A human-readable name for this component type.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }
}

/// Capability table entry for one registered component type.
#[derive(Debug, Clone, Copy)]
pub struct ComponentInfo {
    /// The id assigned to the type.
    pub id: ComponentId,
    /// The human-readable name of the component.
    pub name: &'static str,
    /// Rust type identity, used to reject mismatched values.
    pub type_id: TypeId,
    new_column: fn() -> Box<dyn ErasedColumn>,
}

impl ComponentInfo {
    fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: T::type_name(),
            type_id: TypeId::of::<T>(),
            new_column: || Box::new(Vec::<T>::new()),
        }
    }

    /// Builds an empty column for this component type.
    #[must_use]
    pub fn new_column(&self) -> Column {
        Column::new(self.id, self.name, (self.new_column)())
    }
}

/// Maps component types to stable, dense [`ComponentId`]s.
///
/// Registration is idempotent per type, never hands the same id to two types,
/// and has no removal.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentId>,
    infos: Vec<Option<ComponentInfo>>,
    next_free: usize,
}

impl ComponentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` on first use, returning its id.
    ///
    /// Ids are dense from 0, skipping ids already claimed through
    /// [`register_as`](Self::register_as).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyComponentTypes`] once every id is taken.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentId> {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        while self.next_free < SIGNATURE_WIDTH && self.is_taken(self.next_free) {
            self.next_free += 1;
        }
        if self.next_free >= SIGNATURE_WIDTH {
            return Err(EcsError::TooManyComponentTypes {
                limit: SIGNATURE_WIDTH,
            });
        }
        let id = ComponentId::from_index(self.next_free);
        self.bind(ComponentInfo::of::<T>(id));
        Ok(id)
    }

    /// Registers `T` under a statically declared id.
    ///
    /// Declaring the same type with the same id again is a no-op.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentIdInUse`] if `id` belongs to another type, or if
    ///   `T` is already registered under a different id.
    pub fn register_as<T: Component>(&mut self, id: ComponentId) -> EcsResult<ComponentId> {
        if let Some(&existing) = self.by_type.get(&TypeId::of::<T>()) {
            if existing == id {
                return Ok(id);
            }
            return Err(EcsError::ComponentIdInUse {
                id: existing,
                existing: T::type_name(),
            });
        }
        if let Some(info) = self.info(id) {
            return Err(EcsError::ComponentIdInUse {
                id,
                existing: info.name,
            });
        }
        self.bind(ComponentInfo::of::<T>(id));
        Ok(id)
    }

    fn is_taken(&self, index: usize) -> bool {
        matches!(self.infos.get(index), Some(Some(_)))
    }

    fn bind(&mut self, info: ComponentInfo) {
        let index = info.id.index();
        if self.infos.len() <= index {
            self.infos.resize(index + 1, None);
        }
        self.by_type.insert(info.type_id, info.id);
        self.infos[index] = Some(info);
    }

    /// Returns the id of `T`, if registered.
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.id_by_type(TypeId::of::<T>())
    }

    /// Returns the id bound to a raw [`TypeId`], if registered.
    #[must_use]
    pub fn id_by_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.by_type.get(&type_id).copied()
    }

    /// Returns the capability entry for `id`.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index()).and_then(Option::as_ref)
    }

    /// Iterates registered types in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter().flatten()
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Returns `true` if no type has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    struct Marker<const N: usize>;

    impl<const N: usize> Component for Marker<N> {}

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let id1 = registry.register::<Health>().unwrap();
        let id2 = registry.register::<Health>().unwrap();
        assert_eq!(id1, id2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_types_get_distinct_dense_ids() {
        let mut registry = ComponentRegistry::new();
        let h = registry.register::<Health>().unwrap();
        let v = registry.register::<Velocity>().unwrap();
        assert_eq!(h.index(), 0);
        assert_eq!(v.index(), 1);
        assert_eq!(registry.id_of::<Velocity>(), Some(v));
        assert_eq!(registry.info(h).unwrap().name, "Health");
    }

    #[test]
    fn test_component_id_range_is_checked() {
        assert!(ComponentId::new(SIGNATURE_WIDTH - 1).is_ok());
        assert_eq!(
            ComponentId::new(SIGNATURE_WIDTH),
            Err(EcsError::InvalidComponentId {
                id: SIGNATURE_WIDTH,
                width: SIGNATURE_WIDTH
            })
        );
    }

    #[test]
    fn test_register_as_reserves_id_and_auto_ids_skip_it() {
        let mut registry = ComponentRegistry::new();
        let declared = ComponentId::new(0).unwrap();
        registry.register_as::<Velocity>(declared).unwrap();
        // Declaring again with the same id is fine.
        assert_eq!(registry.register_as::<Velocity>(declared).unwrap(), declared);

        let h = registry.register::<Health>().unwrap();
        assert_eq!(h.index(), 1);
    }

    #[test]
    fn test_register_as_rejects_taken_id() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Health>().unwrap();
        let err = registry.register_as::<Velocity>(id).unwrap_err();
        assert_eq!(
            err,
            EcsError::ComponentIdInUse {
                id,
                existing: "Health"
            }
        );

        // A registered type cannot move to another id either.
        let other = ComponentId::new(9).unwrap();
        assert!(registry.register_as::<Health>(other).is_err());
    }

    #[test]
    fn test_registry_exhaustion() {
        let mut registry = ComponentRegistry::new();
        // Occupy all but the last id, then take it, then overflow.
        for index in 0..SIGNATURE_WIDTH - 1 {
            let id = ComponentId::new(index).unwrap();
            registry.infos.resize(index + 1, None);
            registry.infos[index] = Some(ComponentInfo {
                id,
                name: "filler",
                type_id: TypeId::of::<()>(),
                new_column: || Box::new(Vec::<Health>::new()),
            });
        }
        registry.register::<Marker<0>>().unwrap();
        assert_eq!(
            registry.id_of::<Marker<0>>().unwrap().index(),
            SIGNATURE_WIDTH - 1
        );
        assert_eq!(
            registry.register::<Marker<1>>(),
            Err(EcsError::TooManyComponentTypes {
                limit: SIGNATURE_WIDTH
            })
        );
    }

    #[test]
    fn test_info_builds_matching_column() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Health>().unwrap();
        let column = registry.info(id).unwrap().new_column();
        assert_eq!(column.id(), id);
        assert!(column.is_empty());
        assert!(column.values::<Health>().is_some());
        assert!(column.values::<Velocity>().is_none());
    }
}
