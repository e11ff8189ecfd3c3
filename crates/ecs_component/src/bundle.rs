//! Heterogeneous sets of component values for entity creation.
//!
//! A [`Bundle`] collects one value per component type, in any order. It is
//! built either with [`Bundle::with`] or converted from a tuple of components:
//!
//! ```rust
//! use ecs_component::{Bundle, Component};
//!
//! struct Position(f32, f32);
//! impl Component for Position {}
//! struct Velocity(f32, f32);
//! impl Component for Velocity {}
//!
//! let a = Bundle::new().with(Position(0.0, 0.0)).with(Velocity(1.0, 1.0));
//! let b: Bundle = (Velocity(1.0, 1.0), Position(0.0, 0.0)).into();
//! assert_eq!(a.len(), b.len());
//! ```

use std::any::TypeId;
use std::fmt;

use crate::column::BoxedComponent;
use crate::component::{Component, ComponentId, ComponentRegistry};
use crate::error::{EcsError, EcsResult};
use crate::signature::Signature;

/// One value inside a [`Bundle`], with what is needed to register its type.
pub struct BundleEntry {
    type_id: TypeId,
    name: &'static str,
    register: fn(&mut ComponentRegistry) -> EcsResult<ComponentId>,
    value: BoxedComponent,
}

impl BundleEntry {
    fn new<T: Component>(value: T) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::type_name(),
            register: ComponentRegistry::register::<T>,
            value: Box::new(value),
        }
    }

    /// Name of the component type.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type identity of the value.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Registers the value's type (idempotently) and returns its id.
    ///
    /// # Errors
    ///
    /// Propagates [`ComponentRegistry::register`] failures.
    pub fn register(&self, registry: &mut ComponentRegistry) -> EcsResult<ComponentId> {
        (self.register)(registry)
    }
}

impl fmt::Debug for BundleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleEntry").field("name", &self.name).finish()
    }
}

/// A bundle resolved against a registry: its signature and one value per id,
/// sorted by ascending id.
#[derive(Debug)]
pub struct ResolvedBundle {
    /// The exact component set of the bundle.
    pub signature: Signature,
    /// Values in ascending id order.
    pub values: Vec<(ComponentId, BoxedComponent)>,
}

/// An unordered collection of component values.
#[derive(Debug, Default)]
pub struct Bundle {
    entries: Vec<BundleEntry>,
}

impl Bundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a component value.
    #[must_use]
    pub fn with<T: Component>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// Adds a component value in place.
    pub fn push<T: Component>(&mut self, value: T) {
        self.entries.push(BundleEntry::new(value));
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bundle holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Returns `true` if every value's type is already in `registry`.
    #[must_use]
    pub fn is_registered(&self, registry: &ComponentRegistry) -> bool {
        self.entries
            .iter()
            .all(|entry| registry.id_by_type(entry.type_id).is_some())
    }

    /// Resolves every value to its id using `id_for`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateComponent`] if two values share a type.
    /// - Anything `id_for` returns.
    pub fn resolve(
        self,
        mut id_for: impl FnMut(&BundleEntry) -> EcsResult<ComponentId>,
    ) -> EcsResult<ResolvedBundle> {
        let mut signature = Signature::EMPTY;
        let mut values = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let id = id_for(&entry)?;
            if signature.has(id) {
                return Err(EcsError::DuplicateComponent { name: entry.name });
            }
            signature.set(id);
            values.push((id, entry.value));
        }
        values.sort_unstable_by_key(|(id, _)| *id);
        Ok(ResolvedBundle { signature, values })
    }
}

macro_rules! impl_bundle_from_tuple {
    ($($name:ident),+) => {
        impl<$($name: Component),+> From<($($name,)+)> for Bundle {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                let mut bundle = Bundle {
                    entries: Vec::with_capacity([$(stringify!($name)),+].len()),
                };
                $( bundle.push($name); )+
                bundle
            }
        }
    };
}

impl_bundle_from_tuple!(A);
impl_bundle_from_tuple!(A, B);
impl_bundle_from_tuple!(A, B, C);
impl_bundle_from_tuple!(A, B, C, D);
impl_bundle_from_tuple!(A, B, C, D, E);
impl_bundle_from_tuple!(A, B, C, D, E, F);
impl_bundle_from_tuple!(A, B, C, D, E, F, G);
impl_bundle_from_tuple!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(f32, f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, PartialEq)]
    struct Velocity(f32, f32);

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_resolve_sorts_by_id() {
        let mut registry = ComponentRegistry::new();
        let p = registry.register::<Position>().unwrap();
        let v = registry.register::<Velocity>().unwrap();

        let bundle: Bundle = (Velocity(1.0, 1.0), Position(0.0, 0.0)).into();
        assert!(bundle.is_registered(&registry));
        let resolved = bundle
            .resolve(|entry| entry.register(&mut registry))
            .unwrap();
        assert_eq!(resolved.signature, Signature::from_ids([p, v]));
        let ids: Vec<_> = resolved.values.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![p, v]);
        assert_eq!(
            resolved.values[0].1.downcast_ref::<Position>(),
            Some(&Position(0.0, 0.0))
        );
    }

    #[test]
    fn test_resolve_registers_on_first_use() {
        let mut registry = ComponentRegistry::new();
        let bundle = Bundle::new().with(Position(1.0, 2.0));
        assert!(!bundle.is_registered(&registry));
        bundle
            .resolve(|entry| entry.register(&mut registry))
            .unwrap();
        assert!(registry.id_of::<Position>().is_some());
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let mut registry = ComponentRegistry::new();
        let bundle = Bundle::new()
            .with(Position(0.0, 0.0))
            .with(Position(1.0, 1.0));
        let err = bundle
            .resolve(|entry| entry.register(&mut registry))
            .unwrap_err();
        assert_eq!(err, EcsError::DuplicateComponent { name: "Position" });
    }
}
