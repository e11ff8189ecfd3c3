//! Storage-layer error types.
//!
//! Every fallible operation on the registry, archetypes, or the world returns
//! [`EcsResult`]. Systems run once per frame and must be able to recover, so
//! none of these conditions panic.

use crate::archetype::ArchetypeId;
use crate::component::ComponentId;
use crate::entity::Entity;

/// Convenience alias used throughout the engine.
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors reported by the entity/component storage engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    /// A component id does not fit into the signature bitset.
    #[error("component id {id} is out of range (signature width is {width})")]
    InvalidComponentId {
        /// The offending raw id.
        id: usize,
        /// Number of bits in a signature.
        width: usize,
    },

    /// The registry has handed out every id the signature can hold.
    #[error("cannot register more than {limit} component types")]
    TooManyComponentTypes {
        /// Maximum number of distinct component types.
        limit: usize,
    },

    /// A statically declared id is already bound to a different type, or the
    /// type is already registered under another id.
    #[error("component id {id} is already bound to `{existing}`")]
    ComponentIdInUse {
        /// The id that was requested.
        id: ComponentId,
        /// Name of the type currently holding the id.
        existing: &'static str,
    },

    /// Two values of the same component type were passed to one creation call.
    #[error("component `{name}` was supplied more than once")]
    DuplicateComponent {
        /// Name of the duplicated component type.
        name: &'static str,
    },

    /// The entity was never created or has been despawned.
    #[error("{0} not found")]
    EntityNotFound(Entity),

    /// The entity exists but does not carry the requested component.
    #[error("component `{component}` not present on {entity}")]
    ComponentNotPresent {
        /// The entity that was inspected.
        entity: Entity,
        /// Name of the missing component type.
        component: &'static str,
    },

    /// The component type has never been registered with this world.
    #[error("component `{name}` is not registered")]
    UnregisteredComponent {
        /// Name of the component type.
        name: &'static str,
    },

    /// A value was routed to a column holding a different type.
    #[error("value does not match column type `{expected}` for component id {id}")]
    ComponentTypeMismatch {
        /// Column the value was written to.
        id: ComponentId,
        /// Type name the column stores.
        expected: &'static str,
    },

    /// The archetype is held by a live query batch on the calling thread, or
    /// by another thread while the caller holds a batch of its own.
    #[error("{archetype} is locked by an active query batch")]
    ArchetypeInUse {
        /// The archetype that could not be locked.
        archetype: ArchetypeId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = EcsError::EntityNotFound(Entity::from_raw(7));
        assert_eq!(err.to_string(), "Entity(7) not found");

        let err = EcsError::TooManyComponentTypes { limit: 256 };
        assert_eq!(err.to_string(), "cannot register more than 256 component types");

        let err = EcsError::ComponentNotPresent {
            entity: Entity::from_raw(3),
            component: "Health",
        };
        assert_eq!(err.to_string(), "component `Health` not present on Entity(3)");

        let err = EcsError::ArchetypeInUse {
            archetype: ArchetypeId(2),
        };
        assert_eq!(err.to_string(), "Archetype(2) is locked by an active query batch");
    }
}
