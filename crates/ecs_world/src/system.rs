//! Per-frame update callbacks.
//!
//! A [`System`] is invoked once per [`World::update`](crate::World::update),
//! in registration order, on the thread calling `update`. Systems find their
//! data through [`Filter`](crate::Filter) or [`World::query`](crate::World::query).

use std::fmt;

use crate::world::World;

/// A per-frame callback.
pub trait System: Send {
    /// A human-readable name, used for tracing spans.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs once per frame. `dt` is passed through from the driver as given.
    fn update(&mut self, world: &World, dt: f64);
}

/// A [`System`] backed by a closure.
///
/// ```rust
/// use ecs_world::{FnSystem, System, World};
///
/// let mut frames = 0u32;
/// let mut system = FnSystem::new("count_frames", move |_world: &World, _dt: f64| {
///     frames += 1;
/// });
/// assert_eq!(system.name(), "count_frames");
/// system.update(&World::new(), 0.016);
/// ```
pub struct FnSystem<F> {
    name: String,
    run: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&World, f64) + Send,
{
    /// Wraps `run` under `name`.
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&World, f64) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, world: &World, dt: f64) {
        (self.run)(world, dt);
    }
}

impl<F> fmt::Debug for FnSystem<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSystem").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl System for Named {
        fn update(&mut self, _world: &World, _dt: f64) {}
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Named.name().ends_with("Named"));
    }

    #[test]
    fn test_fn_system_passes_dt_through() {
        let world = World::new();
        let mut seen = Vec::new();
        {
            let mut system = FnSystem::new("record", |_: &World, dt: f64| seen.push(dt));
            system.update(&world, -1.5);
            system.update(&world, 1e9);
        }
        assert_eq!(seen, vec![-1.5, 1e9]);
    }
}
