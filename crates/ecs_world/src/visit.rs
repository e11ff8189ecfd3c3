//! Per-thread record of archetypes held by live query batches.
//!
//! A batch keeps its archetype write-locked until it is dropped. Any other
//! lock on that archetype taken by the same thread would never be granted,
//! so every table lock consults this record first:
//!
//! - an archetype this thread is visiting is never locked again;
//! - while visiting, a thread only waits for archetypes with a higher id than
//!   every archetype it visits, and merely tries the others.
//!
//! Waits therefore only ever go up the id order, and no lock cycle can form.

use std::cell::RefCell;
use std::marker::PhantomData;

use ecs_component::ArchetypeId;

thread_local! {
    static VISITING: RefCell<Vec<(usize, ArchetypeId)>> = const { RefCell::new(Vec::new()) };
}

/// How the current thread may lock a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// A live batch on this thread holds the table.
    Visiting,
    /// The lock may only be tried.
    Try,
    /// Blocking on the lock is safe.
    Wait,
}

/// Decides how the table identified by `key` may be locked.
pub(crate) fn access(key: usize, id: ArchetypeId) -> Access {
    VISITING.with(|visiting| {
        let visiting = visiting.borrow();
        if visiting.iter().any(|(held, _)| *held == key) {
            Access::Visiting
        } else if visiting.iter().any(|(_, held)| *held >= id) {
            Access::Try
        } else {
            Access::Wait
        }
    })
}

/// Number of archetypes the current thread is visiting.
#[cfg(test)]
pub(crate) fn depth() -> usize {
    VISITING.with(|visiting| visiting.borrow().len())
}

/// Marks a table as visited by this thread until dropped.
///
/// Not `Send`: the record is per thread.
#[derive(Debug)]
pub(crate) struct VisitMarker {
    key: usize,
    _thread: PhantomData<*const ()>,
}

impl VisitMarker {
    pub(crate) fn enter(key: usize, id: ArchetypeId) -> Self {
        VISITING.with(|visiting| visiting.borrow_mut().push((key, id)));
        Self {
            key,
            _thread: PhantomData,
        }
    }
}

impl Drop for VisitMarker {
    fn drop(&mut self) {
        VISITING.with(|visiting| {
            let mut visiting = visiting.borrow_mut();
            if let Some(position) = visiting.iter().rposition(|(held, _)| *held == self.key) {
                visiting.remove(position);
            }
        });
    }
}
