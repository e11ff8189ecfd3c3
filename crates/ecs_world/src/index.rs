//! The archetype arena and its lookup structures.
//!
//! Everything here sits behind the world's index lock. The lock is only ever
//! held for short lookups or inserts; no archetype lock is acquired while it
//! is held.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ecs_component::{
    ArchetypeId, ArchetypeTable, Column, ColumnPool, ComponentId, ComponentRegistry, EcsError, EcsResult,
    SIGNATURE_WIDTH, Signature,
};
use parking_lot::lock_api::ArcRwLockWriteGuard;
use parking_lot::{RawRwLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use crate::config::WorldConfig;
use crate::filter::Filter;
use crate::visit::{self, Access, VisitMarker};

/// Owned write lock held by a query batch.
pub(crate) type VisitGuard = ArcRwLockWriteGuard<RawRwLock, ArchetypeTable>;

/// Shared handle to one archetype table.
///
/// The row count is mirrored outside the lock, so counting never waits on a
/// table. Every lock goes through [`visit::access`].
#[derive(Debug, Clone)]
pub(crate) struct SharedTable {
    id: ArchetypeId,
    lock: Arc<RwLock<ArchetypeTable>>,
    rows: Arc<AtomicUsize>,
}

impl SharedTable {
    fn new(table: ArchetypeTable) -> Self {
        Self {
            id: table.id(),
            rows: Arc::new(AtomicUsize::new(table.len())),
            lock: Arc::new(RwLock::new(table)),
        }
    }

    pub(crate) fn id(&self) -> ArchetypeId {
        self.id
    }

    /// Rows as of the last write unlock.
    pub(crate) fn rows(&self) -> usize {
        self.rows.load(Ordering::Acquire)
    }

    fn key(&self) -> usize {
        Arc::as_ptr(&self.lock) as usize
    }

    fn in_use(&self) -> EcsError {
        EcsError::ArchetypeInUse { archetype: self.id }
    }

    /// Read-locks the table.
    ///
    /// # Errors
    ///
    /// [`EcsError::ArchetypeInUse`] instead of waiting when waiting could
    /// never end.
    pub(crate) fn read(&self) -> EcsResult<RwLockReadGuard<'_, ArchetypeTable>> {
        match visit::access(self.key(), self.id) {
            Access::Wait => Ok(self.lock.read()),
            Access::Try => self.lock.try_read().ok_or_else(|| self.in_use()),
            Access::Visiting => Err(self.in_use()),
        }
    }

    /// Write-locks the table. The row count is published on unlock.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub(crate) fn write(&self) -> EcsResult<TableWriteGuard<'_>> {
        let guard = match visit::access(self.key(), self.id) {
            Access::Wait => self.lock.write(),
            Access::Try => self.lock.try_write().ok_or_else(|| self.in_use())?,
            Access::Visiting => return Err(self.in_use()),
        };
        Ok(TableWriteGuard {
            guard,
            rows: &self.rows,
        })
    }

    /// Write-locks the table for a query batch and records the visit.
    ///
    /// Returns `None`, skipping the archetype, when this thread is already
    /// visiting it or when it could only be tried and is busy.
    pub(crate) fn visit(&self) -> Option<(VisitGuard, VisitMarker)> {
        let guard = match visit::access(self.key(), self.id) {
            Access::Wait => self.lock.write_arc(),
            Access::Try => match self.lock.try_write_arc() {
                Some(guard) => guard,
                None => {
                    warn!(archetype = %self.id, "archetype busy during nested query; skipped");
                    return None;
                }
            },
            Access::Visiting => {
                warn!(archetype = %self.id, "archetype already visited on this thread; skipped");
                return None;
            }
        };
        Some((guard, VisitMarker::enter(self.key(), self.id)))
    }
}

/// Write guard that publishes the table's row count when released.
pub(crate) struct TableWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, ArchetypeTable>,
    rows: &'a AtomicUsize,
}

impl Deref for TableWriteGuard<'_> {
    type Target = ArchetypeTable;

    fn deref(&self) -> &ArchetypeTable {
        &self.guard
    }
}

impl DerefMut for TableWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut ArchetypeTable {
        &mut self.guard
    }
}

impl Drop for TableWriteGuard<'_> {
    fn drop(&mut self) {
        self.rows.store(self.guard.len(), Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub(crate) struct ArchetypeIndex {
    pub(crate) registry: ComponentRegistry,
    pub(crate) pool: ColumnPool,
    tables: Vec<SharedTable>,
    /// Signature of each arena slot, readable without locking the table.
    signatures: Vec<Signature>,
    /// Fingerprint buckets. Entries must be confirmed with `==`.
    by_fingerprint: HashMap<u64, Vec<ArchetypeId>>,
    /// For each component id, the archetypes containing it, ascending.
    by_component: Vec<Vec<ArchetypeId>>,
    /// Bumped whenever an archetype is added.
    generation: u64,
}

impl ArchetypeIndex {
    /// Finds the archetype with exactly `signature`.
    pub(crate) fn find(&self, signature: &Signature) -> Option<ArchetypeId> {
        self.by_fingerprint
            .get(&signature.fingerprint())?
            .iter()
            .copied()
            .find(|id| self.signatures[id.index()] == *signature)
    }

    /// Creates the archetype for `signature`. The caller has checked that it
    /// does not exist yet.
    pub(crate) fn create(
        &mut self,
        signature: Signature,
        config: &WorldConfig,
    ) -> EcsResult<ArchetypeId> {
        let id = ArchetypeId(self.tables.len() as u32);

        let mut columns = Vec::with_capacity(signature.len());
        let mut recycled = 0;
        for component in signature.indices() {
            let info = self
                .registry
                .info(component)
                .ok_or(EcsError::InvalidComponentId {
                    id: component.index(),
                    width: SIGNATURE_WIDTH,
                })?;
            let pooled = if config.recycle_columns {
                self.pool.acquire(component)
            } else {
                None
            };
            match pooled {
                Some(buffer) => {
                    recycled += 1;
                    columns.push(Column::new(component, info.name, buffer));
                }
                None => columns.push(info.new_column()),
            }
        }

        let mut table = ArchetypeTable::new(id, signature, columns)?;
        if config.archetype_capacity > 0 {
            table.reserve(config.archetype_capacity);
        }

        self.tables.push(SharedTable::new(table));
        self.signatures.push(signature);
        self.by_fingerprint
            .entry(signature.fingerprint())
            .or_default()
            .push(id);
        for component in signature.indices() {
            let slot = component.index();
            if self.by_component.len() <= slot {
                self.by_component.resize_with(slot + 1, Vec::new);
            }
            self.by_component[slot].push(id);
        }
        self.generation += 1;

        debug!(
            archetype = %id,
            components = signature.len(),
            recycled,
            "created archetype"
        );
        Ok(id)
    }

    /// Returns the existing archetype for `signature` or creates it.
    pub(crate) fn get_or_create(
        &mut self,
        signature: Signature,
        config: &WorldConfig,
    ) -> EcsResult<ArchetypeId> {
        match self.find(&signature) {
            Some(id) => Ok(id),
            None => self.create(signature, config),
        }
    }

    /// Archetypes matching `filter`, in ascending id order.
    ///
    /// Starts from the rarest included component, then checks each
    /// candidate's full signature.
    pub(crate) fn plan(&self, filter: &Filter) -> Vec<ArchetypeId> {
        let include = filter.include_signature();
        if include.is_empty() {
            return Vec::new();
        }
        let smallest = include
            .indices()
            .map(|component| self.containing(component))
            .min_by_key(|candidates| candidates.len())
            .unwrap_or(&[][..]);
        smallest
            .iter()
            .copied()
            .filter(|id| filter.matches(&self.signatures[id.index()]))
            .collect()
    }

    /// Archetypes containing `component`.
    pub(crate) fn containing(&self, component: ComponentId) -> &[ArchetypeId] {
        self.by_component
            .get(component.index())
            .map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn table(&self, id: ArchetypeId) -> SharedTable {
        self.tables[id.index()].clone()
    }

    pub(crate) fn tables(&self) -> &[SharedTable] {
        &self.tables
    }

    pub(crate) fn signature(&self, id: ArchetypeId) -> Signature {
        self.signatures[id.index()]
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.len()
    }
}
