//! Query plan cache.
//!
//! Maps a [`Filter`] to the archetypes it matched, tagged with the archetype
//! generation at planning time. A new archetype bumps the generation and so
//! invalidates every entry. Rows are never cached: entities added to an
//! already matched archetype are visible to the next query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use ecs_component::ArchetypeId;
use parking_lot::Mutex;

use crate::filter::Filter;

#[derive(Debug)]
struct CachedPlan {
    generation: u64,
    archetypes: Vec<ArchetypeId>,
}

/// Hit/miss counters of a [`QueryCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to plan.
    pub misses: u64,
    /// Filters currently cached.
    pub entries: usize,
}

#[derive(Debug, Default)]
pub(crate) struct QueryCache {
    plans: Mutex<HashMap<Filter, CachedPlan>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl QueryCache {
    /// Returns the cached plan for `filter` if it is current, otherwise runs
    /// `plan` and stores the result.
    pub(crate) fn get_or_plan(
        &self,
        filter: &Filter,
        generation: u64,
        plan: impl FnOnce() -> Vec<ArchetypeId>,
    ) -> Vec<ArchetypeId> {
        let mut plans = self.plans.lock();
        if let Some(cached) = plans.get(filter)
            && cached.generation == generation
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return cached.archetypes.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let archetypes = plan();
        plans.insert(
            *filter,
            CachedPlan {
                generation,
                archetypes: archetypes.clone(),
            },
        );
        archetypes
    }

    /// Drops every entry, returning how many there were.
    pub(crate) fn clear(&self) -> usize {
        let mut plans = self.plans.lock();
        let count = plans.len();
        plans.clear();
        count
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.plans.lock().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecs_component::ComponentId;

    fn filter() -> Filter {
        Filter::new().include(ComponentId::new(1).unwrap())
    }

    #[test]
    fn test_hit_within_generation() {
        let cache = QueryCache::default();
        let first = cache.get_or_plan(&filter(), 1, || vec![ArchetypeId(0)]);
        let second = cache.get_or_plan(&filter(), 1, || panic!("should be cached"));
        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_new_generation_replans() {
        let cache = QueryCache::default();
        cache.get_or_plan(&filter(), 1, || vec![ArchetypeId(0)]);
        let replanned = cache.get_or_plan(&filter(), 2, || vec![ArchetypeId(0), ArchetypeId(3)]);
        assert_eq!(replanned, vec![ArchetypeId(0), ArchetypeId(3)]);
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_clear() {
        let cache = QueryCache::default();
        cache.get_or_plan(&filter(), 1, Vec::new);
        assert_eq!(cache.clear(), 1);
        assert_eq!(cache.stats().entries, 0);
    }
}
