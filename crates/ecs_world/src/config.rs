//! World tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration for a [`World`](crate::World).
///
/// All fields have defaults, so a partial JSON object deserialises fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Remember which archetypes match each filter until a new archetype
    /// appears.
    pub query_cache: bool,
    /// Rows reserved up front in every newly created archetype.
    pub archetype_capacity: usize,
    /// Let new archetypes reuse column buffers released by
    /// [`World::reclaim_empty_archetypes`](crate::World::reclaim_empty_archetypes).
    pub recycle_columns: bool,
}

impl WorldConfig {
    /// Enables or disables the query cache.
    #[must_use]
    pub fn with_query_cache(mut self, enabled: bool) -> Self {
        self.query_cache = enabled;
        self
    }

    /// Sets the rows reserved per new archetype.
    #[must_use]
    pub fn with_archetype_capacity(mut self, rows: usize) -> Self {
        self.archetype_capacity = rows;
        self
    }

    /// Enables or disables column buffer reuse.
    #[must_use]
    pub fn with_column_recycling(mut self, enabled: bool) -> Self {
        self.recycle_columns = enabled;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            query_cache: true,
            archetype_capacity: 0,
            recycle_columns: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert!(config.query_cache);
        assert_eq!(config.archetype_capacity, 0);
        assert!(config.recycle_columns);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{ "archetype_capacity": 128 }"#).unwrap();
        assert_eq!(config, WorldConfig::default().with_archetype_capacity(128));
    }

    #[test]
    fn test_builder_methods() {
        let config = WorldConfig::default()
            .with_query_cache(false)
            .with_column_recycling(false);
        assert!(!config.query_cache);
        assert!(!config.recycle_columns);
    }
}
