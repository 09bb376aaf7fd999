use crate::db::CatalogDb;
use crate::schedule::{PlannerConfig, ScheduleGenerator, ScheduleError};
use crate::server::cache::GenerationCacheState;

/// Shared state for the planner server.
pub struct PlannerState {
    /// The term catalog that schedules are generated from
    pub catalog: CatalogDb,
    pub config: PlannerConfig,
    /// Recently generated results
    pub cache_state: GenerationCacheState,
}

impl PlannerState {
    /// Opens the catalog named in the config.
    pub fn new(config: PlannerConfig) -> Result<Self, ScheduleError> {
        let catalog = CatalogDb::new(&config.database_path)?;
        Ok(Self::with_catalog(catalog, config))
    }

    pub fn with_catalog(catalog: CatalogDb, config: PlannerConfig) -> Self {
        let cache_state = GenerationCacheState::new(config.cache_ttl(), config.cache_max_entries);
        Self {
            catalog,
            config,
            cache_state,
        }
    }

    /// A generator over the catalog using the configured policy and budget.
    pub fn generator(&self) -> ScheduleGenerator<&CatalogDb> {
        ScheduleGenerator::from_config(&self.catalog, &self.config)
    }
}
