//! Configuration for the planner engine and server
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::conflict::ConflictPolicy;
use super::enumerate::SearchBudget;
use super::error::ScheduleError;
use super::filter::FilterCriteria;

/// Environment variable naming the config file when no argument is given.
pub const CONFIG_ENV_VAR: &str = "PLANNER_CONFIG";

/// Top-level planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Path to the SQLite catalog
    pub database_path: String,
    pub bind_address: String,
    pub port: u16,
    pub budget: BudgetConfig,
    /// Also reject schedules whose final exams overlap
    pub check_final_exams: bool,
    /// How long generated results stay cached
    pub cache_ttl_secs: u64,
    /// Upper bound on cached results; the oldest is evicted past it
    pub cache_max_entries: usize,
    /// Criteria applied beneath every request's own criteria
    pub default_criteria: FilterCriteria,
}

/// Search ceiling; any unset limit is unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_nodes: Option<u64>,
    pub max_results: Option<usize>,
    pub time_limit_ms: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            database_path: "catalog.db".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            budget: BudgetConfig::default(),
            check_final_exams: false,
            cache_ttl_secs: 5 * 60,
            cache_max_entries: 1024,
            default_criteria: FilterCriteria::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON config file
    ///
    /// # Returns
    /// * `Ok(PlannerConfig)` - Parsed configuration, defaults filled in
    /// * `Err` - If the file can't be read or parsed, or the default criteria are invalid
    pub fn load_from_file(path: &Path) -> Result<Self, ScheduleError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ScheduleError> {
        let mut config: PlannerConfig = serde_json::from_str(content)?;
        config.default_criteria = config.default_criteria.validate()?;
        Ok(config)
    }

    /// Resolves the config from an explicit path, then `PLANNER_CONFIG`,
    /// falling back to defaults when neither is set.
    pub fn resolve(path: Option<&str>) -> Result<Self, ScheduleError> {
        let from_env = std::env::var(CONFIG_ENV_VAR).ok();
        match path.map(str::to_string).or(from_env) {
            Some(path) => Self::load_from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn search_budget(&self) -> SearchBudget {
        SearchBudget {
            max_nodes: self.budget.max_nodes,
            max_results: self.budget.max_results,
            time_limit: self.budget.time_limit_ms.map(Duration::from_millis),
        }
    }

    pub fn conflict_policy(&self) -> ConflictPolicy {
        ConflictPolicy {
            include_finals: self.check_final_exams,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// `address:port` for binding the server.
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
