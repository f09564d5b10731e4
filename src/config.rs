//! Planner configuration
//!
//! Knobs that steer physical join selection. A `PlannerConfig` value is
//! threaded into every planning call; nothing here is global or session state.

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};

/// Default cardinality ratio for choosing an index join.
///
/// The driving side must be smaller than 1% of the indexed side.
pub const DEFAULT_INDEX_JOIN_RATIO: f64 = 0.01;

/// Configuration for physical plan generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Pick an index join whenever one is legal, ignoring the cardinality ratio.
    ///
    /// Diagnostic/testing switch. Legality (eligibility) is never bypassed.
    pub force_index_join: bool,

    /// Index join is chosen when `driving_card < index_join_ratio * indexed_card`.
    pub index_join_ratio: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            force_index_join: false,
            index_join_ratio: DEFAULT_INDEX_JOIN_RATIO,
        }
    }
}

impl PlannerConfig {
    /// Preset for tests: index joins forced on wherever they are legal
    pub fn for_testing() -> Self {
        Self {
            force_index_join: true,
            ..Self::default()
        }
    }

    pub fn with_force_index_join(mut self, force: bool) -> Self {
        self.force_index_join = force;
        self
    }

    pub fn with_index_join_ratio(mut self, ratio: f64) -> Self {
        self.index_join_ratio = ratio;
        self
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.index_join_ratio.is_finite() || !(0.0..=1.0).contains(&self.index_join_ratio) {
            return Err(PlanError::Config(format!(
                "index_join_ratio must be within [0, 1], got {}",
                self.index_join_ratio
            )));
        }
        Ok(())
    }

    /// Ratio test: is `driving` small enough relative to `indexed`?
    pub fn passes_index_ratio(&self, driving: u64, indexed: u64) -> bool {
        (driving as f64) < self.index_join_ratio * indexed as f64
    }
}
