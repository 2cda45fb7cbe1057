//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::capitalization::UeScanPolicy;
use crate::core::errors::{Error, Result};

/// Upper bound on the capitalization recursion budget.
///
/// Real curricula chain at most a handful of semesters; anything beyond
/// this is a typo.
pub const MAX_CAPITALIZATION_DEPTH: u32 = 16;

/// Tunable knobs of the aggregation engine, loadable from TOML.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many capitalized semesters a score lookup may walk back through
    #[serde(default = "default_max_capitalization_depth")]
    pub max_capitalization_depth: u32,

    /// UE average lookup used when comparing against capitalized UEs
    #[serde(default)]
    pub ue_scan: UeScanPolicy,

    /// Drop invalid scores from tag averages instead of voiding the average
    #[serde(default = "default_force_averages")]
    pub force_averages: bool,

    /// Name under which the general average is published as a tag
    #[serde(default = "default_overall_tag")]
    pub overall_tag: String,

    /// Bonus rule applied on top of the general average, by registry name
    #[serde(default)]
    pub bonus_rule: Option<String>,
}

pub fn default_max_capitalization_depth() -> u32 {
    2
}

pub fn default_force_averages() -> bool {
    true
}

pub fn default_overall_tag() -> String {
    "general".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_capitalization_depth: default_max_capitalization_depth(),
            ue_scan: UeScanPolicy::default(),
            force_averages: default_force_averages(),
            overall_tag: default_overall_tag(),
            bonus_rule: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document and validate the result
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| Error::configuration(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_capitalization_depth > MAX_CAPITALIZATION_DEPTH {
            return Err(Error::configuration(format!(
                "max_capitalization_depth {} exceeds the limit of {}",
                self.max_capitalization_depth, MAX_CAPITALIZATION_DEPTH
            )));
        }
        if self.overall_tag.trim().is_empty() {
            return Err(Error::configuration("overall_tag must not be empty"));
        }
        if let Some(name) = &self.bonus_rule {
            if name.trim().is_empty() {
                return Err(Error::configuration("bonus_rule must not be empty"));
            }
        }
        Ok(())
    }

    /// Recursion budget as passed to the score resolver
    pub fn capitalization_depth(&self) -> i32 {
        self.max_capitalization_depth as i32
    }
}
