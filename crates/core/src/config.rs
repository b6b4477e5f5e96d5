use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::model::SizeBackendKind;

/// Usage level, in percent, at or above which a drive counts as nearly full.
pub const DEFAULT_REMOVAL_THRESHOLD_PERCENT: f32 = 40.0;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectorConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_removal_threshold_percent")]
    pub removal_threshold_percent: f32,
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,
    #[serde(default)]
    pub size_backend: SizeBackendKind,
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_removal_threshold_percent() -> f32 {
    DEFAULT_REMOVAL_THRESHOLD_PERCENT
}

fn default_suggestion_limit() -> usize {
    DEFAULT_SUGGESTION_LIMIT
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            removal_threshold_percent: default_removal_threshold_percent(),
            suggestion_limit: default_suggestion_limit(),
            size_backend: SizeBackendKind::Native,
        }
    }
}

impl InspectorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(anyhow!("cache_capacity must be greater than zero"));
        }
        if self.suggestion_limit == 0 {
            return Err(anyhow!("suggestion_limit must be greater than zero"));
        }
        if !(0.0..=100.0).contains(&self.removal_threshold_percent) {
            return Err(anyhow!(
                "removal_threshold_percent must be between 0 and 100"
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<InspectorConfig> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: InspectorConfig = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
