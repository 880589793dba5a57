use crate::backend::{GroupSizes, StageVariant};
use crate::error::SimError;
use pps_common::SwarmParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run configuration. Every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub agent_count: usize,
    pub accumulate_group_size: u32,
    pub integrate_group_size: u32,
    pub buffer_count: usize,
    pub variant: StageVariant,
    /// Population RNG seed. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub params: SwarmParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        let groups = GroupSizes::default();
        Self {
            agent_count: 8192,
            accumulate_group_size: groups.accumulate,
            integrate_group_size: groups.integrate,
            buffer_count: 2,
            variant: StageVariant::default(),
            seed: None,
            params: SwarmParams::default(),
        }
    }
}

impl SimConfig {
    /// Load from YAML (`.yaml`/`.yml`) or JSON (anything else).
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&text)?,
            _ => serde_json::from_str(&text)?,
        };
        config.validate()?;
        tracing::info!(path = %path.display(), agents = config.agent_count, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.agent_count == 0 {
            return Err(SimError::InvalidConfig("agent_count must be positive".into()));
        }
        if self.accumulate_group_size == 0 || self.integrate_group_size == 0 {
            return Err(SimError::InvalidConfig("group sizes must be positive".into()));
        }
        if self.buffer_count < 2 {
            return Err(SimError::InvalidConfig(format!(
                "buffer_count must be at least 2, got {}",
                self.buffer_count
            )));
        }
        self.params.validate()?;
        Ok(())
    }

    pub fn group_sizes(&self) -> GroupSizes {
        GroupSizes {
            accumulate: self.accumulate_group_size,
            integrate: self.integrate_group_size,
        }
    }
}
