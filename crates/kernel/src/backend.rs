//! The seam between the frame driver and whatever executes the stages.
//!
//! The CPU backend lives in this crate; the wgpu backend implements the same
//! trait from `pps-gpu`.

use crate::error::BackendError;
use crate::store::Slot;
use pps_common::{Agent, SwarmParams};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a frame is split into kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageVariant {
    /// Accumulate forces into a scratch buffer, then integrate.
    #[default]
    TwoPass,
    /// Legacy single kernel with the neighbour scan inlined into integration.
    SinglePass,
}

impl fmt::Display for StageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoPass => f.write_str("two-pass"),
            Self::SinglePass => f.write_str("single-pass"),
        }
    }
}

impl FromStr for StageVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "two-pass" | "two_pass" => Ok(Self::TwoPass),
            "single-pass" | "single_pass" => Ok(Self::SinglePass),
            other => Err(format!(
                "unknown stage variant '{other}' (expected two-pass or single-pass)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Accumulate,
    Integrate,
    Fused,
}

/// Work group sizes per stage. The fused kernel uses the integrate size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSizes {
    pub accumulate: u32,
    pub integrate: u32,
}

impl Default for GroupSizes {
    fn default() -> Self {
        Self {
            accumulate: 64,
            integrate: 32,
        }
    }
}

/// Everything a backend needs to execute one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub read: Slot,
    pub write: Slot,
    pub variant: StageVariant,
}

impl FramePlan {
    /// Stages in dependency order. Backends insert a full barrier between them.
    pub fn stages(&self) -> &'static [Stage] {
        match self.variant {
            StageVariant::TwoPass => &[Stage::Accumulate, Stage::Integrate],
            StageVariant::SinglePass => &[Stage::Fused],
        }
    }
}

/// A device able to hold generation buffers and run the swarm stages.
pub trait ComputeBackend {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Population size the buffers were allocated for.
    fn agent_count(&self) -> usize;

    /// Number of generation buffers.
    fn slot_count(&self) -> usize;

    /// Push the complete parameter set.
    fn upload_params(&mut self, params: &SwarmParams) -> Result<(), BackendError>;

    /// Write `agents` into every generation buffer.
    fn upload_population(&mut self, agents: &[Agent]) -> Result<(), BackendError>;

    /// Execute the plan's stages in order. Must not return before the write
    /// slot is fully produced from the backend's point of view.
    fn dispatch(&mut self, plan: &FramePlan) -> Result<(), BackendError>;

    /// Copy one generation back to host memory.
    fn read_population(&mut self, slot: Slot) -> Result<Vec<Agent>, BackendError>;
}
