//! wgpu backend for the swarm: compute kernels over ping-pong agent buffers
//! and an instanced-triangle agent renderer.
//!
//! # Invariants
//! - A frame's stages are separate compute passes in one submission.
//! - The renderer only binds a generation buffer as vertex input.
//! - Kernel or pipeline validation errors surface at construction, before any
//!   frame runs.

mod compute;
mod context;
mod error;
mod renderer;
mod shaders;

pub use compute::GpuBackend;
pub use context::GpuContext;
pub use error::GpuError;
pub use renderer::AgentPipeline;
pub use shaders::{AGENT_SHADER, swarm_kernels};

pub fn crate_info() -> &'static str {
    "pps-gpu v0.1.0"
}
