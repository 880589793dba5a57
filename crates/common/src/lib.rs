//! Shared types for the particle swarm: the agent record, the parameter set
//! and the periodic domain both live here so the CPU kernels, the GPU backend
//! and the renderers agree on one byte layout.
//!
//! # Invariants
//! - `Agent` and `ParamsUniform` are `Pod` and match the WGSL struct layouts.
//! - A `SwarmParams` value that escapes a constructor or setter is valid.

pub mod params;
pub mod types;

pub use params::{ParamError, ParamName, ParamsUniform, SwarmParams, PRESETS};
pub use types::{
    Agent, DOMAIN_MAX, DOMAIN_MIN, DOMAIN_SPAN, RESERVED_SENTINEL, wrap_coordinate, wrap_heading,
    wrap_position,
};

pub fn crate_info() -> &'static str {
    "pps-common v0.1.0"
}
