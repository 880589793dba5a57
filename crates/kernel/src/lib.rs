//! Swarm kernel: generation buffers, the two data-parallel stages and the
//! frame driver that sequences them.
//!
//! # Invariants
//! - A stage never writes the slot it reads; slot roles rotate by frame parity.
//! - Integration observes the complete force buffer of the same generation.
//! - Stages are deterministic: same population, forces and params give the
//!   same bytes.
//! - Parameters are snapshotted once per frame and only change as a whole.

pub mod accumulate;
pub mod backend;
pub mod config;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod integrate;
pub mod params;
pub mod simulation;
pub mod store;

pub use accumulate::{Force, NeighborScan, accumulate_forces, neighbor_counts, scan_neighbors};
pub use backend::{ComputeBackend, FramePlan, GroupSizes, Stage, StageVariant};
pub use config::SimConfig;
pub use cpu::CpuBackend;
pub use error::{BackendError, SimError};
pub use integrate::{integrate, integrate_agent, integrate_fused};
pub use params::{ParamBlock, randomized_params};
pub use simulation::{FrameReport, SimState, Simulation, population_hash, step_population};
pub use store::{AgentStore, PingPong, Slot, spawn_population};

pub fn crate_info() -> &'static str {
    "pps-kernel v0.1.0"
}
