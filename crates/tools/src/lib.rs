//! Developer Tooling: swarm inspector and per-generation statistics.
//!
//! # Invariants
//! - Inspection is read-only over a generation copy.

mod inspector;

pub use inspector::{AgentInfo, SwarmInspector, SwarmSummary};

pub fn crate_info() -> &'static str {
    "pps-tools v0.1.0"
}
