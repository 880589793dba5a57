//! Interaction Controller: parameter edits and resets from any thread, applied
//! by the frame loop between frames.
//!
//! # Invariants
//! - Invalid values are rejected before they reach the queue; the running
//!   parameters keep their prior value.
//! - Queued commands are applied in send order, never during a dispatch.

pub mod command;
pub mod controller;

pub use command::Command;
pub use controller::{CommandInbox, ControlError, InteractionController, channel};

pub fn crate_info() -> &'static str {
    "pps-control v0.1.0"
}
