//! Integration Stage: turn, then move, then wrap.
//!
//! `θ' = wrap(θ + global + local · n · sign(right − left))`
//! `p' = wrap(p + speed · (cos θ', sin θ'))`

use crate::accumulate::{Force, scan_neighbors};
use crate::dispatch::dispatch;
use pps_common::{Agent, SwarmParams, wrap_heading, wrap_position};

/// Steering term for one agent. Zero when both sides are balanced.
pub fn steering(force: Force, local_rotation: f32) -> f32 {
    let diff = force.right - force.left;
    let sign = if diff > 0.0 {
        1.0
    } else if diff < 0.0 {
        -1.0
    } else {
        0.0
    };
    local_rotation * force.total() * sign
}

/// Advance one agent by one timestep. `reserved` passes through unchanged.
pub fn integrate_agent(agent: &Agent, force: Force, params: &SwarmParams) -> Agent {
    let heading = wrap_heading(
        agent.heading + params.global_rotation + steering(force, params.local_rotation),
    );
    let moved = agent.pos() + params.speed * glam::Vec2::from_angle(heading);
    Agent {
        position: wrap_position(moved).to_array(),
        reserved: agent.reserved,
        heading,
    }
}

/// Two-kernel path: consume a completed force buffer for the same generation.
pub fn integrate(
    read: &[Agent],
    forces: &[Force],
    params: &SwarmParams,
    write: &mut [Agent],
    group_size: u32,
) {
    debug_assert_eq!(read.len(), forces.len());
    debug_assert_eq!(read.len(), write.len());
    dispatch(write, group_size, |i| {
        integrate_agent(&read[i], forces[i], params)
    });
}

/// Legacy single-kernel path: scan neighbours inline, no force buffer.
pub fn integrate_fused(read: &[Agent], params: &SwarmParams, write: &mut [Agent], group_size: u32) {
    debug_assert_eq!(read.len(), write.len());
    let radius = params.neighborhood_radius;
    dispatch(write, group_size, |i| {
        let force = scan_neighbors(read, i, radius).to_force();
        integrate_agent(&read[i], force, params)
    });
}
