//! Force Accumulation Stage.
//!
//! For every agent, count the other agents inside the neighbourhood radius and
//! split them by side: left of the heading or right of it. The scan is a full
//! O(N) pass per agent.

use crate::dispatch::dispatch;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use pps_common::{Agent, DOMAIN_MAX, DOMAIN_MIN, DOMAIN_SPAN, SwarmParams};

/// Per-agent accumulator written by the accumulation stage and consumed by
/// integration. Matches the two-float GPU force record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Force {
    pub left: f32,
    pub right: f32,
}

impl Force {
    pub fn total(&self) -> f32 {
        self.left + self.right
    }
}

/// Neighbour counts for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborScan {
    pub left: u32,
    pub right: u32,
}

impl NeighborScan {
    pub fn count(&self) -> u32 {
        self.left + self.right
    }

    pub fn to_force(self) -> Force {
        Force {
            left: self.left as f32,
            right: self.right as f32,
        }
    }
}

/// Shortest displacement from `from` to `to` on the torus.
pub fn toroidal_delta(from: Vec2, to: Vec2) -> Vec2 {
    let d = to - from;
    Vec2::new(fold(d.x), fold(d.y))
}

fn fold(d: f32) -> f32 {
    if d > DOMAIN_MAX {
        d - DOMAIN_SPAN
    } else if d < DOMAIN_MIN {
        d + DOMAIN_SPAN
    } else {
        d
    }
}

/// Scan the population around agent `index`.
///
/// The agent itself is skipped by index. A neighbour is strictly closer than
/// `radius`; it counts as left when it lies counter-clockwise of the heading
/// and as right otherwise.
pub fn scan_neighbors(agents: &[Agent], index: usize, radius: f32) -> NeighborScan {
    let me = agents[index];
    let origin = me.pos();
    let dir = me.direction();
    let radius_sq = radius * radius;

    let mut scan = NeighborScan::default();
    for (j, other) in agents.iter().enumerate() {
        if j == index {
            continue;
        }
        let d = toroidal_delta(origin, other.pos());
        if d.length_squared() >= radius_sq {
            continue;
        }
        if dir.perp_dot(d) > 0.0 {
            scan.left += 1;
        } else {
            scan.right += 1;
        }
    }
    scan
}

/// Run the accumulation stage over `agents`, writing one force per agent.
pub fn accumulate_forces(
    agents: &[Agent],
    params: &SwarmParams,
    forces: &mut [Force],
    group_size: u32,
) {
    debug_assert_eq!(agents.len(), forces.len());
    let radius = params.neighborhood_radius;
    dispatch(forces, group_size, |i| {
        scan_neighbors(agents, i, radius).to_force()
    });
}

/// Neighbour count of every agent, for inspection.
pub fn neighbor_counts(agents: &[Agent], radius: f32) -> Vec<u32> {
    let mut counts = vec![0u32; agents.len()];
    dispatch(&mut counts, 64, |i| scan_neighbors(agents, i, radius).count());
    counts
}
