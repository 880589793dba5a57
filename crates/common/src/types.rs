use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::f32::consts::TAU;

/// Lower bound of the periodic simulation domain on both axes.
pub const DOMAIN_MIN: f32 = -1.0;
/// Upper bound of the periodic simulation domain on both axes.
pub const DOMAIN_MAX: f32 = 1.0;
/// Period of the domain (`DOMAIN_MAX - DOMAIN_MIN`).
pub const DOMAIN_SPAN: f32 = DOMAIN_MAX - DOMAIN_MIN;

/// Value written into `Agent::reserved` at spawn. Stages copy it through untouched.
pub const RESERVED_SENTINEL: f32 = 1.0;

/// One simulated agent, laid out exactly as the GPU buffers store it:
/// `x, y, reserved, heading`.
///
/// The renderer reads `(x, y, reserved)` as one `float32x3` attribute and the
/// heading as a trailing `float32`, so the field order is load-bearing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Agent {
    pub position: [f32; 2],
    pub reserved: f32,
    /// Radians in `[0, 2π)`.
    pub heading: f32,
}

impl Agent {
    pub fn new(position: Vec2, heading: f32) -> Self {
        Self {
            position: position.to_array(),
            reserved: RESERVED_SENTINEL,
            heading,
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::from_array(self.position)
    }

    /// Unit vector along the heading.
    pub fn direction(&self) -> Vec2 {
        Vec2::from_angle(self.heading)
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(Vec2::ZERO, 0.0)
    }
}

/// Wrap one coordinate into the domain.
///
/// Values already inside the closed interval `[-1, 1]` are returned as-is;
/// anything outside is folded back with period 2 into `[-1, 1)`.
pub fn wrap_coordinate(x: f32) -> f32 {
    if (DOMAIN_MIN..=DOMAIN_MAX).contains(&x) {
        return x;
    }
    let wrapped = (x - DOMAIN_MIN).rem_euclid(DOMAIN_SPAN) + DOMAIN_MIN;
    // rem_euclid can round up to the full period for tiny negative inputs
    if wrapped >= DOMAIN_MAX {
        DOMAIN_MIN
    } else {
        wrapped
    }
}

/// Wrap both axes independently (toroidal topology).
pub fn wrap_position(p: Vec2) -> Vec2 {
    Vec2::new(wrap_coordinate(p.x), wrap_coordinate(p.y))
}

/// Wrap an angle into `[0, 2π)`.
pub fn wrap_heading(theta: f32) -> f32 {
    let wrapped = theta.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}
