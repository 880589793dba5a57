use glam::{UVec2, Vec2};
use pps_common::{Agent, DOMAIN_MIN, DOMAIN_SPAN, SwarmParams};
use std::fmt::Write;

/// Per-frame context handed to a renderer alongside the agents.
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Generation the agents belong to.
    pub generation: u64,
    pub params: SwarmParams,
    /// Output resolution in cells (text) or pixels (GPU).
    pub size: UVec2,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            generation: 0,
            params: SwarmParams::default(),
            size: UVec2::new(64, 24),
        }
    }
}

/// Renderer-agnostic interface. All agent renderers implement this trait.
///
/// The renderer reads one generation and produces output. It never mutates the
/// buffer; the simulation owns it.
pub trait AgentRenderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given generation.
    fn render(&self, agents: &[Agent], info: &FrameInfo) -> Self::Output;
}

/// ASCII density map of the domain, brightest where agents cluster.
#[derive(Debug, Default)]
pub struct TextRenderer;

const RAMP: &[u8] = b" .:-=+*#%@";

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Grid cell for a domain position. +y is up, so row 0 is the top edge.
    fn cell(pos: Vec2, size: UVec2) -> (usize, usize) {
        let unit = ((pos - Vec2::splat(DOMAIN_MIN)) / DOMAIN_SPAN).clamp(Vec2::ZERO, Vec2::ONE);
        let col = ((unit.x * size.x as f32) as u32).min(size.x - 1);
        let row = (((1.0 - unit.y) * size.y as f32) as u32).min(size.y - 1);
        (row as usize, col as usize)
    }
}

impl AgentRenderer for TextRenderer {
    type Output = String;

    fn render(&self, agents: &[Agent], info: &FrameInfo) -> String {
        let size = info.size.max(UVec2::ONE);
        let mut counts = vec![0u32; (size.x * size.y) as usize];
        for agent in agents {
            let (row, col) = Self::cell(agent.pos(), size);
            counts[row * size.x as usize + col] += 1;
        }
        let peak = counts.iter().copied().max().unwrap_or(0).max(1);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Swarm (generation={}, agents={}) ===",
            info.generation,
            agents.len()
        );
        let _ = writeln!(out, "Params: {}", info.params);
        let border = "-".repeat(size.x as usize);
        let _ = writeln!(out, "+{border}+");
        for row in counts.chunks(size.x as usize) {
            out.push('|');
            for &c in row {
                let level = if c == 0 {
                    0
                } else {
                    // any occupied cell shows at least the faintest mark
                    1 + (c as usize * (RAMP.len() - 2)) / peak as usize
                };
                out.push(RAMP[level.min(RAMP.len() - 1)] as char);
            }
            out.push_str("|\n");
        }
        let _ = writeln!(out, "+{border}+");
        tracing::trace!(generation = info.generation, peak, "text frame rendered");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> FrameInfo {
        FrameInfo {
            size: UVec2::new(4, 2),
            ..FrameInfo::default()
        }
    }

    #[test]
    fn empty_generation_renders_blank_grid() {
        let out = TextRenderer::new().render(&[], &small());
        assert!(out.contains("generation=0"));
        assert!(out.contains("agents=0"));
        assert!(out.contains("|    |"));
    }

    #[test]
    fn agents_land_in_their_quadrant() {
        let agents = [
            Agent::new(Vec2::new(-0.9, 0.9), 0.0),
            Agent::new(Vec2::new(0.9, -0.9), 0.0),
        ];
        let out = TextRenderer::new().render(&agents, &small());
        let rows: Vec<&str> = out.lines().filter(|l| l.starts_with('|')).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1..2], "@");
        assert_eq!(&rows[0][4..5], " ");
        assert_eq!(&rows[1][4..5], "@");
    }

    #[test]
    fn domain_edges_stay_on_grid() {
        let agents = [
            Agent::new(Vec2::new(1.0, 1.0), 0.0),
            Agent::new(Vec2::new(-1.0, -1.0), 0.0),
        ];
        let out = TextRenderer::new().render(&agents, &small());
        assert_eq!(out.lines().filter(|l| l.starts_with('|')).count(), 2);
    }

    #[test]
    fn rendering_leaves_agents_untouched() {
        let agents = vec![Agent::new(Vec2::new(0.1, 0.2), 1.0); 3];
        let before = agents.clone();
        let _ = TextRenderer::new().render(&agents, &FrameInfo::default());
        assert_eq!(agents, before);
    }
}
