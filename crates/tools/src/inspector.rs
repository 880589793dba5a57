use glam::Vec2;
use pps_common::{Agent, SwarmParams};
use pps_kernel::{neighbor_counts, population_hash, scan_neighbors};

/// Swarm inspector for developer tooling.
///
/// Read-only queries over one generation for debugging and the CLI report.
pub struct SwarmInspector;

impl SwarmInspector {
    /// Produce a summary of one generation.
    pub fn summary(agents: &[Agent], params: &SwarmParams, generation: u64) -> SwarmSummary {
        let counts = neighbor_counts(agents, params.neighborhood_radius);
        let total: u64 = counts.iter().map(|&c| c as u64).sum();
        let mean_neighbors = if agents.is_empty() {
            0.0
        } else {
            total as f32 / agents.len() as f32
        };
        let summary = SwarmSummary {
            agent_count: agents.len(),
            generation,
            polarization: Self::polarization(agents),
            mean_neighbors,
            max_neighbors: counts.iter().copied().max().unwrap_or(0),
            hash: population_hash(agents),
        };
        tracing::debug!(
            generation,
            agents = summary.agent_count,
            polarization = summary.polarization,
            mean_neighbors = summary.mean_neighbors,
            "generation inspected"
        );
        summary
    }

    /// Length of the mean heading vector: 1 when all agents face the same way,
    /// near 0 when headings are spread uniformly.
    pub fn polarization(agents: &[Agent]) -> f32 {
        if agents.is_empty() {
            return 0.0;
        }
        let sum: Vec2 = agents.iter().map(Agent::direction).sum();
        (sum / agents.len() as f32).length()
    }

    /// Detail for one agent, or `None` past the population.
    pub fn inspect_agent(agents: &[Agent], index: usize, radius: f32) -> Option<AgentInfo> {
        let agent = agents.get(index)?;
        let scan = scan_neighbors(agents, index, radius);
        Some(AgentInfo {
            index,
            position: agent.position,
            heading: agent.heading,
            left: scan.left,
            right: scan.right,
        })
    }
}

/// Summary of one generation for the inspector.
#[derive(Debug, Clone)]
pub struct SwarmSummary {
    pub agent_count: usize,
    pub generation: u64,
    pub polarization: f32,
    pub mean_neighbors: f32,
    pub max_neighbors: u32,
    pub hash: u64,
}

impl std::fmt::Display for SwarmSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Swarm: generation={} agents={} polarization={:.3} neighbors(mean={:.2}, max={}) hash={:016x}",
            self.generation,
            self.agent_count,
            self.polarization,
            self.mean_neighbors,
            self.max_neighbors,
            self.hash
        )
    }
}

/// Detailed info about a single agent.
#[derive(Debug, Clone)]
pub struct AgentInfo {
    pub index: usize,
    pub position: [f32; 2],
    pub heading: f32,
    pub left: u32,
    pub right: u32,
}

impl std::fmt::Display for AgentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Agent #{} pos=({:.3}, {:.3}) heading={:.3} neighbors(left={}, right={})",
            self.index, self.position[0], self.position[1], self.heading, self.left, self.right
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pps_kernel::spawn_population;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn summary_empty_generation() {
        let summary = SwarmInspector::summary(&[], &SwarmParams::default(), 0);
        assert_eq!(summary.agent_count, 0);
        assert_eq!(summary.mean_neighbors, 0.0);
        assert_eq!(summary.max_neighbors, 0);
    }

    #[test]
    fn aligned_swarm_is_fully_polarized() {
        let agents: Vec<Agent> = (0..10)
            .map(|i| Agent::new(Vec2::new(i as f32 * 0.1 - 0.5, 0.0), 1.2))
            .collect();
        assert!((SwarmInspector::polarization(&agents) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn opposed_pair_cancels_out() {
        let agents = [
            Agent::new(Vec2::ZERO, 0.0),
            Agent::new(Vec2::ZERO, std::f32::consts::PI),
        ];
        assert!(SwarmInspector::polarization(&agents) < 1e-5);
    }

    #[test]
    fn random_swarm_is_weakly_polarized() {
        let mut rng = StdRng::seed_from_u64(3);
        let agents = spawn_population(4096, &mut rng);
        assert!(SwarmInspector::polarization(&agents) < 0.1);
    }

    #[test]
    fn summary_counts_neighbours() {
        let agents = [
            Agent::new(Vec2::new(0.0, 0.0), 0.0),
            Agent::new(Vec2::new(0.05, 0.0), 0.0),
            Agent::new(Vec2::new(0.8, 0.8), 0.0),
        ];
        let params = SwarmParams::new(0.0, 0.1, 0.0, 0.0);
        let summary = SwarmInspector::summary(&agents, &params, 7);
        assert_eq!(summary.generation, 7);
        assert_eq!(summary.max_neighbors, 1);
        assert!((summary.mean_neighbors - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn inspect_agent_splits_sides() {
        let agents = [
            Agent::new(Vec2::new(0.0, 0.0), 0.0),
            Agent::new(Vec2::new(0.0, 0.05), 0.0),
        ];
        let info = SwarmInspector::inspect_agent(&agents, 0, 0.1).unwrap();
        assert_eq!((info.left, info.right), (1, 0));
        assert!(SwarmInspector::inspect_agent(&agents, 2, 0.1).is_none());
    }

    #[test]
    fn summary_display() {
        let summary = SwarmInspector::summary(&[], &SwarmParams::default(), 0);
        let s = format!("{summary}");
        assert!(s.contains("generation=0"));
    }
}
