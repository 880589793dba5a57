use crate::accumulate::{Force, accumulate_forces};
use crate::backend::{ComputeBackend, FramePlan, GroupSizes, Stage};
use crate::error::BackendError;
use crate::integrate::{integrate, integrate_fused};
use crate::store::{AgentStore, PingPong, Slot};
use pps_common::{Agent, SwarmParams};

/// Reference backend: host-memory buffers, stages run on the rayon pool.
///
/// Returning from `dispatch` is the barrier; every stage has finished writing
/// before the next one starts.
#[derive(Debug, Clone)]
pub struct CpuBackend {
    store: AgentStore,
    forces: Vec<Force>,
    params: SwarmParams,
    groups: GroupSizes,
}

impl CpuBackend {
    pub fn new(agent_count: usize, slots: usize, groups: GroupSizes) -> Result<Self, BackendError> {
        let ring = PingPong::new(slots)?;
        Ok(Self {
            store: AgentStore::new(agent_count, ring),
            forces: vec![Force::default(); agent_count],
            params: SwarmParams::default(),
            groups,
        })
    }

    /// Borrow a generation without copying.
    pub fn generation(&self, slot: Slot) -> Result<&[Agent], BackendError> {
        self.store.generation(slot)
    }

    /// Force buffer as left by the most recent accumulation stage.
    pub fn forces(&self) -> &[Force] {
        &self.forces
    }

    /// Parameters as last uploaded.
    pub fn params(&self) -> SwarmParams {
        self.params
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn agent_count(&self) -> usize {
        self.store.agent_count()
    }

    fn slot_count(&self) -> usize {
        self.store.slot_count()
    }

    fn upload_params(&mut self, params: &SwarmParams) -> Result<(), BackendError> {
        self.params = *params;
        Ok(())
    }

    fn upload_population(&mut self, agents: &[Agent]) -> Result<(), BackendError> {
        self.store.initialize(agents)
    }

    fn dispatch(&mut self, plan: &FramePlan) -> Result<(), BackendError> {
        let params = self.params;
        let groups = self.groups;
        let (read, write) = self.store.frame_view(plan.read, plan.write)?;
        for stage in plan.stages() {
            tracing::trace!(?stage, read = plan.read.index(), write = plan.write.index(), "cpu stage");
            match stage {
                Stage::Accumulate => {
                    accumulate_forces(read, &params, &mut self.forces, groups.accumulate)
                }
                Stage::Integrate => integrate(read, &self.forces, &params, write, groups.integrate),
                Stage::Fused => integrate_fused(read, &params, write, groups.integrate),
            }
        }
        Ok(())
    }

    fn read_population(&mut self, slot: Slot) -> Result<Vec<Agent>, BackendError> {
        Ok(self.store.generation(slot)?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StageVariant;
    use crate::store::spawn_population;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn backend_with(n: usize, seed: u64) -> (CpuBackend, Vec<Agent>) {
        let mut backend = CpuBackend::new(n, 2, GroupSizes::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let agents = spawn_population(n, &mut rng);
        backend.upload_population(&agents).unwrap();
        (backend, agents)
    }

    #[test]
    fn dispatch_leaves_read_slot_untouched() {
        let (mut backend, agents) = backend_with(96, 1);
        let ring = PingPong::new(2).unwrap();
        let plan = FramePlan {
            read: ring.read_slot(0),
            write: ring.write_slot(0),
            variant: StageVariant::TwoPass,
        };
        backend.dispatch(&plan).unwrap();
        assert_eq!(backend.generation(plan.read).unwrap(), agents.as_slice());
        assert_ne!(backend.generation(plan.write).unwrap(), agents.as_slice());
    }

    #[test]
    fn force_buffer_sized_per_agent() {
        let (backend, _) = backend_with(70, 2);
        assert_eq!(backend.forces().len(), 70);
        assert_eq!(std::mem::size_of_val(backend.forces()), 70 * 2 * 4);
    }

    #[test]
    fn upload_rejects_wrong_population() {
        let (mut backend, _) = backend_with(16, 3);
        assert!(matches!(
            backend.upload_population(&[Agent::default(); 15]),
            Err(BackendError::PopulationMismatch { .. })
        ));
    }

    #[test]
    fn aliased_plan_is_refused() {
        let (mut backend, _) = backend_with(8, 4);
        let ring = PingPong::new(2).unwrap();
        let slot = ring.read_slot(0);
        let plan = FramePlan {
            read: slot,
            write: slot,
            variant: StageVariant::SinglePass,
        };
        assert!(matches!(
            backend.dispatch(&plan),
            Err(BackendError::AliasedSlots(_))
        ));
    }
}
