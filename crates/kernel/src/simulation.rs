use crate::accumulate::{Force, accumulate_forces};
use crate::backend::{ComputeBackend, FramePlan, GroupSizes, StageVariant};
use crate::config::SimConfig;
use crate::dispatch::idle_lanes;
use crate::error::SimError;
use crate::integrate::{integrate, integrate_fused};
use crate::params::{ParamBlock, randomized_params};
use crate::store::{PingPong, Slot, spawn_population};
use pps_common::{Agent, ParamName, SwarmParams};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    /// Buffers allocated, no population uploaded yet.
    Idle,
    Running,
}

/// What one call to `run_frame` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Generation now held by `exposed`.
    pub generation: u64,
    pub exposed: Slot,
    pub params_uploaded: bool,
    pub plan: FramePlan,
}

/// Frame driver. Owns the backend, the parameter block and the slot ring.
///
/// The host owns the loop and calls `run_frame` once per tick; commands that
/// change parameters or the population take effect at the next frame boundary.
pub struct Simulation<B: ComputeBackend> {
    backend: B,
    config: SimConfig,
    ring: PingPong,
    params: ParamBlock,
    rng: StdRng,
    state: SimState,
    frame: u64,
    exposed: Slot,
}

impl<B: ComputeBackend> Simulation<B> {
    pub fn new(backend: B, config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        if backend.agent_count() != config.agent_count {
            return Err(SimError::InvalidConfig(format!(
                "{} backend holds {} agents, config asks for {}",
                backend.name(),
                backend.agent_count(),
                config.agent_count
            )));
        }
        if backend.slot_count() != config.buffer_count {
            return Err(SimError::InvalidConfig(format!(
                "{} backend has {} generation buffers, config asks for {}",
                backend.name(),
                backend.slot_count(),
                config.buffer_count
            )));
        }
        let ring = PingPong::new(config.buffer_count)?;
        let params = ParamBlock::new(config.params)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let groups = config.group_sizes();
        for (stage, size) in [("accumulate", groups.accumulate), ("integrate", groups.integrate)] {
            let idle = idle_lanes(config.agent_count, size);
            if idle > 0 {
                tracing::warn!(
                    stage,
                    agents = config.agent_count,
                    group_size = size,
                    idle,
                    "population is not a multiple of the group size; final group runs partially"
                );
            }
        }

        let exposed = ring.read_slot(0);
        Ok(Self {
            backend,
            config,
            ring,
            params,
            rng,
            state: SimState::Idle,
            frame: 0,
            exposed,
        })
    }

    /// Sample a population, upload it with the current parameters and start
    /// at generation 0.
    pub fn initialize(&mut self) -> Result<(), SimError> {
        self.upload_fresh_population()?;
        let params = self.params.snapshot();
        self.backend.upload_params(&params)?;
        self.params.take_dirty();
        tracing::info!(
            backend = self.backend.name(),
            agents = self.config.agent_count,
            variant = %self.config.variant,
            %params,
            "simulation initialized"
        );
        Ok(())
    }

    /// Advance one generation.
    pub fn run_frame(&mut self) -> Result<FrameReport, SimError> {
        if self.state != SimState::Running {
            return Err(SimError::NotInitialized);
        }
        let span = tracing::info_span!("run_frame", frame = self.frame);
        let _guard = span.enter();

        let params = self.params.snapshot();
        let params_uploaded = self.params.is_dirty();
        if params_uploaded {
            self.backend.upload_params(&params)?;
            self.params.take_dirty();
            tracing::debug!(%params, "parameters uploaded");
        }

        let plan = FramePlan {
            read: self.ring.read_slot(self.frame),
            write: self.ring.write_slot(self.frame),
            variant: self.config.variant,
        };
        tracing::trace!(read = plan.read.index(), write = plan.write.index(), "dispatch");
        self.backend.dispatch(&plan)?;

        self.frame += 1;
        self.exposed = plan.write;
        Ok(FrameReport {
            generation: self.frame,
            exposed: self.exposed,
            params_uploaded,
            plan,
        })
    }

    /// Replace the population with a fresh sample. Parameters are untouched.
    /// From `Idle` this behaves like `initialize`.
    pub fn reset(&mut self) -> Result<(), SimError> {
        if self.state == SimState::Idle {
            return self.initialize();
        }
        self.upload_fresh_population()?;
        tracing::info!(agents = self.config.agent_count, "population reset");
        Ok(())
    }

    /// Draw new parameters from their randomize ranges, then reset.
    pub fn randomize_and_reset(&mut self) -> Result<SwarmParams, SimError> {
        let params = randomized_params(&mut self.rng);
        self.params.replace(params)?;
        tracing::info!(%params, "parameters randomized");
        self.reset()?;
        Ok(params)
    }

    /// Validate and apply one field; the new set is uploaded before the next
    /// frame dispatches.
    pub fn set_parameter(&mut self, name: ParamName, value: f32) -> Result<SwarmParams, SimError> {
        Ok(self.params.set(name, value)?)
    }

    pub fn set_params(&mut self, params: SwarmParams) -> Result<(), SimError> {
        Ok(self.params.replace(params)?)
    }

    pub fn params(&self) -> SwarmParams {
        self.params.snapshot()
    }

    /// Frames run since the last initialize or reset.
    pub fn generation(&self) -> u64 {
        self.frame
    }

    /// Slot the renderer should draw. Stays valid until the next `run_frame`.
    pub fn exposed_slot(&self) -> Slot {
        self.exposed
    }

    /// Copy of the exposed generation.
    pub fn population(&mut self) -> Result<Vec<Agent>, SimError> {
        if self.state != SimState::Running {
            return Err(SimError::NotInitialized);
        }
        Ok(self.backend.read_population(self.exposed)?)
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn upload_fresh_population(&mut self) -> Result<(), SimError> {
        let agents = spawn_population(self.config.agent_count, &mut self.rng);
        self.backend.upload_population(&agents)?;
        self.frame = 0;
        self.exposed = self.ring.read_slot(0);
        self.state = SimState::Running;
        Ok(())
    }
}

/// One frame as a pure function of the previous generation.
pub fn step_population(read: &[Agent], params: &SwarmParams, variant: StageVariant) -> Vec<Agent> {
    let groups = GroupSizes::default();
    let mut write = vec![Agent::default(); read.len()];
    match variant {
        StageVariant::TwoPass => {
            let mut forces = vec![Force::default(); read.len()];
            accumulate_forces(read, params, &mut forces, groups.accumulate);
            integrate(read, &forces, params, &mut write, groups.integrate);
        }
        StageVariant::SinglePass => integrate_fused(read, params, &mut write, groups.integrate),
    }
    write
}

/// FNV-1a over the byte image of a population, for determinism checks.
pub fn population_hash(agents: &[Agent]) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
    for &b in bytemuck::cast_slice::<Agent, u8>(agents) {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuBackend;
    use glam::Vec2;
    use pps_common::{DOMAIN_MAX, DOMAIN_MIN};
    use std::f32::consts::FRAC_PI_2;

    fn config(n: usize, seed: u64) -> SimConfig {
        SimConfig {
            agent_count: n,
            seed: Some(seed),
            ..SimConfig::default()
        }
    }

    fn sim(n: usize, seed: u64) -> Simulation<CpuBackend> {
        let c = config(n, seed);
        let backend = CpuBackend::new(n, c.buffer_count, c.group_sizes()).unwrap();
        Simulation::new(backend, c).unwrap()
    }

    /// Load a hand-placed population through the backend seam.
    fn place(sim: &mut Simulation<CpuBackend>, agents: &[Agent]) {
        sim.initialize().unwrap();
        sim.backend_mut().upload_population(agents).unwrap();
    }

    #[test]
    fn run_frame_requires_initialize() {
        let mut s = sim(16, 1);
        assert_eq!(s.state(), SimState::Idle);
        assert!(matches!(s.run_frame(), Err(SimError::NotInitialized)));
        assert!(matches!(s.population(), Err(SimError::NotInitialized)));
        s.initialize().unwrap();
        assert_eq!(s.state(), SimState::Running);
        assert_eq!(s.run_frame().unwrap().generation, 1);
    }

    #[test]
    fn backend_size_mismatch_is_rejected() {
        let backend = CpuBackend::new(10, 2, GroupSizes::default()).unwrap();
        assert!(matches!(
            Simulation::new(backend, config(12, 0)),
            Err(SimError::InvalidConfig(_))
        ));
        let backend = CpuBackend::new(12, 3, GroupSizes::default()).unwrap();
        assert!(matches!(
            Simulation::new(backend, config(12, 0)),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn same_seed_same_generations() {
        let mut a = sim(300, 42);
        let mut b = sim(300, 42);
        a.initialize().unwrap();
        b.initialize().unwrap();
        for _ in 0..10 {
            a.run_frame().unwrap();
            b.run_frame().unwrap();
            assert_eq!(
                population_hash(&a.population().unwrap()),
                population_hash(&b.population().unwrap())
            );
        }
    }

    #[test]
    fn driver_matches_pure_step() {
        let mut s = sim(128, 3);
        s.initialize().unwrap();
        let mut expected = s.population().unwrap();
        for _ in 0..5 {
            expected = step_population(&expected, &s.params(), StageVariant::TwoPass);
            s.run_frame().unwrap();
            assert_eq!(s.population().unwrap(), expected);
        }
    }

    #[test]
    fn single_pass_variant_matches_two_pass() {
        let mut two = sim(200, 8);
        let mut c = config(200, 8);
        c.variant = StageVariant::SinglePass;
        let backend = CpuBackend::new(200, 2, c.group_sizes()).unwrap();
        let mut one = Simulation::new(backend, c).unwrap();
        two.initialize().unwrap();
        one.initialize().unwrap();
        for _ in 0..6 {
            two.run_frame().unwrap();
            one.run_frame().unwrap();
        }
        assert_eq!(
            population_hash(&two.population().unwrap()),
            population_hash(&one.population().unwrap())
        );
    }

    #[test]
    fn exposed_slot_is_never_the_next_write() {
        for k in [2, 3] {
            let mut c = config(32, 5);
            c.buffer_count = k;
            let backend = CpuBackend::new(32, k, c.group_sizes()).unwrap();
            let mut s = Simulation::new(backend, c).unwrap();
            s.initialize().unwrap();
            for _ in 0..12 {
                let report = s.run_frame().unwrap();
                assert_ne!(report.plan.read, report.plan.write);
                let shown = s.exposed_slot();
                let shown_agents = s.population().unwrap();
                let next = s.run_frame().unwrap();
                assert_ne!(next.plan.write, shown);
                assert_eq!(s.backend().generation(shown).unwrap(), shown_agents.as_slice());
            }
        }
    }

    #[test]
    fn corners_stay_put_without_motion_or_steering() {
        let mut s = sim(4, 0);
        s.set_params(SwarmParams::new(0.0, 2.0, 0.0, 0.0)).unwrap();
        let corners = [
            Agent::new(Vec2::new(-0.5, -0.5), 0.3),
            Agent::new(Vec2::new(0.5, -0.5), 1.7),
            Agent::new(Vec2::new(0.5, 0.5), 3.9),
            Agent::new(Vec2::new(-0.5, 0.5), 5.5),
        ];
        place(&mut s, &corners);
        s.run_frame().unwrap();
        assert_eq!(s.population().unwrap(), corners.to_vec());
    }

    #[test]
    fn pair_steers_only_by_each_other() {
        let mut s = sim(2, 0);
        s.set_params(SwarmParams::new(0.0, 0.1, 0.0, 0.1)).unwrap();
        // both face +y; b sits on a's right, a sits on b's left
        let pair = [
            Agent::new(Vec2::new(0.0, 0.0), FRAC_PI_2),
            Agent::new(Vec2::new(0.05, 0.0), FRAC_PI_2),
        ];
        place(&mut s, &pair);
        s.run_frame().unwrap();
        let next = s.population().unwrap();
        assert!((next[0].heading - (FRAC_PI_2 + 0.1)).abs() < 1e-6);
        assert!((next[1].heading - (FRAC_PI_2 - 0.1)).abs() < 1e-6);
        assert_eq!(next[0].position, pair[0].position);
    }

    #[test]
    fn params_upload_once_per_change() {
        let mut s = sim(8, 2);
        s.initialize().unwrap();
        assert!(!s.run_frame().unwrap().params_uploaded);
        s.set_parameter(ParamName::Speed, 0.02).unwrap();
        assert!(s.run_frame().unwrap().params_uploaded);
        assert!(!s.run_frame().unwrap().params_uploaded);
        assert_eq!(s.backend().params().speed, 0.02);
    }

    #[test]
    fn rejected_parameter_keeps_prior_value() {
        let mut s = sim(8, 2);
        let before = s.params();
        assert!(s.set_parameter(ParamName::NeighborhoodRadius, f32::NAN).is_err());
        assert!(s.set_parameter(ParamName::Speed, -0.1).is_err());
        assert_eq!(s.params(), before);
    }

    #[test]
    fn extreme_rotation_is_rejected_and_headings_stay_wrapped() {
        let mut s = sim(5, 0);
        s.set_params(SwarmParams::new(0.0, 0.5, 0.0, 0.1)).unwrap();
        assert!(s.set_parameter(ParamName::LocalRotation, f32::MAX).is_err());
        assert!(s.set_params(SwarmParams::new(0.0, 0.5, 0.0, f32::MAX)).is_err());
        s.set_parameter(ParamName::LocalRotation, ParamName::LocalRotation.max_magnitude())
            .unwrap();
        s.set_parameter(ParamName::GlobalRotation, -ParamName::GlobalRotation.max_magnitude())
            .unwrap();
        let cluster = [
            Agent::new(Vec2::new(0.0, 0.0), 0.0),
            Agent::new(Vec2::new(0.1, 0.0), 1.0),
            Agent::new(Vec2::new(0.0, 0.1), 2.0),
            Agent::new(Vec2::new(-0.1, 0.0), 3.0),
            Agent::new(Vec2::new(0.9, 0.9), 4.0),
        ];
        place(&mut s, &cluster);
        for _ in 0..10 {
            s.run_frame().unwrap();
            for agent in s.population().unwrap() {
                assert!((0.0..std::f32::consts::TAU).contains(&agent.heading));
            }
        }
        let far = crate::accumulate::scan_neighbors(&s.population().unwrap(), 4, 0.5);
        assert_eq!(far.left + far.right, 0);
    }

    #[test]
    fn reset_draws_fresh_population_and_keeps_params() {
        let mut s = sim(512, 11);
        s.initialize().unwrap();
        s.set_parameter(ParamName::LocalRotation, 0.3).unwrap();
        for _ in 0..3 {
            s.run_frame().unwrap();
        }
        let before = s.population().unwrap();
        let params = s.params();

        s.reset().unwrap();
        assert_eq!(s.generation(), 0);
        assert_eq!(s.params(), params);
        let fresh = s.population().unwrap();
        assert_ne!(population_hash(&fresh), population_hash(&before));

        // the next frame reads the fresh sample
        let expected = step_population(&fresh, &params, StageVariant::TwoPass);
        s.run_frame().unwrap();
        assert_eq!(s.population().unwrap(), expected);
    }

    #[test]
    fn resets_cover_the_domain_uniformly() {
        let mut s = sim(256, 13);
        s.initialize().unwrap();
        let mut quadrants = [0usize; 4];
        for _ in 0..40 {
            s.reset().unwrap();
            for a in s.population().unwrap() {
                assert!((DOMAIN_MIN..DOMAIN_MAX).contains(&a.position[0]));
                let q = (a.position[0] > 0.0) as usize + 2 * (a.position[1] > 0.0) as usize;
                quadrants[q] += 1;
            }
        }
        // 10240 samples, 2560 expected per quadrant
        for q in quadrants {
            assert!((2300..2820).contains(&q), "quadrant count {q}");
        }
    }

    #[test]
    fn randomize_and_reset_replaces_params() {
        let mut s = sim(64, 21);
        s.initialize().unwrap();
        s.run_frame().unwrap();
        let params = s.randomize_and_reset().unwrap();
        assert_eq!(s.params(), params);
        assert_eq!(s.generation(), 0);
        assert!(s.run_frame().unwrap().params_uploaded);
    }

    #[test]
    fn reset_from_idle_initializes() {
        let mut s = sim(16, 4);
        s.reset().unwrap();
        assert_eq!(s.state(), SimState::Running);
        assert!(s.run_frame().is_ok());
    }

    #[test]
    fn hash_distinguishes_populations() {
        let a = [Agent::new(Vec2::new(0.1, 0.2), 0.3)];
        let b = [Agent::new(Vec2::new(0.1, 0.2), 0.30001)];
        assert_eq!(population_hash(&a), population_hash(&a));
        assert_ne!(population_hash(&a), population_hash(&b));
    }
}
