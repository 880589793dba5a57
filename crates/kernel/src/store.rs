//! Agent State Store: population sampling and the generation-buffer ring.
//!
//! Buffer roles are a pure function of the frame index. Callers ask for the
//! read and write slot of a frame; they never hold on to a slot across frames.

use crate::error::BackendError;
use glam::Vec2;
use pps_common::{Agent, DOMAIN_MAX, DOMAIN_MIN, wrap_heading};
use rand::Rng;
use std::f32::consts::TAU;

/// Opaque handle to one generation buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot(usize);

impl Slot {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Maps frame indices onto a ring of `k >= 2` generation buffers.
///
/// Frame `f` reads slot `f mod k` and writes slot `(f + 1) mod k`, so the
/// slot it exposes is the one frame `f + 1` reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPong {
    slots: usize,
}

impl PingPong {
    pub fn new(slots: usize) -> Result<Self, BackendError> {
        if slots < 2 {
            return Err(BackendError::TooFewSlots(slots));
        }
        Ok(Self { slots })
    }

    pub fn slot_count(&self) -> usize {
        self.slots
    }

    pub fn read_slot(&self, frame: u64) -> Slot {
        Slot((frame % self.slots as u64) as usize)
    }

    pub fn write_slot(&self, frame: u64) -> Slot {
        Slot(((frame + 1) % self.slots as u64) as usize)
    }

    /// Slot holding the generation produced by `frame`.
    pub fn exposed_slot(&self, frame: u64) -> Slot {
        self.write_slot(frame)
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + use<> {
        (0..self.slots).map(Slot)
    }
}

/// Sample `n` agents: positions uniform in the domain, headings uniform in `[0, 2π)`.
pub fn spawn_population<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Agent> {
    (0..n)
        .map(|_| {
            let x = rng.gen_range(DOMAIN_MIN..DOMAIN_MAX);
            let y = rng.gen_range(DOMAIN_MIN..DOMAIN_MAX);
            let heading = wrap_heading(rng.gen_range(0.0..TAU));
            Agent::new(Vec2::new(x, y), heading)
        })
        .collect()
}

/// Host-memory generation buffers for the CPU backend.
#[derive(Debug, Clone)]
pub struct AgentStore {
    slots: Vec<Vec<Agent>>,
    agent_count: usize,
}

impl AgentStore {
    pub fn new(agent_count: usize, ring: PingPong) -> Self {
        Self {
            slots: vec![vec![Agent::default(); agent_count]; ring.slot_count()],
            agent_count,
        }
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Write `agents` into every slot so the first frame reads a defined state
    /// whatever its parity.
    pub fn initialize(&mut self, agents: &[Agent]) -> Result<(), BackendError> {
        if agents.len() != self.agent_count {
            return Err(BackendError::PopulationMismatch {
                expected: self.agent_count,
                actual: agents.len(),
            });
        }
        for slot in &mut self.slots {
            slot.copy_from_slice(agents);
        }
        Ok(())
    }

    pub fn generation(&self, slot: Slot) -> Result<&[Agent], BackendError> {
        self.check(slot)?;
        Ok(&self.slots[slot.0])
    }

    /// Borrow one slot read-only and another mutably for the span of a frame.
    pub fn frame_view(
        &mut self,
        read: Slot,
        write: Slot,
    ) -> Result<(&[Agent], &mut [Agent]), BackendError> {
        self.check(read)?;
        self.check(write)?;
        let (r, w) = (read.0, write.0);
        if r == w {
            return Err(BackendError::AliasedSlots(r));
        }
        if r < w {
            let (lo, hi) = self.slots.split_at_mut(w);
            Ok((&lo[r], &mut hi[0]))
        } else {
            let (lo, hi) = self.slots.split_at_mut(r);
            Ok((&hi[0], &mut lo[w]))
        }
    }

    fn check(&self, slot: Slot) -> Result<(), BackendError> {
        if slot.0 >= self.slots.len() {
            return Err(BackendError::SlotOutOfRange {
                slot: slot.0,
                count: self.slots.len(),
            });
        }
        Ok(())
    }
}
