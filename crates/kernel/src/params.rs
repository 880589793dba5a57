//! Parameter Block: the current `SwarmParams` plus a dirty flag that tells the
//! driver to push the whole set to the backend before the next dispatch.

use pps_common::{ParamError, ParamName, SwarmParams};
use rand::Rng;

#[derive(Debug, Clone)]
pub struct ParamBlock {
    current: SwarmParams,
    dirty: bool,
}

impl ParamBlock {
    /// A freshly created block is dirty so the first frame uploads it.
    pub fn new(params: SwarmParams) -> Result<Self, ParamError> {
        params.validate()?;
        Ok(Self {
            current: params,
            dirty: true,
        })
    }

    /// Copy of the current set. Frames dispatch against this copy.
    pub fn snapshot(&self) -> SwarmParams {
        self.current
    }

    /// Replace one field. On error the block is unchanged.
    pub fn set(&mut self, name: ParamName, value: f32) -> Result<SwarmParams, ParamError> {
        let next = self.current.with(name, value)?;
        self.current = next;
        self.dirty = true;
        tracing::debug!(%name, value, "parameter updated");
        Ok(next)
    }

    /// Replace the whole set. On error the block is unchanged.
    pub fn replace(&mut self, params: SwarmParams) -> Result<(), ParamError> {
        params.validate()?;
        self.current = params;
        self.dirty = true;
        tracing::debug!(%params, "parameters replaced");
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clear the dirty flag, returning whether it was set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Draw every field from its randomize range, rounded to three decimals.
pub fn randomized_params<R: Rng + ?Sized>(rng: &mut R) -> SwarmParams {
    let mut draw = |name: ParamName| round3(rng.gen_range(name.randomize_range()));
    let params = SwarmParams::new(
        draw(ParamName::Speed),
        draw(ParamName::NeighborhoodRadius),
        draw(ParamName::GlobalRotation),
        draw(ParamName::LocalRotation),
    );
    debug_assert!(params.validate().is_ok(), "randomized {params} out of bounds");
    params
}

fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}
