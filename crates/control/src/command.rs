use pps_common::{ParamName, SwarmParams};

/// A request from the interaction surface, applied by the frame loop at the
/// next frame boundary.
///
/// Commands are validated before they are queued, so the loop only ever sees
/// values it can apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Replace one parameter.
    SetParameter { name: ParamName, value: f32 },
    /// Replace the whole parameter set.
    SetParams(SwarmParams),
    /// Fresh population, parameters untouched.
    Reset,
    /// Random parameters, then a fresh population.
    RandomizeAndReset,
    /// Switch to a named parameter set.
    ApplyPreset(String),
}

impl Command {
    /// Whether applying the command replaces the population.
    pub fn resets_population(&self) -> bool {
        matches!(self, Self::Reset | Self::RandomizeAndReset)
    }
}
