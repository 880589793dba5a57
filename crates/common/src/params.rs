use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Errors raised when a parameter edit is rejected at the boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: ParamName, value: f32 },
    #[error("{name} must be non-negative, got {value}")]
    Negative { name: ParamName, value: f32 },
    #[error("{name} magnitude must not exceed {max}, got {value}")]
    TooLarge { name: ParamName, value: f32, max: f32 },
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// The four tunables of the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamName {
    Speed,
    NeighborhoodRadius,
    GlobalRotation,
    LocalRotation,
}

impl ParamName {
    pub const ALL: [ParamName; 4] = [
        ParamName::Speed,
        ParamName::NeighborhoodRadius,
        ParamName::GlobalRotation,
        ParamName::LocalRotation,
    ];

    /// Name used by the interaction contract.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Speed => "speed",
            Self::NeighborhoodRadius => "neighborhoodRadius",
            Self::GlobalRotation => "globalRotation",
            Self::LocalRotation => "localRotation",
        }
    }

    /// Human-readable label for UI panels.
    pub fn label(self) -> &'static str {
        match self {
            Self::Speed => "Speed",
            Self::NeighborhoodRadius => "Neighborhood radius",
            Self::GlobalRotation => "Global rotation",
            Self::LocalRotation => "Local rotation",
        }
    }

    pub fn allows_negative(self) -> bool {
        matches!(self, Self::GlobalRotation)
    }

    /// Largest accepted magnitude. A step of half the domain, a radius that
    /// covers the whole torus, and half a turn per frame.
    pub fn max_magnitude(self) -> f32 {
        match self {
            Self::Speed => 1.0,
            Self::NeighborhoodRadius => 2.0,
            Self::GlobalRotation | Self::LocalRotation => PI,
        }
    }

    /// Range sampled by "randomize and reset".
    pub fn randomize_range(self) -> RangeInclusive<f32> {
        match self {
            Self::Speed => 0.0..=0.01,
            Self::NeighborhoodRadius => 0.0..=0.5,
            Self::GlobalRotation => -PI * 0.1..=PI * 0.1,
            Self::LocalRotation => 0.0..=PI * 0.1,
        }
    }

    /// Range exposed by interactive sliders. Covers every preset.
    pub fn slider_range(self) -> RangeInclusive<f32> {
        match self {
            Self::Speed => 0.0..=0.03,
            Self::NeighborhoodRadius => 0.0..=0.5,
            Self::GlobalRotation => -0.5..=0.5,
            Self::LocalRotation => 0.0..=0.5,
        }
    }

    /// Check a candidate value for this field.
    pub fn validate(self, value: f32) -> Result<f32, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite { name: self, value });
        }
        if value < 0.0 && !self.allows_negative() {
            return Err(ParamError::Negative { name: self, value });
        }
        let max = self.max_magnitude();
        if value.abs() > max {
            return Err(ParamError::TooLarge {
                name: self,
                value,
                max,
            });
        }
        Ok(value)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "speed" => Ok(Self::Speed),
            "neighborhoodRadius" | "neighborhood_radius" | "radius" => {
                Ok(Self::NeighborhoodRadius)
            }
            "globalRotation" | "global_rotation" => Ok(Self::GlobalRotation),
            "localRotation" | "local_rotation" => Ok(Self::LocalRotation),
            other => Err(ParamError::UnknownParameter(other.to_string())),
        }
    }
}

/// Global tunables read by every stage of a frame.
///
/// Always edited as a whole: `with` returns a new validated set and leaves
/// `self` untouched on error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmParams {
    pub speed: f32,
    #[serde(alias = "neighborhoodRadius")]
    pub neighborhood_radius: f32,
    #[serde(alias = "globalRotation")]
    pub global_rotation: f32,
    #[serde(alias = "localRotation")]
    pub local_rotation: f32,
}

/// Named parameter sets.
pub const PRESETS: &[(&str, SwarmParams)] = &[
    ("default", SwarmParams::DEFAULT),
    ("frozen", SwarmParams::new(0.0, 0.0, 0.0, 0.0)),
    ("vortex", SwarmParams::new(0.02, 0.09, 0.40, 0.16)),
    ("drift", SwarmParams::new(0.004, 0.261, 0.009, 0.005)),
];

impl SwarmParams {
    pub const DEFAULT: SwarmParams = SwarmParams::new(0.006, 0.09, -0.1, 0.12);

    /// Unchecked constructor for constants; run `validate` on anything user-supplied.
    pub const fn new(
        speed: f32,
        neighborhood_radius: f32,
        global_rotation: f32,
        local_rotation: f32,
    ) -> Self {
        Self {
            speed,
            neighborhood_radius,
            global_rotation,
            local_rotation,
        }
    }

    pub fn preset(name: &str) -> Result<Self, ParamError> {
        PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, params)| *params)
            .ok_or_else(|| ParamError::UnknownPreset(name.to_string()))
    }

    pub fn get(&self, name: ParamName) -> f32 {
        match name {
            ParamName::Speed => self.speed,
            ParamName::NeighborhoodRadius => self.neighborhood_radius,
            ParamName::GlobalRotation => self.global_rotation,
            ParamName::LocalRotation => self.local_rotation,
        }
    }

    /// Return a copy with one field replaced, after validating the new value.
    pub fn with(&self, name: ParamName, value: f32) -> Result<Self, ParamError> {
        let value = name.validate(value)?;
        let mut next = *self;
        match name {
            ParamName::Speed => next.speed = value,
            ParamName::NeighborhoodRadius => next.neighborhood_radius = value,
            ParamName::GlobalRotation => next.global_rotation = value,
            ParamName::LocalRotation => next.local_rotation = value,
        }
        Ok(next)
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        for name in ParamName::ALL {
            name.validate(self.get(name))?;
        }
        Ok(())
    }

    pub fn to_uniform(&self) -> ParamsUniform {
        ParamsUniform {
            values: [
                self.speed,
                self.neighborhood_radius,
                self.global_rotation,
                self.local_rotation,
            ],
        }
    }
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SwarmParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "speed={:.3} radius={:.3} global={:.3} local={:.3}",
            self.speed, self.neighborhood_radius, self.global_rotation, self.local_rotation
        )
    }
}

/// GPU image of `SwarmParams`: `speed, radius, global, local`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParamsUniform {
    pub values: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SwarmParams::default().validate().is_ok());
        for (_, preset) in PRESETS {
            assert!(preset.validate().is_ok());
        }
    }

    #[test]
    fn presets_fit_slider_ranges() {
        for (name, preset) in PRESETS {
            for field in ParamName::ALL {
                assert!(
                    field.slider_range().contains(&preset.get(field)),
                    "{name}.{field} outside slider range"
                );
            }
        }
    }

    #[test]
    fn with_replaces_single_field() {
        let p = SwarmParams::default();
        let q = p.with(ParamName::Speed, 0.5).unwrap();
        assert_eq!(q.speed, 0.5);
        assert_eq!(q.neighborhood_radius, p.neighborhood_radius);
        assert_eq!(q.global_rotation, p.global_rotation);
        assert_eq!(q.local_rotation, p.local_rotation);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let p = SwarmParams::default();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            for name in ParamName::ALL {
                assert!(matches!(
                    p.with(name, bad),
                    Err(ParamError::NonFinite { .. })
                ));
            }
        }
    }

    #[test]
    fn negative_values_only_allowed_for_global_rotation() {
        let p = SwarmParams::default();
        assert!(p.with(ParamName::GlobalRotation, -0.3).is_ok());
        assert_eq!(
            p.with(ParamName::Speed, -0.1),
            Err(ParamError::Negative {
                name: ParamName::Speed,
                value: -0.1
            })
        );
        assert!(p.with(ParamName::NeighborhoodRadius, -1.0).is_err());
        assert!(p.with(ParamName::LocalRotation, -1.0).is_err());
    }

    #[test]
    fn oversized_finite_values_are_rejected() {
        let p = SwarmParams::default();
        for name in ParamName::ALL {
            let max = name.max_magnitude();
            assert!(p.with(name, max).is_ok(), "{name} at its bound");
            assert!(matches!(
                p.with(name, f32::MAX),
                Err(ParamError::TooLarge { .. })
            ));
        }
        assert!(matches!(
            p.with(ParamName::GlobalRotation, -f32::MAX),
            Err(ParamError::TooLarge { .. })
        ));
        assert!(SwarmParams::new(0.0, 0.5, 0.0, f32::MAX).validate().is_err());
    }

    #[test]
    fn slider_and_randomize_ranges_fit_the_bounds() {
        for name in ParamName::ALL {
            let max = name.max_magnitude();
            for range in [name.slider_range(), name.randomize_range()] {
                assert!(range.start().abs() <= max && range.end().abs() <= max);
            }
        }
    }

    #[test]
    fn names_parse_in_both_spellings() {
        assert_eq!(
            "neighborhoodRadius".parse::<ParamName>().unwrap(),
            ParamName::NeighborhoodRadius
        );
        assert_eq!(
            "local_rotation".parse::<ParamName>().unwrap(),
            ParamName::LocalRotation
        );
        assert!(matches!(
            "mass".parse::<ParamName>(),
            Err(ParamError::UnknownParameter(_))
        ));
        for name in ParamName::ALL {
            assert_eq!(name.as_str().parse::<ParamName>().unwrap(), name);
        }
    }

    #[test]
    fn preset_lookup() {
        assert_eq!(SwarmParams::preset("frozen").unwrap().speed, 0.0);
        assert!(matches!(
            SwarmParams::preset("nope"),
            Err(ParamError::UnknownPreset(_))
        ));
    }

    #[test]
    fn uniform_layout_matches_field_order() {
        let p = SwarmParams::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(p.to_uniform().values, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(std::mem::size_of::<ParamsUniform>(), 16);
    }
}
