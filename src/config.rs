use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which packing engine answers a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Engine {
    /// Grid-based greedy placement with per-type column pinning.
    #[default]
    HeightMap,
    /// Best of the single- and mixed-orientation layer stacks.
    Layered,
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::HeightMap => write!(f, "height-map"),
            Engine::Layered => write!(f, "layered"),
        }
    }
}

/// Tunable limits of a packing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackConfig {
    /// Height-map cell size, in pallet length units.
    pub grid_resolution: f64,
    /// Upper bound on height-map placement iterations.
    pub max_iterations: usize,
    /// Anchors with less headroom than this are never considered.
    pub min_headroom: f64,
    /// Upper bound on layers per layered stack.
    pub max_layers: usize,
    /// Largest "switch after N layers" tried by the mixed-layer search.
    pub max_switch_after: usize,
    /// Cap on enumerated per-type orientation assignments.
    pub max_orientation_maps: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 0.5,
            max_iterations: 5000,
            min_headroom: 0.5,
            max_layers: 100,
            max_switch_after: 15,
            max_orientation_maps: 36,
        }
    }
}

impl PackConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.grid_resolution.is_finite() && self.grid_resolution > 0.0) {
            return Err(Error::ConfigError(format!(
                "grid resolution must be positive, got {}",
                self.grid_resolution
            )));
        }
        if !(self.min_headroom.is_finite() && self.min_headroom >= 0.0) {
            return Err(Error::ConfigError(format!(
                "min headroom must be zero or positive, got {}",
                self.min_headroom
            )));
        }
        for (label, v) in [
            ("max iterations", self.max_iterations),
            ("max layers", self.max_layers),
            ("max switch after", self.max_switch_after),
            ("max orientation maps", self.max_orientation_maps),
        ] {
            if v == 0 {
                return Err(Error::ConfigError(format!("{label} must be non-zero")));
            }
        }
        Ok(())
    }
}
