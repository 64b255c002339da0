//! Mixed-unit pallet stacking.
//!
//! Given a pallet and a set of box types, produces a deterministic stacking
//! plan with per-layer grouping and summary metrics. Two engines are
//! available: a height-map packer that builds columns and fills gaps, and a
//! layered search that stacks guillotine-packed layers per orientation map.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod guillotine;
pub mod heightmap;
pub mod orientation;
pub mod packer;
pub mod render;
pub mod solver;
pub mod strategy;
pub mod types;

pub use config::{Engine, PackConfig};
pub use error::{Error, Result};
pub use solver::{PackRequest, Solver};
pub use types::{MixedPalletResult, PalletLayer, PalletSpec, Placement, UnitSummary, UnitType};

/// Runs the default engine with default settings.
pub fn calculate_mixed_pallet(units: &[UnitType], pallet: &PalletSpec) -> MixedPalletResult {
    Solver::new(units.to_vec(), *pallet).solve()
}
