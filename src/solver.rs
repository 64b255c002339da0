use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::aggregate::{self, NO_UNITS_WARNING};
use crate::config::{Engine, PackConfig};
use crate::error::{Error, Result};
use crate::heightmap::{self, MAX_GRID_CELLS};
use crate::packer::HeightMapPacker;
use crate::strategy::StrategySearch;
use crate::types::{MixedPalletResult, PalletSpec, TOLERANCE, UnitType};

pub const CANCELLED_WARNING: &str = "Calculation cancelled before completion";

fn grid_too_large(engine: Engine, pallet: &PalletSpec, config: &PackConfig) -> bool {
    engine == Engine::HeightMap
        && heightmap::grid_cells(pallet.length, pallet.width, config.grid_resolution).is_none()
}

/// Everything needed to run one calculation, as accepted by the CLI and server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackRequest {
    pub units: Vec<UnitType>,
    pub pallet: PalletSpec,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub config: PackConfig,
}

impl PackRequest {
    /// Checks every field and builds a solver for the request.
    pub fn into_solver(self) -> Result<Solver> {
        self.pallet.validate()?;
        self.config.validate()?;
        if grid_too_large(self.engine, &self.pallet, &self.config) {
            return Err(Error::ConfigError(format!(
                "a {}x{} pallet at grid resolution {} needs more than {} cells",
                self.pallet.length,
                self.pallet.width,
                self.config.grid_resolution,
                MAX_GRID_CELLS
            )));
        }
        let mut seen = HashSet::new();
        for unit in &self.units {
            unit.validate()?;
            if !seen.insert(unit.id.as_str()) {
                return Err(Error::DuplicateUnitId(unit.id.clone()));
            }
        }
        Ok(Solver::new(self.units, self.pallet)
            .with_engine(self.engine)
            .with_config(self.config))
    }
}

pub struct Solver {
    units: Vec<UnitType>,
    pallet: PalletSpec,
    engine: Engine,
    config: PackConfig,
    cancelled: Arc<AtomicBool>,
}

impl Solver {
    pub fn new(units: Vec<UnitType>, pallet: PalletSpec) -> Self {
        Self {
            units,
            pallet,
            engine: Engine::default(),
            config: PackConfig::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_config(mut self, config: PackConfig) -> Self {
        self.config = config;
        self
    }

    /// Flag that stops a running `solve` early when set.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn units(&self) -> &[UnitType] {
        &self.units
    }

    pub fn pallet(&self) -> &PalletSpec {
        &self.pallet
    }

    pub fn solve(&self) -> MixedPalletResult {
        if self.units.is_empty() {
            return aggregate::empty_result(&self.pallet, NO_UNITS_WARNING);
        }

        let (packable, mut warnings) = self.prepare();
        let (placements, cancelled) = if packable.is_empty() {
            (Vec::new(), false)
        } else {
            match self.engine {
                Engine::HeightMap => {
                    let outcome = HeightMapPacker::new(&packable, &self.pallet, &self.config)
                        .run(&self.cancelled);
                    tracing::debug!(
                        engine = %self.engine,
                        placed = outcome.placements.len(),
                        iterations = outcome.iterations,
                        height = outcome.total_height,
                        "packing run finished"
                    );
                    (outcome.placements, outcome.cancelled)
                }
                Engine::Layered => {
                    let search = StrategySearch::new(&packable, &self.pallet, &self.config);
                    let best = search.best(&self.cancelled);
                    tracing::debug!(
                        engine = %self.engine,
                        maps = search.maps().len(),
                        placed = best.as_ref().map_or(0, |b| b.total_units),
                        strategy = best.as_ref().map_or("none", |b| b.description.as_str()),
                        "packing run finished"
                    );
                    let cancelled = self.cancelled.load(Ordering::Relaxed);
                    (best.map(|b| b.placements).unwrap_or_default(), cancelled)
                }
            }
        };

        if cancelled {
            warnings.push(CANCELLED_WARNING.to_string());
        }
        aggregate::summarize(&self.units, &self.pallet, placements, warnings)
    }

    /// Drops unit types the engines cannot handle and collects warnings about
    /// the input that would otherwise go unexplained.
    fn prepare(&self) -> (Vec<UnitType>, Vec<String>) {
        let mut warnings = Vec::new();
        let usable = self.pallet.max_height - self.pallet.base_height;
        if usable < 0.0 {
            warnings.push(format!(
                "Maximum height {} is below the pallet base height {}",
                self.pallet.max_height, self.pallet.base_height
            ));
        }

        if grid_too_large(self.engine, &self.pallet, &self.config) {
            warnings.push(format!(
                "Pallet footprint needs more than {MAX_GRID_CELLS} grid cells at resolution {}",
                self.config.grid_resolution
            ));
            return (Vec::new(), warnings);
        }

        let mut packable = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            if let Err(e) = unit.validate() {
                warnings.push(format!("{e}; unit skipped"));
                continue;
            }
            if usable >= 0.0 && unit.min_edge() > usable + TOLERANCE {
                warnings.push(format!(
                    "Unit '{}' is taller than the usable height {} in every orientation",
                    unit.name, usable
                ));
            }
            packable.push(unit.clone());
        }
        (packable, warnings)
    }
}
