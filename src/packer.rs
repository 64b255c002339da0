//! Height-map mixed-orientation packer.
//!
//! Greedily places one box per iteration anywhere on a gridded top surface.
//! Every unit type is pinned to a single column (its primary footprint) and
//! keeps stacking there until the column is full; only then may it start a new
//! one. Continuing a column always beats opening a new spot.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::PackConfig;
use crate::heightmap::{GridRect, HeightMap};
use crate::orientation::{Orientation, orientations};
use crate::types::{Dims3, PalletSpec, Placement, Point3, TOLERANCE, UnitType, approx_eq};

const CONTINUATION_BIAS: f64 = 1000.0;
const HEADROOM_WEIGHT: f64 = 50.0;
const AREA_WEIGHT: f64 = 30.0;
const CORNER_BONUS: f64 = 5.0;

#[derive(Debug, Clone, Copy)]
struct PrimaryFootprint {
    unit_idx: usize,
    col: usize,
    row: usize,
    l: f64,
    w: f64,
    top: f64,
    full: bool,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    unit_idx: usize,
    orientation: Orientation,
    l: f64,
    w: f64,
    col: usize,
    row: usize,
    base: f64,
    score: f64,
    continuation: bool,
}

/// Mutable state of one packing run. Created per call and dropped with it.
struct PackingRun {
    grid: HeightMap,
    /// Per unit; `None` is unlimited.
    remaining: Vec<Option<u32>>,
    /// In order of creation.
    footprints: Vec<PrimaryFootprint>,
    placements: Vec<Placement>,
}

impl PackingRun {
    fn has_stock(&self, unit_idx: usize) -> bool {
        self.remaining[unit_idx].is_none_or(|r| r > 0)
    }

    fn is_pinned(&self, unit_idx: usize) -> bool {
        self.footprints
            .iter()
            .any(|f| f.unit_idx == unit_idx && !f.full)
    }
}

#[derive(Debug, Clone)]
pub struct PackOutcome {
    pub placements: Vec<Placement>,
    /// Highest box top, or the pallet base when nothing was placed.
    pub total_height: f64,
    pub iterations: usize,
    pub cancelled: bool,
}

pub struct HeightMapPacker<'a> {
    units: &'a [UnitType],
    pallet: &'a PalletSpec,
    config: &'a PackConfig,
    orientations: Vec<Vec<Orientation>>,
}

impl<'a> HeightMapPacker<'a> {
    pub fn new(units: &'a [UnitType], pallet: &'a PalletSpec, config: &'a PackConfig) -> Self {
        let orientations = units.iter().map(|u| orientations(u.edges())).collect();
        Self {
            units,
            pallet,
            config,
            orientations,
        }
    }

    pub fn run(&self, cancelled: &AtomicBool) -> PackOutcome {
        let Some(grid) = HeightMap::new(
            self.pallet.length,
            self.pallet.width,
            self.config.grid_resolution,
            self.pallet.base_height,
        ) else {
            tracing::warn!(
                length = self.pallet.length,
                width = self.pallet.width,
                resolution = self.config.grid_resolution,
                "height map too large, nothing packed"
            );
            return PackOutcome {
                placements: Vec::new(),
                total_height: self.pallet.base_height,
                iterations: 0,
                cancelled: false,
            };
        };
        let mut run = PackingRun {
            grid,
            remaining: self.units.iter().map(UnitType::quantity_limit).collect(),
            footprints: Vec::new(),
            placements: Vec::new(),
        };

        let mut iterations = 0;
        let mut was_cancelled = false;
        while iterations < self.config.max_iterations {
            if cancelled.load(Ordering::Relaxed) {
                was_cancelled = true;
                break;
            }
            iterations += 1;

            if !(0..self.units.len()).any(|i| run.has_stock(i)) {
                break;
            }

            self.refresh_footprints(&mut run);
            let best = self
                .continuation_candidate(&run)
                .or_else(|| self.new_placement_candidate(&run));
            let Some(candidate) = best else {
                break;
            };
            self.place(&mut run, candidate);
        }

        let total_height = run
            .placements
            .iter()
            .map(Placement::top_height)
            .reduce(f64::max)
            .unwrap_or(self.pallet.base_height);

        PackOutcome {
            placements: run.placements,
            total_height,
            iterations,
            cancelled: was_cancelled,
        }
    }

    fn footprint_span(&self, run: &PackingRun, f: &PrimaryFootprint) -> GridRect {
        run.grid.span(f.col, f.row, f.l, f.w)
    }

    /// Marks columns that can no longer take another box of their footprint,
    /// either because no matching orientation fits under the ceiling or because
    /// something else has been built over part of the column.
    fn refresh_footprints(&self, run: &mut PackingRun) {
        for i in 0..run.footprints.len() {
            let f = run.footprints[i];
            if f.full {
                continue;
            }
            let headroom = self.pallet.max_height - f.top;
            let fits = self.orientations[f.unit_idx]
                .iter()
                .any(|o| o.matches_footprint(f.l, f.w) && o.h <= headroom + TOLERANCE);
            let covered = !run.grid.is_uniform_at(self.footprint_span(run, &f), f.top);
            if !fits || covered {
                run.footprints[i].full = true;
            }
        }
    }

    /// Phase 1: stack another box on an open column, lowest column first.
    fn continuation_candidate(&self, run: &PackingRun) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for f in run.footprints.iter().filter(|f| !f.full) {
            if !run.has_stock(f.unit_idx) {
                continue;
            }
            let headroom = self.pallet.max_height - f.top;
            if headroom < self.config.min_headroom {
                continue;
            }
            if !run.grid.is_uniform_at(self.footprint_span(run, f), f.top) {
                continue;
            }

            let score = CONTINUATION_BIAS + headroom;
            for o in &self.orientations[f.unit_idx] {
                if o.h > headroom + TOLERANCE {
                    continue;
                }
                for (l, w) in o.footprint_rotations() {
                    if !approx_eq(l, f.l) || !approx_eq(w, f.w) {
                        continue;
                    }
                    if best.is_none_or(|b| score > b.score) {
                        best = Some(Candidate {
                            unit_idx: f.unit_idx,
                            orientation: *o,
                            l,
                            w,
                            col: f.col,
                            row: f.row,
                            base: f.top,
                            score,
                            continuation: true,
                        });
                    }
                }
            }
        }

        best
    }

    /// Phase 2: scan every cell for the best spot to open a new column.
    fn new_placement_candidate(&self, run: &PackingRun) -> Option<Candidate> {
        let max_height = self.pallet.max_height;
        let usable = max_height - self.pallet.base_height;
        let pallet_area = self.pallet.footprint_area();
        if usable <= 0.0 || pallet_area <= 0.0 {
            return None;
        }

        let free_units: Vec<usize> = (0..self.units.len())
            .filter(|&i| run.has_stock(i) && !run.is_pinned(i))
            .collect();
        if free_units.is_empty() {
            return None;
        }

        let grid = &run.grid;
        let mut best: Option<Candidate> = None;

        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let base = grid.height_at(col, row);
                let headroom = max_height - base;
                if headroom < self.config.min_headroom {
                    continue;
                }
                let corner = (if col == 0 { CORNER_BONUS } else { 0.0 })
                    + (if row == 0 { CORNER_BONUS } else { 0.0 });

                for &unit_idx in &free_units {
                    for o in &self.orientations[unit_idx] {
                        if o.h > headroom + TOLERANCE {
                            continue;
                        }
                        for (l, w) in o.footprint_rotations() {
                            if grid.offset(col) + l > self.pallet.length + TOLERANCE
                                || grid.offset(row) + w > self.pallet.width + TOLERANCE
                            {
                                continue;
                            }
                            let span = grid.span(col, row, l, w);

                            let score = headroom / usable * HEADROOM_WEIGHT
                                + l * w / pallet_area * AREA_WEIGHT
                                + corner;
                            // Only a strictly better score can win, so skip the
                            // region scan for anything that could not.
                            if best.is_some_and(|b| score <= b.score) {
                                continue;
                            }
                            if !grid.is_uniform_at(span, base) {
                                continue;
                            }

                            best = Some(Candidate {
                                unit_idx,
                                orientation: *o,
                                l,
                                w,
                                col,
                                row,
                                base,
                                score,
                                continuation: false,
                            });
                        }
                    }
                }
            }
        }

        best
    }

    fn place(&self, run: &mut PackingRun, c: Candidate) {
        let unit = &self.units[c.unit_idx];
        let h = c.orientation.h;
        let top = c.base + h;

        run.placements.push(Placement {
            unit_id: unit.id.clone(),
            unit_name: unit.name.clone(),
            color: unit.color_or_default().to_string(),
            position: Point3 {
                x: -self.pallet.length / 2.0 + run.grid.offset(c.col) + c.l / 2.0,
                y: c.base + h / 2.0,
                z: -self.pallet.width / 2.0 + run.grid.offset(c.row) + c.w / 2.0,
            },
            dimensions: Dims3 { l: c.l, w: c.w, h },
            rotated: !approx_eq(c.l, c.orientation.l),
        });

        let span = run.grid.span(c.col, c.row, c.l, c.w);
        run.grid.raise(span, top);

        if c.continuation {
            if let Some(f) = run
                .footprints
                .iter_mut()
                .find(|f| f.unit_idx == c.unit_idx && !f.full)
            {
                f.top = top;
            }
        } else {
            run.footprints.retain(|f| f.unit_idx != c.unit_idx);
            run.footprints.push(PrimaryFootprint {
                unit_idx: c.unit_idx,
                col: c.col,
                row: c.row,
                l: c.l,
                w: c.w,
                top,
                full: false,
            });
        }

        if let Some(r) = run.remaining[c.unit_idx].as_mut() {
            *r = r.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(units: &[UnitType], pallet: &PalletSpec) -> PackOutcome {
        let config = PackConfig::default();
        HeightMapPacker::new(units, pallet, &config).run(&AtomicBool::new(false))
    }

    fn standard_pallet() -> PalletSpec {
        PalletSpec::new(48.0, 40.0, 5.9, 52.0)
    }

    #[test]
    fn test_first_box_in_origin_corner() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0).with_quantity(1)];
        let out = pack(&units, &standard_pallet());
        assert_eq!(out.placements.len(), 1);
        let p = &out.placements[0];
        assert_eq!(p.position.x, -24.0 + 6.0);
        assert_eq!(p.position.z, -20.0 + 5.0);
        assert!((p.base_height() - 5.9).abs() < 1e-9);
        assert_eq!(
            p.dimensions,
            Dims3 {
                l: 12.0,
                w: 10.0,
                h: 8.0
            }
        );
        assert!(!p.rotated);
    }

    #[test]
    fn test_column_filled_before_new_footprint() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0)];
        let out = pack(&units, &standard_pallet());
        // 46.1 of usable height holds five 8-high boxes per column.
        for p in &out.placements[..5] {
            assert_eq!((p.position.x, p.position.z), (-18.0, -15.0));
        }
        assert_ne!(
            (out.placements[5].position.x, out.placements[5].position.z),
            (-18.0, -15.0)
        );
        assert_eq!(out.placements.len(), 80);
        assert!((out.total_height - 45.9).abs() < 1e-9);
    }

    #[test]
    fn test_quantity_limit_stops_run() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0).with_quantity(3)];
        let out = pack(&units, &standard_pallet());
        assert_eq!(out.placements.len(), 3);
        assert!(out.iterations <= 4);
        assert!(!out.cancelled);
    }

    #[test]
    fn test_nothing_fits() {
        let units = [UnitType::new("a", "A", 60.0, 60.0, 60.0)];
        let out = pack(&units, &standard_pallet());
        assert!(out.placements.is_empty());
        assert_eq!(out.total_height, 5.9);
        assert_eq!(out.iterations, 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0)];
        let pallet = standard_pallet();
        let config = PackConfig::default();
        let out = HeightMapPacker::new(&units, &pallet, &config).run(&AtomicBool::new(true));
        assert!(out.cancelled);
        assert!(out.placements.is_empty());
        assert_eq!(out.iterations, 0);
    }

    #[test]
    fn test_iteration_cap() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0)];
        let pallet = standard_pallet();
        let config = PackConfig {
            max_iterations: 7,
            ..PackConfig::default()
        };
        let out = HeightMapPacker::new(&units, &pallet, &config).run(&AtomicBool::new(false));
        assert_eq!(out.placements.len(), 7);
        assert_eq!(out.iterations, 7);
    }

    #[test]
    fn test_coarse_grid_keeps_boxes_on_pallet() {
        // Each box runs 0.09 past a 10-wide cell, so only one fits per row.
        let units = [UnitType::new("a", "A", 10.09, 10.09, 5.0)];
        let pallet = PalletSpec::new(20.0, 20.0, 0.0, 10.0);
        let config = PackConfig {
            grid_resolution: 10.0,
            ..PackConfig::default()
        };
        let out = HeightMapPacker::new(&units, &pallet, &config).run(&AtomicBool::new(false));
        assert_eq!(out.placements.len(), 2);
        for p in &out.placements {
            assert!(p.position.x + p.dimensions.l / 2.0 <= 10.0 + TOLERANCE);
            assert!(p.position.z + p.dimensions.w / 2.0 <= 10.0 + TOLERANCE);
        }
    }

    #[test]
    fn test_oversized_grid_packs_nothing() {
        let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0)];
        let out = pack(&units, &PalletSpec::new(1e12, 1e12, 0.0, 50.0));
        assert!(out.placements.is_empty());
        assert_eq!(out.iterations, 0);
    }

    #[test]
    fn test_footprint_turned_to_fit() {
        // On a 40 wide pallet the 30x45 footprint only fits turned to 45x30.
        let units = [UnitType::new("a", "A", 30.0, 45.0, 60.0).with_quantity(1)];
        let pallet = PalletSpec::new(48.0, 40.0, 0.0, 100.0);
        let out = pack(&units, &pallet);
        assert_eq!(out.placements.len(), 1);
        let p = &out.placements[0];
        assert_eq!(
            p.dimensions,
            Dims3 {
                l: 45.0,
                w: 30.0,
                h: 60.0
            }
        );
        assert!(p.rotated);
        assert_eq!(p.position.x, -24.0 + 22.5);
    }
}
