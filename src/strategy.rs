//! Layer-by-layer stacking with one fixed orientation per unit type, and the
//! search over orientation assignments that keeps the best stack.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::aggregate::build_layer;
use crate::config::PackConfig;
use crate::guillotine::{BoxToPack, pack_layer};
use crate::orientation::{Orientation, orientations};
use crate::types::{Dims3, PalletLayer, PalletSpec, Placement, Point3, TOLERANCE, UnitType};

/// Stop stacking once less than this much height is left.
const MIN_LAYER_HEADROOM: f64 = 0.1;

/// One orientation per unit type, indexed like the unit list.
pub type OrientationMap = Vec<Orientation>;

/// Enumerates the cartesian product of per-unit orientation choices, first
/// unit varying slowest, stopping after `cap` maps.
pub fn orientation_maps(choices: &[Vec<Orientation>], cap: usize) -> Vec<OrientationMap> {
    if choices.is_empty() || choices.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut maps = Vec::new();
    let mut digits = vec![0usize; choices.len()];
    while maps.len() < cap {
        maps.push(digits.iter().zip(choices).map(|(&d, c)| c[d]).collect());

        // Mixed-radix increment, last position fastest.
        let mut pos = choices.len();
        loop {
            if pos == 0 {
                return maps;
            }
            pos -= 1;
            digits[pos] += 1;
            if digits[pos] < choices[pos].len() {
                break;
            }
            digits[pos] = 0;
        }
    }
    maps
}

/// Size of the full product, saturating.
pub fn orientation_map_count(choices: &[Vec<Orientation>]) -> usize {
    choices
        .iter()
        .fold(1usize, |acc, c| acc.saturating_mul(c.len()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyResult {
    pub description: String,
    pub total_units: usize,
    pub total_height: f64,
    pub layers: Vec<PalletLayer>,
    pub placements: Vec<Placement>,
}

impl StrategyResult {
    pub fn used_volume(&self) -> f64 {
        self.placements.iter().map(|p| p.dimensions.volume()).sum()
    }

    /// More units wins; equal counts fall back to the denser stack.
    pub fn is_better_than(&self, other: &StrategyResult) -> bool {
        if self.total_units != other.total_units {
            return self.total_units > other.total_units;
        }
        self.used_volume() > other.used_volume() + TOLERANCE
    }
}

pub struct LayerStacker<'a> {
    units: &'a [UnitType],
    pallet: &'a PalletSpec,
    config: &'a PackConfig,
}

impl<'a> LayerStacker<'a> {
    pub fn new(units: &'a [UnitType], pallet: &'a PalletSpec, config: &'a PackConfig) -> Self {
        Self {
            units,
            pallet,
            config,
        }
    }

    /// Stacks full layers using `map` for every layer.
    pub fn run_single(&self, map: &OrientationMap) -> StrategyResult {
        let description = format!("Single orientation: {}", describe_map(self.units, map));
        self.stack(map, None, description)
    }

    /// Stacks `switch_after` layers with `primary`, then continues with
    /// `secondary`. Returns `None` when nothing could be placed.
    pub fn run_mixed(
        &self,
        primary: &OrientationMap,
        secondary: &OrientationMap,
        switch_after: usize,
    ) -> Option<StrategyResult> {
        let result = self.mixed_stack(primary, secondary, switch_after);
        self.is_usable(&result).then_some(result)
    }

    fn is_usable(&self, result: &StrategyResult) -> bool {
        result.total_units > 0 && result.total_height <= self.pallet.max_height + TOLERANCE
    }

    fn mixed_stack(
        &self,
        primary: &OrientationMap,
        secondary: &OrientationMap,
        switch_after: usize,
    ) -> StrategyResult {
        let description = format!(
            "Mixed layers: {switch_after} primary ({}), then alternate ({})",
            describe_map(self.units, primary),
            describe_map(self.units, secondary),
        );
        self.stack(primary, Some((secondary, switch_after)), description)
    }

    fn boxes_for(&self, map: &OrientationMap, remaining: &[Option<u32>]) -> Vec<BoxToPack> {
        map.iter()
            .zip(remaining)
            .enumerate()
            .map(|(unit_idx, (&orientation, &remaining))| BoxToPack {
                unit_idx,
                orientation,
                remaining,
            })
            .collect()
    }

    fn stack(
        &self,
        primary: &OrientationMap,
        secondary: Option<(&OrientationMap, usize)>,
        description: String,
    ) -> StrategyResult {
        let pallet = self.pallet;
        let mut remaining: Vec<Option<u32>> =
            self.units.iter().map(UnitType::quantity_limit).collect();
        let mut layers: Vec<PalletLayer> = Vec::new();
        let mut placements: Vec<Placement> = Vec::new();
        let mut base = pallet.base_height;

        while layers.len() < self.config.max_layers {
            let headroom = pallet.max_height - base;
            if headroom < MIN_LAYER_HEADROOM {
                break;
            }

            let (preferred, alternate) = match secondary {
                Some((second, n)) if layers.len() >= n => (second, Some(primary)),
                Some((second, _)) => (primary, Some(second)),
                None => (primary, None),
            };

            let mut boxes = self.boxes_for(preferred, &remaining);
            if !fits_headroom(&boxes, headroom) {
                match alternate {
                    Some(alt) if fits_headroom(&self.boxes_for(alt, &remaining), headroom) => {
                        boxes = self.boxes_for(alt, &remaining);
                    }
                    _ => break,
                }
            }

            let layer = pack_layer(&mut boxes, pallet.length, pallet.width, headroom);
            if layer.is_empty() || layer.thickness <= 0.0 {
                break;
            }
            if base + layer.thickness > pallet.max_height + TOLERANCE {
                break;
            }

            for b in &boxes {
                remaining[b.unit_idx] = b.remaining;
            }

            let layer_placements: Vec<Placement> = layer
                .placements
                .iter()
                .map(|lp| {
                    let unit = &self.units[lp.unit_idx];
                    Placement {
                        unit_id: unit.id.clone(),
                        unit_name: unit.name.clone(),
                        color: unit.color_or_default().to_string(),
                        position: Point3 {
                            x: -pallet.length / 2.0 + lp.x + lp.l / 2.0,
                            y: base + lp.h / 2.0,
                            z: -pallet.width / 2.0 + lp.z + lp.w / 2.0,
                        },
                        dimensions: Dims3 {
                            l: lp.l,
                            w: lp.w,
                            h: lp.h,
                        },
                        rotated: lp.rotated,
                    }
                })
                .collect();

            placements.extend(layer_placements.iter().cloned());
            layers.push(build_layer(
                layers.len(),
                base,
                layer_placements,
                pallet.footprint_area(),
            ));
            base += layer.thickness;
        }

        StrategyResult {
            description,
            total_units: placements.len(),
            total_height: base,
            layers,
            placements,
        }
    }
}

/// Whether any box still in stock is low enough for `headroom`.
fn fits_headroom(boxes: &[BoxToPack], headroom: f64) -> bool {
    boxes
        .iter()
        .filter(|b| b.has_remaining())
        .any(|b| b.orientation.h <= headroom + TOLERANCE)
}

fn describe_map(units: &[UnitType], map: &OrientationMap) -> String {
    units
        .iter()
        .zip(map)
        .map(|(u, o)| format!("{} {}x{}x{}", u.name, o.l, o.w, o.h))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tries every single-orientation stack and every (primary, secondary,
/// switch-after) combination, keeping the stack that places the most units.
pub struct StrategySearch<'a> {
    stacker: LayerStacker<'a>,
    config: &'a PackConfig,
    maps: Vec<OrientationMap>,
}

impl<'a> StrategySearch<'a> {
    pub fn new(units: &'a [UnitType], pallet: &'a PalletSpec, config: &'a PackConfig) -> Self {
        let choices: Vec<Vec<Orientation>> =
            units.iter().map(|u| orientations(u.edges())).collect();
        let total = orientation_map_count(&choices);
        if total > config.max_orientation_maps {
            tracing::warn!(
                total,
                cap = config.max_orientation_maps,
                "orientation assignments truncated"
            );
        }
        Self {
            stacker: LayerStacker::new(units, pallet, config),
            config,
            maps: orientation_maps(&choices, config.max_orientation_maps),
        }
    }

    pub fn maps(&self) -> &[OrientationMap] {
        &self.maps
    }

    fn for_each_mixed(&self, cancelled: &AtomicBool, mut visit: impl FnMut(StrategyResult)) {
        if self.maps.len() < 2 {
            return;
        }
        for (pi, primary) in self.maps.iter().enumerate() {
            for (si, secondary) in self.maps.iter().enumerate() {
                if pi == si {
                    continue;
                }
                for n in 1..=self.config.max_switch_after {
                    if cancelled.load(Ordering::Relaxed) {
                        return;
                    }
                    let result = self.stacker.mixed_stack(primary, secondary, n);
                    // A stack that ended before layer `n` never switched, and
                    // every later switch point rebuilds the same stack.
                    let switched = result.layers.len() > n;
                    if self.stacker.is_usable(&result) {
                        visit(result);
                    }
                    if !switched {
                        break;
                    }
                }
            }
        }
    }

    /// Every mixed-layer stack that places at least one unit.
    pub fn mixed_candidates(&self, cancelled: &AtomicBool) -> Vec<StrategyResult> {
        let mut out = Vec::new();
        self.for_each_mixed(cancelled, |r| out.push(r));
        out
    }

    pub fn best(&self, cancelled: &AtomicBool) -> Option<StrategyResult> {
        let mut best: Option<StrategyResult> = None;
        let mut consider = |candidate: StrategyResult| {
            if candidate.total_units == 0 {
                return;
            }
            if best.as_ref().is_none_or(|b| candidate.is_better_than(b)) {
                best = Some(candidate);
            }
        };

        for map in &self.maps {
            if cancelled.load(Ordering::Relaxed) {
                break;
            }
            consider(self.stacker.run_single(map));
        }
        self.for_each_mixed(cancelled, &mut consider);

        best
    }
}
