//! Regroups a flat placement list into layers and derives the summary metrics.

use std::collections::{BTreeMap, HashMap};

use crate::types::{
    MixedPalletResult, PalletLayer, PalletSpec, Placement, TOLERANCE, UnitSummary, UnitType,
};

pub const NO_UNITS_WARNING: &str = "No unit types defined";
pub const NOTHING_PLACED_WARNING: &str =
    "No units could be placed within the maximum pallet height";

pub fn build_layer(
    layer_index: usize,
    base_y: f64,
    placements: Vec<Placement>,
    area_total: f64,
) -> PalletLayer {
    let height = placements
        .iter()
        .map(|p| p.dimensions.h)
        .fold(0.0, f64::max);
    let area_used = placements.iter().map(|p| p.dimensions.footprint_area()).sum();
    PalletLayer {
        layer_index,
        height,
        base_y,
        placements,
        area_used,
        area_total,
    }
}

/// Buckets placements by base height rounded to two decimals, lowest first.
pub fn group_layers(placements: &[Placement], area_total: f64) -> Vec<PalletLayer> {
    let mut groups: BTreeMap<i64, Vec<Placement>> = BTreeMap::new();
    for p in placements {
        let key = (p.base_height() * 100.0).round() as i64;
        groups.entry(key).or_default().push(p.clone());
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, (key, group))| build_layer(i, key as f64 / 100.0, group, area_total))
        .collect()
}

pub fn total_height(placements: &[Placement], pallet: &PalletSpec) -> f64 {
    placements
        .iter()
        .map(Placement::top_height)
        .reduce(f64::max)
        .unwrap_or(pallet.base_height)
}

pub fn summarize_units(units: &[UnitType], placements: &[Placement]) -> Vec<UnitSummary> {
    let mut placed: HashMap<&str, u32> = HashMap::new();
    for p in placements {
        *placed.entry(p.unit_id.as_str()).or_insert(0) += 1;
    }

    units
        .iter()
        .map(|u| {
            let count_placed = placed.get(u.id.as_str()).copied().unwrap_or(0);
            let quantity_requested = u.quantity_limit();
            UnitSummary {
                unit_id: u.id.clone(),
                unit_name: u.name.clone(),
                color: u.color_or_default().to_string(),
                count_placed,
                quantity_requested,
                quantity_remaining: quantity_requested.map(|q| q.saturating_sub(count_placed)),
            }
        })
        .collect()
}

/// Builds the caller-facing result from an engine's placements.
pub fn summarize(
    units: &[UnitType],
    pallet: &PalletSpec,
    placements: Vec<Placement>,
    mut warnings: Vec<String>,
) -> MixedPalletResult {
    let pallet_area = pallet.footprint_area();
    let layers = group_layers(&placements, pallet_area);
    let unit_summaries = summarize_units(units, &placements);

    let weights: HashMap<&str, f64> = units.iter().map(|u| (u.id.as_str(), u.weight)).collect();
    let total_weight: f64 = placements
        .iter()
        .map(|p| weights.get(p.unit_id.as_str()).copied().unwrap_or(0.0))
        .sum();

    let pallet_volume = pallet_area * pallet.usable_height();
    let used_volume: f64 = placements.iter().map(|p| p.dimensions.volume()).sum();
    let volume_efficiency = if pallet_volume > 0.0 {
        used_volume / pallet_volume * 100.0
    } else {
        0.0
    };

    let max_layer_area = layers.iter().map(|l| l.area_used).fold(0.0, f64::max);
    let area_efficiency = if pallet_area > 0.0 {
        max_layer_area / pallet_area * 100.0
    } else {
        0.0
    };

    let total_units = placements.len();
    let total_height = total_height(&placements, pallet);
    if total_units == 0 && !warnings.iter().any(|w| w == NOTHING_PLACED_WARNING) {
        warnings.push(NOTHING_PLACED_WARNING.to_string());
    }

    MixedPalletResult {
        layers,
        placements,
        unit_summaries,
        total_units,
        total_weight,
        pallet_weight: pallet.pallet_weight,
        combined_weight: pallet.pallet_weight + total_weight,
        total_height,
        volume_efficiency,
        area_efficiency,
        warnings,
        is_valid: total_units > 0 && total_height <= pallet.max_height + TOLERANCE,
    }
}

pub fn empty_result(pallet: &PalletSpec, warning: &str) -> MixedPalletResult {
    MixedPalletResult {
        layers: Vec::new(),
        placements: Vec::new(),
        unit_summaries: Vec::new(),
        total_units: 0,
        total_weight: 0.0,
        pallet_weight: pallet.pallet_weight,
        combined_weight: pallet.pallet_weight,
        total_height: pallet.base_height,
        volume_efficiency: 0.0,
        area_efficiency: 0.0,
        warnings: vec![warning.to_string()],
        is_valid: false,
    }
}
