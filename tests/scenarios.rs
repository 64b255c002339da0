use std::collections::HashMap;
use std::sync::atomic::Ordering;

use pallet_stacker::types::TOLERANCE;
use pallet_stacker::{
    Engine, MixedPalletResult, PackConfig, PalletSpec, Placement, Solver, UnitType,
    calculate_mixed_pallet,
};

const ENGINES: [Engine; 2] = [Engine::HeightMap, Engine::Layered];

fn standard_pallet() -> PalletSpec {
    PalletSpec::new(48.0, 40.0, 5.9, 52.0).with_weight(45.0)
}

fn solve(units: &[UnitType], pallet: PalletSpec, engine: Engine) -> MixedPalletResult {
    Solver::new(units.to_vec(), pallet).with_engine(engine).solve()
}

fn overlaps(a: &Placement, b: &Placement) -> bool {
    let axis = |ca: f64, da: f64, cb: f64, db: f64| (ca - cb).abs() < (da + db) / 2.0 - TOLERANCE;
    axis(a.position.x, a.dimensions.l, b.position.x, b.dimensions.l)
        && axis(a.position.y, a.dimensions.h, b.position.y, b.dimensions.h)
        && axis(a.position.z, a.dimensions.w, b.position.z, b.dimensions.w)
}

/// Every box inside the pallet envelope and no two boxes sharing volume.
fn assert_valid_solution(result: &MixedPalletResult, pallet: &PalletSpec) {
    for p in &result.placements {
        let (x, y, z) = (p.position.x, p.position.y, p.position.z);
        let d = p.dimensions;
        assert!(
            x - d.l / 2.0 >= -pallet.length / 2.0 - TOLERANCE
                && x + d.l / 2.0 <= pallet.length / 2.0 + TOLERANCE,
            "{} at x={} overhangs the pallet length",
            p.unit_name,
            x
        );
        assert!(
            z - d.w / 2.0 >= -pallet.width / 2.0 - TOLERANCE
                && z + d.w / 2.0 <= pallet.width / 2.0 + TOLERANCE,
            "{} at z={} overhangs the pallet width",
            p.unit_name,
            z
        );
        assert!(
            y - d.h / 2.0 >= pallet.base_height - TOLERANCE
                && y + d.h / 2.0 <= pallet.max_height + TOLERANCE,
            "{} at y={} is outside the height envelope",
            p.unit_name,
            y
        );
    }

    for (i, a) in result.placements.iter().enumerate() {
        for (j, b) in result.placements.iter().enumerate().skip(i + 1) {
            assert!(!overlaps(a, b), "placements {} and {} overlap: {:?} / {:?}", i, j, a, b);
        }
    }

    let layered: usize = result.layers.iter().map(|l| l.placements.len()).sum();
    assert_eq!(layered, result.placements.len(), "every placement belongs to one layer");
    assert!(
        result.layers.windows(2).all(|w| w[0].base_y < w[1].base_y),
        "layers ascend by base height"
    );
    assert_eq!(result.total_units, result.placements.len());
}

fn placed_by_type(result: &MixedPalletResult) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for p in &result.placements {
        *counts.entry(p.unit_id.as_str()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_single_type_fills_full_layers() {
    let pallet = standard_pallet();
    let units = [UnitType::new("carton", "Carton", 12.0, 10.0, 8.0)];
    let result = solve(&units, pallet, Engine::HeightMap);

    assert_valid_solution(&result, &pallet);
    assert!(result.is_valid);
    assert_eq!(result.total_units, 80);
    assert_eq!(result.layers.len(), 5);
    assert!(result.layers.iter().all(|l| l.placements.len() == 16));
    assert!(result.placements.iter().all(|p| p.dimensions.h == 8.0));
    assert!((result.total_height - 45.9).abs() < 1e-9);
    assert!((result.area_efficiency - 100.0).abs() < 1e-9);
}

#[test]
fn test_single_type_layered_engine() {
    let pallet = standard_pallet();
    let units = [UnitType::new("carton", "Carton", 12.0, 10.0, 8.0)];
    let result = solve(&units, pallet, Engine::Layered);

    assert_valid_solution(&result, &pallet);
    assert!(result.is_valid);
    assert!(!result.layers.is_empty());
    assert!(result.total_height <= 52.0 + TOLERANCE);
    assert!(result.total_units >= 80, "layered search should at least match a flat stack");
}

#[test]
fn test_two_types_stack_in_columns() {
    let pallet = standard_pallet();
    let units = [
        UnitType::new("big", "Big", 24.0, 20.0, 12.0),
        UnitType::new("small", "Small", 12.0, 10.0, 8.0),
    ];
    let result = solve(&units, pallet, Engine::HeightMap);

    assert_valid_solution(&result, &pallet);
    assert!(result.is_valid);
    let counts = placed_by_type(&result);
    assert_eq!(counts.get("big"), Some(&12));
    assert_eq!(counts.get("small"), Some(&16));

    // The first big boxes build one column before another spot is opened.
    let big: Vec<&Placement> = result.placements.iter().filter(|p| p.unit_id == "big").collect();
    for p in &big[1..3] {
        assert!((p.position.x - big[0].position.x).abs() < 1e-9);
        assert!((p.position.z - big[0].position.z).abs() < 1e-9);
        assert!(p.position.y > big[0].position.y);
    }
}

#[test]
fn test_two_types_layered_engine() {
    let pallet = standard_pallet();
    let units = [
        UnitType::new("big", "Big", 24.0, 20.0, 12.0),
        UnitType::new("small", "Small", 12.0, 10.0, 8.0),
    ];
    let result = solve(&units, pallet, Engine::Layered);
    assert_valid_solution(&result, &pallet);
    assert!(result.is_valid);
}

#[test]
fn test_quantity_limit_is_exact() {
    let pallet = PalletSpec::new(48.0, 40.0, 0.0, 100.0);
    let units = [UnitType::new("a", "Crate", 12.0, 10.0, 8.0).with_quantity(3)];
    for engine in ENGINES {
        let result = solve(&units, pallet, engine);
        assert_valid_solution(&result, &pallet);
        assert_eq!(result.total_units, 3, "engine {engine}");
        assert_eq!(result.unit_summaries[0].count_placed, 3);
        assert_eq!(result.unit_summaries[0].quantity_remaining, Some(0));
        assert!(result.is_valid);
    }
}

#[test]
fn test_quantities_respected_across_types() {
    let pallet = standard_pallet();
    let units = [
        UnitType::new("a", "A", 16.0, 12.0, 10.0).with_quantity(7),
        UnitType::new("b", "B", 10.0, 10.0, 6.0).with_quantity(11),
        UnitType::new("c", "C", 20.0, 8.0, 5.0),
    ];
    // Three types give 108 orientation maps; keep the mixed search small.
    let config = PackConfig {
        max_orientation_maps: 24,
        max_switch_after: 4,
        ..PackConfig::default()
    };
    for engine in ENGINES {
        let result = Solver::new(units.to_vec(), pallet)
            .with_engine(engine)
            .with_config(config)
            .solve();
        assert_valid_solution(&result, &pallet);
        let counts = placed_by_type(&result);
        assert!(counts.get("a").copied().unwrap_or(0) <= 7, "engine {engine}");
        assert!(counts.get("b").copied().unwrap_or(0) <= 11, "engine {engine}");
        for s in &result.unit_summaries {
            if let (Some(q), Some(r)) = (s.quantity_requested, s.quantity_remaining) {
                assert_eq!(q - s.count_placed, r);
            }
        }
    }
}

#[test]
fn test_unit_too_tall_for_pallet() {
    let pallet = standard_pallet();
    let units = [UnitType::new("tower", "Tower", 50.0, 50.0, 50.0)];
    for engine in ENGINES {
        let result = solve(&units, pallet, engine);
        assert_eq!(result.total_units, 0);
        assert!(!result.is_valid);
        assert!(!result.warnings.is_empty());
        assert!((result.total_height - pallet.base_height).abs() < 1e-9);
    }
}

#[test]
fn test_runs_are_deterministic() {
    let pallet = standard_pallet();
    let units = [
        UnitType::new("a", "A", 16.0, 12.0, 10.0).with_weight(3.0),
        UnitType::new("b", "B", 10.0, 10.0, 6.0).with_quantity(20),
    ];
    for engine in ENGINES {
        let first = solve(&units, pallet, engine);
        let second = solve(&units, pallet, engine);
        assert_eq!(first, second, "engine {engine}");
    }
}

#[test]
fn test_validity_matches_height() {
    let pallet = standard_pallet();
    let units = [UnitType::new("a", "A", 11.0, 9.0, 7.0)];
    for engine in ENGINES {
        let result = solve(&units, pallet, engine);
        assert_valid_solution(&result, &pallet);
        let expected =
            result.total_units > 0 && result.total_height <= pallet.max_height + TOLERANCE;
        assert_eq!(result.is_valid, expected);
    }
}

#[test]
fn test_coarse_grid_still_valid() {
    let pallet = standard_pallet();
    let units = [
        UnitType::new("a", "A", 13.3, 9.7, 7.1),
        UnitType::new("b", "B", 5.0, 5.0, 5.0).with_quantity(30),
    ];
    let config = PackConfig {
        grid_resolution: 2.0,
        ..PackConfig::default()
    };
    let result = Solver::new(units.to_vec(), pallet).with_config(config).solve();
    assert_valid_solution(&result, &pallet);
    assert!(result.total_units > 0);
}

#[test]
fn test_cancelled_run_reports_warning() {
    let units = vec![UnitType::new("a", "A", 12.0, 10.0, 8.0)];
    for engine in ENGINES {
        let solver = Solver::new(units.clone(), standard_pallet()).with_engine(engine);
        solver.cancel_handle().store(true, Ordering::Relaxed);
        let result = solver.solve();
        assert!(result.warnings.iter().any(|w| w.contains("cancelled")), "engine {engine}");
    }
}

#[test]
fn test_entry_point_and_json_shape() {
    let units = [UnitType::new("a", "A", 12.0, 10.0, 8.0).with_quantity(4).with_color("#ff0000")];
    let result = calculate_mixed_pallet(&units, &standard_pallet());
    assert_eq!(result.total_units, 4);
    assert!(result.placements.iter().all(|p| p.color == "#ff0000"));

    let json = serde_json::to_value(&result).unwrap();
    for key in [
        "layers",
        "placements",
        "unitSummaries",
        "totalUnits",
        "totalWeight",
        "palletWeight",
        "combinedWeight",
        "totalHeight",
        "volumeEfficiency",
        "areaEfficiency",
        "warnings",
        "isValid",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(json["unitSummaries"][0]["quantityRemaining"], 0);
    assert!(json["layers"][0].get("baseY").is_some());
}

#[test]
fn test_coarse_grid_boxes_just_past_cell_edge() {
    let pallet = PalletSpec::new(20.0, 20.0, 0.0, 10.0);
    let units = [UnitType::new("a", "A", 10.09, 10.09, 5.0)];
    let config = PackConfig {
        grid_resolution: 10.0,
        ..PackConfig::default()
    };
    let result = Solver::new(units.to_vec(), pallet).with_config(config).solve();
    assert_valid_solution(&result, &pallet);
    assert_eq!(result.total_units, 2);
}
