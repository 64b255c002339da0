use std::collections::BTreeMap;

use crate::orientation::Orientation;
use crate::types::TOLERANCE;

/// Remainders thinner than this on either side are dropped after a split.
const MIN_FREE_SIDE: f64 = 0.1;

/// Unoccupied footprint region, in local corner coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeRect {
    pub x: f64,
    pub z: f64,
    pub l: f64,
    pub w: f64,
}

impl FreeRect {
    fn score(&self) -> f64 {
        self.x + self.z
    }

    fn accepts(&self, l: f64, w: f64) -> bool {
        l <= self.l + TOLERANCE && w <= self.w + TOLERANCE
    }
}

/// One unit type offered to the layer packer in a single fixed orientation.
#[derive(Debug, Clone, Copy)]
pub struct BoxToPack {
    pub unit_idx: usize,
    pub orientation: Orientation,
    /// `None` means unlimited.
    pub remaining: Option<u32>,
}

impl BoxToPack {
    pub fn has_remaining(&self) -> bool {
        self.remaining.is_none_or(|r| r > 0)
    }

    fn take_one(&mut self) {
        if let Some(r) = self.remaining.as_mut() {
            *r = r.saturating_sub(1);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlacement {
    pub unit_idx: usize,
    pub x: f64,
    pub z: f64,
    pub l: f64,
    pub w: f64,
    pub h: f64,
    pub rotated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoredPlacement {
    pub free_idx: usize,
    pub rotated: bool,
    pub score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct LayerResult {
    pub placements: Vec<LayerPlacement>,
    /// Tallest box placed; zero when the layer is empty.
    pub thickness: f64,
    /// Boxes used per unit index.
    pub used: BTreeMap<usize, u32>,
}

impl LayerResult {
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// A single horizontal layer being filled with guillotine splits.
#[derive(Debug, Clone)]
pub struct LayerBin {
    pub free_rects: Vec<FreeRect>,
    pub placements: Vec<LayerPlacement>,
    thickness: f64,
}

impl LayerBin {
    pub fn new(length: f64, width: f64) -> Self {
        Self {
            free_rects: vec![FreeRect {
                x: 0.0,
                z: 0.0,
                l: length,
                w: width,
            }],
            placements: Vec::new(),
            thickness: 0.0,
        }
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    /// Finds the free rectangle closest to the origin corner that takes the
    /// footprint in either rotation. Ties keep the earlier rectangle and the
    /// unrotated footprint.
    pub fn find_best(&self, l: f64, w: f64) -> Option<ScoredPlacement> {
        let mut best: Option<ScoredPlacement> = None;

        for (idx, free) in self.free_rects.iter().enumerate() {
            let score = free.score();
            for (rotated, (fl, fw)) in [(false, (l, w)), (true, (w, l))] {
                if free.accepts(fl, fw) && best.is_none_or(|b| score < b.score) {
                    best = Some(ScoredPlacement {
                        free_idx: idx,
                        rotated,
                        score,
                    });
                }
            }
        }

        best
    }

    pub fn place(
        &mut self,
        scored: ScoredPlacement,
        unit_idx: usize,
        orientation: Orientation,
    ) -> LayerPlacement {
        let free = self.free_rects.remove(scored.free_idx);
        let (l, w) = if scored.rotated {
            (orientation.w, orientation.l)
        } else {
            (orientation.l, orientation.w)
        };

        let placement = LayerPlacement {
            unit_idx,
            x: free.x,
            z: free.z,
            l,
            w,
            h: orientation.h,
            rotated: scored.rotated,
        };

        self.split(free, l, w);
        self.thickness = self.thickness.max(orientation.h);
        self.placements.push(placement);

        placement
    }

    fn split(&mut self, free: FreeRect, l: f64, w: f64) {
        // Right remainder is only as deep as the box; top remainder spans the full rect.
        let right = FreeRect {
            x: free.x + l,
            z: free.z,
            l: free.l - l,
            w,
        };
        let top = FreeRect {
            x: free.x,
            z: free.z + w,
            l: free.l,
            w: free.w - w,
        };

        for rect in [right, top] {
            if rect.l > MIN_FREE_SIDE && rect.w > MIN_FREE_SIDE {
                self.free_rects.push(rect);
            }
        }
        self.free_rects.sort_by(|a, b| a.score().total_cmp(&b.score()));
    }
}

/// Fills one layer of a `length` x `width` footprint from `boxes`.
///
/// Boxes taller than `ceiling` or out of stock are skipped; the rest are tried
/// largest footprint first, each until it no longer fits anywhere. Remaining
/// counts in `boxes` are decremented for everything placed.
pub fn pack_layer(boxes: &mut [BoxToPack], length: f64, width: f64, ceiling: f64) -> LayerResult {
    let mut eligible: Vec<usize> = (0..boxes.len())
        .filter(|&i| boxes[i].has_remaining() && boxes[i].orientation.h <= ceiling + TOLERANCE)
        .collect();
    if eligible.is_empty() {
        return LayerResult::default();
    }
    eligible.sort_by(|&a, &b| {
        boxes[b]
            .orientation
            .footprint_area()
            .total_cmp(&boxes[a].orientation.footprint_area())
    });

    let mut bin = LayerBin::new(length, width);
    let mut used: BTreeMap<usize, u32> = BTreeMap::new();

    for i in eligible {
        let entry = &mut boxes[i];
        while entry.has_remaining() {
            let Some(scored) = bin.find_best(entry.orientation.l, entry.orientation.w) else {
                break;
            };
            bin.place(scored, entry.unit_idx, entry.orientation);
            entry.take_one();
            *used.entry(entry.unit_idx).or_insert(0) += 1;
        }
    }

    LayerResult {
        thickness: bin.thickness(),
        placements: bin.placements,
        used,
    }
}
