use serde::{Deserialize, Serialize};

use crate::types::{TOLERANCE, approx_eq};

/// Which source edge of the unit stands vertically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalAxis {
    Length,
    Width,
    Height,
}

impl VerticalAxis {
    const ALL: [VerticalAxis; 3] = [
        VerticalAxis::Length,
        VerticalAxis::Width,
        VerticalAxis::Height,
    ];
}

/// One way of standing a box: footprint `l` x `w`, vertical extent `h`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub l: f64,
    pub w: f64,
    pub h: f64,
    pub vertical: VerticalAxis,
}

impl Orientation {
    pub fn footprint_area(&self) -> f64 {
        self.l * self.w
    }

    /// The footprint as given, then swapped unless it is square.
    pub fn footprint_rotations(&self) -> impl Iterator<Item = (f64, f64)> + use<> {
        let swapped = (!approx_eq(self.l, self.w)).then_some((self.w, self.l));
        std::iter::once((self.l, self.w)).chain(swapped)
    }

    pub fn matches_footprint(&self, l: f64, w: f64) -> bool {
        (approx_eq(self.l, l) && approx_eq(self.w, w))
            || (approx_eq(self.w, l) && approx_eq(self.l, w))
    }

    fn same_as(&self, l: f64, w: f64, h: f64) -> bool {
        (self.l - l).abs() < TOLERANCE
            && (self.w - w).abs() < TOLERANCE
            && (self.h - h).abs() < TOLERANCE
    }
}

/// Enumerates the distinct orientations of a box with the given edges.
///
/// Each edge takes a turn as the vertical axis and the remaining two form the
/// footprint in both orders. Triples that coincide within tolerance are
/// emitted once, so a cube yields a single orientation.
pub fn orientations(edges: [f64; 3]) -> Vec<Orientation> {
    let mut out: Vec<Orientation> = Vec::with_capacity(6);
    for (vertical_idx, vertical) in VerticalAxis::ALL.into_iter().enumerate() {
        let h = edges[vertical_idx];
        let mut rest = edges
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != vertical_idx)
            .map(|(_, &e)| e);
        let (Some(a), Some(b)) = (rest.next(), rest.next()) else {
            continue;
        };
        for (l, w) in [(a, b), (b, a)] {
            if !out.iter().any(|o| o.same_as(l, w, h)) {
                out.push(Orientation { l, w, h, vertical });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_edges_give_six() {
        let o = orientations([12.0, 10.0, 8.0]);
        assert_eq!(o.len(), 6);
        assert_eq!((o[0].l, o[0].w, o[0].h), (10.0, 8.0, 12.0));
        assert_eq!(o[0].vertical, VerticalAxis::Length);
        assert_eq!((o[4].l, o[4].w, o[4].h), (12.0, 10.0, 8.0));
        assert_eq!(o[4].vertical, VerticalAxis::Height);
    }

    #[test]
    fn test_two_equal_edges_give_three() {
        let o = orientations([10.0, 10.0, 5.0]);
        assert_eq!(o.len(), 3);
        assert!(o.iter().any(|o| o.h == 5.0 && o.l == 10.0 && o.w == 10.0));
    }

    #[test]
    fn test_cube_gives_one() {
        assert_eq!(orientations([5.0, 5.0, 5.0]).len(), 1);
    }

    #[test]
    fn test_near_equal_edges_collapse() {
        // Drift from an inch/mm round trip must not create phantom orientations.
        assert_eq!(orientations([5.0, 5.004, 5.0]).len(), 1);
    }

    #[test]
    fn test_footprint_rotations() {
        let o = orientations([12.0, 10.0, 8.0])[4];
        let rots: Vec<_> = o.footprint_rotations().collect();
        assert_eq!(rots, vec![(12.0, 10.0), (10.0, 12.0)]);
        assert!(o.matches_footprint(10.0, 12.0));
        assert!(!o.matches_footprint(12.0, 8.0));

        let square = orientations([10.0, 10.0, 5.0])
            .into_iter()
            .find(|o| o.h == 5.0)
            .unwrap();
        assert_eq!(square.footprint_rotations().count(), 1);
    }
}
