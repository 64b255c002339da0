use crate::types::{TOLERANCE, approx_eq};

/// Largest grid a packing run will allocate.
pub const MAX_GRID_CELLS: usize = 4_000_000;

/// Number of cells needed to cover `length` at `resolution`.
///
/// Sizes within tolerance of a cell boundary snap down, so drift from unit
/// conversion never costs a whole extra cell. The slack is in length units,
/// so a snapped box never overruns its cells by more than `TOLERANCE`.
/// Positive lengths need at least one.
pub fn cells_for(length: f64, resolution: f64) -> usize {
    if length <= 0.0 || resolution <= 0.0 {
        return 0;
    }
    (((length - TOLERANCE) / resolution).ceil() as usize).max(1)
}

/// Cells in a `length` x `width` grid, or `None` if it exceeds `MAX_GRID_CELLS`.
pub fn grid_cells(length: f64, width: f64, resolution: f64) -> Option<usize> {
    cells_for(length, resolution)
        .checked_mul(cells_for(width, resolution))
        .filter(|&n| n <= MAX_GRID_CELLS)
}

/// Cell-addressed span of a rectangle on the grid, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRect {
    pub col: usize,
    pub row: usize,
    pub end_col: usize,
    pub end_row: usize,
}

/// Discretised top-surface of the stack. Cells only ever rise.
#[derive(Debug, Clone)]
pub struct HeightMap {
    resolution: f64,
    cols: usize,
    rows: usize,
    cells: Vec<f64>,
}

impl HeightMap {
    /// Flat grid at `floor`, or `None` when it would exceed `MAX_GRID_CELLS`.
    pub fn new(length: f64, width: f64, resolution: f64, floor: f64) -> Option<Self> {
        let count = grid_cells(length, width, resolution)?;
        Some(Self {
            resolution,
            cols: cells_for(length, resolution),
            rows: cells_for(width, resolution),
            cells: vec![floor; count],
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn height_at(&self, col: usize, row: usize) -> f64 {
        self.cells[row * self.cols + col]
    }

    /// Offset of a cell edge from the grid origin.
    pub fn offset(&self, index: usize) -> f64 {
        index as f64 * self.resolution
    }

    /// Grid span of an `l` x `w` footprint anchored at (`col`, `row`).
    pub fn span(&self, col: usize, row: usize, l: f64, w: f64) -> GridRect {
        GridRect {
            col,
            row,
            end_col: col + cells_for(l, self.resolution),
            end_row: row + cells_for(w, self.resolution),
        }
    }

    /// Whether every cell in `rect` sits at `height`. Cells past the grid edge
    /// are ignored.
    pub fn is_uniform_at(&self, rect: GridRect, height: f64) -> bool {
        let end_row = rect.end_row.min(self.rows);
        let end_col = rect.end_col.min(self.cols);
        (rect.row..end_row).all(|r| {
            let line = &self.cells[r * self.cols..(r + 1) * self.cols];
            line[rect.col.min(end_col)..end_col]
                .iter()
                .all(|&h| approx_eq(h, height))
        })
    }

    /// Lifts every cell in `rect` to at least `height`.
    pub fn raise(&mut self, rect: GridRect, height: f64) {
        let end_row = rect.end_row.min(self.rows);
        let end_col = rect.end_col.min(self.cols);
        for r in rect.row..end_row {
            for c in rect.col.min(end_col)..end_col {
                let cell = &mut self.cells[r * self.cols + c];
                *cell = cell.max(height);
            }
        }
    }
}
