use crate::types::{PalletLayer, PalletSpec, Placement};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Top-down ASCII plan of one layer. Columns run along the pallet length,
/// rows along its width.
pub fn render_layer(pallet: &PalletSpec, layer: &PalletLayer) -> String {
    if pallet.length <= 0.0 || pallet.width <= 0.0 {
        return String::new();
    }
    // Terminal cells are roughly twice as tall as wide.
    let scale = f64::min(MAX_WIDTH / pallet.length, 2.0 * MAX_HEIGHT / pallet.width);
    let grid_w = (pallet.length * scale).round() as usize;
    let grid_h = (pallet.width * scale / 2.0).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for p in &layer.placements {
        let (x0, z0) = corner(pallet, p);
        let sx = (x0 * scale).round() as usize;
        let sy = (z0 * scale / 2.0).round() as usize;
        let sw = (p.dimensions.l * scale).round() as usize;
        let sh = (p.dimensions.w * scale / 2.0).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }
        draw_rect(&mut grid, sx, sy, sw, sh);
        draw_label(&mut grid, sx, sy, sw, sh, &label(p));
    }

    let mut result = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

/// Near corner of a placement, measured from the pallet corner.
fn corner(pallet: &PalletSpec, p: &Placement) -> (f64, f64) {
    let x = p.position.x + pallet.length / 2.0 - p.dimensions.l / 2.0;
    let z = p.position.z + pallet.width / 2.0 - p.dimensions.w / 2.0;
    (x.max(0.0), z.max(0.0))
}

fn label(p: &Placement) -> String {
    let initial = p.unit_name.chars().next().unwrap_or('?');
    if p.rotated {
        format!("{initial}*")
    } else {
        initial.to_string()
    }
}

fn draw_label(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize, label: &str) {
    if w <= 2 || h == 0 {
        return;
    }
    let chars: Vec<char> = label.chars().collect();
    let cx = x + w / 2;
    let cy = y + h / 2;
    let start_x = cx.saturating_sub(chars.len() / 2);

    for (i, &ch) in chars.iter().enumerate() {
        let col = start_x + i;
        let inside = col > x && col < x + w && cy > y && cy < y + h;
        if inside && cy < grid.len() && col < grid[cy].len() {
            grid[cy][col] = ch;
        }
    }
}

fn merge_edge(existing: char, edge: char) -> char {
    match (existing, edge) {
        ('+', _) => '+',
        ('|', '-') | ('-', '|') => '+',
        _ => edge,
    }
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let Some(cols) = grid.first().map(Vec::len) else {
        return;
    };

    for i in (x..=x + w).filter(|&i| i < cols) {
        for j in [y, y + h].into_iter().filter(|&j| j < rows) {
            grid[j][i] = merge_edge(grid[j][i], '-');
        }
    }
    for j in (y..=y + h).filter(|&j| j < rows) {
        for i in [x, x + w].into_iter().filter(|&i| i < cols) {
            grid[j][i] = merge_edge(grid[j][i], '|');
        }
    }
    for cx in [x, x + w] {
        for cy in [y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}
