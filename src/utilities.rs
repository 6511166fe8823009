/// Grid helpers shared by the samplers

/// Linear interpolation on a monotonically increasing `x` grid.
///
/// Values of `x_new` outside the grid clamp to the first or last `y` value.
/// Used to invert tabulated cumulative distributions.
pub fn interpolate_linear(x: &[f64], y: &[f64], x_new: f64) -> f64 {
    if x.is_empty() {
        return f64::NAN;
    }
    if x.len() == 1 || x_new <= x[0] {
        return y[0];
    }
    if x_new >= x[x.len() - 1] {
        return y[y.len() - 1];
    }

    // first index with x[idx] > x_new, so x[idx - 1] <= x_new < x[idx]
    let idx = x.partition_point(|&v| v <= x_new);
    let (x1, x2) = (x[idx - 1], x[idx]);
    let (y1, y2) = (y[idx - 1], y[idx]);
    if x2 == x1 {
        return y1;
    }
    y1 + (x_new - x1) * (y2 - y1) / (x2 - x1)
}

/// Index of the grid interval holding `value`.
///
/// Returns `i` with `grid[i] < value <= grid[i + 1]`, clamped to `0` for
/// values at or below the first edge and to `grid.len() - 1` for values past
/// the last edge. `grid` must be non-empty and increasing.
pub fn get_index(value: f64, grid: &[f64]) -> usize {
    let below = grid.partition_point(|&edge| edge < value);
    below.saturating_sub(1).min(grid.len().saturating_sub(1))
}
