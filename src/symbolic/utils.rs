//! Grid and finite-difference helpers shared by the symbolic layer and its tests.
use ndarray::Array2;

/// `num_values` evenly spaced points from `start` to `end`, both ends included
pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    match num_values {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num_values as f64 - 1.0);
            let mut values: Vec<f64> = (0..num_values).map(|i| start + i as f64 * step).collect();
            // the last point lands exactly on `end`
            values[num_values - 1] = end;
            values
        }
    }
}

/// Coordinate matrices in "xy" indexing: `X[[i, j]] = x[j]`, `Y[[i, j]] = y[i]`.
pub fn meshgrid(x: &[f64], y: &[f64]) -> (Array2<f64>, Array2<f64>) {
    let shape = (y.len(), x.len());
    let xs = Array2::from_shape_fn(shape, |(_, j)| x[j]);
    let ys = Array2::from_shape_fn(shape, |(i, _)| y[i]);
    (xs, ys)
}

/// symmetric difference quotient (f(at + h) - f(at - h)) / 2h
pub fn central_difference<F>(f: F, at: f64, h: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(at + h) - f(at - h)) / (2.0 * h)
}
