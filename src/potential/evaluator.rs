//! Numeric sampling of a verified potential over the fixed grid.
use crate::potential::error::PotentialError;
use crate::potential::validator::CoordinateSymbols;
use crate::potential::verifier::VerifiedPotential;
use crate::symbolic::utils::{linspace, meshgrid};
use log::{debug, warn};
use ndarray::Array2;

pub const GRID_MIN: f64 = -10.0;
pub const GRID_MAX: f64 = 10.0;
pub const GRID_RESOLUTION: usize = 400;

/// Coordinate matrices of the sampling grid; `xs[[i, j]] = x_axis[j]`, `ys[[i, j]] = y_axis[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
    xs: Array2<f64>,
    ys: Array2<f64>,
}

impl SampleGrid {
    /// The fixed [GRID_MIN, GRID_MAX]² grid with GRID_RESOLUTION points per axis.
    pub fn new() -> Self {
        Self::with_bounds(GRID_MIN, GRID_MAX, GRID_RESOLUTION)
    }

    pub(crate) fn with_bounds(min: f64, max: f64, resolution: usize) -> Self {
        let x_axis = linspace(min, max, resolution);
        let y_axis = linspace(min, max, resolution);
        let (xs, ys) = meshgrid(&x_axis, &y_axis);
        SampleGrid {
            x_axis,
            y_axis,
            xs,
            ys,
        }
    }

    pub fn xs(&self) -> &Array2<f64> {
        &self.xs
    }

    pub fn ys(&self) -> &Array2<f64> {
        &self.ys
    }
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Sampled potential: `values[[i, j]] = U(x_axis[j], y_axis[i])`, all finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValues {
    values: Array2<f64>,
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
}

impl FieldValues {
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }

    /// (rows, columns) = (len(y_axis), len(x_axis))
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn into_parts(self) -> (Array2<f64>, Vec<f64>, Vec<f64>) {
        (self.values, self.x_axis, self.y_axis)
    }
}

pub fn evaluate(
    potential: &VerifiedPotential,
    coords: &CoordinateSymbols,
) -> Result<FieldValues, PotentialError> {
    evaluate_on(potential, coords, SampleGrid::new())
}

/// Compiles the potential, rejects complex-valued forms, samples the grid in one pass and
/// rejects any non-finite sample.
pub(crate) fn evaluate_on(
    potential: &VerifiedPotential,
    coords: &CoordinateSymbols,
    grid: SampleGrid,
) -> Result<FieldValues, PotentialError> {
    let function = potential
        .expr()
        .compile(&coords.as_args())
        .map_err(PotentialError::Unexpected)?;
    if let Some(value) = function.complex_part() {
        warn!("complex constant {} in {}", value, potential.expr());
        return Err(PotentialError::ComplexResult {
            value: value.to_string(),
        });
    }
    let values = function
        .eval_grid(&[grid.xs(), grid.ys()])
        .map_err(PotentialError::Unexpected)?;
    let non_finite = values.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        warn!("{} of {} samples are not finite", non_finite, values.len());
        return Err(PotentialError::NonFiniteResult {
            count: non_finite,
            total: values.len(),
        });
    }
    debug!("sampled {:?} grid", values.dim());
    Ok(FieldValues {
        values,
        x_axis: grid.x_axis,
        y_axis: grid.y_axis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::error::ErrorKind;
    use crate::potential::reconstructor::{ReconstructionStrategy, reconstruct};
    use crate::potential::verifier::verify;
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;

    fn verified(fx: &str, fy: &str) -> VerifiedPotential {
        let coords = CoordinateSymbols::default();
        let fx = Expr::parse_expression(fx).unwrap();
        let fy = Expr::parse_expression(fy).unwrap();
        let candidate = reconstruct(&fx, &fy, &coords, ReconstructionStrategy::default()).unwrap();
        verify(&candidate, &fx, &fy, &coords).unwrap()
    }

    #[test]
    fn test_grid_layout() {
        let grid = SampleGrid::new();
        assert_eq!(grid.xs().dim(), (GRID_RESOLUTION, GRID_RESOLUTION));
        assert_eq!(grid.xs()[[0, 0]], GRID_MIN);
        assert_eq!(grid.xs()[[0, GRID_RESOLUTION - 1]], GRID_MAX);
        assert_eq!(grid.ys()[[GRID_RESOLUTION - 1, 0]], GRID_MAX);
    }

    #[test]
    fn test_harmonic_samples() {
        let field = evaluate(&verified("-x", "-y"), &CoordinateSymbols::default()).unwrap();
        assert_eq!(field.shape(), (400, 400));
        assert_relative_eq!(field.values()[[0, 0]], 100.0, epsilon = 1e-9);
        assert_relative_eq!(field.max(), 100.0, epsilon = 1e-9);
        assert!(field.min() >= 0.0);
        // row index follows y, column index follows x
        let (i, j) = (17, 250);
        let (x, y) = (field.x_axis()[j], field.y_axis()[i]);
        assert_relative_eq!(field.values()[[i, j]], 0.5 * (x * x + y * y), epsilon = 1e-9);
    }

    #[test]
    fn test_logarithmic_potential_is_not_finite() {
        let err = evaluate(&verified("1/x", "0"), &CoordinateSymbols::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonFiniteResultError);
        match err {
            PotentialError::NonFiniteResult { count, total } => {
                assert_eq!(total, 160_000);
                // every column with x <= 0
                assert_eq!(count, 200 * 400);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_complex_constant() {
        let err = evaluate(&verified("sqrt(-1)", "0"), &CoordinateSymbols::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComplexResultError);
    }

    #[test]
    fn test_small_grid() {
        let grid = SampleGrid::with_bounds(0.0, 1.0, 3);
        let field = evaluate_on(&verified("-1", "0"), &CoordinateSymbols::default(), grid).unwrap();
        assert_eq!(field.values().row(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }
}
