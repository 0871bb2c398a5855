//! Consistency check of a candidate potential against the force field it came from.
use crate::potential::error::{Axis, PotentialError};
use crate::potential::reconstructor::CandidatePotential;
use crate::potential::validator::CoordinateSymbols;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::ZeroTest;
use log::{debug, warn};
use std::collections::BTreeMap;

/// A potential whose gradient is known to be exactly -F, in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedPotential {
    expr: Expr,
    coords: CoordinateSymbols,
}

impl VerifiedPotential {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn coords(&self) -> &CoordinateSymbols {
        &self.coords
    }

    /// ∂U along one axis
    pub fn derivative(&self, axis: Axis) -> Expr {
        match axis {
            Axis::X => self.expr.diff(self.coords.x()),
            Axis::Y => self.expr.diff(self.coords.y()),
        }
    }

    pub fn value_at(&self, x: f64, y: f64) -> Result<f64, String> {
        self.expr.eval_expression(&self.point(x, y))
    }

    /// (∂U/∂x, ∂U/∂y) at a point
    pub fn gradient_at(&self, x: f64, y: f64) -> Result<(f64, f64), String> {
        let point = self.point(x, y);
        let dx = self.derivative(Axis::X).eval_expression(&point)?;
        let dy = self.derivative(Axis::Y).eval_expression(&point)?;
        Ok((dx, dy))
    }

    fn point(&self, x: f64, y: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([
            (self.coords.x().to_string(), x),
            (self.coords.y().to_string(), y),
        ])
    }
}

/// ∂U/∂axis + F_axis must vanish identically. `Undetermined` is a failure too.
fn check_axis(potential: &Expr, force: &Expr, var: &str, axis: Axis) -> Result<(), PotentialError> {
    let residual = potential.diff(var) + force.clone();
    match residual.zero_test() {
        ZeroTest::Zero => {
            debug!("residual along {} vanishes", axis);
            Ok(())
        }
        verdict => {
            warn!(
                "residual along {} is {:?}: {}",
                axis,
                verdict,
                residual.simplify()
            );
            Err(PotentialError::InconsistentField {
                axis,
                undetermined: verdict == ZeroTest::Undetermined,
            })
        }
    }
}

pub fn verify(
    candidate: &CandidatePotential,
    fx: &Expr,
    fy: &Expr,
    coords: &CoordinateSymbols,
) -> Result<VerifiedPotential, PotentialError> {
    let potential = candidate.expr();
    check_axis(potential, fx, coords.x(), Axis::X)?;
    check_axis(potential, fy, coords.y(), Axis::Y)?;
    Ok(VerifiedPotential {
        expr: potential.simplify(),
        coords: coords.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::potential::error::ErrorKind;
    use crate::potential::reconstructor::{ReconstructionStrategy, reconstruct};
    use approx::assert_relative_eq;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    fn verified(fx: &str, fy: &str) -> Result<VerifiedPotential, PotentialError> {
        let coords = CoordinateSymbols::default();
        let (fx, fy) = (parse(fx), parse(fy));
        let candidate = reconstruct(&fx, &fy, &coords, ReconstructionStrategy::default())?;
        verify(&candidate, &fx, &fy, &coords)
    }

    #[test]
    fn test_harmonic_potential() {
        let u = verified("-x", "-y").unwrap();
        assert_eq!(u.value_at(0.0, 0.0).unwrap(), 0.0);
        assert_relative_eq!(u.value_at(10.0, 0.0).unwrap(), 50.0);
        let (dx, dy) = u.gradient_at(3.0, -2.0).unwrap();
        assert_relative_eq!(dx, 3.0);
        assert_relative_eq!(dy, -2.0);
    }

    #[test]
    fn test_mixed_potential_exact_derivatives() {
        let u = verified("y", "x").unwrap();
        assert!(u.derivative(Axis::X).equivalent(&parse("-y")));
        assert!(u.derivative(Axis::Y).equivalent(&parse("-x")));
    }

    #[test]
    fn test_non_conservative_field() {
        let err = verified("y", "y").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentFieldError);
        assert_eq!(
            err,
            PotentialError::InconsistentField {
                axis: Axis::X,
                undetermined: false
            }
        );
        let err = verified("-y", "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentFieldError);
    }

    #[test]
    fn test_undecidable_residual_is_a_failure() {
        // a true identity the canonical form cannot reduce
        let force = parse("atan(x) + acot(x) - pi/2");
        let err = check_axis(&Expr::Const(0.0), &force, "x", Axis::X).unwrap_err();
        assert_eq!(
            err,
            PotentialError::InconsistentField {
                axis: Axis::X,
                undetermined: true
            }
        );
        assert_eq!(err.kind(), ErrorKind::InconsistentFieldError);
        assert!(
            err.to_string().contains("could not be reduced to zero"),
            "{}",
            err
        );
    }

    #[test]
    fn test_additive_candidate_rejected_for_mixed_field() {
        let coords = CoordinateSymbols::default();
        let (fx, fy) = (parse("y"), parse("x"));
        let candidate = reconstruct(&fx, &fy, &coords, ReconstructionStrategy::Additive).unwrap();
        let err = verify(&candidate, &fx, &fy, &coords).unwrap_err();
        assert_eq!(
            err,
            PotentialError::InconsistentField {
                axis: Axis::X,
                undetermined: false
            }
        );
    }

    #[test]
    fn test_trigonometric_field() {
        // U = -sin(x)cos(y)
        let u = verified("cos(x)*cos(y)", "-sin(x)*sin(y)").unwrap();
        assert_relative_eq!(
            u.value_at(0.4, 1.1).unwrap(),
            -(0.4f64.sin() * 1.1f64.cos()),
            epsilon = 1e-12
        );
    }
}
