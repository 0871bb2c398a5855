//! Reconstruction of a candidate potential from the two force components.
//!
//! U_x = -∫F_x dx with y held constant. The y part depends on the strategy:
//! - `Additive`: U_y = -∫F_y dy, the plain sum of the two antiderivatives. Works for
//!   separable fields only, since any mixed term gets counted twice.
//! - `ResidualCorrected`: U_y = -∫(F_y + ∂U_x/∂y) dy integrates only what U_x does not
//!   already account for.
//!
//! Both produce candidates; neither decides whether the field is conservative. That is the
//! verifier's job.
use crate::potential::error::{Axis, Component, PotentialError};
use crate::potential::validator::CoordinateSymbols;
use crate::symbolic::symbolic_engine::Expr;
use log::debug;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ReconstructionStrategy {
    Additive,
    #[default]
    ResidualCorrected,
}

/// `U_x + U_y` before verification.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePotential {
    along_x: Expr,
    along_y: Expr,
    potential: Expr,
}

impl CandidatePotential {
    /// -∫F_x dx
    pub fn along_x(&self) -> &Expr {
        &self.along_x
    }

    /// y contribution, as defined by the strategy
    pub fn along_y(&self) -> &Expr {
        &self.along_y
    }

    pub fn expr(&self) -> &Expr {
        &self.potential
    }
}

fn antiderivative(
    integrand: &Expr,
    component: Component,
    axis: Axis,
    var: &str,
) -> Result<Expr, PotentialError> {
    let integral = integrand
        .integrate(var)
        .map_err(|detail| PotentialError::Integration {
            component,
            axis,
            detail,
        })?;
    Ok((-integral).simplify())
}

pub fn reconstruct(
    fx: &Expr,
    fy: &Expr,
    coords: &CoordinateSymbols,
    strategy: ReconstructionStrategy,
) -> Result<CandidatePotential, PotentialError> {
    let along_x = antiderivative(fx, Component::Fx, Axis::X, coords.x())?;
    debug!("U_x = {}", along_x);
    let y_integrand = match strategy {
        ReconstructionStrategy::Additive => fy.clone(),
        ReconstructionStrategy::ResidualCorrected => {
            (fy.clone() + along_x.diff(coords.y())).simplify()
        }
    };
    debug!("integrating {} with respect to {}", y_integrand, coords.y());
    let along_y = antiderivative(&y_integrand, Component::Fy, Axis::Y, coords.y())?;
    debug!("U_y = {}", along_y);
    let potential = (along_x.clone() + along_y.clone()).simplify();
    Ok(CandidatePotential {
        along_x,
        along_y,
        potential,
    })
}
