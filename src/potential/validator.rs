//! Parsing and free-variable validation of a force component.
use crate::potential::error::{Component, PotentialError};
use crate::potential::normalizer::NormalizedExpressionText;
use crate::symbolic::symbolic_engine::Expr;
use log::debug;
use std::collections::BTreeSet;

/// Names of the two planar coordinates, passed to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateSymbols {
    x: String,
    y: String,
}

impl Default for CoordinateSymbols {
    fn default() -> Self {
        CoordinateSymbols::new("x", "y")
    }
}

impl CoordinateSymbols {
    pub fn new(x: &str, y: &str) -> Self {
        CoordinateSymbols {
            x: x.to_string(),
            y: y.to_string(),
        }
    }

    pub fn x(&self) -> &str {
        &self.x
    }

    pub fn y(&self) -> &str {
        &self.y
    }

    /// argument order used when compiling
    pub fn as_args(&self) -> [&str; 2] {
        [&self.x, &self.y]
    }

    pub fn allowed(&self) -> BTreeSet<String> {
        BTreeSet::from([self.x.clone(), self.y.clone()])
    }
}

/// Parses `text` and checks that only the coordinates appear free.
///
/// Undeclared names are reported sorted and without duplicates.
pub fn parse_and_validate(
    text: &NormalizedExpressionText,
    coords: &CoordinateSymbols,
    component: Component,
) -> Result<Expr, PotentialError> {
    let expr = Expr::parse_expression(text.as_str()).map_err(|detail| PotentialError::Parse {
        component,
        input: text.to_string(),
        detail,
    })?;
    let allowed = coords.allowed();
    let undeclared: Vec<String> = expr
        .free_variables()
        .into_iter()
        .filter(|name| !allowed.contains(name))
        .collect();
    if !undeclared.is_empty() {
        return Err(PotentialError::UndeclaredVariables {
            component,
            names: undeclared,
        });
    }
    debug!("{} parsed as {}", component, expr);
    Ok(expr)
}
