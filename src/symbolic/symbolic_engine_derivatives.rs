//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation and direct numerical evaluation of `Expr` trees.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var: &str)` - Analytical partial derivative
//!
//! ### Function evaluation
//! - `eval_expression()` - Direct evaluation without closure creation
//!
//! ## Interesting Code Features
//!
//! 1. **Recursive Differentiation Rules**: product, quotient and chain rules for all supported
//!    functions. Powers are split into three cases: constant exponent (power rule), constant
//!    base (exponential rule) and the general `a^b = exp(b ln a)` rule.
//!
//! 2. The produced trees are not simplified; feed them through `simplify()` when a compact
//!    form is needed.

use crate::symbolic::symbolic_engine::Expr;
use std::collections::BTreeMap;
use std::f64::consts::PI;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// - Power rule: d/dx(u^n) = n*u^(n-1)*u'
    /// - Exponential rule: d/dx(a^v) = a^v*ln(a)*v'
    /// - General rule: d/dx(u^v) = u^v*(v'*ln(u) + v*u'/u)
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = (f'*g - f*g')/g^2
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x"); // 2*x^1*1
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => lhs.diff(var) + rhs.diff(var),
            Expr::Sub(lhs, rhs) => lhs.diff(var) - rhs.diff(var),
            Expr::Mul(lhs, rhs) => {
                lhs.diff(var) * *rhs.clone() + *lhs.clone() * rhs.diff(var)
            }
            Expr::Div(lhs, rhs) => (lhs.diff(var) * *rhs.clone() - rhs.diff(var) * *lhs.clone())
                / (*rhs.clone() * *rhs.clone()),
            Expr::Pow(base, exp) => {
                let base_depends = base.contains_variable(var);
                let exp_depends = exp.contains_variable(var);
                match (base_depends, exp_depends) {
                    (_, false) => {
                        *exp.clone()
                            * base.as_ref().clone().pow(*exp.clone() - Expr::Const(1.0))
                            * base.diff(var)
                    }
                    (false, true) => self.clone() * base.as_ref().clone().ln() * exp.diff(var),
                    (true, true) => {
                        self.clone()
                            * (exp.diff(var) * base.as_ref().clone().ln()
                                + *exp.clone() * base.diff(var) / *base.clone())
                    }
                }
            }
            Expr::Exp(expr) => self.clone() * expr.diff(var),
            Expr::Ln(expr) => expr.diff(var) / *expr.clone(),
            Expr::sin(expr) => Expr::cos(expr.clone()) * expr.diff(var),
            Expr::cos(expr) => -Expr::sin(expr.clone()) * expr.diff(var),
            Expr::tg(expr) => {
                expr.diff(var) / Expr::cos(expr.clone()).pow(Expr::Const(2.0))
            }
            Expr::ctg(expr) => {
                -expr.diff(var) / Expr::sin(expr.clone()).pow(Expr::Const(2.0))
            }
            Expr::arcsin(expr) => {
                expr.diff(var)
                    / (Expr::Const(1.0) - expr.as_ref().clone().pow(Expr::Const(2.0)))
                        .pow(Expr::Const(0.5))
            }
            Expr::arccos(expr) => {
                -expr.diff(var)
                    / (Expr::Const(1.0) - expr.as_ref().clone().pow(Expr::Const(2.0)))
                        .pow(Expr::Const(0.5))
            }
            Expr::arctg(expr) => {
                expr.diff(var) / (Expr::Const(1.0) + expr.as_ref().clone().pow(Expr::Const(2.0)))
            }
            Expr::arcctg(expr) => {
                -expr.diff(var) / (Expr::Const(1.0) + expr.as_ref().clone().pow(Expr::Const(2.0)))
            }
        }
    } // end of diff

    /// Evaluates the expression for the given variable values.
    ///
    /// Real arithmetic: results outside the real domain come out as NaN, poles as infinities.
    /// Errors only when a variable has no value.
    pub fn eval_expression(&self, values: &BTreeMap<String, f64>) -> Result<f64, String> {
        let value = match self {
            Expr::Var(name) => *values
                .get(name)
                .ok_or_else(|| format!("no value given for variable '{}'", name))?,
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => lhs.eval_expression(values)? + rhs.eval_expression(values)?,
            Expr::Sub(lhs, rhs) => lhs.eval_expression(values)? - rhs.eval_expression(values)?,
            Expr::Mul(lhs, rhs) => lhs.eval_expression(values)? * rhs.eval_expression(values)?,
            Expr::Div(lhs, rhs) => lhs.eval_expression(values)? / rhs.eval_expression(values)?,
            Expr::Pow(base, exp) => base
                .eval_expression(values)?
                .powf(exp.eval_expression(values)?),
            Expr::Exp(expr) => expr.eval_expression(values)?.exp(),
            Expr::Ln(expr) => expr.eval_expression(values)?.ln(),
            Expr::sin(expr) => expr.eval_expression(values)?.sin(),
            Expr::cos(expr) => expr.eval_expression(values)?.cos(),
            Expr::tg(expr) => expr.eval_expression(values)?.tan(),
            Expr::ctg(expr) => 1.0 / expr.eval_expression(values)?.tan(),
            Expr::arcsin(expr) => expr.eval_expression(values)?.asin(),
            Expr::arccos(expr) => expr.eval_expression(values)?.acos(),
            Expr::arctg(expr) => expr.eval_expression(values)?.atan(),
            Expr::arcctg(expr) => PI / 2.0 - expr.eval_expression(values)?.atan(),
        };
        Ok(value)
    }

    /// shorthand for expressions of the two planar coordinates
    pub fn eval_xy(&self, x: f64, y: f64) -> Result<f64, String> {
        let values = BTreeMap::from([("x".to_string(), x), ("y".to_string(), y)]);
        self.eval_expression(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::utils::central_difference;
    use approx::assert_relative_eq;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    /// analytic derivative against a central difference at a handful of points
    fn check_against_numeric(input: &str, var: &str, points: &[(f64, f64)]) {
        let expr = parse(input);
        let derivative = expr.diff(var);
        for &(x, y) in points {
            let analytic = derivative.eval_xy(x, y).unwrap();
            let numeric = central_difference(
                |t| {
                    if var == "x" {
                        expr.eval_xy(t, y).unwrap()
                    } else {
                        expr.eval_xy(x, t).unwrap()
                    }
                },
                if var == "x" { x } else { y },
                1e-5,
            );
            assert_relative_eq!(analytic, numeric, epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_polynomial_derivative() {
        let d = parse("3*x^2*y + y^3").diff("x");
        assert_relative_eq!(d.eval_xy(2.0, 5.0).unwrap(), 60.0);
        let d = parse("3*x^2*y + y^3").diff("y");
        assert_relative_eq!(d.eval_xy(2.0, 5.0).unwrap(), 87.0);
    }

    #[test]
    fn test_elementary_functions_match_numeric() {
        let points = [(0.3, 0.7), (1.2, -0.4), (-0.6, 0.25)];
        for input in [
            "sin(x*y) + cos(x)^2",
            "exp(-x^2)*y",
            "ln(x^2 + 1)",
            "tan(x) - cot(x + 2)",
            "asin(x/2) + acos(y/2)",
            "atan(x*y) + acot(x)",
            "sqrt(x^2 + y^2)",
        ] {
            check_against_numeric(input, "x", &points);
            check_against_numeric(input, "y", &points);
        }
    }

    #[test]
    fn test_variable_exponent() {
        let points = [(0.5, 1.5), (1.3, 0.2)];
        // variable base and exponent
        check_against_numeric("y^x", "x", &points);
        check_against_numeric("x^x", "x", &points);
        check_against_numeric("2^(x*y)", "y", &points);
    }

    #[test]
    fn test_arcctg_sign() {
        let d = parse("acot(x)").diff("x");
        assert_relative_eq!(d.eval_xy(1.0, 0.0).unwrap(), -0.5);
    }

    #[test]
    fn test_missing_variable_is_error() {
        let expr = parse("x + z");
        assert!(expr.eval_xy(1.0, 2.0).is_err());
    }
}
