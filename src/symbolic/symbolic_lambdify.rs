//! # Lambdify
//!
//! Compilation of `Expr` trees into an evaluable form.
//!
//! `Expr::compile` turns a tree into a [`Lambda`] whose variables are resolved to argument
//! slots, so evaluation does no name lookups. Subtrees that contain no variables are folded
//! once during compilation, in complex arithmetic: a constant such as `(-1)^0.5` or `ln(-2)`
//! has a nonzero imaginary part, which the compiled function reports through
//! [`CompiledFunction::complex_part`]. The folded tree keeps only the real part.
//!
//! `eval_grid(&[&Array2<f64>])` evaluates elementwise over ndarray grids, one array per
//! argument, in real arithmetic (`NaN` outside the real domain).
use crate::symbolic::symbolic_engine::Expr;
use ndarray::{Array2, Ix2, Zip};
use num_complex::Complex64;
use std::f64::consts::PI;

/// relative size of an imaginary part that still counts as rounding noise
const IMAGINARY_TOLERANCE: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    Ctg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
    ArcCtg(Box<Lambda>),
}

/// A compiled expression together with what constant folding found out about it.
#[derive(Clone, Debug)]
pub struct CompiledFunction {
    body: Lambda,
    arity: usize,
    complex_part: Option<Complex64>,
}

/// Result of compiling one subtree: either a folded constant or a tree that reads arguments.
enum Compiled {
    Constant(Complex64),
    Tree(Lambda),
}

impl Compiled {
    /// Lowers a maximal constant subtree to its real part, remembering the first one that was
    /// not real.
    fn into_lambda(self, complex_part: &mut Option<Complex64>) -> Lambda {
        match self {
            Compiled::Constant(c) => {
                if complex_part.is_none() && has_imaginary_part(c) {
                    *complex_part = Some(c);
                }
                Lambda::Const(c.re)
            }
            Compiled::Tree(tree) => tree,
        }
    }
}

fn is_integer(v: f64) -> bool {
    v.fract() == 0.0 && v.is_finite()
}

fn complex_pow(base: Complex64, exponent: Complex64) -> Complex64 {
    // stay in real arithmetic whenever the real result is the principal one
    if base.im == 0.0 && exponent.im == 0.0 && (base.re >= 0.0 || is_integer(exponent.re)) {
        Complex64::new(base.re.powf(exponent.re), 0.0)
    } else {
        base.powc(exponent)
    }
}

fn has_imaginary_part(c: Complex64) -> bool {
    c.im.abs() > IMAGINARY_TOLERANCE * c.re.abs().max(1.0)
}

impl Expr {
    /// Compiles the expression with the given argument order.
    ///
    /// Fails when the expression uses a variable that is not listed in `vars`.
    pub fn compile(&self, vars: &[&str]) -> Result<CompiledFunction, String> {
        let mut complex_part = None;
        let body = self
            .compile_node(vars, &mut complex_part)?
            .into_lambda(&mut complex_part);
        Ok(CompiledFunction {
            body,
            arity: vars.len(),
            complex_part,
        })
    }

    fn compile_node(
        &self,
        vars: &[&str],
        complex_part: &mut Option<Complex64>,
    ) -> Result<Compiled, String> {
        let binary = |a: &Expr,
                      b: &Expr,
                      complex_part: &mut Option<Complex64>,
                      fold: fn(Complex64, Complex64) -> Complex64,
                      build: fn(Box<Lambda>, Box<Lambda>) -> Lambda|
         -> Result<Compiled, String> {
            let lhs = a.compile_node(vars, complex_part)?;
            let rhs = b.compile_node(vars, complex_part)?;
            Ok(match (lhs, rhs) {
                (Compiled::Constant(l), Compiled::Constant(r)) => Compiled::Constant(fold(l, r)),
                (lhs, rhs) => Compiled::Tree(build(
                    Box::new(lhs.into_lambda(complex_part)),
                    Box::new(rhs.into_lambda(complex_part)),
                )),
            })
        };
        let unary = |e: &Expr,
                     complex_part: &mut Option<Complex64>,
                     fold: fn(Complex64) -> Complex64,
                     build: fn(Box<Lambda>) -> Lambda|
         -> Result<Compiled, String> {
            Ok(match e.compile_node(vars, complex_part)? {
                Compiled::Constant(c) => Compiled::Constant(fold(c)),
                tree => Compiled::Tree(build(Box::new(tree.into_lambda(complex_part)))),
            })
        };

        let compiled = match self {
            Expr::Var(name) => {
                let idx = vars.iter().position(|&v| v == name).ok_or_else(|| {
                    format!("variable '{}' is not among the arguments {:?}", name, vars)
                })?;
                Compiled::Tree(Lambda::Var(idx))
            }
            Expr::Const(v) => Compiled::Constant(Complex64::new(*v, 0.0)),
            Expr::Add(a, b) => binary(a, b, complex_part, |l, r| l + r, Lambda::Add)?,
            Expr::Sub(a, b) => binary(a, b, complex_part, |l, r| l - r, Lambda::Sub)?,
            Expr::Mul(a, b) => binary(a, b, complex_part, |l, r| l * r, Lambda::Mul)?,
            Expr::Div(a, b) => binary(a, b, complex_part, |l, r| l / r, Lambda::Div)?,
            Expr::Pow(a, b) => binary(a, b, complex_part, complex_pow, Lambda::Pow)?,
            Expr::Exp(e) => unary(e, complex_part, |c| c.exp(), Lambda::Exp)?,
            Expr::Ln(e) => unary(e, complex_part, |c| c.ln(), Lambda::Ln)?,
            Expr::sin(e) => unary(e, complex_part, |c| c.sin(), Lambda::Sin)?,
            Expr::cos(e) => unary(e, complex_part, |c| c.cos(), Lambda::Cos)?,
            Expr::tg(e) => unary(e, complex_part, |c| c.tan(), Lambda::Tg)?,
            Expr::ctg(e) => unary(e, complex_part, |c| c.tan().inv(), Lambda::Ctg)?,
            Expr::arcsin(e) => unary(e, complex_part, |c| c.asin(), Lambda::ArcSin)?,
            Expr::arccos(e) => unary(e, complex_part, |c| c.acos(), Lambda::ArcCos)?,
            Expr::arctg(e) => unary(e, complex_part, |c| c.atan(), Lambda::ArcTg)?,
            Expr::arcctg(e) => unary(
                e,
                complex_part,
                |c| Complex64::new(PI / 2.0, 0.0) - c.atan(),
                Lambda::ArcCtg,
            )?,
        };
        Ok(compiled)
    }
}

impl Lambda {
    /// elementwise evaluation; every argument array has shape `dim`
    fn eval_array(&self, args: &[&Array2<f64>], dim: Ix2) -> Array2<f64> {
        match self {
            Lambda::Var(i) => args[*i].clone(),
            Lambda::Const(v) => Array2::from_elem(dim, *v),
            Lambda::Add(a, b) => a.eval_array(args, dim) + &b.eval_array(args, dim),
            Lambda::Sub(a, b) => a.eval_array(args, dim) - &b.eval_array(args, dim),
            Lambda::Mul(a, b) => a.eval_array(args, dim) * &b.eval_array(args, dim),
            Lambda::Div(a, b) => a.eval_array(args, dim) / &b.eval_array(args, dim),
            Lambda::Pow(a, b) => {
                let base = a.eval_array(args, dim);
                let exponent = b.eval_array(args, dim);
                Zip::from(&base)
                    .and(&exponent)
                    .map_collect(|&u, &k| u.powf(k))
            }
            Lambda::Exp(e) => e.eval_array(args, dim).mapv_into(f64::exp),
            Lambda::Ln(e) => e.eval_array(args, dim).mapv_into(f64::ln),
            Lambda::Sin(e) => e.eval_array(args, dim).mapv_into(f64::sin),
            Lambda::Cos(e) => e.eval_array(args, dim).mapv_into(f64::cos),
            Lambda::Tg(e) => e.eval_array(args, dim).mapv_into(f64::tan),
            Lambda::Ctg(e) => e.eval_array(args, dim).mapv_into(|v| 1.0 / v.tan()),
            Lambda::ArcSin(e) => e.eval_array(args, dim).mapv_into(f64::asin),
            Lambda::ArcCos(e) => e.eval_array(args, dim).mapv_into(f64::acos),
            Lambda::ArcTg(e) => e.eval_array(args, dim).mapv_into(f64::atan),
            Lambda::ArcCtg(e) => e.eval_array(args, dim).mapv_into(|v| PI / 2.0 - v.atan()),
        }
    }
}

impl CompiledFunction {
    /// first constant subtree with a non-negligible imaginary part
    pub fn complex_part(&self) -> Option<Complex64> {
        self.complex_part
    }

    /// Evaluates elementwise over equally shaped grids, one per compiled argument.
    pub fn eval_grid(&self, grids: &[&Array2<f64>]) -> Result<Array2<f64>, String> {
        if grids.len() != self.arity {
            return Err(format!(
                "expected {} argument grids, got {}",
                self.arity,
                grids.len()
            ));
        }
        let dim = match grids.first() {
            Some(first) => first.raw_dim(),
            None => return Err("at least one argument grid is needed to fix the shape".to_string()),
        };
        if grids.iter().any(|grid| grid.raw_dim() != dim) {
            return Err("argument grids differ in shape".to_string());
        }
        Ok(self.body.eval_array(grids, dim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::utils::meshgrid;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    /// value at one point, through 1x1 grids
    fn at(f: &CompiledFunction, args: &[f64]) -> f64 {
        let grids: Vec<Array2<f64>> = args.iter().map(|&v| Array2::from_elem((1, 1), v)).collect();
        let refs: Vec<&Array2<f64>> = grids.iter().collect();
        f.eval_grid(&refs).unwrap()[[0, 0]]
    }

    #[test]
    fn test_compile_polynomial() {
        let f = parse("x^2 + 2*x*y + 1").compile(&["x", "y"]).unwrap();
        assert_eq!(f.arity, 2);
        assert_relative_eq!(at(&f, &[3.0, 0.5]), 13.0);
        assert!(f.complex_part().is_none());
    }

    #[test]
    fn test_argument_order() {
        let f = parse("x - y").compile(&["y", "x"]).unwrap();
        assert_relative_eq!(at(&f, &[1.0, 5.0]), 4.0);
    }

    #[test]
    fn test_unknown_variable() {
        let err = parse("x + z").compile(&["x", "y"]).unwrap_err();
        assert!(err.contains("'z'"));
    }

    #[test]
    fn test_wrong_arity() {
        let f = parse("x").compile(&["x", "y"]).unwrap();
        assert!(f.eval_grid(&[&array![[1.0]]]).is_err());
    }

    #[test]
    fn test_constant_subtrees_fold() {
        let f = parse("x * (2 + 3) * sin(pi/2)").compile(&["x"]).unwrap();
        match &f.body {
            Lambda::Mul(lhs, rhs) => {
                assert!(matches!(**rhs, Lambda::Const(v) if (v - 1.0).abs() < 1e-15));
                assert!(matches!(**lhs, Lambda::Mul(_, _)));
            }
            other => panic!("unexpected tree {:?}", other),
        }
        assert_relative_eq!(at(&f, &[2.0]), 10.0);
    }

    #[test]
    fn test_imaginary_constants_are_flagged() {
        for input in ["sqrt(-1)*x", "x + ln(-2)", "asin(2) + y", "x*(-8)^(1/3)"] {
            let f = parse(input).compile(&["x", "y"]).unwrap();
            assert!(f.complex_part().is_some(), "{} should be complex", input);
        }
        let f = parse("sqrt(-1)*x").compile(&["x"]).unwrap();
        let c = f.complex_part().unwrap();
        assert_relative_eq!(c.im, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_real_constants_are_not_flagged() {
        for input in [
            "(-2)^3*x",
            "sqrt(4) + x",
            "ln(exp(2))*x",
            "acos(0.5) + x",
            "(-1)^2*x",
            "x*sqrt(-1)^2",
        ] {
            let f = parse(input).compile(&["x"]).unwrap();
            assert!(f.complex_part().is_none(), "{} should be real", input);
        }
    }

    #[test]
    fn test_non_finite_values_are_not_complex() {
        let f = parse("x/0").compile(&["x"]).unwrap();
        assert!(f.complex_part().is_none());
        assert!(at(&f, &[1.0]).is_infinite());
        let f = parse("ln(x)").compile(&["x"]).unwrap();
        assert!(at(&f, &[-1.0]).is_nan());
    }

    #[test]
    fn test_eval_grid_matches_pointwise() {
        let (xs, ys) = meshgrid(&[-1.0, 0.5, 2.0], &[0.25, 3.0]);
        let expr = parse("x^2*y - sin(x*y) + 2^x + acot(y)");
        let f = expr.compile(&["x", "y"]).unwrap();
        let grid = f.eval_grid(&[&xs, &ys]).unwrap();
        assert_eq!(grid.dim(), (2, 3));
        for ((i, j), value) in grid.indexed_iter() {
            let expected = expr.eval_xy(xs[[i, j]], ys[[i, j]]).unwrap();
            assert_relative_eq!(*value, expected, max_relative = 1e-14);
        }
    }

    #[test]
    fn test_eval_grid_constant_expression() {
        let xs = array![[1.0, 2.0], [3.0, 4.0]];
        let f = parse("7").compile(&["x"]).unwrap();
        let grid = f.eval_grid(&[&xs]).unwrap();
        assert!(grid.iter().all(|&v| v == 7.0));
    }

    #[test]
    fn test_eval_grid_shape_mismatch() {
        let xs = array![[1.0, 2.0]];
        let ys = array![[1.0], [2.0]];
        let f = parse("x + y").compile(&["x", "y"]).unwrap();
        assert!(f.eval_grid(&[&xs, &ys]).is_err());
        assert!(f.eval_grid(&[&xs]).is_err());
    }
}
