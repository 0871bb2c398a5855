//! # Symbolic Engine Module
//!
//! Core expression tree used by every stage of the potential reconstruction.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbolic variables like "x", "y"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `ctg` and the inverse trigonometric functions
//!
//! ### Key Methods
//! - `free_variables()` - sorted set of variable names occurring in the expression
//! - `is_constant()` - no variable anywhere in the tree
//! - `contains_variable()` - dependency test used by the integrator
//!
//! ## Interesting Code Features
//!
//! 1. **Immutable trees**: every transformation returns a new `Expr`; nodes are never mutated
//!    in place, so expressions can be shared freely between threads (`Expr: Send + Sync`).
//!
//! 2. **Operator Overloading**: `std::ops` traits (Add, Sub, Mul, Div, Neg) give natural
//!    syntax: `x.clone() * y + Expr::Const(1.0)`
//!
//! 3. **Non-standard Function Names**: mathematical notation (tg, ctg, arctg) instead
//!    of programming conventions (tan, cot, atan)

#![allow(non_camel_case_types)]

use std::collections::BTreeSet;
use std::f64;
use std::fmt;

/// Symbolic expression represented as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function
    sin(Box<Expr>),
    /// Cosine function
    cos(Box<Expr>),
    /// Tangent function
    tg(Box<Expr>),
    /// Cotangent function
    ctg(Box<Expr>),
    /// Arcsine function
    arcsin(Box<Expr>),
    /// Arccosine function
    arccos(Box<Expr>),
    /// Arctangent function
    arctg(Box<Expr>),
    /// Arccotangent function
    arcctg(Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::ctg(expr) => write!(f, "ctg({})", expr),
            Expr::arcsin(expr) => write!(f, "arcsin({})", expr),
            Expr::arccos(expr) => write!(f, "arccos({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
            Expr::arcctg(expr) => write!(f, "arcctg({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// Direct children of the node, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) => Vec::new(),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::ctg(e)
            | Expr::arcsin(e)
            | Expr::arccos(e)
            | Expr::arctg(e)
            | Expr::arcctg(e) => vec![e.as_ref()],
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            _ => self
                .children()
                .into_iter()
                .any(|child| child.contains_variable(var_name)),
        }
    }

    /// Sorted, deduplicated names of all variables occurring in the expression.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut acc = BTreeSet::new();
        self.collect_variables(&mut acc);
        acc
    }

    fn collect_variables(&self, acc: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                acc.insert(name.clone());
            }
            _ => {
                for child in self.children() {
                    child.collect_variables(acc);
                }
            }
        }
    }

    /// `true` when no variable occurs anywhere in the tree.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Var(_) => false,
            Expr::Const(_) => true,
            _ => self.children().into_iter().all(Expr::is_constant),
        }
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> (Expr, Expr) {
        (Expr::Var("x".to_string()), Expr::Var("y".to_string()))
    }

    #[test]
    fn test_free_variables_sorted() {
        let (x, y) = symbols();
        let z = Expr::Var("z".to_string());
        let expr = (z * y.clone()).exp() + x.clone().ln() - y;
        let vars: Vec<String> = expr.free_variables().into_iter().collect();
        assert_eq!(vars, vec!["x", "y", "z"]);
        assert!(Expr::Const(3.0).free_variables().is_empty());
    }

    #[test]
    fn test_constant_detection() {
        let (x, y) = symbols();
        let expr = x.clone().pow(Expr::Const(2.0)) * y;
        assert!(!expr.is_constant());
        assert!(Expr::sin(Expr::Const(2.0).boxed()).exp().is_constant());
        assert!(expr.contains_variable("x"));
        assert!(!expr.contains_variable("z"));
    }

    #[test]
    fn test_children() {
        let (x, y) = symbols();
        assert_eq!((x.clone() * y.clone()).children(), vec![&x, &y]);
        assert_eq!(Expr::sin(x.clone().boxed()).children(), vec![&x]);
        assert!(x.children().is_empty());
    }

    #[test]
    fn test_display() {
        let (x, y) = symbols();
        let expr = x.clone() * y.clone() - Expr::Const(2.0);
        assert_eq!(format!("{}", expr), "((x * y) - 2)");
        assert_eq!(format!("{}", -x), "(-1 * x)");
    }
}
