/// Parsing of expression text into `Expr` trees
///
///# Example
/// ```
/// use RustedPotential::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x^2 + sin(x*y)").unwrap();
/// println!("parsed_expression {}", parsed_expression);
/// ```
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// the `Expr` tree: construction, operator overloading and variable queries
///
///# Example
/// ```
/// use RustedPotential::symbolic::symbolic_engine::Expr;
/// let expr = Expr::parse_expression("x*y + y").unwrap();
/// assert!(expr.contains_variable("x"));
/// assert!(Expr::parse_expression("2*pi").unwrap().is_constant());
/// ```
pub mod symbolic_engine;
/// analytic derivatives and direct evaluation
///
///# Example
/// ```
/// use RustedPotential::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x^2*y").unwrap();
/// let df_dx = f.diff("x");
/// assert_eq!(df_dx.eval_xy(3.0, 2.0).unwrap(), 12.0);
/// ```
pub mod symbolic_engine_derivatives;
///____________________________________________________________________________________________________________________________
/// # Canonical form
/// expressions as sums of monomials over atoms; simplification, equivalence and the
/// identically-zero test
///
///# Example
/// ```
/// use RustedPotential::symbolic::symbolic_engine::Expr;
/// let lhs = Expr::parse_expression("sin(x)^2 + cos(x)^2").unwrap();
/// assert!(lhs.equivalent(&Expr::Const(1.0)));
/// ```
pub mod symbolic_simplify;
///____________________________________________________________________________________________________________________________
/// # Indefinite integration
///
///# Example
/// ```
/// use RustedPotential::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x*exp(x)").unwrap();
/// let antiderivative = f.integrate("x").unwrap();
/// assert!(antiderivative.diff("x").equivalent(&f));
/// ```
pub mod symbolic_integration;
/// compilation into evaluable trees, constant folding with complex detection, grid evaluation
pub mod symbolic_lambdify;
pub mod utils;
