//! # Symbolic integration
//!
//! Indefinite integration over the canonical form of `symbolic_simplify`. Every variable other
//! than the integration variable is a constant. The integrand is split into terms; each term
//! `c * I * D` is separated into its part `I` free of the variable and its dependent part `D`,
//! and `D` is matched against, in order:
//!
//! 1. nothing left: `∫ dx = x`
//! 2. power rule `x^n`, with `x^-1 -> ln(x)`
//! 3. a function of a linear argument `a*x + b` (`a` may contain other variables):
//!    exp, sin, cos, sin^2, ln, the inverse trigonometric functions, `(a*x+b)^n`, `q^(a*x+b)`
//! 4. integration by parts for `x^n * exp|sin|cos(a*x + b)`
//! 5. `x^n * ln(x)`
//! 6. substitution: `R * T^k` with `R` proportional to `T'`, and `R * f(A)` with `R` proportional
//!    to `A'`
//!
//! Terms sharing the same non-polynomial factors are tried together with substitution first, so
//! `(2x + 1)/(x^2 + x + 1)` integrates to a single logarithm. Anything else is an error naming the
//! offending term. No constant of integration is added.
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::{Atom, MonomialKey, Polynomial};
use itertools::Itertools;

/// upper bound on n in by-parts reductions of x^n*f(x)
const MAX_PARTS_DEGREE: f64 = 16.0;

impl Expr {
    /// SYMBOLIC INTEGRATION

    /// Indefinite integral with respect to `var`, without constant of integration.
    pub fn integrate(&self, var: &str) -> Result<Expr, String> {
        let integrand = Polynomial::from_expr(self);
        Ok(integrate_polynomial(&integrand, var)?.to_expr())
    }
}

/// Integrates a canonical polynomial term by term.
pub fn integrate_polynomial(integrand: &Polynomial, var: &str) -> Result<Polynomial, String> {
    let x = Atom::Var(var.to_string());
    // terms with the same non-polynomial factors form one group
    let grouped = integrand
        .terms()
        .map(|(key, c)| {
            let (dependent, _) = key.split_by(var);
            (dependent.without(&x), Polynomial::monomial(c, key.clone()))
        })
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .chunk_by(|(signature, _)| signature.clone());
    let mut result = Polynomial::zero();
    for (_, chunk) in &grouped {
        let group = chunk.fold(Polynomial::zero(), |acc, (_, term)| acc.add(&term));
        if group.len() > 1 {
            if let Some(integral) = integrate_by_substitution(&group, var) {
                result = result.add(&integral);
                continue;
            }
        }
        for (key, c) in group.terms() {
            result = result.add(&integrate_term(c, key, var)?);
        }
    }
    Ok(result)
}

fn integrate_term(c: f64, key: &MonomialKey, var: &str) -> Result<Polynomial, String> {
    let (dependent, independent) = key.split_by(var);
    let factor = Polynomial::monomial(c, independent);
    match integrate_monomial(&dependent, var) {
        Some(integral) => Ok(factor.mul(&integral)),
        None => Err(format!(
            "no antiderivative found for {} with respect to {}",
            Polynomial::monomial(c, key.clone()).to_expr(),
            var
        )),
    }
}

/// ∫ D dvar for a monomial D whose atoms all depend on var
fn integrate_monomial(dependent: &MonomialKey, var: &str) -> Option<Polynomial> {
    let atoms: Vec<(&Atom, f64)> = dependent.iter().collect();
    let x = Atom::Var(var.to_string());
    let found = match atoms.as_slice() {
        [] => Some(Polynomial::var(var)),
        [(Atom::Var(_), n)] => Some(integrate_power(var, *n)),
        [(atom, n)] => integrate_function_of_linear(atom, *n, var),
        [(first, n), (atom, e)] if **first == x && *e == 1.0 => {
            integrate_by_parts(*n, atom, var).or_else(|| integrate_power_times_ln(*n, atom, var))
        }
        _ => None,
    };
    found.or_else(|| integrate_by_substitution(&Polynomial::monomial(1.0, dependent.clone()), var))
}

/// ∫ x^n dx
fn integrate_power(var: &str, n: f64) -> Polynomial {
    let x = Polynomial::var(var);
    if n == -1.0 {
        x.ln()
    } else {
        x.powf(n + 1.0).scale(1.0 / (n + 1.0))
    }
}

/// Splits `arg` into `a*var + b` with `a`, `b` free of var.
fn linear_coefficients(arg: &Polynomial, var: &str) -> Option<(Polynomial, Polynomial)> {
    let x = Atom::Var(var.to_string());
    let mut a = Polynomial::zero();
    let mut b = Polynomial::zero();
    for (key, c) in arg.terms() {
        if !key.contains_variable(var) {
            b = b.add(&Polynomial::monomial(c, key.clone()));
            continue;
        }
        if key.exponent_of(&x) != Some(1.0) {
            return None;
        }
        let rest = key.without(&x);
        if rest.contains_variable(var) {
            return None;
        }
        a = a.add(&Polynomial::monomial(c, rest));
    }
    if a.is_zero() { None } else { Some((a, b)) }
}

/// ∫ f(a*x + b)^n dx for the functions with a closed-form table entry
fn integrate_function_of_linear(atom: &Atom, n: f64, var: &str) -> Option<Polynomial> {
    if let Atom::PowGeneral(base, exponent) = atom {
        // q^(a*x + b) = exp((a*x + b) ln q)
        if n != 1.0 || base.contains_variable(var) {
            return None;
        }
        let (a, _) = linear_coefficients(exponent, var)?;
        let scale = a.mul(&base.ln()).powf(-1.0);
        return Some(atom.value().mul(&scale));
    }
    let arg = match atom {
        Atom::Group(content) => content,
        _ => atom.argument()?,
    };
    let (a, _) = linear_coefficients(arg, var)?;
    let one = Polynomial::constant(1.0);
    let arg_squared = arg.powi(2);
    let antiderivative = match atom {
        Atom::Group(content) if n == -1.0 => content.ln(),
        Atom::Group(content) => content.powf(n + 1.0).scale(1.0 / (n + 1.0)),
        Atom::Exp(_) if n == 1.0 => atom.value(),
        Atom::Sin(_) if n == 1.0 => arg.cos().neg(),
        // ∫ sin^2 u du = (u - sin u cos u) / 2
        Atom::Sin(_) if n == 2.0 => arg.sub(&arg.sin().mul(&arg.cos())).scale(0.5),
        Atom::Cos(_) if n == 1.0 => arg.sin(),
        // ∫ ln u du = u ln u - u
        Atom::Ln(_) if n == 1.0 => arg.mul(&arg.ln()).sub(arg),
        // ∫ arcsin u du = u arcsin u + sqrt(1 - u^2)
        Atom::ArcSin(_) if n == 1.0 => arg
            .mul(&arg.arcsin())
            .add(&one.sub(&arg_squared).powf(0.5)),
        // ∫ arccos u du = u arccos u - sqrt(1 - u^2)
        Atom::ArcCos(_) if n == 1.0 => arg
            .mul(&arg.arccos())
            .sub(&one.sub(&arg_squared).powf(0.5)),
        // ∫ arctg u du = u arctg u - ln(1 + u^2) / 2
        Atom::ArcTg(_) if n == 1.0 => arg
            .mul(&arg.arctg())
            .sub(&one.add(&arg_squared).ln().scale(0.5)),
        // ∫ arcctg u du = u arcctg u + ln(1 + u^2) / 2
        Atom::ArcCtg(_) if n == 1.0 => arg
            .mul(&arg.arcctg())
            .add(&one.add(&arg_squared).ln().scale(0.5)),
        _ => return None,
    };
    Some(antiderivative.mul(&a.powf(-1.0)))
}

/// ∫ x^n f(a*x + b) dx = x^n F - n ∫ x^(n-1) F dx, F = ∫ f dx, for f = exp, sin, cos
fn integrate_by_parts(n: f64, atom: &Atom, var: &str) -> Option<Polynomial> {
    if !matches!(atom, Atom::Exp(_) | Atom::Sin(_) | Atom::Cos(_)) {
        return None;
    }
    if n < 1.0 || n > MAX_PARTS_DEGREE || n.fract() != 0.0 {
        return None;
    }
    let f_integral = integrate_function_of_linear(atom, 1.0, var)?;
    let x = Polynomial::var(var);
    let reduced = x.powf(n - 1.0).mul(&f_integral).scale(n);
    let remainder = integrate_polynomial(&reduced, var).ok()?;
    Some(x.powf(n).mul(&f_integral).sub(&remainder))
}

/// ∫ x^n ln(x) dx = x^(n+1)/(n+1) * (ln x - 1/(n+1)),  ∫ ln(x)/x dx = ln(x)^2/2
fn integrate_power_times_ln(n: f64, atom: &Atom, var: &str) -> Option<Polynomial> {
    let x = Polynomial::var(var);
    match atom {
        Atom::Ln(arg) if *arg == x => {
            let ln_x = x.ln();
            if n == -1.0 {
                Some(ln_x.powi(2).scale(0.5))
            } else {
                let m = n + 1.0;
                let bracket = ln_x.sub(&Polynomial::constant(1.0 / m));
                Some(x.powf(m).scale(1.0 / m).mul(&bracket))
            }
        }
        _ => None,
    }
}

/// atoms shared by every term with the same exponent, restricted to those depending on var
fn common_factors(integrand: &Polynomial, var: &str) -> Vec<(Atom, f64)> {
    let mut terms = integrand.terms();
    let Some((first, _)) = terms.next() else {
        return Vec::new();
    };
    let mut common: Vec<(Atom, f64)> = first
        .iter()
        .filter(|(atom, _)| atom.contains_variable(var))
        .map(|(atom, e)| (atom.clone(), e))
        .collect();
    for (key, _) in terms {
        common.retain(|(atom, e)| key.exponent_of(atom) == Some(*e));
    }
    common
}

/// the integrand with `atom^e` removed from every term
fn divide_out(integrand: &Polynomial, atom: &Atom) -> Polynomial {
    let mut out = Polynomial::zero();
    for (key, c) in integrand.terms() {
        out = out.add(&Polynomial::monomial(c, key.without(atom)));
    }
    out
}

/// λ free of var with `numerator == λ * denominator`, if one exists
fn proportionality(numerator: &Polynomial, denominator: &Polynomial, var: &str) -> Option<Polynomial> {
    let (pivot_key, pivot_c) = numerator.terms().next()?;
    for (key, c) in denominator.terms() {
        let lambda = Polynomial::monomial(pivot_c / c, pivot_key.divided(key));
        if lambda.contains_variable(var) {
            continue;
        }
        if numerator.sub(&denominator.mul(&lambda)).is_zero() {
            return Some(lambda);
        }
    }
    None
}

/// u-substitution in its two shapes: λ u' u^k and λ A' f(A)
fn integrate_by_substitution(integrand: &Polynomial, var: &str) -> Option<Polynomial> {
    let candidates = common_factors(integrand, var);
    for (atom, k) in &candidates {
        let rest = divide_out(integrand, atom);
        let u = atom.value();
        let du = u.derivative(var);
        if du.is_zero() {
            continue;
        }
        if let Some(lambda) = proportionality(&rest, &du, var) {
            let antiderivative = if *k == -1.0 {
                u.ln()
            } else {
                u.powf(k + 1.0).scale(1.0 / (k + 1.0))
            };
            return Some(lambda.mul(&antiderivative));
        }
    }
    for (atom, k) in &candidates {
        if *k != 1.0 {
            continue;
        }
        let Some(arg) = atom.argument() else {
            continue;
        };
        let outer = match atom {
            Atom::Exp(_) => atom.value(),
            Atom::Sin(_) => arg.cos().neg(),
            Atom::Cos(_) => arg.sin(),
            Atom::Ln(_) => arg.mul(&arg.ln()).sub(arg),
            _ => continue,
        };
        let rest = divide_out(integrand, atom);
        let d_arg = arg.derivative(var);
        if let Some(lambda) = proportionality(&rest, &d_arg, var) {
            return Some(lambda.mul(&outer));
        }
    }
    None
}
