//! # Canonical form and simplification
//!
//! Every expression is brought to a sum of terms `coefficient * monomial`, where a monomial is a
//! product of atoms raised to real exponents:
//!
//! ```text
//!   Polynomial  = { MonomialKey -> coefficient }
//!   MonomialKey = { Atom -> exponent }
//!   Atom        = x | exp(P) | ln(P) | sin(P) | cos(P) | arcsin(P) | ... | (P)^k | P^Q
//! ```
//!
//! Both maps are `BTreeMap`s, so two expressions that normalise to the same form compare equal
//! structurally and print identically. Normalisation rules applied while building terms:
//!
//! - like terms are collected, near-cancellations (relative 1e-12) are dropped
//! - products of exponentials are merged: `exp(a)*exp(b) = exp(a+b)`, constants are pulled out
//!   of the argument: `exp(x+1) = e*exp(x)`, and `exp(k*ln(u)) = u^k`
//! - sums raised to a positive integer power up to 8 are expanded
//! - `tg` and `ctg` become `sin/cos` and `cos/sin`; `cos^k` for integer `k >= 2` is rewritten through
//!   `cos^2 = 1 - sin^2`, so the Pythagorean identity cancels
//! - odd functions take the argument whose first coefficient is positive: `sin(-u) = -sin(u)`,
//!   even ones drop the sign: `cos(-u) = cos(u)`
//! - constants are folded only when the result is finite and real, so `(-1)^0.5` stays symbolic
//!
//! Zero testing ([`Polynomial::zero_test`]) first looks at the canonical form; a residual that is
//! not structurally empty but vanishes at every probe point is reported as undetermined.
use crate::symbolic::symbolic_engine::Expr;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::FRAC_PI_2;

const EPS: f64 = 1e-12;
const MAX_EXPANSION_POWER: f64 = 8.0;
/// relative tolerance for numerical zero probing
const ZERO_TOLERANCE: f64 = 1e-8;
/// probe coordinates, deliberately away from 0 and from simple rationals
const PROBES: [f64; 5] = [0.37, 1.61, -0.83, 2.47, -1.29];

/// rounds values within 1e-12 (relative) of a non-zero integer, and turns -0.0 into 0.0;
/// a non-zero value never becomes zero
fn snap(v: f64) -> f64 {
    let r = v.round();
    if r != 0.0 && (v - r).abs() <= EPS * r.abs() {
        r
    } else {
        v + 0.0
    }
}

fn is_integer(v: f64) -> bool {
    v.fract() == 0.0
}

/// f64 with a total order, so that it can be a map key
#[derive(Clone, Copy, Debug)]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}
impl Eq for Real {}
impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Real {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Indivisible factor of a monomial.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Atom {
    Var(String),
    /// a sum (or a negative/zero constant) that could not be multiplied out
    Group(Polynomial),
    Exp(Polynomial),
    Ln(Polynomial),
    Sin(Polynomial),
    Cos(Polynomial),
    ArcSin(Polynomial),
    ArcCos(Polynomial),
    ArcTg(Polynomial),
    ArcCtg(Polynomial),
    /// base^exponent with an exponent that is not a number
    PowGeneral(Polynomial, Polynomial),
}

/// product of atoms, each with its exponent
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonomialKey(pub BTreeMap<Atom, Real>);

/// sum of `coefficient * monomial`; the empty map is zero
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Polynomial(pub BTreeMap<MonomialKey, Real>);

/// Outcome of a zero test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroTest {
    /// the canonical form is empty
    Zero,
    /// a probe point gave a clearly non-zero value
    NonZero,
    /// not structurally zero, yet numerically indistinguishable from zero (or not evaluable)
    Undetermined,
}

impl Atom {
    pub fn contains_variable(&self, var: &str) -> bool {
        match self {
            Atom::Var(name) => name == var,
            Atom::Group(p)
            | Atom::Exp(p)
            | Atom::Ln(p)
            | Atom::Sin(p)
            | Atom::Cos(p)
            | Atom::ArcSin(p)
            | Atom::ArcCos(p)
            | Atom::ArcTg(p)
            | Atom::ArcCtg(p) => p.contains_variable(var),
            Atom::PowGeneral(base, exp) => base.contains_variable(var) || exp.contains_variable(var),
        }
    }

    fn collect_variables(&self, acc: &mut BTreeSet<String>) {
        match self {
            Atom::Var(name) => {
                acc.insert(name.clone());
            }
            Atom::Group(p)
            | Atom::Exp(p)
            | Atom::Ln(p)
            | Atom::Sin(p)
            | Atom::Cos(p)
            | Atom::ArcSin(p)
            | Atom::ArcCos(p)
            | Atom::ArcTg(p)
            | Atom::ArcCtg(p) => p.collect_variables(acc),
            Atom::PowGeneral(base, exp) => {
                base.collect_variables(acc);
                exp.collect_variables(acc);
            }
        }
    }

    /// argument of a one-argument function atom
    pub fn argument(&self) -> Option<&Polynomial> {
        match self {
            Atom::Exp(p)
            | Atom::Ln(p)
            | Atom::Sin(p)
            | Atom::Cos(p)
            | Atom::ArcSin(p)
            | Atom::ArcCos(p)
            | Atom::ArcTg(p)
            | Atom::ArcCtg(p) => Some(p),
            _ => None,
        }
    }

    /// the atom as a polynomial with exponent 1; a group yields its content
    pub fn value(&self) -> Polynomial {
        match self {
            Atom::Group(content) => content.clone(),
            _ => Polynomial::atom_power(self.clone(), 1.0),
        }
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Atom::Var(name) => Expr::Var(name.clone()),
            Atom::Group(p) => p.to_expr(),
            Atom::Exp(p) => Expr::Exp(p.to_expr().boxed()),
            Atom::Ln(p) => Expr::Ln(p.to_expr().boxed()),
            Atom::Sin(p) => Expr::sin(p.to_expr().boxed()),
            Atom::Cos(p) => Expr::cos(p.to_expr().boxed()),
            Atom::ArcSin(p) => Expr::arcsin(p.to_expr().boxed()),
            Atom::ArcCos(p) => Expr::arccos(p.to_expr().boxed()),
            Atom::ArcTg(p) => Expr::arctg(p.to_expr().boxed()),
            Atom::ArcCtg(p) => Expr::arcctg(p.to_expr().boxed()),
            Atom::PowGeneral(base, exp) => base.to_expr().pow(exp.to_expr()),
        }
    }

    fn eval(&self, values: &BTreeMap<String, f64>) -> f64 {
        match self {
            Atom::Var(name) => values.get(name).copied().unwrap_or(f64::NAN),
            Atom::Group(p) => p.eval(values),
            Atom::Exp(p) => p.eval(values).exp(),
            Atom::Ln(p) => p.eval(values).ln(),
            Atom::Sin(p) => p.eval(values).sin(),
            Atom::Cos(p) => p.eval(values).cos(),
            Atom::ArcSin(p) => p.eval(values).asin(),
            Atom::ArcCos(p) => p.eval(values).acos(),
            Atom::ArcTg(p) => p.eval(values).atan(),
            Atom::ArcCtg(p) => FRAC_PI_2 - p.eval(values).atan(),
            Atom::PowGeneral(base, exp) => base.eval(values).powf(exp.eval(values)),
        }
    }
}

impl MonomialKey {
    pub fn iter(&self) -> impl Iterator<Item = (&Atom, f64)> {
        self.0.iter().map(|(atom, e)| (atom, e.0))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exponent_of(&self, atom: &Atom) -> Option<f64> {
        self.0.get(atom).map(|e| e.0)
    }

    fn insert(&mut self, atom: Atom, exponent: f64) {
        let exponent = snap(exponent);
        if exponent.abs() < EPS {
            self.0.remove(&atom);
        } else {
            self.0.insert(atom, Real(exponent));
        }
    }

    /// product of two monomials: exponents of shared atoms add up
    pub fn merged(&self, other: &MonomialKey) -> MonomialKey {
        let mut out = self.clone();
        for (atom, e) in other.iter() {
            let total = out.exponent_of(atom).unwrap_or(0.0) + e;
            out.insert(atom.clone(), total);
        }
        out
    }

    /// monomial raised to the power `k`
    pub fn scaled(&self, k: f64) -> MonomialKey {
        let mut out = MonomialKey::default();
        for (atom, e) in self.iter() {
            out.insert(atom.clone(), e * k);
        }
        out
    }

    /// quotient of two monomials
    pub fn divided(&self, other: &MonomialKey) -> MonomialKey {
        self.merged(&other.scaled(-1.0))
    }

    pub fn without(&self, atom: &Atom) -> MonomialKey {
        let mut out = self.clone();
        out.0.remove(atom);
        out
    }

    /// splits into the part depending on `var` and the part that does not
    pub fn split_by(&self, var: &str) -> (MonomialKey, MonomialKey) {
        let mut dependent = MonomialKey::default();
        let mut independent = MonomialKey::default();
        for (atom, e) in self.iter() {
            if atom.contains_variable(var) {
                dependent.0.insert(atom.clone(), Real(e));
            } else {
                independent.0.insert(atom.clone(), Real(e));
            }
        }
        (dependent, independent)
    }

    pub fn contains_variable(&self, var: &str) -> bool {
        self.0.keys().any(|atom| atom.contains_variable(var))
    }

    fn eval(&self, values: &BTreeMap<String, f64>) -> f64 {
        self.iter()
            .map(|(atom, e)| atom.eval(values).powf(e))
            .product()
    }

    fn to_expr(&self, coef: f64) -> Expr {
        let power = |atom: &Atom, e: f64| {
            if e == 1.0 {
                atom.to_expr()
            } else {
                atom.to_expr().pow(Expr::Const(e))
            }
        };
        let mut numerator = Vec::new();
        let mut denominator = Vec::new();
        for (atom, e) in self.iter() {
            if e > 0.0 {
                numerator.push(power(atom, e));
            } else {
                denominator.push(power(atom, -e));
            }
        }
        let numerator = match numerator.into_iter().reduce(|a, b| a * b) {
            None => Expr::Const(coef),
            Some(product) if coef == 1.0 => product,
            Some(product) => Expr::Const(coef) * product,
        };
        match denominator.into_iter().reduce(|a, b| a * b) {
            None => numerator,
            Some(product) => numerator / product,
        }
    }
}

/// Applies the term-level rewrite rules to `coef * key`.
fn normalize_term(coef: f64, key: MonomialKey) -> Polynomial {
    if coef == 0.0 {
        return Polynomial::zero();
    }
    // exp(a)^p * exp(b)^q -> exp(p*a + q*b)
    let exponentials: Vec<(Atom, f64)> = key
        .iter()
        .filter(|(atom, _)| matches!(atom, Atom::Exp(_)))
        .map(|(atom, e)| (atom.clone(), e))
        .collect();
    if exponentials.len() > 1 || exponentials.iter().any(|(_, e)| *e != 1.0) {
        let mut rest = key.clone();
        let mut argument = Polynomial::zero();
        for (atom, e) in &exponentials {
            rest.0.remove(atom);
            if let Some(arg) = atom.argument() {
                argument = argument.add(&arg.scale(*e));
            }
        }
        return normalize_term(coef, rest).mul(&argument.exp());
    }
    for (atom, e) in key.iter() {
        match atom {
            Atom::Group(content) if is_integer(e) && e >= 1.0 && e <= MAX_EXPANSION_POWER => {
                let expanded = content.powi(e as u32);
                return normalize_term(coef, key.without(atom)).mul(&expanded);
            }
            Atom::Cos(arg) if is_integer(e) && e >= 2.0 => {
                let k = e as u32;
                let mut rest = key.without(atom);
                rest.insert(atom.clone(), (k % 2) as f64);
                let one_minus_sin2 = Polynomial::constant(1.0).sub(&arg.sin().powi(2));
                return normalize_term(coef, rest).mul(&one_minus_sin2.powi(k / 2));
            }
            _ => {}
        }
    }
    let mut out = Polynomial::zero();
    if coef != 0.0 {
        out.0.insert(key, Real(snap(coef)));
    }
    out
}

/// finite real result of a constant fold, if there is one
fn fold(v: f64) -> Option<f64> {
    if v.is_finite() { Some(v) } else { None }
}

/// c^k, exact reciprocal and repeated products for integer k
fn real_pow(c: f64, k: f64) -> f64 {
    if is_integer(k) && k.abs() <= i32::MAX as f64 {
        c.powi(k as i32)
    } else {
        c.powf(k)
    }
}

impl Polynomial {
    pub fn zero() -> Self {
        Polynomial(BTreeMap::new())
    }

    pub fn constant(c: f64) -> Self {
        let mut out = Polynomial::zero();
        if c != 0.0 {
            out.0.insert(MonomialKey::default(), Real(snap(c)));
        }
        out
    }

    pub fn var(name: &str) -> Self {
        Polynomial::atom_power(Atom::Var(name.to_string()), 1.0)
    }

    /// `atom^exponent` without further normalisation
    pub fn atom_power(atom: Atom, exponent: f64) -> Self {
        let mut key = MonomialKey::default();
        key.insert(atom, exponent);
        let mut out = Polynomial::zero();
        out.0.insert(key, Real(1.0));
        out
    }

    /// `coef * key`, normalised
    pub fn monomial(coef: f64, key: MonomialKey) -> Self {
        normalize_term(coef, key)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&MonomialKey, f64)> {
        self.0.iter().map(|(key, c)| (key, c.0))
    }

    /// the value of a constant polynomial
    pub fn as_constant(&self) -> Option<f64> {
        match self.0.len() {
            0 => Some(0.0),
            1 => self
                .0
                .iter()
                .next()
                .filter(|(key, _)| key.is_empty())
                .map(|(_, c)| c.0),
            _ => None,
        }
    }

    pub fn single_term(&self) -> Option<(f64, &MonomialKey)> {
        if self.0.len() == 1 {
            self.0.iter().next().map(|(key, c)| (c.0, key))
        } else {
            None
        }
    }

    pub fn constant_term(&self) -> f64 {
        self.0
            .get(&MonomialKey::default())
            .map(|c| c.0)
            .unwrap_or(0.0)
    }

    /// coefficient of the first term in canonical order
    pub fn leading_coefficient(&self) -> f64 {
        self.0.values().next().map(|c| c.0).unwrap_or(0.0)
    }

    pub fn contains_variable(&self, var: &str) -> bool {
        self.0.keys().any(|key| key.contains_variable(var))
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut acc = BTreeSet::new();
        self.collect_variables(&mut acc);
        acc
    }

    fn collect_variables(&self, acc: &mut BTreeSet<String>) {
        for key in self.0.keys() {
            for atom in key.0.keys() {
                atom.collect_variables(acc);
            }
        }
    }

    fn add_term(&mut self, key: MonomialKey, coef: f64) {
        if coef == 0.0 {
            return;
        }
        match self.0.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(Real(snap(coef)));
            }
            Entry::Occupied(mut slot) => {
                let old = slot.get().0;
                let sum = old + coef;
                if sum == 0.0 || sum.abs() <= EPS * old.abs().max(coef.abs()) {
                    slot.remove();
                } else {
                    *slot.get_mut() = Real(snap(sum));
                }
            }
        }
    }

    pub fn add(&self, other: &Polynomial) -> Polynomial {
        let mut out = self.clone();
        for (key, c) in other.terms() {
            out.add_term(key.clone(), c);
        }
        out
    }

    pub fn sub(&self, other: &Polynomial) -> Polynomial {
        self.add(&other.neg())
    }

    pub fn scale(&self, factor: f64) -> Polynomial {
        let mut out = Polynomial::zero();
        if factor == 0.0 {
            return out;
        }
        for (key, c) in self.terms() {
            out.add_term(key.clone(), c * factor);
        }
        out
    }

    pub fn neg(&self) -> Polynomial {
        self.scale(-1.0)
    }

    pub fn mul(&self, other: &Polynomial) -> Polynomial {
        let mut out = Polynomial::zero();
        for (ka, ca) in self.terms() {
            for (kb, cb) in other.terms() {
                out = out.add(&normalize_term(ca * cb, ka.merged(kb)));
            }
        }
        out
    }

    /// repeated multiplication
    pub fn powi(&self, k: u32) -> Polynomial {
        let mut out = Polynomial::constant(1.0);
        for _ in 0..k {
            out = out.mul(self);
        }
        out
    }

    pub fn pow(&self, exponent: &Polynomial) -> Polynomial {
        match exponent.as_constant() {
            Some(k) => self.powf(k),
            None => self.pow_symbolic(exponent),
        }
    }

    /// power with a numeric exponent
    pub fn powf(&self, k: f64) -> Polynomial {
        let k = snap(k);
        if k == 0.0 {
            return Polynomial::constant(1.0);
        }
        if k == 1.0 {
            return self.clone();
        }
        if let Some(c) = self.as_constant() {
            let real_domain = c > 0.0 || is_integer(k);
            return match fold(real_pow(c, k)) {
                Some(v) if real_domain => Polynomial::constant(v),
                _ => Polynomial::atom_power(Atom::Group(self.clone()), k),
            };
        }
        if let Some((c, key)) = self.single_term() {
            // (c*m)^k = c^k * m^k holds for integer k, and for c > 0 when every exponent of m
            // lies in (-1, 1]
            let principal = c > 0.0
                && key
                    .iter()
                    .all(|(atom, e)| matches!(atom, Atom::Exp(_)) || (e > -1.0 && e <= 1.0));
            if is_integer(k) || principal {
                return normalize_term(real_pow(c, k), key.scaled(k));
            }
        }
        if is_integer(k) && k > 0.0 && k <= MAX_EXPANSION_POWER {
            return self.powi(k as u32);
        }
        let lead = self.leading_coefficient();
        let factor = if is_integer(k) { lead } else { lead.abs() };
        let content = self.scale(1.0 / factor);
        Polynomial::constant(real_pow(factor, k))
            .mul(&Polynomial::atom_power(Atom::Group(content), k))
    }

    fn pow_symbolic(&self, exponent: &Polynomial) -> Polynomial {
        if let Some(c) = self.as_constant() {
            if c > 0.0 {
                return exponent.scale(c.ln()).exp();
            }
        }
        if let Some((c, key)) = self.single_term() {
            if c == 1.0 && key.0.len() == 1 {
                if let Some((Atom::Exp(arg), e)) = key.iter().next() {
                    return arg.scale(e).mul(exponent).exp();
                }
            }
        }
        Polynomial::atom_power(Atom::PowGeneral(self.clone(), exponent.clone()), 1.0)
    }

    pub fn exp(&self) -> Polynomial {
        let c0 = self.constant_term();
        let rest = self.sub(&Polynomial::constant(c0));
        let factor = c0.exp();
        if !factor.is_finite() {
            return Polynomial::atom_power(Atom::Exp(self.clone()), 1.0);
        }
        if rest.is_zero() {
            return Polynomial::constant(factor);
        }
        if let Some((k, key)) = rest.single_term() {
            if key.0.len() == 1 {
                if let Some((Atom::Ln(u), e)) = key.iter().next() {
                    if e == 1.0 {
                        return u.powf(k).scale(factor);
                    }
                }
            }
        }
        Polynomial::atom_power(Atom::Exp(rest), 1.0).scale(factor)
    }

    pub fn ln(&self) -> Polynomial {
        if let Some(c) = self.as_constant() {
            if c > 0.0 {
                return Polynomial::constant(c.ln());
            }
        }
        Polynomial::atom_power(Atom::Ln(self.clone()), 1.0)
    }

    pub fn sin(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(c.sin())) {
            return Polynomial::constant(v);
        }
        if self.leading_coefficient() < 0.0 {
            return Polynomial::atom_power(Atom::Sin(self.neg()), 1.0).neg();
        }
        Polynomial::atom_power(Atom::Sin(self.clone()), 1.0)
    }

    pub fn cos(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(c.cos())) {
            return Polynomial::constant(v);
        }
        if self.leading_coefficient() < 0.0 {
            return Polynomial::atom_power(Atom::Cos(self.neg()), 1.0);
        }
        Polynomial::atom_power(Atom::Cos(self.clone()), 1.0)
    }

    pub fn arcsin(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(c.asin())) {
            return Polynomial::constant(v);
        }
        if self.leading_coefficient() < 0.0 {
            return Polynomial::atom_power(Atom::ArcSin(self.neg()), 1.0).neg();
        }
        Polynomial::atom_power(Atom::ArcSin(self.clone()), 1.0)
    }

    pub fn arccos(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(c.acos())) {
            return Polynomial::constant(v);
        }
        Polynomial::atom_power(Atom::ArcCos(self.clone()), 1.0)
    }

    pub fn arctg(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(c.atan())) {
            return Polynomial::constant(v);
        }
        if self.leading_coefficient() < 0.0 {
            return Polynomial::atom_power(Atom::ArcTg(self.neg()), 1.0).neg();
        }
        Polynomial::atom_power(Atom::ArcTg(self.clone()), 1.0)
    }

    pub fn arcctg(&self) -> Polynomial {
        if let Some(v) = self.as_constant().and_then(|c| fold(FRAC_PI_2 - c.atan())) {
            return Polynomial::constant(v);
        }
        Polynomial::atom_power(Atom::ArcCtg(self.clone()), 1.0)
    }

    /// Canonical form of an expression.
    pub fn from_expr(expr: &Expr) -> Polynomial {
        match expr {
            Expr::Var(name) => Polynomial::var(name),
            Expr::Const(c) => Polynomial::constant(*c),
            Expr::Add(lhs, rhs) => Polynomial::from_expr(lhs).add(&Polynomial::from_expr(rhs)),
            Expr::Sub(lhs, rhs) => Polynomial::from_expr(lhs).sub(&Polynomial::from_expr(rhs)),
            Expr::Mul(lhs, rhs) => Polynomial::from_expr(lhs).mul(&Polynomial::from_expr(rhs)),
            Expr::Div(lhs, rhs) => {
                Polynomial::from_expr(lhs).mul(&Polynomial::from_expr(rhs).powf(-1.0))
            }
            Expr::Pow(base, exp) => Polynomial::from_expr(base).pow(&Polynomial::from_expr(exp)),
            Expr::Exp(arg) => Polynomial::from_expr(arg).exp(),
            Expr::Ln(arg) => Polynomial::from_expr(arg).ln(),
            Expr::sin(arg) => Polynomial::from_expr(arg).sin(),
            Expr::cos(arg) => Polynomial::from_expr(arg).cos(),
            Expr::tg(arg) => {
                let p = Polynomial::from_expr(arg);
                p.sin().mul(&p.cos().powf(-1.0))
            }
            Expr::ctg(arg) => {
                let p = Polynomial::from_expr(arg);
                p.cos().mul(&p.sin().powf(-1.0))
            }
            Expr::arcsin(arg) => Polynomial::from_expr(arg).arcsin(),
            Expr::arccos(arg) => Polynomial::from_expr(arg).arccos(),
            Expr::arctg(arg) => Polynomial::from_expr(arg).arctg(),
            Expr::arcctg(arg) => Polynomial::from_expr(arg).arcctg(),
        }
    }

    /// Rebuilds an expression tree; terms in canonical order, negative terms as subtractions.
    pub fn to_expr(&self) -> Expr {
        let mut result: Option<Expr> = None;
        for (key, c) in self.terms() {
            result = Some(match result {
                None => key.to_expr(c),
                Some(acc) if c < 0.0 => acc - key.to_expr(-c),
                Some(acc) => acc + key.to_expr(c),
            });
        }
        result.unwrap_or(Expr::Const(0.0))
    }

    /// partial derivative, returned in canonical form
    pub fn derivative(&self, var: &str) -> Polynomial {
        Polynomial::from_expr(&self.to_expr().diff(var))
    }

    /// real evaluation; variables without a value evaluate to NaN
    pub fn eval(&self, values: &BTreeMap<String, f64>) -> f64 {
        self.terms().map(|(key, c)| c * key.eval(values)).sum()
    }

    /// value together with the sum of absolute term values
    fn eval_with_scale(&self, values: &BTreeMap<String, f64>) -> (f64, f64) {
        self.terms().fold((0.0, 0.0), |(total, scale), (key, c)| {
            let term = c * key.eval(values);
            (total + term, scale + term.abs())
        })
    }

    /// Multiplies by every atom that occurs with a negative exponent, raised to the largest such
    /// exponent, so that quotients like `(x + 1)/(x + 1)` meet their denominators. Groups of
    /// constants (`1/0`, `(-1)^0.5`) are left alone.
    pub fn cleared_denominators(&self) -> Polynomial {
        let mut current = self.clone();
        for _ in 0..4 {
            let mut lowest: BTreeMap<Atom, f64> = BTreeMap::new();
            for (key, _) in current.terms() {
                for (atom, e) in key.iter() {
                    let constant_group =
                        matches!(atom, Atom::Group(content) if content.as_constant().is_some());
                    if e < 0.0 && !constant_group {
                        let entry = lowest.entry(atom.clone()).or_insert(0.0);
                        *entry = entry.min(e);
                    }
                }
            }
            if lowest.is_empty() {
                break;
            }
            let mut multiplier = MonomialKey::default();
            for (atom, e) in lowest {
                multiplier.insert(atom, -e);
            }
            current = current.mul(&Polynomial(BTreeMap::from([(multiplier, Real(1.0))])));
        }
        current
    }

    /// empty canonical form, directly or after clearing denominators
    pub fn is_identically_zero(&self) -> bool {
        self.is_zero() || self.cleared_denominators().is_zero()
    }

    /// Decides whether the polynomial is identically zero.
    pub fn zero_test(&self) -> ZeroTest {
        if self.is_identically_zero() {
            return ZeroTest::Zero;
        }
        let vars: Vec<String> = self.free_variables().into_iter().collect();
        for i in 0..PROBES.len() {
            let values: BTreeMap<String, f64> = vars
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let probe = PROBES[(i + 2 * j) % PROBES.len()] * (1.0 + 0.173 * j as f64);
                    (name.clone(), probe)
                })
                .collect();
            let (total, scale) = self.eval_with_scale(&values);
            if total.is_finite()
                && scale.is_finite()
                && total.abs() > ZERO_TOLERANCE * scale.max(1.0)
            {
                return ZeroTest::NonZero;
            }
        }
        ZeroTest::Undetermined
    }
}

impl Expr {
    /// Simplifies by round-tripping through the canonical form.
    pub fn simplify(&self) -> Expr {
        Polynomial::from_expr(self).to_expr()
    }

    /// See [`Polynomial::zero_test`].
    pub fn zero_test(&self) -> ZeroTest {
        Polynomial::from_expr(self).zero_test()
    }

    /// `self - other` has an empty canonical form (possibly after clearing denominators)
    pub fn equivalent(&self, other: &Expr) -> bool {
        Polynomial::from_expr(self)
            .sub(&Polynomial::from_expr(other))
            .is_identically_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }
    fn canon(s: &str) -> Polynomial {
        Polynomial::from_expr(&parse(s))
    }

    #[test]
    fn test_like_terms_collect() {
        assert!(canon("x*y - y*x").is_zero());
        assert_eq!(canon("x + x + 2*x"), canon("4*x"));
        assert_eq!(canon("(x+y)^2"), canon("x^2 + 2*x*y + y^2"));
        assert_eq!(canon("x/x"), Polynomial::constant(1.0));
    }

    #[test]
    fn test_small_coefficients_survive() {
        assert_eq!(Polynomial::constant(1e-13).as_constant(), Some(1e-13));
        assert_relative_eq!(
            canon("1.6e-19*x").to_expr().eval_xy(2.0, 0.0).unwrap(),
            3.2e-19,
            max_relative = 1e-12
        );
        assert!(!canon("1e-13*y").is_zero());
        assert!(canon("1e-13*y - 1e-13*y").is_zero());
        // near-integers are still rounded
        assert_eq!(Polynomial::constant(3.0 + 1e-15).as_constant(), Some(3.0));
        assert_eq!(Polynomial::constant(-0.0), Polynomial::zero());
    }

    #[test]
    fn test_exponentials_merge() {
        assert_eq!(canon("exp(x)*exp(y)"), canon("exp(x+y)"));
        assert!(canon("exp(x+1) - E*exp(x)").is_zero());
        assert_eq!(canon("exp(2*ln(x))"), canon("x^2"));
        assert_eq!(canon("exp(x)^2"), canon("exp(2*x)"));
        assert_eq!(canon("2^x"), canon("exp(x*ln(2))"));
    }

    #[test]
    fn test_trigonometric_identities() {
        assert!(canon("sin(x)^2 + cos(x)^2 - 1").is_zero());
        assert_eq!(canon("sin(-x)"), canon("-sin(x)"));
        assert_eq!(canon("cos(-x)"), canon("cos(x)"));
        assert_eq!(canon("tan(x)*cos(x)"), canon("sin(x)"));
        assert!(canon("cot(x)*tan(x) - 1").is_zero());
    }

    #[test]
    fn test_fractional_powers() {
        assert_eq!(canon("sqrt(x)^2"), canon("x"));
        assert_eq!(canon("sqrt(x)*sqrt(x)"), canon("x"));
        // (x^2)^(1/2) is |x|, so it must not collapse to x
        assert_ne!(canon("sqrt(x^2)"), canon("x"));
        assert_eq!(canon("sqrt(4*x)"), canon("2*sqrt(x)"));
        assert_eq!(canon("(x^2+1)^0.5*(x^2+1)^0.5"), canon("x^2 + 1"));
    }

    #[test]
    fn test_constant_folding_stays_real() {
        assert_eq!(canon("2^3 + ln(1)"), Polynomial::constant(8.0));
        let imaginary = canon("sqrt(-1)");
        assert!(imaginary.as_constant().is_none());
        // i * i folds back to -1
        assert_eq!(canon("sqrt(-1)*sqrt(-1)"), Polynomial::constant(-1.0));
    }

    #[test]
    fn test_simplify_roundtrip_value() {
        let expr = parse("sqrt(x+1)^2*(x+1) - x*exp(y)*exp(-y)");
        let simplified = expr.simplify();
        for (x, y) in [(0.5, 1.0), (2.0, 0.3), (3.0, -1.5)] {
            assert_relative_eq!(
                simplified.eval_xy(x, y).unwrap(),
                expr.eval_xy(x, y).unwrap(),
                max_relative = 1e-12
            );
        }
        assert!(simplified.equivalent(&parse("x^2 + x + 1")));
    }

    #[test]
    fn test_cleared_denominators() {
        assert!(canon("(2*x + 3)/(2*x + 3) - 1").is_identically_zero());
        assert!(canon("x/(x + 1) + 1/(x + 1) - 1").is_identically_zero());
        assert!(canon("tan(x)^2 + 1 - 1/cos(x)^2").is_identically_zero());
        assert!(!canon("x/(x + 1) - 1").is_identically_zero());
        // 1/0 is not cleared away
        assert!(!canon("x/0").is_identically_zero());
    }

    #[test]
    fn test_zero_test_verdicts() {
        assert_eq!(parse("x - x").zero_test(), ZeroTest::Zero);
        assert_eq!(parse("x*y - 1").zero_test(), ZeroTest::NonZero);
        assert_eq!(parse("3").zero_test(), ZeroTest::NonZero);
        // true identity the canonical form does not know about
        assert_eq!(
            parse("atan(x) + acot(x) - pi/2").zero_test(),
            ZeroTest::Undetermined
        );
    }

    #[test]
    fn test_simplify_is_deterministic() {
        let a = parse("y*sin(x) + x^2*exp(y) - 3/x").simplify();
        let b = parse("x^2*exp(y) - 3/x + sin(x)*y").simplify();
        assert_eq!(format!("{}", a), format!("{}", b));
    }
}
