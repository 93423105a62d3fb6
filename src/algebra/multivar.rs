/*
    Moros, high-fidelity propagation of near-Earth asteroid trajectories
    Copyright (C) 2023-onwards The Moros Developers

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{AlgebraResult, Coeff, TaylorSeries};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::sync::{Arc, Mutex, OnceLock};

/// Monomial bookkeeping for a `(variables, degree)` shape, shared by every
/// [`MultiSeries`] of that shape.
///
/// Monomials are stored dense, ordered by total degree and lexicographically
/// within a degree, so slot 0 is the constant and slots `1..=vars` are the
/// linear terms in variable order.
#[derive(Debug)]
pub struct JetTable {
    vars: usize,
    degree: usize,
    monomials: Vec<Vec<u8>>,
    degrees: Vec<u8>,
    index: HashMap<Vec<u8>, usize>,
}

fn registry() -> &'static Mutex<HashMap<(usize, usize), Arc<JetTable>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<(usize, usize), Arc<JetTable>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

impl JetTable {
    /// Fetch (or build and intern) the table for this shape.
    pub fn shared(vars: usize, degree: usize) -> Arc<JetTable> {
        assert!(vars > 0, "a jet needs at least one variable");
        let mut reg = registry().lock().unwrap();
        reg.entry((vars, degree))
            .or_insert_with(|| Arc::new(JetTable::build(vars, degree)))
            .clone()
    }

    fn build(vars: usize, degree: usize) -> JetTable {
        let mut monomials = Vec::new();
        let mut prefix = Vec::with_capacity(vars);
        for d in 0..=degree {
            push_monomials(&mut prefix, vars, d as u8, &mut monomials);
        }
        let degrees = monomials
            .iter()
            .map(|m| m.iter().sum::<u8>())
            .collect::<Vec<_>>();
        let index = monomials
            .iter()
            .enumerate()
            .map(|(slot, m)| (m.clone(), slot))
            .collect();
        JetTable {
            vars,
            degree,
            monomials,
            degrees,
            index,
        }
    }

    pub fn vars(&self) -> usize {
        self.vars
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of monomial slots, i.e. C(vars + degree, degree).
    pub fn len(&self) -> usize {
        self.monomials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monomials.is_empty()
    }
}

fn push_monomials(prefix: &mut Vec<u8>, remaining: usize, total: u8, out: &mut Vec<Vec<u8>>) {
    if remaining == 1 {
        prefix.push(total);
        out.push(prefix.clone());
        prefix.pop();
        return;
    }
    for e in (0..=total).rev() {
        prefix.push(e);
        push_monomials(prefix, remaining - 1, total - e, out);
        prefix.pop();
    }
}

/// A polynomial in `vars` variables truncated at a fixed total degree, over
/// plain doubles.
///
/// This is the coefficient ring of the jet-transport state: the variables
/// enumerate the perturbed initial parameters and a series evaluation at a
/// perturbation vector δ yields the quantity for that perturbed initial
/// condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "MultiSeriesRepr", into = "MultiSeriesRepr")]
pub struct MultiSeries {
    table: Arc<JetTable>,
    coeffs: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct MultiSeriesRepr {
    vars: usize,
    degree: usize,
    coeffs: Vec<f64>,
}

impl From<MultiSeriesRepr> for MultiSeries {
    fn from(repr: MultiSeriesRepr) -> Self {
        let table = JetTable::shared(repr.vars, repr.degree);
        assert_eq!(repr.coeffs.len(), table.len(), "corrupt jet coefficients");
        MultiSeries {
            table,
            coeffs: repr.coeffs,
        }
    }
}

impl From<MultiSeries> for MultiSeriesRepr {
    fn from(series: MultiSeries) -> Self {
        MultiSeriesRepr {
            vars: series.table.vars,
            degree: series.table.degree,
            coeffs: series.coeffs,
        }
    }
}

impl PartialEq for MultiSeries {
    fn eq(&self, other: &Self) -> bool {
        self.table.vars == other.table.vars
            && self.table.degree == other.table.degree
            && self.coeffs == other.coeffs
    }
}

impl MultiSeries {
    pub fn constant(table: Arc<JetTable>, value: f64) -> Self {
        let mut coeffs = vec![0.0; table.len()];
        coeffs[0] = value;
        Self { table, coeffs }
    }

    /// The i-th scaled variable, `scale · δᵢ`.
    ///
    /// The per-variable scale factors keep the jet coefficients O(1) over
    /// long integrations; `tests/propagation/jet.rs` drives an unscaled jet
    /// all the way to a floating-point overflow.
    pub fn variable(table: Arc<JetTable>, var: usize, scale: f64) -> Self {
        assert!(var < table.vars(), "variable index out of range");
        assert!(table.degree() > 0, "a degree-zero jet has no variables");
        let mut out = Self::constant(table, 0.0);
        out.coeffs[1 + var] = scale;
        out
    }

    pub fn table(&self) -> &Arc<JetTable> {
        &self.table
    }

    pub fn vars(&self) -> usize {
        self.table.vars()
    }

    pub fn degree(&self) -> usize {
        self.table.degree()
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Coefficient of the linear term in variable `var`.
    pub fn linear(&self, var: usize) -> f64 {
        self.coeffs[1 + var]
    }

    /// Partial derivative with respect to variable `var`.
    pub fn deriv(&self, var: usize) -> Self {
        let mut out = Self::constant(self.table.clone(), 0.0);
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let exps = &self.table.monomials[slot];
            if exps[var] == 0 {
                continue;
            }
            let mut target = exps.clone();
            target[var] -= 1;
            let tgt_slot = self.table.index[&target];
            out.coeffs[tgt_slot] += c * f64::from(exps[var]);
        }
        out
    }

    /// Evaluate at a perturbation vector.
    pub fn eval(&self, delta: &[f64]) -> f64 {
        assert_eq!(delta.len(), self.vars(), "perturbation dimension mismatch");
        let mut total = 0.0;
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let mut term = c;
            for (var, &e) in self.table.monomials[slot].iter().enumerate() {
                for _ in 0..e {
                    term *= delta[var];
                }
            }
            total += term;
        }
        total
    }

    /// Composition: substitute one series per variable, truncating by total
    /// degree. The argument count must match the variable count; arguments
    /// share the shape of `self`.
    pub fn compose(&self, args: &[MultiSeries]) -> Self {
        assert_eq!(args.len(), self.vars(), "argument count mismatch");
        let mut total = Self::constant(self.table.clone(), 0.0);
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            let mut term = Self::constant(self.table.clone(), c);
            for (var, &e) in self.table.monomials[slot].iter().enumerate() {
                for _ in 0..e {
                    term = &term * &args[var];
                }
            }
            total += term;
        }
        total
    }

    fn assert_same_shape(&self, rhs: &Self) {
        assert!(
            self.table.vars == rhs.table.vars && self.table.degree == rhs.table.degree,
            "jet shapes do not match: ({}, {}) != ({}, {})",
            self.table.vars,
            self.table.degree,
            rhs.table.vars,
            rhs.table.degree
        );
    }

    /// Horner composition with a univariate expansion around the constant
    /// part: `outer(c + w)` where `w = self - c` and `outer` carries the
    /// order-`degree` Taylor coefficients of the outer function at `c`.
    fn compose_univariate(&self, outer: &TaylorSeries<f64>) -> Self {
        let degree = self.degree();
        let mut w = self.clone();
        w.coeffs[0] = 0.0;
        let mut acc = Self::constant(self.table.clone(), *outer.coeff(degree));
        for k in (0..degree).rev() {
            acc = &acc * &w;
            acc.coeffs[0] += outer.coeff(k);
        }
        acc
    }

    fn unary(&self, f: impl FnOnce(&TaylorSeries<f64>) -> TaylorSeries<f64>) -> Self {
        if self.degree() == 0 {
            let t = TaylorSeries::constant(self.coeffs[0], 0);
            return Self::constant(self.table.clone(), *f(&t).coeff(0));
        }
        let t = TaylorSeries::variable(self.coeffs[0], self.degree());
        self.compose_univariate(&f(&t))
    }

    fn try_unary(
        &self,
        f: impl FnOnce(&TaylorSeries<f64>) -> AlgebraResult<TaylorSeries<f64>>,
    ) -> AlgebraResult<Self> {
        if self.degree() == 0 {
            let t = TaylorSeries::constant(self.coeffs[0], 0);
            return Ok(Self::constant(self.table.clone(), *f(&t)?.coeff(0)));
        }
        let t = TaylorSeries::variable(self.coeffs[0], self.degree());
        Ok(self.compose_univariate(&f(&t)?))
    }
}

impl<'a> Add for &'a MultiSeries {
    type Output = MultiSeries;

    fn add(self, rhs: Self) -> MultiSeries {
        self.assert_same_shape(rhs);
        let mut out = self.clone();
        for (a, b) in out.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a += b;
        }
        out
    }
}

impl<'a> Sub for &'a MultiSeries {
    type Output = MultiSeries;

    fn sub(self, rhs: Self) -> MultiSeries {
        self.assert_same_shape(rhs);
        let mut out = self.clone();
        for (a, b) in out.coeffs.iter_mut().zip(&rhs.coeffs) {
            *a -= b;
        }
        out
    }
}

impl<'a> Mul for &'a MultiSeries {
    type Output = MultiSeries;

    fn mul(self, rhs: Self) -> MultiSeries {
        self.assert_same_shape(rhs);
        let table = &self.table;
        let max_degree = table.degree as u8;
        let mut out = MultiSeries::constant(self.table.clone(), 0.0);
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            let deg_i = table.degrees[i];
            for (j, &b) in rhs.coeffs.iter().enumerate() {
                if b == 0.0 || deg_i + table.degrees[j] > max_degree {
                    continue;
                }
                let mut key = table.monomials[i].clone();
                for (e, f) in key.iter_mut().zip(&table.monomials[j]) {
                    *e += f;
                }
                out.coeffs[table.index[&key]] += a * b;
            }
        }
        out
    }
}

impl Add for MultiSeries {
    type Output = MultiSeries;

    fn add(self, rhs: Self) -> MultiSeries {
        &self + &rhs
    }
}

impl Sub for MultiSeries {
    type Output = MultiSeries;

    fn sub(self, rhs: Self) -> MultiSeries {
        &self - &rhs
    }
}

impl Mul for MultiSeries {
    type Output = MultiSeries;

    fn mul(self, rhs: Self) -> MultiSeries {
        &self * &rhs
    }
}

impl Neg for MultiSeries {
    type Output = MultiSeries;

    fn neg(mut self) -> MultiSeries {
        for c in &mut self.coeffs {
            *c = -*c;
        }
        self
    }
}

impl AddAssign for MultiSeries {
    fn add_assign(&mut self, rhs: Self) {
        self.assert_same_shape(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a += b;
        }
    }
}

impl SubAssign for MultiSeries {
    fn sub_assign(&mut self, rhs: Self) {
        self.assert_same_shape(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a -= b;
        }
    }
}

impl fmt::Display for MultiSeries {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (slot, &c) in self.coeffs.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            write!(f, "{c:e}")?;
            for (var, &e) in self.table.monomials[slot].iter().enumerate() {
                match e {
                    0 => {}
                    1 => write!(f, " δ{var}")?,
                    _ => write!(f, " δ{var}^{e}")?,
                }
            }
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

impl Coeff for MultiSeries {
    fn lift(&self, value: f64) -> Self {
        Self::constant(self.table.clone(), value)
    }

    fn const_part(&self) -> f64 {
        self.coeffs[0]
    }

    fn norm_inf(&self) -> f64 {
        self.coeffs.iter().fold(0.0, |m, c| m.max(c.abs()))
    }

    fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    fn scale(&self, factor: f64) -> Self {
        let mut out = self.clone();
        for c in &mut out.coeffs {
            *c *= factor;
        }
        out
    }

    fn recip(&self) -> AlgebraResult<Self> {
        self.try_unary(|t| Coeff::recip(t))
    }

    fn sqrt(&self) -> AlgebraResult<Self> {
        self.try_unary(|t| Coeff::sqrt(t))
    }

    fn exp(&self) -> Self {
        self.unary(|t| Coeff::exp(t))
    }

    fn ln(&self) -> AlgebraResult<Self> {
        self.try_unary(|t| Coeff::ln(t))
    }

    fn sin_cos(&self) -> (Self, Self) {
        if self.degree() == 0 {
            let (s, c) = self.coeffs[0].sin_cos();
            return (
                Self::constant(self.table.clone(), s),
                Self::constant(self.table.clone(), c),
            );
        }
        let t = TaylorSeries::variable(self.coeffs[0], self.degree());
        let (sin, cos) = Coeff::sin_cos(&t);
        (
            self.compose_univariate(&sin),
            self.compose_univariate(&cos),
        )
    }

    fn atan(&self) -> Self {
        self.unary(|t| Coeff::atan(t))
    }

    fn powi(&self, n: i32) -> AlgebraResult<Self> {
        if n == 0 {
            return Ok(self.lift(1.0));
        }
        let base = if n < 0 { Coeff::recip(self)? } else { self.clone() };
        let mut exponent = n.unsigned_abs();
        let mut acc = self.lift(1.0);
        let mut squaring = base;
        while exponent > 0 {
            if exponent & 1 == 1 {
                acc = &acc * &squaring;
            }
            exponent >>= 1;
            if exponent > 0 {
                squaring = &squaring * &squaring;
            }
        }
        Ok(acc)
    }

    fn powf(&self, p: f64) -> AlgebraResult<Self> {
        if p >= 0.0 && p.fract() == 0.0 && p <= i32::MAX as f64 {
            return Coeff::powi(self, p as i32);
        }
        self.try_unary(|t| Coeff::powf(t, p))
    }
}
