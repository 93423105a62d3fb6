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

use super::{AlgebraError, AlgebraResult, Coeff};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A power series in one variable truncated at a fixed order.
///
/// Convention: `coeffs[k] = f^(k)(0) / k!`, so the series represents
/// `Σ coeffs[k] t^k mod t^(order+1)`. The order is fixed at construction and
/// preserved by every operation; terms above it are dropped.
///
/// The nonlinear operations use the standard Cauchy-product recursions, so the
/// k-th output coefficient only depends on input coefficients up to k. The
/// Taylor step kernel relies on exactly this property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaylorSeries<R> {
    coeffs: Vec<R>,
}

impl<R: Coeff> TaylorSeries<R> {
    /// A constant series of the requested order.
    pub fn constant(value: R, order: usize) -> Self {
        let mut coeffs = Vec::with_capacity(order + 1);
        let zero = value.lift(0.0);
        coeffs.push(value);
        for _ in 0..order {
            coeffs.push(zero.clone());
        }
        Self { coeffs }
    }

    /// The independent variable offset by `value`, i.e. `value + t`.
    ///
    /// Panics if `order` is zero, as a zero-order series cannot carry the
    /// linear term.
    pub fn variable(value: R, order: usize) -> Self {
        assert!(order > 0, "a zero-order series cannot be a variable");
        let one = value.lift(1.0);
        let mut series = Self::constant(value, order);
        series.coeffs[1] = one;
        series
    }

    /// Builds a series directly from its coefficients. Panics on empty input.
    pub fn from_coeffs(coeffs: Vec<R>) -> Self {
        assert!(!coeffs.is_empty(), "a series needs at least one coefficient");
        Self { coeffs }
    }

    pub fn order(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn coeff(&self, k: usize) -> &R {
        &self.coeffs[k]
    }

    pub fn coeffs(&self) -> &[R] {
        &self.coeffs
    }

    pub fn into_coeffs(self) -> Vec<R> {
        self.coeffs
    }

    pub fn set_coeff(&mut self, k: usize, value: R) {
        self.coeffs[k] = value;
    }

    /// All-zero series of the same order and coefficient shape.
    pub fn zeroed(&self) -> Self {
        Self::constant(self.coeffs[0].lift(0.0), self.order())
    }

    /// Copy truncated to a lower order (used by the fused step kernel).
    pub fn truncated(&self, order: usize) -> Self {
        let order = order.min(self.order());
        Self {
            coeffs: self.coeffs[..=order].to_vec(),
        }
    }

    /// Horner evaluation at a scalar offset from the expansion point.
    pub fn evaluate(&self, x: f64) -> R {
        let mut acc = self.coeffs[self.order()].clone();
        for k in (0..self.order()).rev() {
            acc = acc.scale(x) + self.coeffs[k].clone();
        }
        acc
    }

    /// Term-wise derivative. The order is preserved; the top coefficient of
    /// the result is zero.
    pub fn differentiate(&self) -> Self {
        let mut out = self.zeroed();
        for k in 1..=self.order() {
            out.coeffs[k - 1] = self.coeffs[k].scale(k as f64);
        }
        out
    }

    /// Antiderivative with the provided constant of integration. The order is
    /// preserved, so the top input coefficient does not appear in the result.
    pub fn integrate(&self, constant: &R) -> Self {
        let mut out = self.zeroed();
        out.coeffs[0] = constant.clone();
        for k in 1..=self.order() {
            out.coeffs[k] = self.coeffs[k - 1].scale(1.0 / k as f64);
        }
        out
    }

    /// Series composition `self ∘ inner`.
    ///
    /// The inner series must have the same order and a zero constant term,
    /// otherwise the truncated composition is meaningless.
    pub fn compose(&self, inner: &Self) -> AlgebraResult<Self> {
        if self.order() != inner.order() {
            return Err(AlgebraError::OrderMismatch {
                lhs: self.order(),
                rhs: inner.order(),
            });
        }
        if inner.coeffs[0].norm_inf() != 0.0 {
            return Err(AlgebraError::NonZeroInnerConstant {
                constant: inner.coeffs[0].const_part(),
            });
        }
        let mut acc = Self::constant(self.coeffs[self.order()].clone(), self.order());
        for k in (0..self.order()).rev() {
            acc = &acc * inner;
            acc.coeffs[0] += self.coeffs[k].clone();
        }
        Ok(acc)
    }

    /// Re-expansion around a shifted point: returns `g` with
    /// `g(s) = self(s + offset)`.
    pub fn translate(&self, offset: f64) -> Self {
        let shift = Self::variable(self.coeffs[0].lift(offset), self.order().max(1))
            .truncated(self.order());
        let mut acc = Self::constant(self.coeffs[self.order()].clone(), self.order());
        for k in (0..self.order()).rev() {
            acc = &acc * &shift;
            acc.coeffs[0] += self.coeffs[k].clone();
        }
        acc
    }

    /// Division, erroring when the divisor's constant term is not invertible.
    pub fn try_div(&self, rhs: &Self) -> AlgebraResult<Self> {
        self.assert_same_order(rhs);
        let g0_inv = rhs.coeffs[0].recip()?;
        let mut out = self.zeroed();
        for k in 0..=self.order() {
            let mut sum = self.coeffs[k].clone();
            for j in 1..=k {
                sum -= rhs.coeffs[j].clone() * out.coeffs[k - j].clone();
            }
            out.coeffs[k] = sum * g0_inv.clone();
        }
        Ok(out)
    }

    /// Projection onto the unperturbed (δ = 0) series over plain doubles.
    pub fn const_projection(&self) -> TaylorSeries<f64> {
        TaylorSeries {
            coeffs: self.coeffs.iter().map(|c| c.const_part()).collect(),
        }
    }

    fn assert_same_order(&self, rhs: &Self) {
        assert_eq!(
            self.order(),
            rhs.order(),
            "series orders do not match: {} != {}",
            self.order(),
            rhs.order()
        );
    }
}

impl<'a, R: Coeff> Add for &'a TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn add(self, rhs: Self) -> TaylorSeries<R> {
        self.assert_same_order(rhs);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a.clone() + b.clone())
            .collect();
        TaylorSeries { coeffs }
    }
}

impl<'a, R: Coeff> Sub for &'a TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn sub(self, rhs: Self) -> TaylorSeries<R> {
        self.assert_same_order(rhs);
        let coeffs = self
            .coeffs
            .iter()
            .zip(&rhs.coeffs)
            .map(|(a, b)| a.clone() - b.clone())
            .collect();
        TaylorSeries { coeffs }
    }
}

impl<'a, R: Coeff> Mul for &'a TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn mul(self, rhs: Self) -> TaylorSeries<R> {
        self.assert_same_order(rhs);
        let mut out = self.zeroed();
        for k in 0..=self.order() {
            let mut sum = self.coeffs[0].lift(0.0);
            for j in 0..=k {
                sum += self.coeffs[j].clone() * rhs.coeffs[k - j].clone();
            }
            out.coeffs[k] = sum;
        }
        out
    }
}

impl<R: Coeff> Add for TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn add(self, rhs: Self) -> TaylorSeries<R> {
        &self + &rhs
    }
}

impl<R: Coeff> Sub for TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn sub(self, rhs: Self) -> TaylorSeries<R> {
        &self - &rhs
    }
}

impl<R: Coeff> Mul for TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn mul(self, rhs: Self) -> TaylorSeries<R> {
        &self * &rhs
    }
}

impl<R: Coeff> Neg for TaylorSeries<R> {
    type Output = TaylorSeries<R>;

    fn neg(mut self) -> TaylorSeries<R> {
        for c in &mut self.coeffs {
            *c = -c.clone();
        }
        self
    }
}

impl<R: Coeff> AddAssign for TaylorSeries<R> {
    fn add_assign(&mut self, rhs: Self) {
        self.assert_same_order(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a += b;
        }
    }
}

impl<R: Coeff> SubAssign for TaylorSeries<R> {
    fn sub_assign(&mut self, rhs: Self) {
        self.assert_same_order(&rhs);
        for (a, b) in self.coeffs.iter_mut().zip(rhs.coeffs) {
            *a -= b;
        }
    }
}

impl<R: Coeff> fmt::Display for TaylorSeries<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({})", self.coeffs[0])?;
        for (k, c) in self.coeffs.iter().enumerate().skip(1) {
            write!(f, " + ({c}) t^{k}")?;
        }
        Ok(())
    }
}

impl<R: Coeff> Coeff for TaylorSeries<R> {
    fn lift(&self, value: f64) -> Self {
        Self::constant(self.coeffs[0].lift(value), self.order())
    }

    fn const_part(&self) -> f64 {
        self.coeffs[0].const_part()
    }

    fn norm_inf(&self) -> f64 {
        self.coeffs.iter().fold(0.0, |m, c| m.max(c.norm_inf()))
    }

    fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    fn scale(&self, factor: f64) -> Self {
        Self {
            coeffs: self.coeffs.iter().map(|c| c.scale(factor)).collect(),
        }
    }

    fn recip(&self) -> AlgebraResult<Self> {
        let f0_inv = self.coeffs[0].recip()?;
        let mut out = self.zeroed();
        out.coeffs[0] = f0_inv.clone();
        for k in 1..=self.order() {
            let mut sum = self.coeffs[0].lift(0.0);
            for j in 1..=k {
                sum += self.coeffs[j].clone() * out.coeffs[k - j].clone();
            }
            out.coeffs[k] = -(sum * f0_inv.clone());
        }
        Ok(out)
    }

    fn sqrt(&self) -> AlgebraResult<Self> {
        let h0 = self.coeffs[0].sqrt()?;
        let two_h0_inv = h0.scale(2.0).recip()?;
        let mut out = self.zeroed();
        out.coeffs[0] = h0;
        for k in 1..=self.order() {
            let mut sum = self.coeffs[k].clone();
            for j in 1..k {
                sum -= out.coeffs[j].clone() * out.coeffs[k - j].clone();
            }
            out.coeffs[k] = sum * two_h0_inv.clone();
        }
        Ok(out)
    }

    fn exp(&self) -> Self {
        let mut out = self.zeroed();
        out.coeffs[0] = self.coeffs[0].exp();
        for k in 1..=self.order() {
            let mut sum = self.coeffs[0].lift(0.0);
            for j in 1..=k {
                sum += self.coeffs[j].scale(j as f64) * out.coeffs[k - j].clone();
            }
            out.coeffs[k] = sum.scale(1.0 / k as f64);
        }
        out
    }

    fn ln(&self) -> AlgebraResult<Self> {
        let f0_inv = self.coeffs[0].recip()?;
        let mut out = self.zeroed();
        out.coeffs[0] = self.coeffs[0].ln()?;
        for k in 1..=self.order() {
            let mut sum = self.coeffs[0].lift(0.0);
            for j in 1..k {
                sum += out.coeffs[j].scale(j as f64) * self.coeffs[k - j].clone();
            }
            out.coeffs[k] = (self.coeffs[k].clone() - sum.scale(1.0 / k as f64)) * f0_inv.clone();
        }
        Ok(out)
    }

    fn sin_cos(&self) -> (Self, Self) {
        let mut sin = self.zeroed();
        let mut cos = self.zeroed();
        let (s0, c0) = self.coeffs[0].sin_cos();
        sin.coeffs[0] = s0;
        cos.coeffs[0] = c0;
        for k in 1..=self.order() {
            let mut sum_s = self.coeffs[0].lift(0.0);
            let mut sum_c = self.coeffs[0].lift(0.0);
            for j in 1..=k {
                let fj = self.coeffs[j].scale(j as f64);
                sum_s += fj.clone() * cos.coeffs[k - j].clone();
                sum_c += fj * sin.coeffs[k - j].clone();
            }
            sin.coeffs[k] = sum_s.scale(1.0 / k as f64);
            cos.coeffs[k] = -sum_c.scale(1.0 / k as f64);
        }
        (sin, cos)
    }

    fn atan(&self) -> Self {
        // h' = f' / (1 + f²), integrated term by term.
        let one = self.lift(1.0);
        let denom = one + self * self;
        let g = denom
            .recip()
            .expect("1 + f² always has a positive constant term");
        let mut out = self.zeroed();
        out.coeffs[0] = self.coeffs[0].atan();
        for k in 1..=self.order() {
            let mut sum = self.coeffs[0].lift(0.0);
            for j in 1..=k {
                sum += self.coeffs[j].scale(j as f64) * g.coeffs[k - j].clone();
            }
            out.coeffs[k] = sum.scale(1.0 / k as f64);
        }
        out
    }

    fn powi(&self, n: i32) -> AlgebraResult<Self> {
        if n == 0 {
            return Ok(self.lift(1.0));
        }
        let base = if n < 0 { Coeff::recip(self)? } else { self.clone() };
        let mut exponent = n.unsigned_abs();
        let mut acc = base.lift(1.0);
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
        Ok(Coeff::ln(self)?.scale(p).exp())
    }
}

#[test]
fn constant_squares_and_roots() {
    let c = TaylorSeries::<f64>::constant(3.0, 8);
    let sq = &c * &c;
    assert_eq!(sq, TaylorSeries::constant(9.0, 8));
    let root = Coeff::sqrt(&sq).unwrap();
    for k in 0..=8 {
        let expect = if k == 0 { 3.0 } else { 0.0 };
        assert!((root.coeff(k) - expect).abs() < 1e-15);
    }
}

#[test]
fn integration_shifts_coefficients() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![2.0, -1.0, 4.0, 0.5, 3.0]);
    let int = f.integrate(&7.0);
    assert_eq!(*int.coeff(0), 7.0);
    for k in 1..=4 {
        assert!((int.coeff(k) - f.coeff(k - 1) / k as f64).abs() < 1e-16);
    }
    // d/dt then ∫ reproduces the series except for the top coefficient.
    let roundtrip = f.differentiate().integrate(f.coeff(0));
    for k in 0..4 {
        assert!((roundtrip.coeff(k) - f.coeff(k)).abs() < 1e-16);
    }
}

#[test]
fn exp_ln_roundtrip() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![2.0, 0.3, -0.1, 0.05, 0.2, -0.4]);
    let back = Coeff::ln(&Coeff::exp(&f)).unwrap();
    for k in 0..=5 {
        assert!((back.coeff(k) - f.coeff(k)).abs() < 1e-13);
    }
}

#[test]
fn sin_cos_pythagoras() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![0.7, 1.0, -0.2, 0.1, 0.3]);
    let (s, c) = Coeff::sin_cos(&f);
    let unit = &(&s * &s) + &(&c * &c);
    assert!((unit.coeff(0) - 1.0).abs() < 1e-15);
    for k in 1..=4 {
        assert!(unit.coeff(k).abs() < 1e-14);
    }
}

#[test]
fn division_against_multiplication() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![1.5, -0.3, 0.2, 0.7]);
    let g = TaylorSeries::<f64>::from_coeffs(vec![2.0, 0.1, -0.5, 0.3]);
    let q = f.try_div(&g).unwrap();
    let back = &q * &g;
    for k in 0..=3 {
        assert!((back.coeff(k) - f.coeff(k)).abs() < 1e-14);
    }

    let zero_const = TaylorSeries::<f64>::from_coeffs(vec![0.0, 1.0, 0.0, 0.0]);
    assert_eq!(
        f.try_div(&zero_const),
        Err(AlgebraError::NonInvertibleConstant)
    );
}

#[test]
fn composition_requires_zero_inner_constant() {
    let outer = TaylorSeries::<f64>::from_coeffs(vec![1.0, 1.0, 0.5, 1.0 / 6.0]);
    let bad = TaylorSeries::<f64>::from_coeffs(vec![0.5, 1.0, 0.0, 0.0]);
    assert!(matches!(
        outer.compose(&bad),
        Err(AlgebraError::NonZeroInnerConstant { .. })
    ));

    // exp(t) ∘ 2t against exp(2t).
    let inner = TaylorSeries::<f64>::from_coeffs(vec![0.0, 2.0, 0.0, 0.0]);
    let composed = outer.compose(&inner).unwrap();
    for (k, expect) in [1.0, 2.0, 2.0, 4.0 / 3.0].iter().enumerate() {
        assert!((composed.coeff(k) - expect).abs() < 1e-15);
    }
}

#[test]
fn translate_matches_evaluation() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![1.0, -2.0, 0.5, 0.25]);
    let g = f.translate(0.3);
    for x in [-0.2, 0.0, 0.1, 0.5] {
        assert!((g.evaluate(x) - f.evaluate(x + 0.3)).abs() < 1e-14);
    }
}

#[test]
fn horner_evaluation() {
    let f = TaylorSeries::<f64>::from_coeffs(vec![1.0, 2.0, 3.0]);
    assert!((f.evaluate(2.0) - 17.0).abs() < 1e-15);
}
