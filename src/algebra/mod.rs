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

use snafu::Snafu;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Truncated power series in one variable, the workhorse of the integrator.
pub mod series;
pub use self::series::TaylorSeries;

/// Truncated polynomials in several variables, the coefficient ring of the jet.
pub mod multivar;
pub use self::multivar::{JetTable, MultiSeries};

/// Errors raised by the series algebra.
///
/// These are programmer errors: the integrator treats any of them as fatal
/// and aborts with the context attached.
#[derive(Clone, Debug, PartialEq, Snafu)]
pub enum AlgebraError {
    #[snafu(display("series orders do not match: {lhs} != {rhs}"))]
    OrderMismatch { lhs: usize, rhs: usize },

    #[snafu(display("inner series of a composition must have a zero constant term, got {constant}"))]
    NonZeroInnerConstant { constant: f64 },

    #[snafu(display("{op} requires a positive constant term, got {constant}"))]
    NonPositiveConstant { op: &'static str, constant: f64 },

    #[snafu(display("division by a series whose constant term is zero"))]
    NonInvertibleConstant,
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

/// An element of the coefficient ring the integrator computes in.
///
/// The equations of motion are written exactly once over this trait and are
/// then instantiated with `f64` (plain numerical integration), [`MultiSeries`]
/// (jet transport), or a [`TaylorSeries`] over either (the inner recursion of
/// the ephemeris evaluation). Extended-precision scalars plug in through the
/// same seam.
///
/// Constructors are prototype based: `lift` builds a constant with the same
/// shape (series order, variable count, truncation degree) as `self`, so no
/// global state is needed to know what ring one is working in.
///
/// The arithmetic operators panic on shape mismatches, exactly as `nalgebra`
/// panics on dimension mismatches. All *domain* failures (division by a
/// non-invertible element, square root or logarithm outside the domain)
/// return an [`AlgebraError`] instead.
pub trait Coeff:
    Clone
    + PartialEq
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + Sized
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
{
    /// Build a constant of the same ring shape as `self`.
    fn lift(&self, value: f64) -> Self;

    /// The value at the expansion point (all perturbations set to zero).
    fn const_part(&self) -> f64;

    /// Max-norm over every underlying `f64` coefficient.
    ///
    /// Drives both the step-size selection and divergence detection, hence it
    /// must account for *all* coefficients, not just the constant part.
    fn norm_inf(&self) -> f64;

    /// True when every underlying coefficient is finite.
    fn is_finite(&self) -> bool;

    /// Multiplication by a plain scalar.
    fn scale(&self, factor: f64) -> Self;

    /// Multiplicative inverse. Errors when the constant part is zero.
    fn recip(&self) -> AlgebraResult<Self>;

    /// Square root. Errors when the constant part is not positive.
    fn sqrt(&self) -> AlgebraResult<Self>;

    fn exp(&self) -> Self;

    /// Natural logarithm. Errors when the constant part is not positive.
    fn ln(&self) -> AlgebraResult<Self>;

    fn sin_cos(&self) -> (Self, Self);

    fn atan(&self) -> Self;

    /// Integer power. Negative exponents go through `recip`.
    fn powi(&self, n: i32) -> AlgebraResult<Self>;

    /// Real power, as `exp(p ln self)`. Errors outside the logarithm domain.
    fn powf(&self, p: f64) -> AlgebraResult<Self>;
}

impl Coeff for f64 {
    fn lift(&self, value: f64) -> Self {
        value
    }

    fn const_part(&self) -> f64 {
        *self
    }

    fn norm_inf(&self) -> f64 {
        self.abs()
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn scale(&self, factor: f64) -> Self {
        self * factor
    }

    fn recip(&self) -> AlgebraResult<Self> {
        if *self == 0.0 {
            return Err(AlgebraError::NonInvertibleConstant);
        }
        Ok(1.0 / self)
    }

    fn sqrt(&self) -> AlgebraResult<Self> {
        if *self <= 0.0 {
            return Err(AlgebraError::NonPositiveConstant {
                op: "sqrt",
                constant: *self,
            });
        }
        Ok(f64::sqrt(*self))
    }

    fn exp(&self) -> Self {
        f64::exp(*self)
    }

    fn ln(&self) -> AlgebraResult<Self> {
        if *self <= 0.0 {
            return Err(AlgebraError::NonPositiveConstant {
                op: "ln",
                constant: *self,
            });
        }
        Ok(f64::ln(*self))
    }

    fn sin_cos(&self) -> (Self, Self) {
        f64::sin_cos(*self)
    }

    fn atan(&self) -> Self {
        f64::atan(*self)
    }

    fn powi(&self, n: i32) -> AlgebraResult<Self> {
        if n < 0 && *self == 0.0 {
            return Err(AlgebraError::NonInvertibleConstant);
        }
        Ok(f64::powi(*self, n))
    }

    fn powf(&self, p: f64) -> AlgebraResult<Self> {
        if *self <= 0.0 {
            return Err(AlgebraError::NonPositiveConstant {
                op: "powf",
                constant: *self,
            });
        }
        Ok(f64::powf(*self, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_is_a_coeff() {
        let x = 4.0_f64;
        assert_eq!(x.lift(2.5), 2.5);
        assert_eq!(Coeff::sqrt(&x).unwrap(), 2.0);
        assert_eq!(Coeff::recip(&x).unwrap(), 0.25);
        assert!(Coeff::sqrt(&-1.0).is_err());
        assert!(Coeff::ln(&0.0).is_err());
        assert!(Coeff::recip(&0.0).is_err());
    }
}
