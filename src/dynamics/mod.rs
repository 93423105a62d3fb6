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

//! # Dynamics
//! Equations of motion, written once over the abstract coefficient ring and
//! instantiated by the integrator with plain doubles or with the jet algebra.

use crate::algebra::{AlgebraError, Coeff, TaylorSeries};
use crate::ephemeris::EphemerisError;
use snafu::Snafu;

pub mod kepler;
pub use self::kepler::KeplerDynamics;

pub mod oblateness;

pub mod nbody;
pub use self::nbody::RelativisticDynamics;

/// The equations of motion the Taylor integrator advances.
///
/// `eom` receives the state as one truncated series per component and the
/// symbolic time `t + s`, and writes the derivative series into `dxdt`. The
/// k-th derivative coefficient may only depend on state coefficients up to k
/// (true of any algebraic right-hand side evaluated in this algebra); the
/// coefficient recursion of the step kernel relies on it.
///
/// Implementations are generic over [`Coeff`] so that a single definition
/// serves the plain double, jet-transport and extended-precision
/// instantiations.
pub trait Dynamics<R: Coeff>: Send + Sync {
    /// Number of state components.
    fn dim(&self) -> usize;

    fn eom(
        &self,
        t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
        dxdt: &mut [TaylorSeries<R>],
    ) -> Result<(), DynamicsError>;
}

#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DynamicsError {
    #[snafu(display("right-hand side could not read the ephemeris: {source}"))]
    EphemerisRead { source: EphemerisError },

    #[snafu(display("right-hand side left the algebra domain: {source}"))]
    AlgebraDomain { source: AlgebraError },

    #[snafu(display("trajectory impacts {body} at {t} days past J2000"))]
    Impact { body: String, t: f64 },
}

/// Dot product of series-valued 3-vectors.
pub(crate) fn dot3<T: Coeff>(a: &[T; 3], b: &[T; 3]) -> T {
    a[0].clone() * b[0].clone() + a[1].clone() * b[1].clone() + a[2].clone() * b[2].clone()
}

pub(crate) fn sub3<T: Coeff>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    [
        a[0].clone() - b[0].clone(),
        a[1].clone() - b[1].clone(),
        a[2].clone() - b[2].clone(),
    ]
}

pub(crate) fn add3<T: Coeff>(a: &[T; 3], b: &[T; 3]) -> [T; 3] {
    [
        a[0].clone() + b[0].clone(),
        a[1].clone() + b[1].clone(),
        a[2].clone() + b[2].clone(),
    ]
}

/// Component-wise product with a series scalar.
pub(crate) fn mul3<T: Coeff>(a: &[T; 3], factor: &T) -> [T; 3] {
    [
        a[0].clone() * factor.clone(),
        a[1].clone() * factor.clone(),
        a[2].clone() * factor.clone(),
    ]
}

pub(crate) fn scale3<T: Coeff>(a: &[T; 3], factor: f64) -> [T; 3] {
    [a[0].scale(factor), a[1].scale(factor), a[2].scale(factor)]
}

pub(crate) fn zero3<T: Coeff>(proto: &T) -> [T; 3] {
    [proto.lift(0.0), proto.lift(0.0), proto.lift(0.0)]
}
