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

/*! # moros

High-order Taylor-series propagation of near-Earth asteroid trajectories
through the relativistic Solar System, with jet transport of the sensitivity
to the uncertain initial parameters and close-approach event detection. The
reference target is (99942) Apophis.

The integrator state lives in a truncated polynomial algebra: each component
is a Taylor series in time whose coefficients are, when uncertainty transport
is requested, themselves multivariate polynomials in the perturbed initial
parameters. The equations of motion are written once over that abstract ring.
*/

/// The truncated power-series algebras the integrator computes in.
pub mod algebra;

/// Physical and unit constants (au, days, TDB).
pub mod constants;

/// Equations of motion: relativistic N-body, oblateness, non-gravitational
/// terms, and the two-body validation dynamics.
pub mod dynamics;

/// Piecewise-polynomial interpolants and the Solar-System ephemeris.
pub mod ephemeris;

mod errors;
pub use self::errors::MorosError;

/// Binary file containers.
pub mod io;

/// The adaptive Taylor integrator, event detection and the Lyapunov layer.
pub mod propagation;

/// Dense integration output.
pub mod trajectory;

#[macro_use]
extern crate log;

/// Common imports for downstream users.
pub mod prelude {
    pub use crate::algebra::{Coeff, JetTable, MultiSeries, TaylorSeries};
    pub use crate::dynamics::{Dynamics, KeplerDynamics, RelativisticDynamics};
    pub use crate::ephemeris::{
        solar_system_bodies, GravParams, PiecewiseSeries, SolarSystemEphemeris,
    };
    pub use crate::io::FileIO;
    pub use crate::propagation::{
        lyapunov_spectrum, ClosestApproach, EventFunc, EventOpts, EventRecord, Jacobian,
        PropInstance, PropOpts, PropOutcome, Propagator, Solution,
    };
    pub use crate::trajectory::Trajectory;
    pub use crate::MorosError;
}

/// Re-export of hifitime, used at the I/O time boundary.
pub mod time {
    pub use hifitime::*;
}
