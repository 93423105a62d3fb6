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

//! # Propagation
//! The adaptive Taylor-series integrator: step kernel, driver, event
//! detection and the Lyapunov-spectrum layer.

use crate::dynamics::DynamicsError;
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub mod step;
pub use self::step::{taylor_step, TaylorStep};

pub mod propagator;
pub use self::propagator::{PropInstance, PropOpts, Propagator, Solution};

pub mod events;
pub use self::events::{ClosestApproach, EventFunc, EventOpts, EventRecord};

pub mod lyapunov;
pub use self::lyapunov::{lyapunov_spectrum, Jacobian, LyapunovSpectrum};

/// How an integration run ended. Hard failures are reported through
/// [`PropagationError`] instead; both the maxsteps and cancellation cases
/// still hand back the partial trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropOutcome {
    /// The final step was clipped so that the end time is reached exactly.
    Completed,
    /// The per-direction step cap was hit; the trajectory is partial.
    MaxStepsReached,
    /// The cancellation token fired between steps; the trajectory is partial.
    Cancelled,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PropagationError {
    #[snafu(display(
        "step size underflow at t={t} days (step {step}): Δt={dt:e}, the integration diverged"
    ))]
    StepSizeUnderflow { t: f64, step: usize, dt: f64 },

    #[snafu(display("right-hand side failed at t={t} days (step {step}): {source}"))]
    Dynamics {
        t: f64,
        step: usize,
        source: DynamicsError,
    },

    #[snafu(display("non-finite state component {component} at t={t} days (step {step})"))]
    Divergent {
        t: f64,
        step: usize,
        component: usize,
    },

    #[snafu(display("tangent basis became degenerate at t={t} days"))]
    DegenerateTangent { t: f64 },
}
