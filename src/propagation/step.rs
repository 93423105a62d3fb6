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

use super::propagator::PropOpts;
use super::{DynamicsSnafu, PropagationError};
use crate::algebra::{Coeff, TaylorSeries};
use crate::dynamics::Dynamics;
use snafu::ResultExt;

/// One accepted Taylor expansion of the flow around the current time.
#[derive(Clone, Debug)]
pub struct TaylorStep<R> {
    /// The jet polynomial per state component, in the local variable
    /// `s = t − t_k`.
    pub series: Vec<TaylorSeries<R>>,
    /// The step size selected from the truncation error. Always positive;
    /// the driver applies the sign of the integration direction.
    pub dt: f64,
}

/// Compute the Taylor coefficients of the flow at `t` by the jet recursion.
///
/// The state enters with its current value in the constant coefficient and
/// zeros above; for `k = 0..N−1` the right-hand side is evaluated on the
/// partial series (its k-th derivative coefficient is then exact) and
/// `x_{k+1} = dx_k / (k+1)`.
///
/// Two kernels are available. The generic one evaluates the right-hand side
/// on full-order series at every order. The fused one (`opts.parse_eqs`)
/// exploits the triangular structure of the recursion (coefficient k of the
/// derivative only depends on state coefficients up to k) by evaluating on
/// series truncated to the current order, which makes the early orders cheap.
/// Both produce identical coefficients.
pub fn taylor_step<R, D>(
    dynamics: &D,
    t: f64,
    state: &[R],
    step_index: usize,
    opts: &PropOpts,
) -> Result<TaylorStep<R>, PropagationError>
where
    R: Coeff,
    D: Dynamics<R>,
{
    let order = opts.order;
    let dim = state.len();
    let proto = &state[0];

    let mut x: Vec<TaylorSeries<R>> = state
        .iter()
        .map(|v| TaylorSeries::constant(v.clone(), order))
        .collect();
    let t_series = TaylorSeries::variable(proto.lift(t), order);

    if opts.parse_eqs {
        for k in 0..order {
            let truncated: Vec<TaylorSeries<R>> =
                x.iter().map(|s| s.truncated(k + 1)).collect();
            let t_trunc = t_series.truncated(k + 1);
            let mut dxdt = vec![truncated[0].zeroed(); dim];
            dynamics
                .eom(&t_trunc, &truncated, &mut dxdt)
                .context(DynamicsSnafu {
                    t,
                    step: step_index,
                })?;
            for c in 0..dim {
                x[c].set_coeff(k + 1, dxdt[c].coeff(k).scale(1.0 / (k + 1) as f64));
            }
        }
    } else {
        let mut dxdt = vec![x[0].zeroed(); dim];
        for k in 0..order {
            dynamics.eom(&t_series, &x, &mut dxdt).context(DynamicsSnafu {
                t,
                step: step_index,
            })?;
            for c in 0..dim {
                x[c].set_coeff(k + 1, dxdt[c].coeff(k).scale(1.0 / (k + 1) as f64));
            }
        }
    }

    for (c, series) in x.iter().enumerate() {
        if !series.is_finite() {
            return Err(PropagationError::Divergent {
                t,
                step: step_index,
                component: c,
            });
        }
    }

    let dt = select_step(&x, opts, t, step_index)?;
    Ok(TaylorStep { series: x, dt })
}

/// Step size from the last two coefficient rows: for j ∈ {N−1, N} pick Δt
/// with `‖x_j‖∞ Δtʲ ≈ abstol`, take the minimum over components and both
/// rows, and scale by the safety factor. Components below the magnitude
/// floor are ignored; if every component sits below it the step is clamped
/// to `max_step`.
fn select_step<R: Coeff>(
    x: &[TaylorSeries<R>],
    opts: &PropOpts,
    t: f64,
    step_index: usize,
) -> Result<f64, PropagationError> {
    let order = opts.order;
    let mut dt = opts.max_step;
    for j in [order - 1, order] {
        for series in x {
            let magnitude = series.coeff(j).norm_inf();
            if magnitude < opts.coeff_floor {
                continue;
            }
            dt = dt.min((opts.abstol / magnitude).powf(1.0 / j as f64));
        }
    }
    dt *= opts.safety;
    if !dt.is_finite() || dt < opts.min_step {
        return Err(PropagationError::StepSizeUnderflow {
            t,
            step: step_index,
            dt,
        });
    }
    Ok(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::KeplerDynamics;

    #[test]
    fn step_polynomial_reproduces_input_at_zero() {
        let dynamics = KeplerDynamics { gm: 1.0 };
        let opts = PropOpts {
            order: 20,
            abstol: 1e-20,
            ..Default::default()
        };
        let state = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let step = taylor_step(&dynamics, 0.0, &state, 0, &opts).unwrap();
        for (series, value) in step.series.iter().zip(&state) {
            assert_eq!(series.evaluate(0.0), *value);
        }
        assert!(step.dt > 0.0);
    }

    #[test]
    fn fused_and_generic_kernels_agree() {
        let dynamics = KeplerDynamics { gm: 1.0 };
        let state = vec![0.9, 0.1, 0.02, -0.1, 1.05, 0.01];
        let generic = PropOpts {
            order: 15,
            parse_eqs: false,
            ..Default::default()
        };
        let fused = PropOpts {
            order: 15,
            parse_eqs: true,
            ..Default::default()
        };
        let a = taylor_step(&dynamics, 0.0, &state, 0, &generic).unwrap();
        let b = taylor_step(&dynamics, 0.0, &state, 0, &fused).unwrap();
        for (sa, sb) in a.series.iter().zip(&b.series) {
            for k in 0..=15 {
                assert_eq!(sa.coeff(k), sb.coeff(k));
            }
        }
        assert_eq!(a.dt, b.dt);
    }

    #[test]
    fn tighter_tolerance_shrinks_the_step() {
        let dynamics = KeplerDynamics { gm: 1.0 };
        let state = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let loose = PropOpts {
            order: 10,
            abstol: 1e-10,
            ..Default::default()
        };
        let tight = PropOpts {
            order: 10,
            abstol: 1e-20,
            ..Default::default()
        };
        let a = taylor_step(&dynamics, 0.0, &state, 0, &loose).unwrap();
        let b = taylor_step(&dynamics, 0.0, &state, 0, &tight).unwrap();
        assert!(b.dt < a.dt);
    }
}
