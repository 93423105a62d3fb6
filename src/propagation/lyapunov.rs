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

//! Finite-time Lyapunov spectrum via the variational equations.
//!
//! The state is augmented with the fundamental matrix Φ (row-major), advanced
//! by `dΦ/dt = (∂f/∂x)·Φ`, and re-orthonormalized with modified Gram–Schmidt
//! after every accepted step; the running sums of `ln R_jj` divided by the
//! elapsed time are the finite-time exponents.

use super::propagator::PropOpts;
use super::step::taylor_step;
use super::{PropOutcome, PropagationError};
use crate::algebra::{JetTable, MultiSeries, TaylorSeries};
use crate::dynamics::{Dynamics, DynamicsError};

/// User-supplied Jacobian in the series algebra, row-major `dof²` entries.
pub type JacobianFn = dyn Fn(
        &TaylorSeries<f64>,
        &[TaylorSeries<f64>],
    ) -> Result<Vec<TaylorSeries<f64>>, DynamicsError>
    + Send
    + Sync;

/// Where ∂f/∂x comes from.
pub enum Jacobian<'a> {
    /// Automatic differentiation through a degree-1 jet in every state
    /// variable.
    Automatic,
    /// An analytic Jacobian function.
    Analytic(&'a JacobianFn),
}

/// The result of a spectrum computation.
#[derive(Clone, Debug)]
pub struct LyapunovSpectrum {
    /// Finite-time exponents at the end of the run, 1/day.
    pub exponents: Vec<f64>,
    /// Per-step history of `(t, finite-time exponents)`.
    pub history: Vec<(f64, Vec<f64>)>,
    pub t: f64,
    /// Final trajectory state (without the tangent block).
    pub state: Vec<f64>,
    pub outcome: PropOutcome,
}

struct VariationalDynamics<'a, D> {
    inner: &'a D,
    dof: usize,
    jacobian: &'a Jacobian<'a>,
}

impl<'a, D> VariationalDynamics<'a, D>
where
    D: Dynamics<f64> + Dynamics<MultiSeries>,
{
    fn automatic_jacobian(
        &self,
        t: &TaylorSeries<f64>,
        x: &[TaylorSeries<f64>],
    ) -> Result<Vec<TaylorSeries<f64>>, DynamicsError> {
        let dof = self.dof;
        let table = JetTable::shared(dof, 1);

        let mut jet_state = Vec::with_capacity(dof);
        for (i, series) in x.iter().enumerate() {
            let mut coeffs: Vec<MultiSeries> = series
                .coeffs()
                .iter()
                .map(|&c| MultiSeries::constant(table.clone(), c))
                .collect();
            coeffs[0] = &coeffs[0] + &MultiSeries::variable(table.clone(), i, 1.0);
            jet_state.push(TaylorSeries::from_coeffs(coeffs));
        }
        let jet_t = TaylorSeries::from_coeffs(
            t.coeffs()
                .iter()
                .map(|&c| MultiSeries::constant(table.clone(), c))
                .collect(),
        );

        let mut jet_dx = vec![jet_state[0].zeroed(); dof];
        Dynamics::<MultiSeries>::eom(self.inner, &jet_t, &jet_state, &mut jet_dx)?;

        let mut jac = Vec::with_capacity(dof * dof);
        for dx in &jet_dx {
            for j in 0..dof {
                jac.push(TaylorSeries::from_coeffs(
                    dx.coeffs().iter().map(|m| m.linear(j)).collect(),
                ));
            }
        }
        Ok(jac)
    }
}

impl<'a, D> Dynamics<f64> for VariationalDynamics<'a, D>
where
    D: Dynamics<f64> + Dynamics<MultiSeries>,
{
    fn dim(&self) -> usize {
        self.dof + self.dof * self.dof
    }

    fn eom(
        &self,
        t: &TaylorSeries<f64>,
        state: &[TaylorSeries<f64>],
        dxdt: &mut [TaylorSeries<f64>],
    ) -> Result<(), DynamicsError> {
        let dof = self.dof;
        let (x, phi) = state.split_at(dof);
        let (dx, dphi) = dxdt.split_at_mut(dof);
        Dynamics::<f64>::eom(self.inner, t, x, dx)?;

        let jac = match self.jacobian {
            Jacobian::Analytic(f) => f(t, x)?,
            Jacobian::Automatic => self.automatic_jacobian(t, x)?,
        };

        for i in 0..dof {
            for j in 0..dof {
                let mut sum = state[0].zeroed();
                for k in 0..dof {
                    sum += jac[i * dof + k].clone() * phi[k * dof + j].clone();
                }
                dphi[i * dof + j] = sum;
            }
        }
        Ok(())
    }
}

/// Modified Gram–Schmidt on the row-major tangent block: Φ is replaced by Q
/// and `ln R_jj` accumulated into the running sums.
fn modified_gram_schmidt(
    phi: &mut [f64],
    dof: usize,
    lambda: &mut [f64],
    t: f64,
) -> Result<(), PropagationError> {
    for j in 0..dof {
        for i in 0..j {
            let mut rij = 0.0;
            for r in 0..dof {
                rij += phi[r * dof + i] * phi[r * dof + j];
            }
            for r in 0..dof {
                phi[r * dof + j] -= rij * phi[r * dof + i];
            }
        }
        let mut norm = 0.0;
        for r in 0..dof {
            norm += phi[r * dof + j] * phi[r * dof + j];
        }
        let norm = norm.sqrt();
        if norm <= f64::EPSILON {
            return Err(PropagationError::DegenerateTangent { t });
        }
        for r in 0..dof {
            phi[r * dof + j] /= norm;
        }
        lambda[j] += norm.ln();
    }
    Ok(())
}

/// Integrate the variational system from `t0` to `t_end` and return the
/// finite-time Lyapunov spectrum.
pub fn lyapunov_spectrum<D>(
    dynamics: &D,
    t0: f64,
    state: &[f64],
    t_end: f64,
    opts: &PropOpts,
    jacobian: Jacobian,
) -> Result<LyapunovSpectrum, PropagationError>
where
    D: Dynamics<f64> + Dynamics<MultiSeries>,
{
    let dof = Dynamics::<f64>::dim(dynamics);
    assert_eq!(state.len(), dof, "state dimension mismatch");

    let vdyn = VariationalDynamics {
        inner: dynamics,
        dof,
        jacobian: &jacobian,
    };

    let mut aug = state.to_vec();
    for i in 0..dof {
        for j in 0..dof {
            aug.push(if i == j { 1.0 } else { 0.0 });
        }
    }

    let dir = (t_end - t0).signum();
    let mut t = t0;
    let mut steps = 0;
    let mut lambda = vec![0.0; dof];
    let mut history = Vec::new();

    if dir == 0.0 {
        return Ok(LyapunovSpectrum {
            exponents: vec![0.0; dof],
            history,
            t,
            state: state.to_vec(),
            outcome: PropOutcome::Completed,
        });
    }

    let outcome = loop {
        if steps >= opts.maxsteps {
            warn!(
                "step cap {} reached at t={:.4} days during the spectrum run",
                opts.maxsteps, t
            );
            break PropOutcome::MaxStepsReached;
        }
        let step = taylor_step(&vdyn, t, &aug, steps, opts)?;
        let mut dt = dir * step.dt;
        let clipped = (t + dt - t_end) * dir >= 0.0;
        if clipped {
            dt = t_end - t;
        }
        aug = step.series.iter().map(|p| p.evaluate(dt)).collect();
        t = if clipped { t_end } else { t + dt };
        steps += 1;

        modified_gram_schmidt(&mut aug[dof..], dof, &mut lambda, t)?;
        let elapsed = t - t0;
        history.push((t, lambda.iter().map(|l| l / elapsed).collect()));

        if clipped {
            break PropOutcome::Completed;
        }
    };

    let exponents = history
        .last()
        .map(|(_, e)| e.clone())
        .unwrap_or_else(|| vec![0.0; dof]);
    Ok(LyapunovSpectrum {
        exponents,
        history,
        t,
        state: aug[..dof].to_vec(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Coeff;

    /// `dx_i/dt = rate_i · x_i`, whose exponents are exactly the rates.
    struct DiagonalLinear {
        rates: Vec<f64>,
    }

    impl<R: Coeff> Dynamics<R> for DiagonalLinear {
        fn dim(&self) -> usize {
            self.rates.len()
        }

        fn eom(
            &self,
            _t: &TaylorSeries<R>,
            state: &[TaylorSeries<R>],
            dxdt: &mut [TaylorSeries<R>],
        ) -> Result<(), DynamicsError> {
            for (i, rate) in self.rates.iter().enumerate() {
                dxdt[i] = state[i].scale(*rate);
            }
            Ok(())
        }
    }

    #[test]
    fn diagonal_system_recovers_rates() {
        let dynamics = DiagonalLinear {
            rates: vec![0.5, -1.5],
        };
        let opts = PropOpts::with_tolerance(15, 1e-16);
        let spectrum = lyapunov_spectrum(
            &dynamics,
            0.0,
            &[1.0, 1.0],
            4.0,
            &opts,
            Jacobian::Automatic,
        )
        .unwrap();
        assert_eq!(spectrum.outcome, PropOutcome::Completed);
        assert!((spectrum.exponents[0] - 0.5).abs() < 1e-10);
        assert!((spectrum.exponents[1] + 1.5).abs() < 1e-10);
    }

    #[test]
    fn analytic_and_automatic_jacobians_agree() {
        let dynamics = DiagonalLinear {
            rates: vec![0.3, -0.7],
        };
        let opts = PropOpts::with_tolerance(12, 1e-14);
        let automatic = lyapunov_spectrum(
            &dynamics,
            0.0,
            &[1.0, 2.0],
            2.0,
            &opts,
            Jacobian::Automatic,
        )
        .unwrap();

        let rates = [0.3, -0.7];
        let analytic_fn = move |t: &TaylorSeries<f64>,
                                _x: &[TaylorSeries<f64>]|
              -> Result<Vec<TaylorSeries<f64>>, DynamicsError> {
            let zero = t.lift(0.0);
            Ok(vec![
                zero.lift(rates[0]),
                zero.lift(0.0),
                zero.lift(0.0),
                zero.lift(rates[1]),
            ])
        };
        let analytic = lyapunov_spectrum(
            &dynamics,
            0.0,
            &[1.0, 2.0],
            2.0,
            &opts,
            Jacobian::Analytic(&analytic_fn),
        )
        .unwrap();

        for (a, b) in automatic.exponents.iter().zip(&analytic.exponents) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn degenerate_tangent_is_reported() {
        let mut phi = vec![0.0; 4];
        let mut lambda = vec![0.0; 2];
        assert!(matches!(
            modified_gram_schmidt(&mut phi, 2, &mut lambda, 1.0),
            Err(PropagationError::DegenerateTangent { .. })
        ));
    }
}
