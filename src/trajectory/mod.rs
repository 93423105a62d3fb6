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

//! # Trajectory
//! The dense solution of an integration: per accepted step the start time,
//! the signed step and the jet polynomial. The concatenation is itself a
//! piecewise-polynomial interpolant.

use crate::algebra::{Coeff, MultiSeries, TaylorSeries};
use crate::ephemeris::{EphemerisError, PiecewiseSeries};
use crate::io::FileIO;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trajectory<R> {
    t0: f64,
    initial: Vec<R>,
    /// End time of each accepted step, absolute days past J2000.
    times: Vec<f64>,
    /// Signed step sizes.
    dts: Vec<f64>,
    /// State at each accepted step end.
    states: Vec<Vec<R>>,
    /// Jet polynomial per accepted step (dense-output mode only).
    pieces: Option<Vec<Vec<TaylorSeries<R>>>>,
}

impl<R: Coeff> Trajectory<R> {
    pub fn new(t0: f64, initial: Vec<R>, dense: bool) -> Self {
        Self {
            t0,
            initial,
            times: Vec::new(),
            dts: Vec::new(),
            states: Vec::new(),
            pieces: dense.then(Vec::new),
        }
    }

    /// Append one accepted step. `end_t` is passed explicitly so the clipped
    /// final step lands on the requested end time exactly.
    pub(crate) fn push_step(
        &mut self,
        end_t: f64,
        dt: f64,
        series: Vec<TaylorSeries<R>>,
        end_state: Vec<R>,
    ) {
        self.times.push(end_t);
        self.dts.push(dt);
        self.states.push(end_state);
        if let Some(pieces) = &mut self.pieces {
            pieces.push(series);
        }
    }

    /// Number of accepted steps.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn start_time(&self) -> f64 {
        self.t0
    }

    pub fn end_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(self.t0)
    }

    pub fn initial_state(&self) -> &[R] {
        &self.initial
    }

    pub fn last_state(&self) -> &[R] {
        self.states
            .last()
            .map_or(self.initial.as_slice(), Vec::as_slice)
    }

    /// State at the end of accepted step `k` (0-based).
    pub fn state_at_step(&self, k: usize) -> &[R] {
        &self.states[k]
    }

    pub fn step_times(&self) -> &[f64] {
        &self.times
    }

    pub fn is_dense(&self) -> bool {
        self.pieces.is_some()
    }

    /// Evaluate the dense solution at an absolute time, in either direction.
    pub fn at(&self, t: f64) -> Result<Vec<R>, EphemerisError> {
        let pieces = self.pieces.as_ref().ok_or_else(|| EphemerisError::Malformed {
            reason: "trajectory was recorded without dense output".to_string(),
        })?;
        if self.times.is_empty() {
            return Err(EphemerisError::Malformed {
                reason: "empty trajectory".to_string(),
            });
        }
        let dir = self.dts[0].signum();
        let span = (self.end_time() - self.t0) * dir;
        if (t - self.t0) * dir < 0.0 || (t - self.t0) * dir > span {
            return Err(EphemerisError::OutOfDomain {
                t,
                start: self.t0.min(self.end_time()),
                end: self.t0.max(self.end_time()),
            });
        }
        // First step whose end lies at or beyond t in the integration
        // direction.
        let idx = self
            .times
            .partition_point(|tau| (*tau - t) * dir < 0.0)
            .min(self.times.len() - 1);
        let start = if idx == 0 { self.t0 } else { self.times[idx - 1] };
        let s = t - start;
        Ok(pieces[idx].iter().map(|p| p.evaluate(s)).collect())
    }

    /// Convert into an interpolant with strictly increasing knots. Backward
    /// legs are reversed and each piece re-expanded around its left endpoint.
    pub fn into_interpolant(self) -> Result<PiecewiseSeries<R>, EphemerisError> {
        let pieces = self.pieces.ok_or_else(|| EphemerisError::Malformed {
            reason: "trajectory was recorded without dense output".to_string(),
        })?;
        if self.times.is_empty() {
            return Err(EphemerisError::Malformed {
                reason: "empty trajectory".to_string(),
            });
        }
        let n = self.times.len();
        if self.dts[0] > 0.0 {
            let mut knots = Vec::with_capacity(n + 1);
            knots.push(0.0);
            knots.extend(self.times.iter().map(|t| t - self.t0));
            PiecewiseSeries::new(self.t0, knots, pieces)
        } else {
            let epoch = self.times[n - 1];
            let mut knots = Vec::with_capacity(n + 1);
            knots.push(0.0);
            for k in (0..n - 1).rev() {
                knots.push(self.times[k] - epoch);
            }
            knots.push(self.t0 - epoch);
            let mut reversed = Vec::with_capacity(n);
            for k in (0..n).rev() {
                reversed.push(
                    pieces[k]
                        .iter()
                        .map(|p| p.translate(self.dts[k]))
                        .collect::<Vec<_>>(),
                );
            }
            PiecewiseSeries::new(epoch, knots, reversed)
        }
    }
}

impl Trajectory<MultiSeries> {
    /// Evaluate the jet solution at a time and an initial-condition
    /// perturbation δ (in the scaled variables).
    pub fn state_for(&self, t: f64, delta: &[f64]) -> Result<Vec<f64>, EphemerisError> {
        Ok(self.at(t)?.iter().map(|jet| jet.eval(delta)).collect())
    }
}

impl<R: Coeff + Serialize + DeserializeOwned> FileIO for Trajectory<R> {}
