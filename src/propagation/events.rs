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

//! Event detection on the step polynomials: bracketing by sign change of the
//! composed scalar series, then Newton refinement.

use crate::algebra::{Coeff, TaylorSeries};
use crate::dynamics::{dot3, sub3, DynamicsError, EphemerisReadSnafu};
use crate::ephemeris::SolarSystemEphemeris;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt;
use std::sync::Arc;

/// A scalar event function `g(x, t)`.
///
/// The same definition serves the coarse scalar checks and the composed
/// series the root refinement runs on, because `eval` is written in the
/// series algebra like the equations of motion themselves.
pub trait EventFunc: Send + Sync + fmt::Display {
    /// Whether the event is armed at this (unperturbed) state. Inactive
    /// brackets are skipped without refinement.
    fn is_active(&self, _t: f64, _state: &[f64]) -> bool {
        true
    }

    /// The event value in the series algebra.
    fn eval<R: Coeff>(
        &self,
        t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
    ) -> Result<TaylorSeries<R>, DynamicsError>;
}

#[derive(Clone, Copy, Debug)]
pub struct EventOpts {
    /// Process the n-th derivative of the event function instead of the
    /// function itself (extrema finding with `order = 1`).
    pub order: usize,
    /// Newton iteration cap per bracketed root.
    pub newton_iters: usize,
    /// Residual tolerance on |g| at the refined root.
    pub abstol: f64,
}

impl Default for EventOpts {
    fn default() -> Self {
        Self {
            order: 0,
            newton_iters: 10,
            abstol: 1e-15,
        }
    }
}

/// A refined zero of the event function.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord<R> {
    /// Absolute event time, days past J2000 TDB.
    pub t: f64,
    /// The (jet) state evaluated at the event time.
    pub state: Vec<R>,
    /// Residual event value at the refined root.
    pub value: f64,
}

impl<R: Coeff + Serialize + serde::de::DeserializeOwned> crate::io::FileIO for EventRecord<R> {}

/// Bracket and refine the event inside one accepted step.
///
/// `series` is the step polynomial in `s = t − t_k` and `dt` the signed step.
/// Returns at most one record per step: the heuristic matches the step sizes
/// the truncation control produces, which are far below the event spacing.
pub(crate) fn detect<R: Coeff, E: EventFunc + ?Sized>(
    event: &E,
    opts: &EventOpts,
    t_k: f64,
    dt: f64,
    series: &[TaylorSeries<R>],
    pre_state: &[R],
) -> Result<Option<EventRecord<R>>, DynamicsError> {
    let consts: Vec<f64> = pre_state.iter().map(|c| c.const_part()).collect();
    if !event.is_active(t_k, &consts) {
        return Ok(None);
    }

    let proto = &series[0];
    let t_series = TaylorSeries::variable(proto.coeff(0).lift(t_k), proto.order());
    let composed = event.eval(&t_series, series)?;

    // Unperturbed scalar series, optionally differentiated for extrema
    // detection.
    let mut g = composed.const_projection();
    for _ in 0..opts.order {
        g = g.differentiate();
    }

    let g_pre = g.evaluate(0.0);
    let g_post = g.evaluate(dt);
    if g_pre * g_post >= 0.0 {
        return Ok(None);
    }

    let dg = g.differentiate();
    let (lo, hi) = if dt >= 0.0 { (0.0, dt) } else { (dt, 0.0) };
    let mut s = dt * g_pre / (g_pre - g_post);
    let mut prev = f64::INFINITY;
    for _ in 0..opts.newton_iters {
        let gv = g.evaluate(s);
        if gv.abs() < opts.abstol || (s - prev).abs() < 1e-14 * dt.abs().max(1.0) {
            break;
        }
        let dv = dg.evaluate(s);
        if dv == 0.0 {
            break;
        }
        prev = s;
        s = (s - gv / dv).clamp(lo, hi);
    }

    let value = g.evaluate(s);
    debug!(
        "{event} -- zero at t={} days with residual {value:e}",
        t_k + s
    );
    Ok(Some(EventRecord {
        t: t_k + s,
        state: series.iter().map(|p| p.evaluate(s)).collect(),
        value,
    }))
}

/// The zero of the relative radial velocity `(r − r_b)·(v − v_b)`, armed only
/// below a distance threshold: a local minimum of the distance to the body,
/// i.e. a close approach.
pub struct ClosestApproach {
    eph: Arc<SolarSystemEphemeris>,
    pub body: usize,
    /// Arming distance in au. Brackets found farther out are ignored.
    pub threshold: f64,
}

impl ClosestApproach {
    pub fn new(eph: Arc<SolarSystemEphemeris>, body: usize) -> Self {
        Self {
            eph,
            body,
            threshold: 0.05,
        }
    }
}

impl fmt::Display for ClosestApproach {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "close approach to {} within {} au",
            self.eph.body(self.body).name,
            self.threshold
        )
    }
}

impl EventFunc for ClosestApproach {
    fn is_active(&self, t: f64, state: &[f64]) -> bool {
        match self.eph.position_of(self.body, &t) {
            Ok(pos) => {
                let dx = state[0] - pos[0];
                let dy = state[1] - pos[1];
                let dz = state[2] - pos[2];
                (dx * dx + dy * dy + dz * dz).sqrt() < self.threshold
            }
            Err(_) => false,
        }
    }

    fn eval<R: Coeff>(
        &self,
        t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
    ) -> Result<TaylorSeries<R>, DynamicsError> {
        let pos = self
            .eph
            .position_of(self.body, t)
            .context(EphemerisReadSnafu)?;
        let vel = self
            .eph
            .velocity_of(self.body, t)
            .context(EphemerisReadSnafu)?;
        let r = [state[0].clone(), state[1].clone(), state[2].clone()];
        let v = [state[3].clone(), state[4].clone(), state[5].clone()];
        Ok(dot3(&sub3(&r, &pos), &sub3(&v, &vel)))
    }
}

/// Placeholder for event-free propagation.
pub(crate) struct NeverEvent;

impl fmt::Display for NeverEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no event")
    }
}

impl EventFunc for NeverEvent {
    fn is_active(&self, _t: f64, _state: &[f64]) -> bool {
        false
    }

    fn eval<R: Coeff>(
        &self,
        t: &TaylorSeries<R>,
        _state: &[TaylorSeries<R>],
    ) -> Result<TaylorSeries<R>, DynamicsError> {
        Ok(t.lift(0.0))
    }
}
