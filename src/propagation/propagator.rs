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

use super::events::{detect, EventFunc, EventOpts, EventRecord, NeverEvent};
use super::step::taylor_step;
use super::{DynamicsSnafu, PropOutcome, PropagationError};
use crate::algebra::Coeff;
use crate::dynamics::Dynamics;
use crate::trajectory::Trajectory;
use snafu::ResultExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Integrator options: truncation order, tolerance and the guard rails.
#[derive(Clone, Copy, Debug)]
pub struct PropOpts {
    /// Order N of the Taylor expansion per step.
    pub order: usize,
    /// Absolute truncation tolerance driving the step size.
    pub abstol: f64,
    /// Step cap per propagation call.
    pub maxsteps: usize,
    /// Step-size safety factor, strictly below one.
    pub safety: f64,
    /// Tail coefficients below this magnitude are ignored by the step-size
    /// rule.
    pub coeff_floor: f64,
    /// Underflow sentinel: a selected step below this aborts as divergent.
    pub min_step: f64,
    /// Step clamp for quiescent states whose tail coefficients all vanish.
    pub max_step: f64,
    /// Use the fused coefficient kernel (see the step module).
    pub parse_eqs: bool,
    /// Record the full jet polynomial per step (dense output) instead of
    /// only the evaluated states.
    pub dense_output: bool,
}

impl Default for PropOpts {
    fn default() -> Self {
        Self {
            order: 25,
            abstol: 1e-20,
            maxsteps: 10_000,
            safety: 0.8,
            coeff_floor: 1e-300,
            min_step: 1e-10,
            max_step: 100.0,
            parse_eqs: true,
            dense_output: true,
        }
    }
}

impl PropOpts {
    /// Options with a specific order and tolerance, everything else default.
    pub fn with_tolerance(order: usize, abstol: f64) -> Self {
        Self {
            order,
            abstol,
            ..Default::default()
        }
    }

    pub fn set_maxsteps(mut self, maxsteps: usize) -> Self {
        self.maxsteps = maxsteps;
        self
    }

    /// One-line summary for the logs.
    pub fn info(&self) -> String {
        format!(
            "[order: {}, abstol: {:e}, maxsteps: {}, parsed: {}]",
            self.order, self.abstol, self.maxsteps, self.parse_eqs
        )
    }
}

/// A propagator setup: the dynamics plus the integrator options. Spawn
/// instances against initial conditions with [`Propagator::with`].
pub struct Propagator<'a, D> {
    pub dynamics: &'a D,
    pub opts: PropOpts,
}

impl<'a, D> Propagator<'a, D> {
    pub fn new(dynamics: &'a D, opts: PropOpts) -> Self {
        assert!(opts.order >= 2, "the Taylor order must be at least 2");
        assert!(
            opts.safety < 1.0 && opts.safety > 0.0,
            "the safety factor must sit in (0, 1)"
        );
        Self { dynamics, opts }
    }

    /// A propagator with the default options.
    pub fn default(dynamics: &'a D) -> Self {
        Self::new(dynamics, PropOpts::default())
    }

    /// Bind an instance to an epoch and an initial state. The state entries
    /// live in the coefficient ring: plain doubles for a numeric
    /// integration, jet elements for uncertainty transport.
    pub fn with<R: Coeff>(&'a self, t0: f64, state: Vec<R>) -> PropInstance<'a, D, R> {
        PropInstance {
            t: t0,
            state,
            steps: 0,
            prop: self,
            cancel: None,
        }
    }
}

/// One integration in flight: the current epoch, state and step count.
pub struct PropInstance<'a, D, R: Coeff> {
    pub t: f64,
    pub state: Vec<R>,
    /// Accepted steps so far.
    pub steps: usize,
    prop: &'a Propagator<'a, D>,
    cancel: Option<Arc<AtomicBool>>,
}

/// What an integration returned: the outcome, final state and the dense
/// solution, plus any refined event roots.
#[derive(Clone, Debug)]
pub struct Solution<R: Coeff> {
    pub outcome: PropOutcome,
    pub t: f64,
    pub state: Vec<R>,
    pub trajectory: Trajectory<R>,
    pub events: Vec<EventRecord<R>>,
}

impl<'a, D, R: Coeff> PropInstance<'a, D, R>
where
    D: Dynamics<R>,
{
    /// Attach a cooperative cancellation token, polled between steps.
    pub fn with_cancellation(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn for_duration(&mut self, duration: f64) -> Result<Solution<R>, PropagationError> {
        let t_end = self.t + duration;
        self.until(t_end)
    }

    /// Propagate to `t_end` (either direction); the final step is clipped so
    /// the end time is reached exactly.
    pub fn until(&mut self, t_end: f64) -> Result<Solution<R>, PropagationError> {
        self.run(t_end, &NeverEvent, &EventOpts::default(), false, None)
    }

    /// Propagate to `t_end` with event detection on every accepted step.
    pub fn until_with_events<E: EventFunc>(
        &mut self,
        t_end: f64,
        event: &E,
        event_opts: &EventOpts,
    ) -> Result<Solution<R>, PropagationError> {
        self.run(t_end, event, event_opts, true, None)
    }

    /// Propagate to `t_end`, publishing every accepted `(t, state)` on the
    /// channel as it lands. Combine with compact output to stream long runs
    /// instead of buffering them.
    pub fn until_with_channel(
        &mut self,
        t_end: f64,
        tx: Sender<(f64, Vec<R>)>,
    ) -> Result<Solution<R>, PropagationError> {
        self.run(t_end, &NeverEvent, &EventOpts::default(), false, Some(&tx))
    }

    fn run<E: EventFunc>(
        &mut self,
        t_end: f64,
        event: &E,
        event_opts: &EventOpts,
        track: bool,
        channel: Option<&Sender<(f64, Vec<R>)>>,
    ) -> Result<Solution<R>, PropagationError> {
        let opts = self.prop.opts;
        let dir = (t_end - self.t).signum();
        let mut trajectory = Trajectory::new(self.t, self.state.clone(), opts.dense_output);
        let mut events = Vec::new();

        if dir == 0.0 {
            return Ok(self.solution(PropOutcome::Completed, trajectory, events));
        }
        info!(
            "propagating from {:.4} until {:.4} days past J2000 {}",
            self.t,
            t_end,
            opts.info()
        );

        let outcome = loop {
            if let Some(token) = &self.cancel {
                if token.load(Ordering::Relaxed) {
                    info!("cancellation observed after {} accepted steps", self.steps);
                    break PropOutcome::Cancelled;
                }
            }
            if self.steps >= opts.maxsteps {
                warn!(
                    "step cap {} reached at t={:.4} days, returning the partial trajectory",
                    opts.maxsteps, self.t
                );
                break PropOutcome::MaxStepsReached;
            }

            let step = taylor_step(self.prop.dynamics, self.t, &self.state, self.steps, &opts)?;
            let mut dt = dir * step.dt;
            let clipped = (self.t + dt - t_end) * dir >= 0.0;
            if clipped {
                dt = t_end - self.t;
            }
            let end_t = if clipped { t_end } else { self.t + dt };

            let new_state: Vec<R> = step.series.iter().map(|p| p.evaluate(dt)).collect();
            for (component, value) in new_state.iter().enumerate() {
                if !value.is_finite() {
                    return Err(PropagationError::Divergent {
                        t: self.t,
                        step: self.steps,
                        component,
                    });
                }
            }

            if track {
                if let Some(record) = detect(event, event_opts, self.t, dt, &step.series, &self.state)
                    .context(DynamicsSnafu {
                        t: self.t,
                        step: self.steps,
                    })?
                {
                    events.push(record);
                }
            }

            if let Some(tx) = channel {
                if tx.send((end_t, new_state.clone())).is_err() {
                    warn!("could not publish to channel, receiver hung up");
                }
            }

            let series = if opts.dense_output {
                step.series
            } else {
                Vec::new()
            };
            trajectory.push_step(end_t, dt, series, new_state.clone());
            self.t = end_t;
            self.state = new_state;
            self.steps += 1;

            if clipped {
                break PropOutcome::Completed;
            }
        };

        Ok(self.solution(outcome, trajectory, events))
    }

    fn solution(
        &self,
        outcome: PropOutcome,
        trajectory: Trajectory<R>,
        events: Vec<EventRecord<R>>,
    ) -> Solution<R> {
        Solution {
            outcome,
            t: self.t,
            state: self.state.clone(),
            trajectory,
            events,
        }
    }
}
