//! Close-approach detection and cooperative cancellation.

use moros::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::support::{circular_speed, sun_earth};

#[test]
fn relative_radial_velocity_zeros_are_found() {
    let eph = Arc::new(sun_earth(3200.0));
    let dynamics = RelativisticDynamics::new(eph.clone());
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(25, 1e-20));

    // Asteroid on a 1.1 au circular orbit, a quarter turn ahead of the
    // Earth: the synodic drift sweeps through the distance extrema.
    let v = circular_speed(1.1);
    let state = vec![0.0, 1.1, 0.0, -v, 0.0, 0.0, 0.0, 0.0];

    let mut event = ClosestApproach::new(eph, 1);
    // Arm the event everywhere: this synthetic geometry never gets truly
    // close, and the extrema of the distance are what we are after.
    event.threshold = 5.0;

    let mut instance = prop.with(0.0, state);
    let sol = instance
        .until_with_events(3000.0, &event, &EventOpts::default())
        .unwrap();
    assert_eq!(sol.outcome, PropOutcome::Completed);

    assert!(
        sol.events.len() >= 2,
        "expected at least two radial-velocity zeros, got {}",
        sol.events.len()
    );
    for record in &sol.events {
        assert!(
            record.value.abs() < 1e-12,
            "event residual {:e} at t={}",
            record.value,
            record.t
        );
        assert!(record.t > 0.0 && record.t < 3000.0);
    }
}

/// Arms never, but counts detection calls and trips the cancellation token
/// after the requested number of accepted steps.
struct CancelAfter {
    seen: AtomicUsize,
    limit: usize,
    token: Arc<AtomicBool>,
}

impl fmt::Display for CancelAfter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "cancel after {} steps", self.limit)
    }
}

impl EventFunc for CancelAfter {
    fn is_active(&self, _t: f64, _state: &[f64]) -> bool {
        if self.seen.fetch_add(1, Ordering::Relaxed) + 1 >= self.limit {
            self.token.store(true, Ordering::Relaxed);
        }
        false
    }

    fn eval<R: Coeff>(
        &self,
        t: &TaylorSeries<R>,
        _state: &[TaylorSeries<R>],
    ) -> Result<TaylorSeries<R>, moros::dynamics::DynamicsError> {
        Ok(t.lift(0.0))
    }
}

#[test]
fn cancellation_after_one_hundred_steps() {
    let dynamics = KeplerDynamics::sun();
    let opts = PropOpts::with_tolerance(20, 1e-18);
    let initial = vec![1.0, 0.0, 0.0, 0.0, circular_speed(1.0), 0.0];
    let t_end = 1e6;

    // Reference: a standalone run capped at exactly one hundred steps.
    let reference_prop = Propagator::new(&dynamics, opts.set_maxsteps(100));
    let mut reference = reference_prop.with(0.0, initial.clone());
    let reference_sol = reference.until(t_end).unwrap();
    assert_eq!(reference_sol.outcome, PropOutcome::MaxStepsReached);
    assert_eq!(reference_sol.trajectory.len(), 100);

    let token = Arc::new(AtomicBool::new(false));
    let watcher = CancelAfter {
        seen: AtomicUsize::new(0),
        limit: 100,
        token: token.clone(),
    };
    let prop = Propagator::new(&dynamics, opts);
    let mut instance = prop.with(0.0, initial).with_cancellation(token);
    let sol = instance
        .until_with_events(t_end, &watcher, &EventOpts::default())
        .unwrap();

    assert_eq!(sol.outcome, PropOutcome::Cancelled);
    assert_eq!(sol.trajectory.len(), 100);
    // Identical step sequence, identical state, to the bit.
    assert_eq!(sol.state, reference_sol.state);
    assert_eq!(sol.t, reference_sol.t);
}
