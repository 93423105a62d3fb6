//! Two-body validation of the Taylor step kernel and driver.

use moros::constants::GM_SUN;
use moros::prelude::*;
use std::f64::consts::TAU;

use super::support::circular_speed;

fn energy(gm: f64, state: &[f64]) -> f64 {
    let r = (state[0].powi(2) + state[1].powi(2) + state[2].powi(2)).sqrt();
    let v2 = state[3].powi(2) + state[4].powi(2) + state[5].powi(2);
    0.5 * v2 - gm / r
}

#[test]
fn circular_orbit_for_one_period() {
    let dynamics = KeplerDynamics::sun();
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(25, 1e-20));

    let a = 1.0;
    let v = circular_speed(a);
    let initial = vec![a, 0.0, 0.0, 0.0, v, 0.0];
    let period = TAU * (a * a * a / GM_SUN).sqrt();

    let e0 = energy(GM_SUN, &initial);
    let mut instance = prop.with(0.0, initial.clone());
    let sol = instance.until(period).unwrap();
    assert_eq!(sol.outcome, PropOutcome::Completed);

    for (found, expect) in sol.state.iter().zip(&initial) {
        assert!(
            (found - expect).abs() < 1e-12,
            "period closure error {:e}",
            (found - expect).abs()
        );
    }
    let drift = ((energy(GM_SUN, &sol.state) - e0) / e0).abs();
    assert!(drift < 1e-12, "relative energy drift {drift:e}");
}

#[test]
fn eccentric_orbit_round_trip() {
    let dynamics = KeplerDynamics::sun();
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(25, 1e-20));

    // e ≈ 0.19, roughly Apophis-like.
    let initial = vec![0.9, 0.0, 0.05, 0.0, 1.1 * circular_speed(0.9), 0.001];
    let mut there = prop.with(0.0, initial.clone());
    let sol = there.until(2000.0).unwrap();
    assert_eq!(sol.outcome, PropOutcome::Completed);
    let steps_there = sol.trajectory.len();

    let mut back = prop.with(2000.0, sol.state);
    let sol = back.until(0.0).unwrap();
    assert_eq!(sol.outcome, PropOutcome::Completed);

    // Reproduction error proportional to the step count times machine
    // epsilon, with a wide margin.
    let budget = 1e-12 * (steps_there + sol.trajectory.len()) as f64;
    for (found, expect) in sol.state.iter().zip(&initial) {
        assert!(
            (found - expect).abs() < budget,
            "round-trip error {:e} exceeds {budget:e}",
            (found - expect).abs()
        );
    }
}

#[test]
fn dense_output_matches_recorded_states() {
    let dynamics = KeplerDynamics::sun();
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(20, 1e-18));
    let initial = vec![1.0, 0.0, 0.0, 0.0, circular_speed(1.0), 0.0];
    let mut instance = prop.with(0.0, initial);
    let sol = instance.until(300.0).unwrap();

    let traj = &sol.trajectory;
    for (k, &t) in traj.step_times().iter().enumerate() {
        let interpolated = traj.at(t).unwrap();
        for (a, b) in interpolated.iter().zip(traj.state_at_step(k)) {
            assert!((a - b).abs() < 1e-13);
        }
    }

    // Off-knot evaluation stays on the energy surface.
    let e0 = energy(GM_SUN, traj.initial_state());
    for t in [13.7, 101.3, 250.9] {
        let state = traj.at(t).unwrap();
        assert!(((energy(GM_SUN, &state) - e0) / e0).abs() < 1e-11);
    }

    // The dense solution converts into a strictly-increasing interpolant.
    let interp = sol.trajectory.into_interpolant().unwrap();
    assert!((interp.start() - 0.0).abs() < 1e-12);
    assert!((interp.end() - 300.0).abs() < 1e-9);
}
