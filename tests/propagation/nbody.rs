//! The relativistic right-hand side against two-body truth, its parallel
//! variant, and the ephemeris container round trip.

use moros::dynamics::DynamicsError;
use moros::prelude::*;
use moros::propagation::PropagationError;
use std::sync::Arc;

use super::support::{circular_speed, sun_earth, sun_only};

fn nbody_state(r: [f64; 3], v: [f64; 3]) -> Vec<f64> {
    vec![r[0], r[1], r[2], v[0], v[1], v[2], 0.0, 0.0]
}

#[test]
fn sun_only_reduces_to_two_body() {
    let eph = Arc::new(sun_only(500.0));
    let nbody = RelativisticDynamics::new(eph);
    let kepler = KeplerDynamics::sun();
    let opts = PropOpts::with_tolerance(25, 1e-20);

    let v = circular_speed(1.0);
    let nbody_prop = Propagator::new(&nbody, opts);
    let mut instance = nbody_prop.with(0.0, nbody_state([1.0, 0.0, 0.0], [0.0, v, 0.0]));
    let pn_sol = instance.until(200.0).unwrap();

    let kepler_prop = Propagator::new(&kepler, opts);
    let mut instance = kepler_prop.with(0.0, vec![1.0, 0.0, 0.0, 0.0, v, 0.0]);
    let two_body_sol = instance.until(200.0).unwrap();

    // The only difference is the post-Newtonian correction, a few parts in
    // 1e8 of the Newtonian acceleration.
    for (pn, tb) in pn_sol.state.iter().take(6).zip(&two_body_sol.state) {
        assert!(
            (pn - tb).abs() < 1e-5,
            "relativistic state departs two-body by {:e}",
            (pn - tb).abs()
        );
    }
    // And it is a real difference, not a no-op.
    let departure: f64 = pn_sol
        .state
        .iter()
        .take(3)
        .zip(&two_body_sol.state[..3])
        .map(|(a, b)| (a - b).abs())
        .sum();
    assert!(departure > 0.0);

    // The non-gravitational parameters are constants of motion.
    assert_eq!(pn_sol.state[6], 0.0);
    assert_eq!(pn_sol.state[7], 0.0);
}

#[test]
fn threaded_body_loop_is_bitwise_deterministic() {
    let eph = Arc::new(sun_earth(600.0));
    let opts = PropOpts::with_tolerance(20, 1e-18);
    let v = circular_speed(1.2);
    let initial = nbody_state([0.0, 1.2, 0.0], [-v, 0.0, 0.0]);

    let serial_dyn = RelativisticDynamics::new(eph.clone()).with_threading(false);
    let serial_prop = Propagator::new(&serial_dyn, opts);
    let serial = serial_prop.with(0.0, initial.clone()).until(500.0);

    let threaded_dyn = RelativisticDynamics::new(eph).with_threading(true);
    let threaded_prop = Propagator::new(&threaded_dyn, opts);
    let threaded = threaded_prop.with(0.0, initial).until(500.0);

    let serial = serial.unwrap();
    let threaded = threaded.unwrap();
    assert_eq!(serial.state, threaded.state);
    assert_eq!(serial.t, threaded.t);
    assert_eq!(serial.trajectory.len(), threaded.trajectory.len());
}

#[test]
fn yarkovsky_parameter_rides_along_and_acts() {
    let eph = Arc::new(sun_only(500.0));
    let dynamics = RelativisticDynamics::new(eph);
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(20, 1e-18));
    let v = circular_speed(1.0);

    let mut without = prop.with(0.0, nbody_state([1.0, 0.0, 0.0], [0.0, v, 0.0]));
    let without = without.until(300.0).unwrap();

    let mut state = nbody_state([1.0, 0.0, 0.0], [0.0, v, 0.0]);
    state[6] = 1e-10;
    let mut with = prop.with(0.0, state);
    let with = with.until(300.0).unwrap();

    // The parameter is exactly conserved while its acceleration acts.
    assert_eq!(with.state[6], 1e-10);
    let shift: f64 = with
        .state
        .iter()
        .take(3)
        .zip(&without.state[..3])
        .map(|(a, b)| (a - b).abs())
        .sum();
    assert!(shift > 1e-9, "radial acceleration had no effect: {shift:e}");
}

#[test]
fn impact_aborts_with_context() {
    let eph = Arc::new(sun_only(500.0));
    let dynamics = RelativisticDynamics::new(eph);
    let prop = Propagator::new(&dynamics, PropOpts::default());

    // Inside the solar radius.
    let mut instance = prop.with(0.0, nbody_state([1e-3, 0.0, 0.0], [0.0, 1e-3, 0.0]));
    match instance.until(10.0) {
        Err(PropagationError::Dynamics {
            source: DynamicsError::Impact { body, .. },
            ..
        }) => assert_eq!(body, "Sun"),
        other => panic!("expected an impact error, got {other:?}"),
    }
}

#[test]
fn ephemeris_container_round_trips() {
    let eph = sun_earth(100.0);
    let path = std::env::temp_dir().join("moros_test_ephemeris.bin");
    eph.save(&path).unwrap();
    let loaded = SolarSystemEphemeris::load_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.n_bodies(), 2);
    for t in [-50.0, 0.0, 37.3, 99.9] {
        let a = eph.position_of(1, &t).unwrap();
        let b = loaded.position_of(1, &t).unwrap();
        assert_eq!(a, b);
    }
}
