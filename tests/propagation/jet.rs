//! Jet-transport checks: the unperturbed jet must reproduce the plain double
//! integration exactly, and the jet evaluated at a perturbation must track an
//! independent integration of the perturbed initial condition.

use moros::dynamics::{Dynamics, DynamicsError};
use moros::prelude::*;
use moros::propagation::{taylor_step, PropagationError};

use super::support::circular_speed;

const POSVEL_SCALE: f64 = 1e-8;

fn jet_state(table: &std::sync::Arc<JetTable>, values: &[f64], scale: f64) -> Vec<MultiSeries> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            MultiSeries::constant(table.clone(), v) + MultiSeries::variable(table.clone(), i, scale)
        })
        .collect()
}

#[test]
fn unperturbed_jet_is_bitwise_identical_to_doubles() {
    let dynamics = KeplerDynamics::sun();
    let opts = PropOpts::with_tolerance(20, 1e-18);
    let table = JetTable::shared(6, 3);

    let mut plain: Vec<f64> = vec![1.0, 0.0, 0.0, 0.0, circular_speed(1.0), 0.0];
    let mut jet = jet_state(&table, &plain, POSVEL_SCALE);
    let mut t = 0.0;

    // Drive both rings through the same step sequence (the jet step, which
    // is never larger than the double step because its coefficient norm
    // includes every partial).
    for step_index in 0..10 {
        let jet_step = taylor_step(&dynamics, t, &jet, step_index, &opts).unwrap();
        let plain_step = taylor_step(&dynamics, t, &plain, step_index, &opts).unwrap();
        let dt = jet_step.dt;
        assert!(dt <= plain_step.dt + f64::EPSILON);

        jet = jet_step.series.iter().map(|p| p.evaluate(dt)).collect();
        plain = plain_step.series.iter().map(|p| p.evaluate(dt)).collect();
        t += dt;

        for (jet_comp, plain_comp) in jet.iter().zip(&plain) {
            // Bit-for-bit: the constant slot of the jet arithmetic is the
            // double arithmetic.
            assert_eq!(jet_comp.const_part(), *plain_comp);
        }
    }
}

#[test]
fn jet_evaluation_tracks_a_perturbed_rerun() {
    let dynamics = KeplerDynamics::sun();
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(25, 1e-20));
    let table = JetTable::shared(6, 4);

    let nominal = [0.95, 0.0, 0.0, 0.0, circular_speed(0.95), 0.0];
    let t_end = 400.0;

    let mut jet_instance = prop.with(0.0, jet_state(&table, &nominal, POSVEL_SCALE));
    let jet_sol = jet_instance.until(t_end).unwrap();
    assert_eq!(jet_sol.outcome, PropOutcome::Completed);

    // +1 km along x, expressed in the scaled variables.
    let perturbation_au = 1.0 / moros::constants::AU_KM;
    let mut delta = [0.0; 6];
    delta[0] = perturbation_au / POSVEL_SCALE;
    let jet_prediction: Vec<f64> = jet_sol.state.iter().map(|jet| jet.eval(&delta)).collect();

    let mut perturbed = nominal;
    perturbed[0] += perturbation_au;
    let mut rerun = prop.with(0.0, perturbed.to_vec());
    let rerun_sol = rerun.until(t_end).unwrap();

    for (predicted, reran) in jet_prediction.iter().zip(&rerun_sol.state) {
        assert!(
            (predicted - reran).abs() < 1e-10,
            "jet prediction off by {:e} au",
            (predicted - reran).abs()
        );
    }
}

#[test]
fn scaled_variables_keep_jet_coefficients_bounded() {
    let dynamics = KeplerDynamics::sun();
    let prop = Propagator::new(&dynamics, PropOpts::with_tolerance(20, 1e-18));
    let table = JetTable::shared(6, 2);
    let nominal = [1.0, 0.0, 0.0, 0.0, circular_speed(1.0), 0.0];
    let t_end = 3000.0;

    let mut scaled = prop.with(0.0, jet_state(&table, &nominal, POSVEL_SCALE));
    let scaled_sol = scaled.until(t_end).unwrap();
    let scaled_norm = scaled_sol
        .state
        .iter()
        .fold(0.0_f64, |m, jet| m.max(jet.norm_inf()));

    let mut unscaled = prop.with(0.0, jet_state(&table, &nominal, 1.0));
    let unscaled_sol = unscaled.until(t_end).unwrap();
    let unscaled_norm = unscaled_sol
        .state
        .iter()
        .fold(0.0_f64, |m, jet| m.max(jet.norm_inf()));

    // The scale factors are load-bearing: without them the second-order flow
    // derivatives dominate the jet by many orders of magnitude. On unstable
    // dynamics that growth runs all the way into the floating-point range,
    // which `omitting_the_scales_overflows_the_jet` below drives to the end.
    assert!(scaled_norm < 1e2, "scaled jet grew to {scaled_norm:e}");
    assert!(
        unscaled_norm > 1e4 * scaled_norm,
        "unscaled jet only reached {unscaled_norm:e}"
    );
}

/// `dx/dt = rate·x + cubic·x³` started on the nominal solution x ≡ 0: the
/// state lives entirely in the jet, and the unstable mode multiplies the jet
/// coefficients by e on every 1/rate of integration time.
struct UnstableCubic {
    rate: f64,
    cubic: f64,
}

impl<R: Coeff> Dynamics<R> for UnstableCubic {
    fn dim(&self) -> usize {
        1
    }

    fn eom(
        &self,
        _t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
        dxdt: &mut [TaylorSeries<R>],
    ) -> Result<(), DynamicsError> {
        let x = &state[0];
        let x3 = &(x * x) * x;
        dxdt[0] = x.scale(self.rate) + x3.scale(self.cubic);
        Ok(())
    }
}

#[test]
fn omitting_the_scales_overflows_the_jet() {
    let dynamics = UnstableCubic {
        rate: 1e12,
        cubic: 1e12,
    };
    let table = JetTable::shared(1, 3);
    // The step floor sits well below the 1/rate time scale so the step-size
    // control cannot mask the coefficient overflow.
    let opts = PropOpts {
        order: 25,
        abstol: 1e-12,
        min_step: 1e-16,
        ..Default::default()
    };
    let prop = Propagator::new(&dynamics, opts);
    // 25 e-folds of the unstable mode.
    let t_end = 25.0 / dynamics.rate;

    // With the scale factor every coefficient stays representable out to the
    // horizon.
    let scaled = vec![MultiSeries::variable(table.clone(), 0, 1e-8)];
    let sol = prop.with(0.0, scaled).until(t_end).unwrap();
    assert_eq!(sol.outcome, PropOutcome::Completed);
    assert!(sol.state[0].is_finite());

    // Without it the cubic term cubes jet coefficients that have long left
    // O(1), and the recursion overflows mid-run: the degree-3 coefficient
    // exceeds the f64 range within the first twenty e-folds, well before
    // the step-size control could shrink the step.
    let unscaled = vec![MultiSeries::variable(table, 0, 1.0)];
    match prop.with(0.0, unscaled).until(t_end) {
        Err(PropagationError::Divergent { step, component, .. }) => {
            assert!(step > 0, "overflow should build up over many steps");
            assert_eq!(component, 0);
        }
        other => panic!("expected the unscaled jet to overflow, got {other:?}"),
    }
}

#[test]
fn stiffness_below_the_sentinel_reports_underflow() {
    let dynamics = UnstableCubic {
        rate: 1e12,
        cubic: 1e12,
    };
    let table = JetTable::shared(1, 3);
    // Default options: the unstable mode demands steps far below the
    // sentinel floor, which is the divergence signal.
    let prop = Propagator::default(&dynamics);
    let state = vec![MultiSeries::variable(table, 0, 1.0)];
    match prop.with(0.0, state).until(1.0) {
        Err(PropagationError::StepSizeUnderflow { dt, .. }) => {
            assert!(dt < 1e-10, "reported Δt {dt:e} is not below the floor");
        }
        other => panic!("expected a step-size underflow, got {other:?}"),
    }
}
