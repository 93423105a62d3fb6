//! Synthetic ephemerides for the integration tests: the real 31-year JPL
//! container is validation data, not something the test suite ships.

use moros::constants::GM_SUN;
use moros::prelude::*;
use std::f64::consts::FRAC_PI_2;

/// Taylor pieces of a circular orbit of radius `a` (au) and angular rate
/// `omega` (rad/day) over a uniform knot grid, plus a zero z coordinate.
pub fn circular_pieces(
    a: f64,
    omega: f64,
    phase0: f64,
    knots: &[f64],
    order: usize,
) -> Vec<Vec<TaylorSeries<f64>>> {
    knots[..knots.len() - 1]
        .iter()
        .map(|&tk| {
            let phase = phase0 + omega * tk;
            let mut cx = Vec::with_capacity(order + 1);
            let mut cy = Vec::with_capacity(order + 1);
            let mut factor = a;
            for j in 0..=order {
                let arg = phase + j as f64 * FRAC_PI_2;
                cx.push(factor * arg.cos());
                cy.push(factor * arg.sin());
                factor *= omega / (j + 1) as f64;
            }
            vec![
                TaylorSeries::from_coeffs(cx),
                TaylorSeries::from_coeffs(cy),
                TaylorSeries::constant(0.0, order),
            ]
        })
        .collect()
}

fn uniform_knots(span: f64, dt: f64) -> Vec<f64> {
    let n = (2.0 * span / dt).ceil() as usize;
    (0..=n).map(|k| -span + k as f64 * dt).collect()
}

/// An ephemeris with the Sun pinned at the barycenter and nothing else,
/// valid on `[-span, span]` days around J2000.
pub fn sun_only(span: f64) -> SolarSystemEphemeris {
    let sun = GravParams::point_mass("Sun", GM_SUN, 4.6524726e-3);
    let knots = vec![-span, span];
    let position = PiecewiseSeries::new(
        0.0,
        knots.clone(),
        vec![vec![TaylorSeries::constant(0.0, 2); 3]],
    )
    .unwrap();
    let potential =
        PiecewiseSeries::new(0.0, knots, vec![vec![TaylorSeries::constant(0.0, 2)]]).unwrap();
    SolarSystemEphemeris::new(vec![sun], position, potential).unwrap()
}

/// Sun at the barycenter plus an "Earth" on a circular 1 au orbit.
pub fn sun_earth(span: f64) -> SolarSystemEphemeris {
    let sun = GravParams::point_mass("Sun", GM_SUN, 4.6524726e-3);
    let earth = GravParams::point_mass("Earth", 8.8876924467071022e-10, 4.26352e-5);

    let knots = uniform_knots(span, 10.0);
    let order = 12;
    let omega = GM_SUN.sqrt();
    let earth_pieces = circular_pieces(1.0, omega, 0.0, &knots, order);

    let pieces: Vec<Vec<TaylorSeries<f64>>> = earth_pieces
        .into_iter()
        .map(|earth_piece| {
            let mut coords = vec![TaylorSeries::constant(0.0, order); 3];
            coords.extend(earth_piece);
            coords
        })
        .collect();
    let position = PiecewiseSeries::new(0.0, knots.clone(), pieces).unwrap();

    // Newtonian potentials at each body from the other one, both at unit
    // separation.
    let potential_pieces = knots[..knots.len() - 1]
        .iter()
        .map(|_| {
            vec![
                TaylorSeries::constant(earth.gm, order),
                TaylorSeries::constant(sun.gm, order),
            ]
        })
        .collect();
    let potential = PiecewiseSeries::new(0.0, knots, potential_pieces).unwrap();

    SolarSystemEphemeris::new(vec![sun, earth], position, potential).unwrap()
}

/// Circular-orbit speed at radius `a` au around the Sun.
pub fn circular_speed(a: f64) -> f64 {
    (GM_SUN / a).sqrt()
}
