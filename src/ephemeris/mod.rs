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

//! # Ephemeris
//! Piecewise-polynomial interpolants and the Solar-System ephemeris container
//! the right-hand side reads its massive-body states from.

use crate::algebra::Coeff;
use crate::constants::{DAYS_PER_CENTURY, SECONDS_PER_DAY};
use crate::io::FileIO;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::path::Path;
use std::sync::OnceLock;

pub mod interpolant;
pub use self::interpolant::PiecewiseSeries;

#[derive(Clone, Debug, PartialEq, Snafu)]
pub enum EphemerisError {
    #[snafu(display(
        "evaluation time {t} days past J2000 outside the ephemeris domain [{start}, {end}]"
    ))]
    OutOfDomain { t: f64, start: f64, end: f64 },

    #[snafu(display("malformed interpolant: {reason}"))]
    Malformed { reason: String },
}

/// Convert an epoch offset in TDB seconds past J2000 (the native unit of the
/// upstream ephemeris files) into integration days.
pub fn et_seconds_to_days(et_s: f64) -> f64 {
    et_s / SECONDS_PER_DAY
}

/// Gravitational and figure parameters of one massive body.
///
/// `oblate` masks the zonal-harmonics interaction: by default only the Earth
/// has it enabled, although the Sun and Moon entries carry their J₂ values so
/// the mask can be flipped per body without touching the dynamics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GravParams {
    pub name: String,
    /// Gravitational parameter, au³/day².
    pub gm: f64,
    /// Body radius, au (reference radius for the zonal harmonics).
    pub radius: f64,
    pub oblate: bool,
    pub j2: f64,
    pub j3: f64,
    pub j4: f64,
    /// Pole right ascension at J2000 and its rate, degrees and degrees per
    /// Julian century.
    pub pole_ra_deg: f64,
    pub pole_ra_rate: f64,
    pub pole_dec_deg: f64,
    pub pole_dec_rate: f64,
}

impl GravParams {
    /// A body with no figure model.
    pub fn point_mass(name: &str, gm: f64, radius: f64) -> Self {
        Self {
            name: name.to_string(),
            gm,
            radius,
            oblate: false,
            j2: 0.0,
            j3: 0.0,
            j4: 0.0,
            pole_ra_deg: 0.0,
            pole_ra_rate: 0.0,
            pole_dec_deg: 90.0,
            pole_dec_rate: 0.0,
        }
    }

    /// Rotation from the inertial frame into the body equatorial frame at
    /// `t` days past J2000, from the IAU pole angles: R₁(90°−δ)·R₃(90°+α).
    /// The prime meridian is irrelevant for zonal harmonics.
    pub fn pole_rotation(&self, t: f64) -> Matrix3<f64> {
        let centuries = t / DAYS_PER_CENTURY;
        let ra = (self.pole_ra_deg + self.pole_ra_rate * centuries).to_radians();
        let dec = (self.pole_dec_deg + self.pole_dec_rate * centuries).to_radians();
        rot_x(std::f64::consts::FRAC_PI_2 - dec) * rot_z(std::f64::consts::FRAC_PI_2 + ra)
    }
}

fn rot_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0)
}

fn rot_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c)
}

/// The DE440-compatible body table: Sun, planets, the Moon and Pluto, in
/// barycentric ordering. GM in au³/day², radii in au.
pub fn solar_system_bodies() -> Vec<GravParams> {
    let mut sun = GravParams::point_mass("Sun", 2.9591220828559093e-4, 4.6524726e-3);
    sun.j2 = 2.1106088532726840e-7;
    sun.pole_ra_deg = 286.13;
    sun.pole_dec_deg = 63.87;

    let mercury = GravParams::point_mass("Mercury", 4.9125001948893182e-11, 1.63084e-5);
    let venus = GravParams::point_mass("Venus", 7.2434523326441187e-10, 4.04537e-5);

    let mut earth = GravParams::point_mass("Earth", 8.8876924467071022e-10, 4.26352e-5);
    earth.oblate = true;
    earth.j2 = 1.08262545e-3;
    earth.j3 = -2.5326613e-6;
    earth.j4 = -1.6198976e-6;
    earth.pole_ra_rate = -0.641;
    earth.pole_dec_rate = -0.557;

    let mut moon = GravParams::point_mass("Moon", 1.0931894624024351e-11, 1.16138e-5);
    moon.j2 = 2.0321568464952570e-4;
    moon.pole_ra_deg = 269.9949;
    moon.pole_dec_deg = 66.5392;

    let mars = GravParams::point_mass("Mars", 9.5495488297258119e-11, 2.27021e-5);
    let jupiter = GravParams::point_mass("Jupiter", 2.8253458252257917e-7, 4.77895e-4);
    let saturn = GravParams::point_mass("Saturn", 8.4597059933762903e-8, 4.02867e-4);
    let uranus = GravParams::point_mass("Uranus", 1.2920249167819693e-8, 1.70851e-4);
    let neptune = GravParams::point_mass("Neptune", 1.5243589007842762e-8, 1.65537e-4);
    let pluto = GravParams::point_mass("Pluto", 2.1786852877392738e-12, 7.9433e-6);

    vec![
        sun, mercury, venus, earth, moon, mars, jupiter, saturn, uranus, neptune, pluto,
    ]
}

/// Barycentric states of the massive bodies over the integration interval.
///
/// The container carries the position channel (three coordinates per body, in
/// au) and the Newtonian potential at each body (`Σ_j μ_j/ρ_ij`, in
/// au²/day²); velocities and accelerations are derived by differentiating the
/// position interpolant and cached on first use.
#[derive(Debug, Serialize, Deserialize)]
pub struct SolarSystemEphemeris {
    bodies: Vec<GravParams>,
    position: PiecewiseSeries<f64>,
    potential: PiecewiseSeries<f64>,
    #[serde(skip)]
    velocity: OnceLock<PiecewiseSeries<f64>>,
    #[serde(skip)]
    acceleration: OnceLock<PiecewiseSeries<f64>>,
}

impl FileIO for SolarSystemEphemeris {}

impl SolarSystemEphemeris {
    pub fn new(
        bodies: Vec<GravParams>,
        position: PiecewiseSeries<f64>,
        potential: PiecewiseSeries<f64>,
    ) -> Result<Self, EphemerisError> {
        if position.coords() != 3 * bodies.len() {
            return Err(EphemerisError::Malformed {
                reason: format!(
                    "{} position coordinates for {} bodies",
                    position.coords(),
                    bodies.len()
                ),
            });
        }
        if potential.coords() != bodies.len() {
            return Err(EphemerisError::Malformed {
                reason: format!(
                    "{} potential coordinates for {} bodies",
                    potential.coords(),
                    bodies.len()
                ),
            });
        }
        Ok(Self {
            bodies,
            position,
            potential,
            velocity: OnceLock::new(),
            acceleration: OnceLock::new(),
        })
    }

    /// Load from disk and log the coverage interval.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, crate::io::IoError> {
        let eph = Self::load(&path)?;
        info!(
            "loaded ephemeris of {} bodies covering [{:.2}, {:.2}] days past J2000 from {}",
            eph.bodies.len(),
            eph.start(),
            eph.end(),
            path.as_ref().display()
        );
        Ok(eph)
    }

    pub fn n_bodies(&self) -> usize {
        self.bodies.len()
    }

    pub fn bodies(&self) -> &[GravParams] {
        &self.bodies
    }

    pub fn body(&self, i: usize) -> &GravParams {
        &self.bodies[i]
    }

    pub fn start(&self) -> f64 {
        self.position.start()
    }

    pub fn end(&self) -> f64 {
        self.position.end()
    }

    fn velocity_channel(&self) -> &PiecewiseSeries<f64> {
        self.velocity.get_or_init(|| self.position.differentiate())
    }

    fn acceleration_channel(&self) -> &PiecewiseSeries<f64> {
        self.acceleration
            .get_or_init(|| self.velocity_channel().differentiate())
    }

    /// Barycentric position of body `i` in the ring of the prototype time.
    pub fn position_of<T: Coeff>(&self, i: usize, t: &T) -> Result<[T; 3], EphemerisError> {
        self.position.evaluate_vec3_in(3 * i, t)
    }

    pub fn velocity_of<T: Coeff>(&self, i: usize, t: &T) -> Result<[T; 3], EphemerisError> {
        self.velocity_channel().evaluate_vec3_in(3 * i, t)
    }

    /// Newtonian acceleration of body `i`, from the twice-differentiated
    /// position channel.
    pub fn acceleration_of<T: Coeff>(&self, i: usize, t: &T) -> Result<[T; 3], EphemerisError> {
        self.acceleration_channel().evaluate_vec3_in(3 * i, t)
    }

    /// Newtonian potential at body `i` (sum over the other massive bodies).
    pub fn potential_of<T: Coeff>(&self, i: usize, t: &T) -> Result<T, EphemerisError> {
        self.potential.evaluate_coord_in(i, t)
    }
}
