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

//! Zonal-harmonics acceleration of an oblate body, evaluated in the body
//! equatorial frame obtained from the IAU pole angles and rotated back.

use super::{dot3, AlgebraDomainSnafu, DynamicsError};
use crate::algebra::Coeff;
use crate::ephemeris::GravParams;
use nalgebra::Matrix3;
use snafu::ResultExt;

/// Apply a numeric rotation to a series-valued vector.
fn rotate<T: Coeff>(m: &Matrix3<f64>, v: &[T; 3]) -> [T; 3] {
    let row = |j: usize| {
        v[0].scale(m[(j, 0)]) + v[1].scale(m[(j, 1)]) + v[2].scale(m[(j, 2)])
    };
    [row(0), row(1), row(2)]
}

fn rotate_back<T: Coeff>(m: &Matrix3<f64>, v: &[T; 3]) -> [T; 3] {
    let col = |j: usize| {
        v[0].scale(m[(0, j)]) + v[1].scale(m[(1, j)]) + v[2].scale(m[(2, j)])
    };
    [col(0), col(1), col(2)]
}

/// J₂/J₃/J₄ acceleration exerted by `params` on a particle at `delta`
/// (particle position relative to the body, inertial frame, au), at `t` days
/// past J2000. Vanishing zonal coefficients contribute nothing.
pub fn zonal_acceleration<T: Coeff>(
    params: &GravParams,
    t: f64,
    delta: &[T; 3],
) -> Result<[T; 3], DynamicsError> {
    let rot = params.pole_rotation(t);
    let xi = rotate(&rot, delta);
    let (x, y, z) = (&xi[0], &xi[1], &xi[2]);

    let r2 = dot3(&xi, &xi);
    let r = Coeff::sqrt(&r2).context(AlgebraDomainSnafu)?;
    let r2_inv = Coeff::recip(&r2).context(AlgebraDomainSnafu)?;
    let r5_inv = Coeff::recip(&(r2.clone() * r2.clone() * r.clone())).context(AlgebraDomainSnafu)?;
    let r7_inv = r5_inv.clone() * r2_inv.clone();

    let z2_r2 = z.clone() * z.clone() * r2_inv.clone();
    let re2 = params.radius * params.radius;

    // J2 (Vallado 8-23): the dominant flattening term.
    let c2 = -1.5 * params.j2 * params.gm * re2;
    let f_xy = (z2_r2.scale(-5.0) + z.lift(1.0)) * r5_inv.clone();
    let f_z = (z2_r2.scale(-5.0) + z.lift(3.0)) * r5_inv.clone();
    let mut acc = [
        x.clone() * f_xy.clone().scale(c2),
        y.clone() * f_xy.scale(c2),
        z.clone() * f_z.scale(c2),
    ];

    if params.j3 != 0.0 {
        let c3 = -2.5 * params.j3 * params.gm * re2 * params.radius;
        let w = z.clone() * (z2_r2.scale(-7.0) + z.lift(3.0));
        let g_z = z.clone() * z.clone() * (z2_r2.scale(-7.0) + z.lift(6.0)) - r2.clone().scale(0.6);
        acc[0] += x.clone() * w.clone() * r7_inv.clone().scale(c3);
        acc[1] += y.clone() * w * r7_inv.clone().scale(c3);
        acc[2] += g_z * r7_inv.clone().scale(c3);
    }

    if params.j4 != 0.0 {
        let c4 = 1.875 * params.j4 * params.gm * re2 * re2;
        let z4_r4 = z2_r2.clone() * z2_r2.clone();
        let h_xy = z4_r4.clone().scale(21.0) + z2_r2.scale(-14.0) + z.lift(1.0);
        let h_z = z4_r4.scale(21.0)
            + (z.clone() * z.clone() * r2_inv).scale(-70.0 / 3.0)
            + z.lift(5.0);
        acc[0] += x.clone() * h_xy.clone() * r7_inv.clone().scale(c4);
        acc[1] += y.clone() * h_xy * r7_inv.clone().scale(c4);
        acc[2] += z.clone() * h_z * r7_inv.scale(c4);
    }

    Ok(rotate_back(&rot, &acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::solar_system_bodies;

    fn earth() -> GravParams {
        solar_system_bodies()
            .into_iter()
            .find(|b| b.name == "Earth")
            .unwrap()
    }

    #[test]
    fn equatorial_j2_pulls_inward() {
        let mut body = earth();
        body.j3 = 0.0;
        body.j4 = 0.0;
        // Aligned with the Earth pole frame at J2000 (t = 0): a point in the
        // equatorial plane feels an extra inward pull, a point on the polar
        // axis an extra outward-reducing pull of twice the magnitude.
        let rot = body.pole_rotation(0.0);
        let r = 10.0 * body.radius;
        let equator: [f64; 3] = (rot.transpose() * nalgebra::Vector3::new(r, 0.0, 0.0)).into();
        let pole: [f64; 3] = (rot.transpose() * nalgebra::Vector3::new(0.0, 0.0, r)).into();

        let a_eq = zonal_acceleration(&body, 0.0, &equator).unwrap();
        let a_pole = zonal_acceleration(&body, 0.0, &pole).unwrap();

        let radial_eq = (0..3).map(|i| a_eq[i] * equator[i] / r).sum::<f64>();
        let radial_pole = (0..3).map(|i| a_pole[i] * pole[i] / r).sum::<f64>();
        let magnitude = 1.5 * body.j2 * body.gm * body.radius.powi(2) / r.powi(4);

        assert!((radial_eq + magnitude).abs() < 1e-9 * magnitude);
        assert!((radial_pole - 2.0 * magnitude).abs() < 1e-9 * magnitude);
    }

    #[test]
    fn series_and_scalar_agree() {
        use crate::algebra::TaylorSeries;
        let body = earth();
        let delta = [6e-5, -3e-5, 2e-5];
        let scalar = zonal_acceleration(&body, 100.0, &delta).unwrap();
        let series_delta = [
            TaylorSeries::<f64>::constant(delta[0], 5),
            TaylorSeries::constant(delta[1], 5),
            TaylorSeries::constant(delta[2], 5),
        ];
        let series = zonal_acceleration(&body, 100.0, &series_delta).unwrap();
        for i in 0..3 {
            assert!((series[i].coeff(0) - scalar[i]).abs() < 1e-18);
        }
    }
}
