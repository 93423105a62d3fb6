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

//! Post-Newtonian N-body right-hand side for a massless asteroid.
//!
//! The asteroid is a test particle: the massive-body states come from the
//! ephemeris, so no self-interaction pair ever appears in the sums. State
//! layout is `[x y z vx vy vz A β]` where `A` is the Yarkovsky acceleration
//! magnitude and `β` the radiation-pressure coefficient; both are constants
//! of motion carried so the jet captures their sensitivity.

use super::oblateness::zonal_acceleration;
use super::{
    add3, dot3, mul3, scale3, sub3, zero3, AlgebraDomainSnafu, Dynamics, DynamicsError,
    EphemerisReadSnafu,
};
use crate::algebra::{Coeff, TaylorSeries};
use crate::constants::INV_C2;
use crate::ephemeris::SolarSystemEphemeris;
use rayon::prelude::*;
use snafu::ResultExt;
use std::sync::Arc;

/// Index of the Yarkovsky magnitude in the state vector.
pub const YARKOVSKY: usize = 6;
/// Index of the radiation-pressure coefficient in the state vector.
pub const RADIATION_PRESSURE: usize = 7;
/// Full state dimension.
pub const STATE_DIM: usize = 8;

/// Einstein–Infeld–Hoffmann point-mass accelerations plus planetary
/// oblateness and the non-gravitational terms.
#[derive(Clone)]
pub struct RelativisticDynamics {
    eph: Arc<SolarSystemEphemeris>,
    sun: usize,
    /// Partition the per-body loop across the rayon pool. The fold over the
    /// per-body contributions stays sequential in body order, so the result
    /// is identical to the serial variant.
    pub threaded: bool,
}

/// Pairwise geometry of the asteroid against one massive body, reused by the
/// Newtonian, post-Newtonian and non-gravitational terms.
struct BodyGeometry<T> {
    delta: [T; 3],
    delta_v: [T; 3],
    rho_inv: T,
    rho2_inv: T,
    rho3_inv: T,
    newton: [T; 3],
    mu_over_rho: T,
    vel: [T; 3],
    acc: [T; 3],
    pot: T,
}

impl RelativisticDynamics {
    pub fn new(eph: Arc<SolarSystemEphemeris>) -> Self {
        let sun = eph
            .bodies()
            .iter()
            .position(|b| b.name == "Sun")
            .unwrap_or(0);
        Self {
            eph,
            sun,
            threaded: false,
        }
    }

    pub fn with_threading(mut self, threaded: bool) -> Self {
        self.threaded = threaded;
        self
    }

    pub fn ephemeris(&self) -> &Arc<SolarSystemEphemeris> {
        &self.eph
    }

    fn map_bodies<T, F>(&self, f: F) -> Result<Vec<T>, DynamicsError>
    where
        T: Send,
        F: Fn(usize) -> Result<T, DynamicsError> + Send + Sync,
    {
        if self.threaded {
            (0..self.eph.n_bodies()).into_par_iter().map(f).collect()
        } else {
            (0..self.eph.n_bodies()).map(f).collect()
        }
    }

    fn geometry<R: Coeff>(
        &self,
        body: usize,
        t: &TaylorSeries<R>,
        r: &[TaylorSeries<R>; 3],
        v: &[TaylorSeries<R>; 3],
    ) -> Result<BodyGeometry<TaylorSeries<R>>, DynamicsError> {
        let params = self.eph.body(body);
        let pos = self.eph.position_of(body, t).context(EphemerisReadSnafu)?;
        let vel = self.eph.velocity_of(body, t).context(EphemerisReadSnafu)?;
        let acc = self
            .eph
            .acceleration_of(body, t)
            .context(EphemerisReadSnafu)?;
        let pot = self.eph.potential_of(body, t).context(EphemerisReadSnafu)?;

        let delta = sub3(r, &pos);
        let delta_v = sub3(v, &vel);
        let rho2 = dot3(&delta, &delta);
        let rho = Coeff::sqrt(&rho2).context(AlgebraDomainSnafu)?;

        if rho.const_part() <= params.radius {
            return Err(DynamicsError::Impact {
                body: params.name.clone(),
                t: t.const_part(),
            });
        }

        let rho_inv = Coeff::recip(&rho).context(AlgebraDomainSnafu)?;
        let rho2_inv = rho_inv.clone() * rho_inv.clone();
        let rho3_inv = rho2_inv.clone() * rho_inv.clone();
        let newton = mul3(&delta, &rho3_inv.scale(-params.gm));
        let mu_over_rho = rho_inv.scale(params.gm);

        Ok(BodyGeometry {
            delta,
            delta_v,
            rho_inv,
            rho2_inv,
            rho3_inv,
            newton,
            mu_over_rho,
            vel,
            acc,
            pot,
        })
    }
}

impl<R: Coeff> Dynamics<R> for RelativisticDynamics {
    fn dim(&self) -> usize {
        STATE_DIM
    }

    fn eom(
        &self,
        t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
        dxdt: &mut [TaylorSeries<R>],
    ) -> Result<(), DynamicsError> {
        let r = [state[0].clone(), state[1].clone(), state[2].clone()];
        let v = [state[3].clone(), state[4].clone(), state[5].clone()];
        let proto = &state[0];

        let geoms = self.map_bodies(|i| self.geometry(i, t, &r, &v))?;

        // First reduction: Newtonian acceleration and the potential at the
        // asteroid, needed by every post-Newtonian bracket.
        let mut newton = zero3(proto);
        let mut u_ast = proto.lift(0.0);
        for geom in &geoms {
            newton = add3(&newton, &geom.newton);
            u_ast += geom.mu_over_rho.clone();
        }

        let v2 = dot3(&v, &v);
        let t_days = t.const_part();

        // Per-body EIH correction: the Newtonian term is multiplied by
        // (1 + corr/c²) and a velocity-dependent piece plus the 7/(2c²)
        // source-acceleration piece are added. Writes are per body; the fold
        // below is sequential in body order.
        let pn_terms = self.map_bodies(|i| {
            let geom = &geoms[i];
            let params = self.eph.body(i);

            let vi2 = dot3(&geom.vel, &geom.vel);
            let v_dot_vi = dot3(&v, &geom.vel);
            let radial_vi = dot3(&geom.delta, &geom.vel);
            let delta_dot_acc = dot3(&geom.delta, &geom.acc);

            let corr = (u_ast.scale(-4.0) - geom.pot.clone()
                + v2.clone()
                + vi2.scale(2.0)
                + v_dot_vi.scale(-4.0)
                + (radial_vi.clone() * radial_vi * geom.rho2_inv.clone()).scale(-1.5)
                + delta_dot_acc.scale(-0.5))
            .scale(INV_C2);
            let mut term = mul3(&geom.newton, &corr);

            let four_v_minus_three_vi = [
                v[0].scale(4.0) - geom.vel[0].scale(3.0),
                v[1].scale(4.0) - geom.vel[1].scale(3.0),
                v[2].scale(4.0) - geom.vel[2].scale(3.0),
            ];
            let coupling = (dot3(&geom.delta, &four_v_minus_three_vi) * geom.rho3_inv.clone())
                .scale(params.gm * INV_C2);
            term = add3(&term, &mul3(&geom.delta_v, &coupling));

            term = add3(
                &term,
                &scale3(&mul3(&geom.acc, &geom.mu_over_rho), 3.5 * INV_C2),
            );

            if params.oblate {
                term = add3(&term, &zonal_acceleration(params, t_days, &geom.delta)?);
            }

            Ok(term)
        })?;

        let mut accel = newton;
        for term in &pn_terms {
            accel = add3(&accel, term);
        }

        // Non-gravitational terms along the heliocentric direction: the
        // Yarkovsky magnitude and the radiation-pressure coefficient ride in
        // the state so the jet carries their sensitivity.
        let sun = &geoms[self.sun];
        let gm_sun = self.eph.body(self.sun).gm;
        let radial = state[YARKOVSKY].clone()
            + state[RADIATION_PRESSURE].clone() * sun.rho2_inv.scale(gm_sun);
        let unit_h = mul3(&sun.delta, &sun.rho_inv);
        accel = add3(&accel, &mul3(&unit_h, &radial));

        dxdt[0] = v[0].clone();
        dxdt[1] = v[1].clone();
        dxdt[2] = v[2].clone();
        dxdt[3] = accel[0].clone();
        dxdt[4] = accel[1].clone();
        dxdt[5] = accel[2].clone();
        dxdt[YARKOVSKY] = state[YARKOVSKY].zeroed();
        dxdt[RADIATION_PRESSURE] = state[RADIATION_PRESSURE].zeroed();

        Ok(())
    }
}
