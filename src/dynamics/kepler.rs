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

use super::{dot3, AlgebraDomainSnafu, Dynamics, DynamicsError};
use crate::algebra::{Coeff, TaylorSeries};
use crate::constants::GM_SUN;
use snafu::ResultExt;

/// Two-body dynamics around a single central mass.
///
/// Integrating this against the analytic Kepler solution is the canonical
/// validation of the step kernel.
#[derive(Clone, Debug)]
pub struct KeplerDynamics {
    pub gm: f64,
}

impl KeplerDynamics {
    pub fn sun() -> Self {
        Self { gm: GM_SUN }
    }
}

impl<R: Coeff> Dynamics<R> for KeplerDynamics {
    fn dim(&self) -> usize {
        6
    }

    fn eom(
        &self,
        _t: &TaylorSeries<R>,
        state: &[TaylorSeries<R>],
        dxdt: &mut [TaylorSeries<R>],
    ) -> Result<(), DynamicsError> {
        let r = [state[0].clone(), state[1].clone(), state[2].clone()];
        let r2 = dot3(&r, &r);
        let rho = Coeff::sqrt(&r2).context(AlgebraDomainSnafu)?;
        let rho3_inv = Coeff::recip(&(rho * r2)).context(AlgebraDomainSnafu)?;
        for i in 0..3 {
            dxdt[i] = state[3 + i].clone();
            dxdt[3 + i] = r[i].clone() * rho3_inv.scale(-self.gm);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_orbit_acceleration() {
        let dyn_ = KeplerDynamics { gm: 1.0 };
        let order = 4;
        let t = TaylorSeries::<f64>::variable(0.0, order);
        let state: Vec<_> = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
            .iter()
            .map(|&v| TaylorSeries::constant(v, order))
            .collect();
        let mut dxdt = vec![TaylorSeries::constant(0.0, order); 6];
        dyn_.eom(&t, &state, &mut dxdt).unwrap();
        // ṙ = v, v̇ = -r/r³ = (-1, 0, 0).
        assert!((dxdt[1].coeff(0) - 1.0).abs() < 1e-15);
        assert!((dxdt[3].coeff(0) + 1.0).abs() < 1e-15);
        assert!(dxdt[4].coeff(0).abs() < 1e-15);
    }
}
