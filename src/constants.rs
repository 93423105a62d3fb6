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

//! Physical and unit constants. Everything dynamical is expressed in au,
//! au/day and days of TDB past J2000, matching the ephemeris units.

/// One astronomical unit in kilometers (IAU 2012 definition).
pub const AU_KM: f64 = 1.495978707e8;

pub const SECONDS_PER_DAY: f64 = 86400.0;

pub const DAYS_PER_YEAR: f64 = 365.25;

pub const DAYS_PER_CENTURY: f64 = 36525.0;

/// Speed of light in au/day.
pub const C_AU_DAY: f64 = 173.144632674240;

/// 1/c² in the integration units, the post-Newtonian expansion parameter.
pub const INV_C2: f64 = 1.0 / (C_AU_DAY * C_AU_DAY);

/// Heliocentric gravitational parameter, au³/day² (DE440 compatible).
pub const GM_SUN: f64 = 2.9591220828559093e-4;

/// Julian date of the J2000 epoch.
pub const JD_J2000: f64 = 2451545.0;
